//! Local file backend for state storage
//!
//! State lives in a JSON file (default `netstack.state.json`); the lock is a
//! sibling file with the `.lock` extension.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};
use crate::lock::LockInfo;
use crate::state::StateFile;

pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "netstack.state.json";

    pub fn with_path(state_path: PathBuf) -> Self {
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
        }
    }

    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        let path = config.get_string("path").unwrap_or(Self::DEFAULT_STATE_FILE);
        if path.trim().is_empty() {
            return Err(BackendError::Configuration(
                "state path must not be empty".to_string(),
            ));
        }
        Ok(Self::with_path(PathBuf::from(path)))
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    async fn read_lock(&self) -> BackendResult<Option<LockInfo>> {
        if !self.lock_path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&self.lock_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to read lock file: {}", e)))?;
        let lock = serde_json::from_str(&content)
            .map_err(|e| BackendError::InvalidState(format!("Failed to parse lock file: {}", e)))?;
        Ok(Some(lock))
    }

    async fn remove_lock(&self) -> BackendResult<()> {
        tokio::fs::remove_file(&self.lock_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to remove lock file: {}", e)))
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        if !self.state_path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&self.state_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to read state file: {}", e)))?;

        let state: StateFile = serde_json::from_str(&content).map_err(|e| {
            BackendError::InvalidState(format!("Failed to parse state file: {}", e))
        })?;

        Ok(Some(state))
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(stored) = self.read_state().await?
            && stored.lineage != state.lineage
        {
            return Err(BackendError::LineageMismatch {
                expected: stored.lineage,
                actual: state.lineage.clone(),
            });
        }

        let content = serde_json::to_string_pretty(state).map_err(|e| {
            BackendError::Serialization(format!("Failed to serialize state: {}", e))
        })?;

        if let Some(parent) = self.state_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BackendError::Io(format!("Failed to create state directory: {}", e)))?;
        }

        tokio::fs::write(&self.state_path, content)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write state file: {}", e)))?;

        log::debug!(
            "Wrote state serial {} to {}",
            state.serial,
            self.state_path.display()
        );
        Ok(())
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo> {
        // An unreadable lock file is treated like a stale one
        match self.read_lock().await {
            Ok(Some(existing)) if !existing.is_expired() => {
                return Err(BackendError::locked(&existing));
            }
            Ok(Some(existing)) => {
                log::warn!("Taking over expired lock {} held by {}", existing.id, existing.who);
            }
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring unreadable lock file: {}", e),
        }

        let lock = LockInfo::new(operation);
        let content = serde_json::to_string_pretty(&lock)
            .map_err(|e| BackendError::Serialization(format!("Failed to serialize lock: {}", e)))?;

        tokio::fs::write(&self.lock_path, content)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write lock file: {}", e)))?;

        Ok(lock)
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        let existing = self
            .read_lock()
            .await?
            .ok_or_else(|| BackendError::LockNotFound(lock.id.clone()))?;

        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }

        self.remove_lock().await
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        if !self.lock_path.exists() {
            return Err(BackendError::LockNotFound(lock_id.to_string()));
        }

        if let Ok(Some(existing)) = self.read_lock().await
            && existing.id != lock_id
        {
            return Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: existing.id,
            });
        }

        self.remove_lock().await
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::state::ResourceState;

    fn backend_in(dir: &Path) -> LocalBackend {
        LocalBackend::with_path(dir.join("dev.state.json"))
    }

    #[tokio::test]
    async fn read_write_state() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());

        assert!(backend.read_state().await.unwrap().is_none());

        let mut state = StateFile::new("dev");
        state.upsert_resource(ResourceState::new("ec2_vpc", "domain_vpc").with_identifier("vpc-1"));
        state.increment_serial();
        backend.write_state(&state).await.unwrap();

        let read = backend.read_state().await.unwrap().unwrap();
        assert_eq!(read.serial, 1);
        assert_eq!(read.stage, "dev");
        assert_eq!(read.resources, state.resources);
    }

    #[tokio::test]
    async fn refuses_to_overwrite_other_lineage() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());

        backend.write_state(&StateFile::new("dev")).await.unwrap();
        let result = backend.write_state(&StateFile::new("dev")).await;
        assert!(matches!(result, Err(BackendError::LineageMismatch { .. })));
    }

    #[tokio::test]
    async fn creates_missing_directories() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("states").join("dev.json"));
        backend.write_state(&StateFile::new("dev")).await.unwrap();
        assert!(backend.state_path().exists());
    }

    #[tokio::test]
    async fn corrupt_state_is_reported() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());
        std::fs::write(backend.state_path(), "{ not json").unwrap();

        assert!(matches!(
            backend.read_state().await,
            Err(BackendError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_released() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());

        let lock = backend.acquire_lock("apply").await.unwrap();
        assert!(dir.path().join("dev.state.lock").exists());

        match backend.acquire_lock("destroy").await {
            Err(BackendError::Locked { lock_id, .. }) => assert_eq!(lock_id, lock.id),
            other => panic!("Expected Locked error, got {:?}", other),
        }

        let other = LockInfo::new("apply");
        assert!(matches!(
            backend.release_lock(&other).await,
            Err(BackendError::LockMismatch { .. })
        ));

        backend.release_lock(&lock).await.unwrap();
        let lock = backend.acquire_lock("destroy").await.unwrap();
        backend.release_lock(&lock).await.unwrap();
    }

    #[tokio::test]
    async fn expired_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());

        let stale = LockInfo::with_ttl("apply", chrono::Duration::seconds(-1));
        std::fs::write(&backend.lock_path, serde_json::to_string(&stale).unwrap()).unwrap();

        let lock = backend.acquire_lock("apply").await.unwrap();
        assert_ne!(lock.id, stale.id);
    }

    #[tokio::test]
    async fn force_unlock_checks_id() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());

        assert!(matches!(
            backend.force_unlock("nope").await,
            Err(BackendError::LockNotFound(_))
        ));

        let lock = backend.acquire_lock("apply").await.unwrap();
        assert!(matches!(
            backend.force_unlock("nope").await,
            Err(BackendError::LockMismatch { .. })
        ));
        backend.force_unlock(&lock.id).await.unwrap();
        assert!(backend.acquire_lock("apply").await.is_ok());
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(
            LocalBackend::from_config(&BackendConfig::local("")),
            Err(BackendError::Configuration(_))
        ));
        let backend = LocalBackend::from_config(&BackendConfig {
            backend_type: "local".to_string(),
            attributes: Default::default(),
        })
        .unwrap();
        assert_eq!(backend.state_path(), Path::new("netstack.state.json"));
    }
}
