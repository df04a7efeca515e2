//! State backend trait and error types

use std::collections::HashMap;

use async_trait::async_trait;
use netstack_core::resource::Value;
use thiserror::Error;

use crate::lock::LockInfo;
use crate::state::StateFile;

/// Errors that can occur when interacting with a state backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("State is locked by {who} (lock ID: {lock_id}, operation: {operation})")]
    Locked {
        lock_id: String,
        who: String,
        operation: String,
    },

    #[error("Lock not found: {0}")]
    LockNotFound(String),

    #[error("Lock ID mismatch: expected {expected}, got {actual}")]
    LockMismatch { expected: String, actual: String },

    #[error("Unsupported backend type: {0}")]
    UnsupportedBackend(String),

    #[error("Backend configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state file: {0}")]
    InvalidState(String),

    /// The stored state belongs to another lineage
    #[error("State lineage mismatch: expected {expected}, got {actual}")]
    LineageMismatch { expected: String, actual: String },

    #[error("State belongs to stage {actual}, not {expected}")]
    StageMismatch { expected: String, actual: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BackendError {
    pub fn locked(lock: &LockInfo) -> Self {
        Self::Locked {
            lock_id: lock.id.clone(),
            who: lock.who.clone(),
            operation: lock.operation.clone(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Storage for state files
///
/// Writers hold a lock for the duration of an apply or destroy.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the stored state, `None` before the first apply
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Store the state. The serial should be incremented beforehand.
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Acquire the lock, failing while an unexpired lock is held
    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo>;

    /// Release a lock acquired by this process
    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()>;

    /// Remove a lock by ID regardless of who holds it
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;
}

/// Configuration for a state backend
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend type (currently only "local")
    pub backend_type: String,
    pub attributes: HashMap<String, Value>,
}

impl BackendConfig {
    /// Local backend storing state at `path`
    pub fn local(path: impl Into<String>) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("path".to_string(), Value::String(path.into()));
        Self {
            backend_type: "local".to_string(),
            attributes,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_error_names_holder() {
        let lock = LockInfo::new("apply");
        let error = BackendError::locked(&lock);
        assert_eq!(
            error.to_string(),
            format!(
                "State is locked by {} (lock ID: {}, operation: apply)",
                lock.who, lock.id
            )
        );
    }

    #[test]
    fn local_config_carries_path() {
        let config = BackendConfig::local("state/dev.json");
        assert_eq!(config.backend_type, "local");
        assert_eq!(config.get_string("path"), Some("state/dev.json"));
        assert_eq!(config.get_string("bucket"), None);
    }
}
