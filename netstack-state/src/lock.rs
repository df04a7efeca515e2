//! State lock records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Minutes a lock is honored before another run may take it over
pub const LOCK_TTL_MINUTES: i64 = 15;

/// Information about a state lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub id: String,
    /// Command holding the lock ("apply", "destroy")
    pub operation: String,
    /// `user@host` of the holder
    pub who: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(operation: impl Into<String>) -> Self {
        Self::with_ttl(operation, Duration::minutes(LOCK_TTL_MINUTES))
    }

    pub fn with_ttl(operation: impl Into<String>, ttl: Duration) -> Self {
        let created = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
            who: lock_owner(),
            created,
            expires: created + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires
    }
}

fn lock_owner() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_expires_after_ttl() {
        let lock = LockInfo::new("apply");
        assert_eq!(lock.operation, "apply");
        assert!(lock.who.contains('@'));
        assert_eq!(lock.expires - lock.created, Duration::minutes(15));
        assert!(!lock.is_expired());

        let stale = LockInfo::with_ttl("apply", Duration::seconds(-1));
        assert!(stale.is_expired());
    }

    #[test]
    fn lock_ids_are_unique() {
        assert_ne!(LockInfo::new("apply").id, LockInfo::new("apply").id);
    }
}
