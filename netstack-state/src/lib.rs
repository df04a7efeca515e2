//! Netstack State Management
//!
//! Records the cloud identifiers and attributes of every resource a stage
//! has applied, so later runs can plan updates and deletions.
//!
//! - **StateFile**: resources recorded for one stage
//! - **StateBackend**: storage for state files, with locking
//! - **LockInfo**: who holds the state and until when
//!
//! # Example
//!
//! ```ignore
//! use netstack_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::local("netstack.state.json")).await?;
//!
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_else(|| StateFile::new("dev"));
//!
//! // ... apply a plan and record its outcomes ...
//! state.record_apply(&plan, &result);
//!
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::create_backend;
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
