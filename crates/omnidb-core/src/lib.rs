//! OmniDB Core Library
//!
//! A uniform access layer over heterogeneous database engines: a fixed
//! backend contract, a registry resolving backend names to implementations,
//! per-handle options and last-error state, and chunked, timeout-bound
//! result streaming.

pub mod backend;
pub mod config;
pub mod error;
pub mod handle;
pub mod options;
pub mod registry;
pub mod sql;
pub mod types;

// Re-export commonly used types
pub use backend::{Backend, Fetch};
#[cfg(feature = "sqlite")]
pub use backend::{SQLITE_BUSY_TIMEOUT, SQLITE_FOREIGN_KEYS, SqliteBackend};
pub use config::ConnectionConfig;
pub use error::{DbError, DbResult, ErrorClass, ErrorCode, LastError};
pub use handle::{Handle, HandleState};
pub use options::{OptionAccess, OptionId, OptionKind, OptionSpec, OptionValue};
pub use registry::{BackendFactory, Registry, global_registry, register_backend};
pub use types::*;
