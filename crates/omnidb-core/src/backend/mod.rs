//! Database backend implementations
//!
//! Provides the contract every engine adapter implements, plus the
//! built-in adapters.

#[cfg(feature = "sqlite")]
mod sqlite;
#[allow(clippy::module_inception)]
mod r#trait;

// Re-export all public APIs
#[cfg(feature = "sqlite")]
pub use sqlite::{SQLITE_BUSY_TIMEOUT, SQLITE_FOREIGN_KEYS, SqliteBackend};
pub use r#trait::{Backend, Fetch};

#[cfg(test)]
pub use r#trait::MockBackend;
