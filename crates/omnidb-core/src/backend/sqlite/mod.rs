//! SQLite backend module
//!
//! Embedded SQLite through rusqlite, with the connection owned by a
//! dedicated worker thread.

mod backend;
mod worker;

#[cfg(test)]
mod tests;

pub use backend::{SQLITE_BUSY_TIMEOUT, SQLITE_FOREIGN_KEYS, SqliteBackend};
