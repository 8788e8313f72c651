//! Error types for OmniDB
//!
//! Every fallible operation returns a `DbError`. Each error provides:
//! - code(): a generic status for caller branching
//! - class(): a coarse classification (permanent, transient, unknown) for retry policy
//! - message(): the backend-native or core-generated diagnostic
//!
//! Handles additionally keep the last failure as a `LastError`.

mod classify;
mod constructors;
mod types;

pub use types::{DbError, DbResult, ErrorClass, ErrorCode, LastError};
