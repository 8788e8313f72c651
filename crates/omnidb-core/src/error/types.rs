//! Core error types for OmniDB

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for OmniDB operations
pub type DbResult<T> = Result<T, DbError>;

/// Coarse failure classification used to decide whether retrying makes sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Retrying the same call will fail again
    Permanent,
    /// The condition may clear up (lock contention, transport hiccup)
    Transient,
    /// The backend could not tell
    Unknown,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permanent => write!(f, "permanent"),
            Self::Transient => write!(f, "transient"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Generic status code for caller branching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    BackendNotFound,
    Connect,
    Auth,
    NotSupported,
    Use,
    Index,
    NotFound,
    InvalidOption,
    Backend,
}

/// Main error type for OmniDB
///
/// Every variant carries the backend-native or core-generated message.
/// `Backend` failures additionally carry the engine's classification.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    /// No backend registered under the requested name
    #[error("Backend not found: {name}")]
    BackendNotFound { name: String },

    /// Transport-level failure while initializing a handle
    #[error("Connect failed: {message}")]
    Connect { message: String },

    /// Authentication or database open failure during bind
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Unknown option id, read-only option or unsupported bind method
    #[error("Not supported: {message}")]
    NotSupported { message: String },

    /// Operation invoked out of lifecycle order or on an invalid cursor
    #[error("Invalid use: {message}")]
    Use { message: String },

    /// Column or field position out of range
    #[error("Index {pos} out of range (count {count})")]
    Index { pos: usize, count: usize },

    /// Option id was never set and has no default
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Option value does not match the option's kind
    #[error("Invalid option value: {message}")]
    InvalidOption { message: String },

    /// Opaque native failure
    #[error("{message}")]
    Backend { message: String, class: ErrorClass },
}

/// Last-error state kept by a handle
///
/// Overwritten by every failing call. Success leaves it untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct LastError {
    pub code: ErrorCode,
    pub class: ErrorClass,
    pub message: String,
}

impl From<&DbError> for LastError {
    fn from(error: &DbError) -> Self {
        Self {
            code: error.code(),
            class: error.class(),
            message: error.to_string(),
        }
    }
}
