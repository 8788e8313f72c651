//! Constructor methods for DbError

use super::types::{DbError, ErrorClass};

impl DbError {
    /// Create a backend-not-found error
    pub fn backend_not_found(name: impl Into<String>) -> Self {
        Self::BackendNotFound { name: name.into() }
    }

    /// Create a connect error
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a not-supported error
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Create a use error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Use {
            message: message.into(),
        }
    }

    /// Create an index error
    pub fn index(pos: usize, count: usize) -> Self {
        Self::Index { pos, count }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an invalid option error
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption {
            message: message.into(),
        }
    }

    /// Create a backend error with an explicit classification
    pub fn backend(message: impl Into<String>, class: ErrorClass) -> Self {
        Self::Backend {
            message: message.into(),
            class,
        }
    }

    /// Backend error that will not go away on retry
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::backend(message, ErrorClass::Permanent)
    }

    /// Backend error that may succeed on retry
    pub fn transient(message: impl Into<String>) -> Self {
        Self::backend(message, ErrorClass::Transient)
    }
}
