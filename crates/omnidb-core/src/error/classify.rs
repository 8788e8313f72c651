//! Status codes and classification for DbError

use super::types::{DbError, ErrorClass, ErrorCode};

impl DbError {
    /// Generic status for programmatic branching
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::BackendNotFound { .. } => ErrorCode::BackendNotFound,
            Self::Connect { .. } => ErrorCode::Connect,
            Self::Auth { .. } => ErrorCode::Auth,
            Self::NotSupported { .. } => ErrorCode::NotSupported,
            Self::Use { .. } => ErrorCode::Use,
            Self::Index { .. } => ErrorCode::Index,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidOption { .. } => ErrorCode::InvalidOption,
            Self::Backend { .. } => ErrorCode::Backend,
        }
    }

    /// Stable string code, e.g. for log fields
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BackendNotFound { .. } => "DB_BACKEND_NOT_FOUND",
            Self::Connect { .. } => "DB_CONNECT",
            Self::Auth { .. } => "DB_AUTH",
            Self::NotSupported { .. } => "DB_NOT_SUPPORTED",
            Self::Use { .. } => "DB_USE",
            Self::Index { .. } => "DB_INDEX",
            Self::NotFound { .. } => "DB_NOT_FOUND",
            Self::InvalidOption { .. } => "DB_INVALID_OPTION",
            Self::Backend { .. } => "DB_BACKEND",
        }
    }

    /// Coarse classification guiding retry decisions
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Connect { .. } => ErrorClass::Transient,
            Self::Backend { class, .. } => *class,
            _ => ErrorClass::Permanent,
        }
    }

    /// Native or core-generated message without the variant prefix
    pub fn message(&self) -> String {
        match self {
            Self::BackendNotFound { name } => name.clone(),
            Self::Connect { message }
            | Self::Auth { message }
            | Self::NotSupported { message }
            | Self::Use { message }
            | Self::NotFound { message }
            | Self::InvalidOption { message }
            | Self::Backend { message, .. } => message.clone(),
            Self::Index { .. } => self.to_string(),
        }
    }

    /// Check if this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// True for lifecycle violations
    pub fn is_use_error(&self) -> bool {
        matches!(self, Self::Use { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LastError;

    #[test]
    fn test_classification() {
        assert_eq!(DbError::connect("refused").class(), ErrorClass::Transient);
        assert_eq!(DbError::auth("bad password").class(), ErrorClass::Permanent);
        assert_eq!(DbError::usage("not bound").class(), ErrorClass::Permanent);
        assert_eq!(
            DbError::backend("disk I/O error", ErrorClass::Unknown).class(),
            ErrorClass::Unknown
        );
        assert!(DbError::transient("database is locked").is_retryable());
        assert!(!DbError::permanent("syntax error").is_retryable());
    }

    #[test]
    fn test_codes() {
        assert_eq!(DbError::index(3, 1).code(), ErrorCode::Index);
        assert_eq!(DbError::index(3, 1).error_code(), "DB_INDEX");
        assert_eq!(DbError::backend_not_found("pg").code(), ErrorCode::BackendNotFound);
        assert!(DbError::usage("x").is_use_error());
    }

    #[test]
    fn test_last_error_from_backend_error() {
        let err = DbError::permanent("near \"BOGUS\": syntax error");
        let last = LastError::from(&err);
        assert_eq!(last.code, ErrorCode::Backend);
        assert_eq!(last.class, ErrorClass::Permanent);
        assert_eq!(last.message, "near \"BOGUS\": syntax error");
        assert_eq!(err.message(), last.message);
    }
}
