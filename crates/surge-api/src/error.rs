use thiserror::Error;

use crate::meta::ObjectKind;

/// Custom result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by the object store and its callers.
///
/// `NotFound` is deliberately a first-class variant: a dependency that has
/// not materialized yet is routine, and callers must be able to tell it
/// apart from a transport failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{kind} {name:?} not found")]
    NotFound { kind: ObjectKind, name: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ApiError {
    /// Create a new not-found error
    pub fn not_found(kind: ObjectKind, name: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        ApiError::Transport(msg.into())
    }

    /// Create a new store error
    pub fn store<S: Into<String>>(msg: S) -> Self {
        ApiError::Store(msg.into())
    }

    /// Whether this error means the object simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_predicate() {
        let err = ApiError::not_found(ObjectKind::FileWatch, "frontend");
        assert!(err.is_not_found());
        assert!(!ApiError::transport("connection reset").is_not_found());
    }

    #[test]
    fn test_display_includes_kind_and_name() {
        let err = ApiError::not_found(ObjectKind::LiveUpdate, "api-server");
        assert_eq!(err.to_string(), "LiveUpdate \"api-server\" not found");
    }
}
