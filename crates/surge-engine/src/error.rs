use surge_api::ApiError;

/// Engine error types.
///
/// Only control-loop failures live here: a pass that returns an error is
/// retried by the external scheduler with backoff. Synchronization-domain
/// failures (Invalid, UpdateFailed, PodsInconsistent, run-step errors) are
/// captured entirely in `LiveUpdateStatus` and never surface as errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Store error
    #[error("Store error: {0}")]
    Store(String),

    /// Transport error reaching a dependency
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<ApiError> for EngineError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Transport(msg) => EngineError::Transport(msg),
            other => EngineError::Store(other.to_string()),
        }
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
