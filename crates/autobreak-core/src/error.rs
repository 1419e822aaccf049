//! Error types for autobreak

use thiserror::Error;

/// Main error type for autobreak
#[derive(Error, Debug)]
pub enum AutobreakError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A precondition on an argument was violated
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Probe error
    #[error("Probe error: {0}")]
    Probe(String),

    /// Proxy error
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AutobreakError {
    /// Whether this error is a caller contract violation rather than an
    /// environmental failure
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, AutobreakError::InvalidArgument(_))
    }
}

/// Result type for autobreak operations
pub type AutobreakResult<T> = Result<T, AutobreakError>;

impl From<toml::de::Error> for AutobreakError {
    fn from(err: toml::de::Error) -> Self {
        AutobreakError::Config(format!("Failed to parse config: {}", err))
    }
}
