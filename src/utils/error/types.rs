//! Error types for the accelerator

use crate::core::connection_pool::PoolError;
use crate::core::router::RouterError;
use crate::core::tokens::TokenError;
use thiserror::Error;

/// Result type alias for the accelerator
pub type Result<T> = std::result::Result<T, AcceleratorError>;

/// Error taxonomy shared by every component
///
/// Kinds, not type names: the glue layer maps each kind onto its own
/// exception class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown handle id, unknown model or unknown deployment name
    NotFound,
    /// A deployment with the same `model_name` is already registered
    Duplicate,
    /// Connection pool at capacity for a provider
    Exhausted,
    /// No eligible (non-cooldown) deployment to route to
    Unavailable,
    /// No token encoding table for the model
    Unsupported,
    /// Invalid input or configuration
    Invalid,
}

impl ErrorKind {
    /// Stable lowercase name, suitable for logs and foreign-language bindings
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Exhausted => "exhausted",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the accelerator
#[derive(Error, Debug)]
pub enum AcceleratorError {
    /// Token counting errors
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Connection pool errors
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Router errors
    #[error(transparent)]
    Router(#[from] RouterError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AcceleratorError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AcceleratorError::Token(e) => e.kind(),
            AcceleratorError::Pool(e) => e.kind(),
            AcceleratorError::Router(e) => e.kind(),
            AcceleratorError::Config(_)
            | AcceleratorError::Validation(_)
            | AcceleratorError::Io(_)
            | AcceleratorError::Yaml(_) => ErrorKind::Invalid,
        }
    }
}
