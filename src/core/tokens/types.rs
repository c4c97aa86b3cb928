//! Token counter types

use crate::utils::error::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token counting errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// No encoding table is known for the model
    #[error("Model not supported: {0}")]
    ModelNotSupported(String),

    /// The text does not fit the model's context window
    #[error("Input exceeds context window for {model}: {tokens} tokens > {limit} limit")]
    ContextWindowExceeded {
        model: String,
        tokens: usize,
        limit: usize,
    },
}

impl TokenError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenError::ModelNotSupported(_) => ErrorKind::Unsupported,
            TokenError::ContextWindowExceeded { .. } => ErrorKind::Invalid,
        }
    }
}

/// Encoding cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Encodings currently cached
    pub cached_encodings: usize,
    /// Configured capacity
    pub max_cache_size: usize,
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that had to load a table
    pub misses: u64,
    /// Tables dropped to make room
    pub evictions: u64,
}
