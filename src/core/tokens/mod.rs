//! Token counting with an LRU cache of per-model encoding tables
//!
//! Encodings are real BPE tables from `tiktoken-rs`. Loading a table is the
//! expensive part of counting, so loaded tables are kept in a bounded
//! least-recently-used cache keyed by the model name the caller passed in.
//!
//! Unknown models fail with [`TokenError::ModelNotSupported`]; there is no
//! character-based guess.

mod counter;
mod limits;
mod types;


pub use counter::{TokenCounter, token_health_check};
pub use limits::{ModelLimits, ModelPrice};
pub use types::{CacheStats, TokenError};
