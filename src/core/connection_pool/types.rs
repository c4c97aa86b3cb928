//! Connection pool types
//!
//! Contains error types, statistics, and handle metadata.

use crate::utils::error::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connection pool errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Every slot for the provider is leased
    #[error("Connection pool exhausted for provider {provider} (max {max})")]
    Exhausted { provider: String, max: usize },

    /// The handle was never issued or has been closed
    #[error("Connection handle not found: {0}")]
    HandleNotFound(String),
}

impl PoolError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::Exhausted { .. } => ErrorKind::Exhausted,
            PoolError::HandleNotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// Pool-wide statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Providers that have requested at least one connection
    pub providers: usize,
    /// Handles waiting to be reused
    pub total_available: usize,
    /// Handles currently leased
    pub total_in_use: usize,
    pub max_connections_per_provider: usize,
}

/// Snapshot for a single provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStats {
    pub provider: String,
    pub available: usize,
    pub in_use: usize,
    /// Handles minted over the provider's lifetime
    pub total_created: u64,
    /// Successful checkouts, new or reused
    pub total_checkouts: u64,
    /// Handles closed explicitly or by the idle sweep
    pub total_closed: u64,
}

/// Metadata for one handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub id: String,
    pub provider: String,
    /// Creation time (clock milliseconds)
    pub created_at_ms: u64,
    /// Last checkout or return (clock milliseconds)
    pub last_used_ms: u64,
    /// Number of checkouts served by this handle
    pub use_count: u64,
    pub in_use: bool,
}

/// Handle wrapper with metadata for pool management
#[derive(Debug, Clone)]
pub(super) struct PooledHandle {
    pub(super) created_at_ms: u64,
    pub(super) last_used_ms: u64,
    pub(super) use_count: u64,
    pub(super) in_use: bool,
}

impl PooledHandle {
    /// A freshly minted handle, already leased
    pub(super) fn leased(now_ms: u64) -> Self {
        Self {
            created_at_ms: now_ms,
            last_used_ms: now_ms,
            use_count: 1,
            in_use: true,
        }
    }

    /// Mark the handle as checked out again
    pub(super) fn mark_used(&mut self, now_ms: u64) {
        self.in_use = true;
        self.use_count += 1;
        self.last_used_ms = now_ms;
    }

    /// Check if the handle has been sitting unused for longer than `max_idle_ms`
    pub(super) fn is_idle(&self, now_ms: u64, max_idle_ms: u64) -> bool {
        !self.in_use && now_ms.saturating_sub(self.last_used_ms) > max_idle_ms
    }
}
