//! Rate limiter types and data structures

use serde::{Deserialize, Serialize};

/// Outcome of a detailed rate limit check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitResult {
    /// Whether the requested units fit in the window
    pub allowed: bool,
    /// Units counted inside the window before this call
    pub current_count: u64,
    /// Limit the check was made against
    pub limit: u64,
    /// Units still available after this call
    pub remaining: u64,
    /// Milliseconds until the oldest counted units leave the window
    pub reset_after_ms: u64,
    /// Retry after (milliseconds, only set when not allowed)
    pub retry_after_ms: Option<u64>,
}

/// Aggregate statistics across keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStats {
    /// Keys with live window state
    pub tracked_keys: usize,
    /// Consumption records accepted since creation
    pub total_requests: u64,
    /// Units still retained across all windows
    pub retained_units: u64,
}
