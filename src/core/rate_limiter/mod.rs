//! Sliding-window rate limiting
//!
//! Each key owns a compressed log of `(timestamp, units)` records behind its
//! own lock, so admission checks on different keys never contend. A check at
//! time `T` with window `W` counts only units recorded in `(T - W, T]`;
//! there are no fixed buckets and no boundary bursts.
//!
//! `consume_tokens` records usage without enforcing a limit. Callers either
//! pair it with `check_rate_limit`, or use `check_and_consume` to check and
//! record under a single lock acquisition.

mod limiter;
mod types;
mod utils;
mod window;


pub use limiter::{RateLimiter, rate_limit_health_check};
pub use types::{RateLimitResult, RateLimitStats};
