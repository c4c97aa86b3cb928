//! Core rate limiter implementation

use super::types::{RateLimitResult, RateLimitStats};
use super::window::SlidingWindow;
use crate::config::RateLimiterConfig;
use crate::core::clock::{Clock, system_clock};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Sliding-window rate limiter keyed by arbitrary strings
///
/// Per-key state lives behind its own mutex. The map is only locked long
/// enough to fetch or create a key's window, so independent keys proceed in
/// parallel.
pub struct RateLimiter {
    /// Window state by key (API key, user, deployment, ...)
    pub(super) windows: DashMap<String, Arc<Mutex<SlidingWindow>>>,
    /// How long records are kept: the largest window checked so far, never
    /// less than the configured default
    pub(super) horizon_ms: AtomicU64,
    /// Interval for the background sweep
    pub(super) cleanup_interval_secs: u64,
    /// Consumption records accepted since creation
    pub(super) total_requests: AtomicU64,
    pub(super) clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("tracked_keys", &self.windows.len())
            .field("horizon_ms", &self.horizon_ms.load(Ordering::Relaxed))
            .finish()
    }
}

impl RateLimiter {
    /// Create a rate limiter with default settings on the system clock
    pub fn new() -> Self {
        Self::from_config(&RateLimiterConfig::default())
    }

    /// Create a rate limiter from configuration
    pub fn from_config(config: &RateLimiterConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    /// Create a rate limiter reading time from `clock`
    pub fn with_clock(config: &RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            horizon_ms: AtomicU64::new(config.default_window_secs.saturating_mul(1000)),
            cleanup_interval_secs: config.cleanup_interval_secs,
            total_requests: AtomicU64::new(0),
            clock,
        }
    }

    /// Would one more unit for `key` fit under `limit` in the last `window_secs`?
    ///
    /// Read-only with respect to usage: nothing is recorded. Pair with
    /// [`consume_tokens`](Self::consume_tokens), or use
    /// [`check_and_consume`](Self::check_and_consume) to do both atomically.
    pub fn check_rate_limit(&self, key: &str, limit: u64, window_secs: u64) -> bool {
        self.check(key, limit, window_secs).allowed
    }

    /// Detailed read-only check for one more unit
    pub fn check(&self, key: &str, limit: u64, window_secs: u64) -> RateLimitResult {
        let now = self.clock.now_ms();
        let window_ms = window_secs.saturating_mul(1000);
        let horizon = self.widen_horizon(window_ms);
        let window = self.window_for(key);
        let mut window = window.lock();

        let used = window.used(now, window_ms, horizon);
        build_result(&window, now, window_ms, used, 1, limit)
    }

    /// Record `count` units for `key` at the current time
    ///
    /// Recording never fails and never enforces a limit, so this always
    /// returns `true`. A count of zero records nothing.
    pub fn consume_tokens(&self, key: &str, count: u64) -> bool {
        if count == 0 {
            return true;
        }

        let now = self.clock.now_ms();
        let horizon = self.horizon_ms.load(Ordering::Relaxed);
        self.window_for(key).lock().record(now, count, horizon);
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        debug!("Recorded {} units for key {}", count, key);
        true
    }

    /// Atomically check that `count` units fit and record them if so
    ///
    /// Both steps run under the key's lock, so concurrent callers can never
    /// jointly exceed `limit` within the window.
    pub fn check_and_consume(
        &self,
        key: &str,
        count: u64,
        limit: u64,
        window_secs: u64,
    ) -> RateLimitResult {
        let now = self.clock.now_ms();
        let window_ms = window_secs.saturating_mul(1000);
        let horizon = self.widen_horizon(window_ms);
        let window = self.window_for(key);
        let mut window = window.lock();

        let used = window.used(now, window_ms, horizon);
        let mut result = build_result(&window, now, window_ms, used, count, limit);

        if result.allowed && count > 0 {
            window.record(now, count, horizon);
            self.total_requests.fetch_add(1, Ordering::Relaxed);
            result.reset_after_ms = window.reset_after(now, window_ms);
        } else if !result.allowed {
            debug!("Rate limit exceeded for key {}: {}/{}", key, used, limit);
        }

        result
    }

    /// Units recorded for `key` in the last `window_secs`
    ///
    /// Unknown keys report zero and are not created.
    pub fn get_key_usage(&self, key: &str, window_secs: u64) -> u64 {
        let Some(window) = self.windows.get(key).map(|w| Arc::clone(w.value())) else {
            return 0;
        };
        let now = self.clock.now_ms();
        let window_ms = window_secs.saturating_mul(1000);
        let horizon = self.widen_horizon(window_ms);
        let used = window.lock().used(now, window_ms, horizon);
        used
    }

    /// Aggregate statistics
    pub fn get_rate_limit_stats(&self) -> RateLimitStats {
        let now = self.clock.now_ms();
        let horizon = self.horizon_ms.load(Ordering::Relaxed);
        let windows: Vec<_> = self
            .windows
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let retained_units = windows
            .iter()
            .map(|window| window.lock().retained(now, horizon))
            .sum();

        RateLimitStats {
            tracked_keys: windows.len(),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            retained_units,
        }
    }

    /// Forget all state for `key`
    pub fn reset(&self, key: &str) -> bool {
        let removed = self.windows.remove(key).is_some();
        if removed {
            info!("Rate limit state reset for key {}", key);
        }
        removed
    }

    /// Fetch or lazily create the window for `key`
    pub(super) fn window_for(&self, key: &str) -> Arc<Mutex<SlidingWindow>> {
        // Avoid String allocation if key already exists
        if let Some(window) = self.windows.get(key) {
            return Arc::clone(window.value());
        }

        let entry = self.windows.entry(key.to_string()).or_default();
        Arc::clone(entry.value())
    }

    /// Raise the retention horizon to cover `window_ms`, returning the result
    fn widen_horizon(&self, window_ms: u64) -> u64 {
        let previous = self.horizon_ms.fetch_max(window_ms, Ordering::Relaxed);
        previous.max(window_ms)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn build_result(
    window: &SlidingWindow,
    now_ms: u64,
    window_ms: u64,
    used: u64,
    requested: u64,
    limit: u64,
) -> RateLimitResult {
    let allowed = used.saturating_add(requested) <= limit;
    let reset_after_ms = window.reset_after(now_ms, window_ms);
    let remaining = if allowed {
        limit - used - requested
    } else {
        limit.saturating_sub(used)
    };

    RateLimitResult {
        allowed,
        current_count: used,
        limit,
        remaining,
        reset_after_ms,
        retry_after_ms: if allowed { None } else { Some(reset_after_ms) },
    }
}

/// Health check for the rate limiting component
pub fn rate_limit_health_check() -> bool {
    info!("Rate limiting health check called");
    RateLimiter::new().health_check()
}
