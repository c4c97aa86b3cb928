//! Maintenance helpers for the rate limiter

use super::limiter::RateLimiter;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

impl RateLimiter {
    /// Prune expired records and drop keys left with nothing retained
    ///
    /// Returns the number of keys removed. A key whose window is currently
    /// held by another caller is kept, so an in-flight record is never lost.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let horizon = self.horizon_ms.load(Ordering::Relaxed);
        let before = self.windows.len();

        self.windows.retain(|_, window| {
            if Arc::strong_count(window) > 1 {
                return true;
            }
            let mut window = window.lock();
            window.prune(now, horizon);
            !window.is_empty()
        });

        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!("Rate limiter cleanup removed {} idle keys", removed);
        }
        removed
    }

    /// Start background cleanup task
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_cleanup_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        let period = Duration::from_secs(self.cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                limiter.cleanup();
            }
        })
    }

    /// Number of keys with live window state
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Verify the limiter can admit and record on a scratch key
    ///
    /// Each call uses its own key, so concurrent checks never see each
    /// other's records.
    pub fn health_check(&self) -> bool {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let key = format!("__health_check_{}__", SEQ.fetch_add(1, Ordering::Relaxed));
        let admitted = self.check_and_consume(&key, 1, 1, 1).allowed;
        let denied = !self.check_rate_limit(&key, 1, 1);
        self.reset(&key);
        admitted && denied
    }
}
