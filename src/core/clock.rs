//! Time source shared by the stateful components
//!
//! The rate limiter, connection pool and router all reason about elapsed
//! time (window expiry, idle handles, cooldowns). They read it through
//! [`Clock`] so tests can move time forward without sleeping.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Millisecond time source
pub trait Clock: Send + Sync + Debug {
    /// Current time in milliseconds
    ///
    /// Must be non-decreasing for a given clock.
    fn now_ms(&self) -> u64;
}

/// Wall clock (milliseconds since UNIX_EPOCH)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Manually advanced clock
///
/// Starts at the given instant and only moves when [`ManualClock::advance`]
/// or [`ManualClock::set`] is called.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    /// Create a shared clock, ready to hand to a component
    pub fn shared(start_ms: u64) -> Arc<Self> {
        Arc::new(Self::new(start_ms))
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute time; ignored if it would move the clock backwards
    pub fn set(&self, now_ms: u64) {
        self.now_ms.fetch_max(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Default clock handle used by component constructors
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
