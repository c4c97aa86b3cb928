//! Custom test assertions
//!
//! Domain-specific checks for the components' structural invariants.

use fast_litellm::{ConnectionPool, TokenCounter};

/// Assertions for ConnectionPool
pub trait PoolAssertions {
    /// Assert a provider never holds more handles than the pool allows
    fn assert_within_capacity(&self, provider: &str);
}

impl PoolAssertions for ConnectionPool {
    fn assert_within_capacity(&self, provider: &str) {
        let Some(stats) = self.get_provider_stats(provider) else {
            return;
        };
        let max = self.max_connections_per_provider();
        assert!(
            stats.available + stats.in_use <= max,
            "Provider {} holds {} handles (available {}, in use {}), max {}",
            provider,
            stats.available + stats.in_use,
            stats.available,
            stats.in_use,
            max
        );
    }
}

/// Assertions for TokenCounter
pub trait CacheAssertions {
    /// Assert the encoding cache never exceeds its capacity
    fn assert_cache_bounded(&self);
}

impl CacheAssertions for TokenCounter {
    fn assert_cache_bounded(&self) {
        let stats = self.get_cache_stats();
        assert!(
            stats.cached_encodings <= stats.max_cache_size,
            "Cache holds {} encodings, capacity {}",
            stats.cached_encodings,
            stats.max_cache_size
        );
    }
}

/// Assert two values are approximately equal (for floats)
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr) => {
        assert_approx_eq!($left, $right, 1e-6_f64)
    };
    ($left:expr, $right:expr, $epsilon:expr) => {
        let left_val: f64 = $left as f64;
        let right_val: f64 = $right as f64;
        let diff = (left_val - right_val).abs();
        assert!(
            diff < $epsilon,
            "assertion failed: `(left ~= right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` (epsilon: `{:?}`)",
            left_val,
            right_val,
            diff,
            $epsilon
        );
    };
}
