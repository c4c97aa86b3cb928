//! Rate limiter and connection pool integration tests

#[cfg(test)]
mod tests {
    use crate::common::TestClock;
    use crate::common::assertions::PoolAssertions;
    use fast_litellm::{ErrorKind, PoolError};
    use std::time::Duration;

    /// limit=5, window=60: full at t=30, free again at t=61
    #[test]
    fn test_sliding_window_expiry() {
        let time = TestClock::new();
        let limiter = time.rate_limiter();

        assert!(limiter.consume_tokens("user-1", 5));
        assert!(!limiter.check_rate_limit("user-1", 5, 60));

        time.advance_secs(30);
        assert!(!limiter.check_rate_limit("user-1", 5, 60));

        time.advance_secs(31);
        assert!(limiter.check_rate_limit("user-1", 5, 60));
        assert_eq!(limiter.get_key_usage("user-1", 60), 0);
    }

    /// Traffic split across a fixed-bucket boundary still counts as one window
    #[test]
    fn test_no_burst_at_window_boundary() {
        let time = TestClock::new();
        let limiter = time.rate_limiter();

        time.advance_secs(50);
        for _ in 0..5 {
            assert!(limiter.check_and_consume("burst", 1, 5, 60).allowed);
        }

        // Ten seconds later a fixed-window counter would have reset
        time.advance_secs(10);
        let result = limiter.check_and_consume("burst", 1, 5, 60);
        assert!(!result.allowed);
        assert_eq!(result.current_count, 5);
        assert_eq!(result.retry_after_ms, Some(50_000));
    }

    /// Keys are created lazily and reclaimed once empty
    #[test]
    fn test_lazy_keys_and_cleanup() {
        let time = TestClock::new();
        let limiter = time.rate_limiter();

        assert!(limiter.check_rate_limit("never-consumed", 1, 60));
        assert_eq!(limiter.get_key_usage("ghost", 60), 0);

        limiter.consume_tokens("a", 1);
        limiter.consume_tokens("b", 3);
        let stats = limiter.get_rate_limit_stats();
        // A check observes the key too, it just records nothing
        assert_eq!(stats.tracked_keys, 3);
        assert_eq!(stats.total_requests, 2);

        time.advance_secs(61);
        assert_eq!(limiter.cleanup(), 3);
        assert_eq!(limiter.get_rate_limit_stats().tracked_keys, 0);
    }

    /// max=2: two checkouts succeed, the third is Exhausted, a returned handle is reused
    #[test]
    fn test_pool_capacity_and_reuse() {
        let time = TestClock::new();
        let pool = time.pool(2);

        let first = pool.get_connection("p").unwrap();
        let second = pool.get_connection("p").unwrap();
        assert_ne!(first, second);

        let err = pool.get_connection("p").unwrap_err();
        assert!(matches!(err, PoolError::Exhausted { max: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::Exhausted);

        assert!(pool.return_connection(&first));
        let fourth = pool.get_connection("p").unwrap();
        assert_eq!(fourth, first);

        let stats = pool.get_provider_stats("p").unwrap();
        assert_eq!(stats.total_created, 2);
        assert_eq!(stats.total_checkouts, 3);
        pool.assert_within_capacity("p");
    }

    /// Unknown, closed and already-available handles report failure
    #[test]
    fn test_pool_return_and_close_failures() {
        let time = TestClock::new();
        let pool = time.pool(2);

        assert!(!pool.return_connection("p_999"));
        assert!(!pool.close_connection("p_999"));

        let id = pool.get_connection("p").unwrap();
        assert!(pool.return_connection(&id));
        assert!(!pool.return_connection(&id));

        assert!(pool.close_connection(&id));
        assert!(!pool.close_connection(&id));
        assert!(!pool.return_connection(&id));

        let stats = pool.get_pool_stats();
        assert_eq!(stats.providers, 1);
        assert_eq!(stats.total_available, 0);
        assert_eq!(stats.total_in_use, 0);
    }

    /// Idle handles are closed, leased ones are kept
    #[test]
    fn test_pool_close_idle() {
        let time = TestClock::new();
        let pool = time.pool(4);

        let idle = pool.get_connection("p").unwrap();
        let leased = pool.get_connection("p").unwrap();
        pool.return_connection(&idle);

        time.advance_secs(301);
        assert_eq!(pool.close_idle(Duration::from_secs(300)), 1);
        assert!(pool.connection_info(&idle).is_err());
        assert!(pool.connection_info(&leased).unwrap().in_use);
    }
}
