//! Concurrency stress tests
//!
//! Many threads hammer a single key, provider, model or deployment group;
//! afterwards the shared structure must still satisfy its invariants.

#[cfg(test)]
mod tests {
    use crate::common::assertions::{CacheAssertions, PoolAssertions};
    use crate::common::{DeploymentFactory, PayloadFactory, TestClock};
    use fast_litellm::{RoutingStrategy, TokenCounter};
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    const THREADS: usize = 8;
    const OPS: usize = 200;

    /// Concurrent atomic admissions never overshoot the limit
    #[test]
    fn test_rate_limiter_single_key_stress() {
        let time = TestClock::new();
        let limiter = time.rate_limiter();
        let admitted = AtomicU64::new(0);

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    for _ in 0..OPS {
                        if limiter.check_and_consume("shared", 1, 500, 60).allowed {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::Relaxed), 500);
        assert_eq!(limiter.get_key_usage("shared", 60), 500);
        assert_eq!(limiter.get_rate_limit_stats().total_requests, 500);
    }

    /// Concurrent plain consumption is never lost
    #[test]
    fn test_rate_limiter_consume_stress() {
        let time = TestClock::new();
        let limiter = time.rate_limiter();

        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let limiter = &limiter;
                scope.spawn(move || {
                    for _ in 0..OPS {
                        limiter.consume_tokens("shared", 2);
                        limiter.consume_tokens(&format!("own-{}", t), 1);
                    }
                });
            }
        });

        let total = (THREADS * OPS * 2) as u64;
        assert_eq!(limiter.get_key_usage("shared", 60), total);
        assert_eq!(limiter.get_rate_limit_stats().tracked_keys, THREADS + 1);
    }

    /// A handle is never held by two callers at once
    #[test]
    fn test_pool_single_provider_stress() {
        let time = TestClock::new();
        let pool = time.pool(4);
        let held = Mutex::new(HashSet::new());
        let checkouts = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    for _ in 0..OPS {
                        let Ok(id) = pool.get_connection("p") else {
                            continue;
                        };
                        checkouts.fetch_add(1, Ordering::Relaxed);
                        assert!(
                            held.lock().unwrap().insert(id.clone()),
                            "handle {} issued twice",
                            id
                        );
                        pool.assert_within_capacity("p");

                        assert!(held.lock().unwrap().remove(&id));
                        assert!(pool.return_connection(&id));
                    }
                });
            }
        });

        let stats = pool.get_provider_stats("p").unwrap();
        assert_eq!(stats.in_use, 0);
        assert!(stats.available <= 4);
        assert!(stats.total_created <= 4);
        assert_eq!(
            stats.total_checkouts,
            checkouts.load(Ordering::Relaxed) as u64
        );
    }

    /// Counts stay deterministic and the cache bounded under churn
    #[test]
    fn test_token_counter_churn() {
        let models = ["gpt-4", "gpt-3.5-turbo", "text-davinci-003", "gpt-4o"];
        let text = "Concurrent callers share one LRU cache of encodings.";
        let expected: Vec<usize> = models
            .iter()
            .map(|model| TokenCounter::new(1).count_tokens(text, model).unwrap())
            .collect();

        let counter = TokenCounter::new(2);
        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let counter = &counter;
                let expected = &expected;
                scope.spawn(move || {
                    for i in 0..50 {
                        let m = (t + i) % models.len();
                        assert_eq!(counter.count_tokens(text, models[m]).unwrap(), expected[m]);
                        counter.assert_cache_bounded();
                    }
                });
            }
        });

        counter.assert_cache_bounded();
        let stats = counter.get_cache_stats();
        assert_eq!(stats.hits + stats.misses, (THREADS * 50) as u64);
    }

    /// Exactly one of many concurrent registrations of a name wins
    #[test]
    fn test_router_concurrent_duplicate_registration() {
        let time = TestClock::new();
        let router = time.router(RoutingStrategy::SimpleShuffle);
        let accepted = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    if router
                        .add_deployment(DeploymentFactory::in_group("only", "gpt"))
                        .is_ok()
                    {
                        accepted.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(accepted.load(Ordering::Relaxed), 1);
        assert_eq!(router.get_deployment_names(), vec!["only"]);
        assert!(router.health_check());
    }

    /// Concurrent routing and feedback leave counters consistent
    #[test]
    fn test_router_route_and_feedback_stress() {
        let time = TestClock::new();
        let router = time.router(RoutingStrategy::LeastBusy);
        for name in ["a", "b", "c", "d"] {
            router
                .add_deployment(DeploymentFactory::in_group(name, "gpt"))
                .unwrap();
        }

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    for i in 0..OPS {
                        let chosen = router
                            .route_request("gpt", &PayloadFactory::empty())
                            .unwrap();
                        if i % 2 == 0 {
                            router
                                .record_success(&chosen.model_name, 50.0, 10)
                                .unwrap();
                        } else {
                            router.release_deployment(&chosen.model_name).unwrap();
                        }
                    }
                });
            }
        });

        let stats = router.get_stats();
        let total = (THREADS * OPS) as u64;
        assert_eq!(stats.total_requests, total);
        assert_eq!(
            stats.deployments.iter().map(|d| d.total_requests).sum::<u64>(),
            total
        );
        assert_eq!(
            stats.deployments.iter().map(|d| d.successful_requests).sum::<u64>(),
            total / 2
        );
        assert!(stats.deployments.iter().all(|d| d.active_requests == 0));
        assert_eq!(stats.healthy_deployments, 4);
    }
}
