//! Router integration tests
//!
//! Cooldown exclusion, duplicate rejection, grouping and token accounting.

#[cfg(test)]
mod tests {
    use crate::common::{DeploymentFactory, PayloadFactory, TestClock};
    use fast_litellm::{ErrorKind, RouterConfig, RouterError, RoutingStrategy, TokenCounter};
    use std::sync::Arc;

    /// A failed deployment is never selected during its cooldown
    #[test]
    fn test_cooldown_exclusion_and_recovery() {
        let time = TestClock::new();
        let router = time.router(RoutingStrategy::SimpleShuffle);
        router
            .add_deployment(DeploymentFactory::in_group("a", "gpt"))
            .unwrap();
        router
            .add_deployment(DeploymentFactory::in_group("b", "gpt"))
            .unwrap();

        router.record_failure("a").unwrap();

        for _ in 0..200 {
            let chosen = router.route_request("gpt", &PayloadFactory::empty()).unwrap();
            assert_eq!(chosen.model_name, "b");
            router.release_deployment("b").unwrap();
            time.advance_ms(250);
        }
        // 50s elapsed, still cooling down
        assert!(router.is_in_cooldown("a").unwrap());

        time.advance_secs(11);
        assert!(!router.is_in_cooldown("a").unwrap());
        assert_eq!(router.get_healthy_deployments("gpt"), vec!["a", "b"]);

        let mut seen_a = false;
        for _ in 0..200 {
            let chosen = router.route_request("gpt", &PayloadFactory::empty()).unwrap();
            seen_a |= chosen.model_name == "a";
        }
        assert!(seen_a, "recovered deployment never selected");
    }

    /// Every deployment cooling down means no route
    #[test]
    fn test_all_in_cooldown_is_unavailable() {
        let time = TestClock::new();
        let router = time.router(RoutingStrategy::LeastBusy);
        router
            .add_deployment(DeploymentFactory::in_group("a", "gpt"))
            .unwrap();
        router.record_failure("a").unwrap();

        let err = router
            .route_request("gpt", &PayloadFactory::empty())
            .unwrap_err();
        assert_eq!(err, RouterError::NoHealthyDeployment("gpt".to_string()));
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        let err = router
            .route_request("unknown-model", &PayloadFactory::empty())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    /// The second registration of a name fails and leaves the first intact
    #[test]
    fn test_duplicate_rejection_keeps_original() {
        let time = TestClock::new();
        let router = time.router(RoutingStrategy::SimpleShuffle);

        router
            .add_deployment(DeploymentFactory::with_cost("a", "gpt", 0.5))
            .unwrap();
        let err = router
            .add_deployment(DeploymentFactory::with_cost("a", "other", 0.1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);

        let kept = router.get_deployment("a").unwrap();
        assert_eq!(kept.group(), "gpt");
        assert_eq!(kept.cost_per_token(), 0.5);
        assert_eq!(router.get_deployment_names(), vec!["a"]);
        assert!(router.get_healthy_deployments("other").is_empty());
    }

    /// Deployments can be routed by group or by their own name
    #[test]
    fn test_route_by_group_or_name() {
        let time = TestClock::new();
        let router = time.router(RoutingStrategy::CostBased);
        router
            .add_deployment(DeploymentFactory::with_cost("cheap", "gpt", 0.000_001))
            .unwrap();
        router
            .add_deployment(DeploymentFactory::with_cost("pricey", "gpt", 0.000_03))
            .unwrap();

        let chosen = router.route_request("gpt", &PayloadFactory::empty()).unwrap();
        assert_eq!(chosen.model_name, "cheap");

        let chosen = router
            .route_request("pricey", &PayloadFactory::empty())
            .unwrap();
        assert_eq!(chosen.model_name, "pricey");

        let mut models = router.list_models();
        models.sort();
        assert_eq!(models, vec!["cheap", "gpt", "pricey"]);
    }

    /// Removing a deployment takes it out of every route key
    #[test]
    fn test_remove_deployment() {
        let time = TestClock::new();
        let router = time.router(RoutingStrategy::LeastBusy);
        router
            .add_deployment(DeploymentFactory::in_group("a", "gpt"))
            .unwrap();
        router
            .add_deployment(DeploymentFactory::in_group("b", "gpt"))
            .unwrap();

        assert!(router.remove_deployment("a"));
        assert!(!router.remove_deployment("a"));

        for _ in 0..10 {
            let chosen = router.route_request("gpt", &PayloadFactory::empty()).unwrap();
            assert_eq!(chosen.model_name, "b");
        }
        assert_eq!(
            router.record_success("a", 10.0, 0).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert!(router.health_check());
    }

    /// Prompt tokens are charged to the selected deployment
    #[test]
    fn test_token_counter_charges_prompt_tokens() {
        let time = TestClock::new();
        let counter = Arc::new(TokenCounter::new(4));
        let router = time
            .router(RoutingStrategy::UsageBasedV1)
            .with_token_counter(Arc::clone(&counter));
        router
            .add_deployment(DeploymentFactory::in_group("a", "gpt"))
            .unwrap();

        let text = "Summarise the sliding window algorithm in one sentence.";
        let expected = counter.count_tokens(text, "gpt-3.5-turbo").unwrap() as u64;

        router
            .route_request("gpt", &PayloadFactory::chat(text))
            .unwrap();

        let stats = router.get_deployment_stats("a").unwrap();
        assert_eq!(stats.rpm, 1);
        assert_eq!(stats.tpm, expected);
        assert_eq!(stats.active_requests, 1);

        router.record_success("a", 120.0, 30).unwrap();
        let stats = router.get_deployment_stats("a").unwrap();
        assert_eq!(stats.tpm, expected + 30);
        assert_eq!(stats.active_requests, 0);
        assert_eq!(stats.successful_requests, 1);
    }

    /// Router statistics add up across deployments
    #[test]
    fn test_router_stats() {
        let time = TestClock::new();
        let router = time.router(RoutingStrategy::LeastBusy);
        for name in ["a", "b", "c"] {
            router
                .add_deployment(DeploymentFactory::in_group(name, "gpt"))
                .unwrap();
        }

        for _ in 0..6 {
            router.route_request("gpt", &PayloadFactory::empty()).unwrap();
        }
        router.record_failure("c").unwrap();

        let stats = router.get_stats();
        assert_eq!(stats.total_requests, 6);
        assert_eq!(stats.total_deployments, 3);
        assert_eq!(stats.healthy_deployments, 2);

        let routed: u64 = stats.deployments.iter().map(|d| d.total_requests).sum();
        assert_eq!(routed, 6);

        let c = stats
            .deployments
            .iter()
            .find(|d| d.model_name == "c")
            .unwrap();
        assert!(c.in_cooldown);
        assert_eq!(c.failed_requests, 1);
        assert_eq!(c.cooldown_remaining_ms, 60_000);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_deployments"], 3);
    }

    /// Retry settings are handed back to the caller unchanged
    #[test]
    fn test_retry_settings_exposed() {
        let time = TestClock::new();
        let router = time.router_with(RouterConfig {
            max_retries: 7,
            timeout_seconds: 12,
            ..RouterConfig::default()
        });

        assert_eq!(router.max_retries(), 7);
        assert_eq!(router.timeout().as_secs(), 12);
    }
}
