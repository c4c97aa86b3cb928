//! Configuration integration tests
//!
//! Loads configuration from disk and builds every component from it.

#[cfg(test)]
mod tests {
    use fast_litellm::config::{ConnectionPoolConfig, Validate};
    use fast_litellm::{
        AcceleratorConfig, AcceleratorError, ConnectionPool, ErrorKind, RateLimiter, Router,
        RoutingStrategy, TokenCounter,
    };
    use std::fs;

    const SAMPLE: &str = r#"
token_counter:
  cache_size: 3
rate_limiter:
  default_window_secs: 120
connection_pool:
  max_connections_per_provider: 2
router:
  routing_strategy: least-busy-with-penalty
  cooldown_time_seconds: 10
  failure_penalty: 2.0
logging:
  level: debug
"#;

    /// Components built from a config file honour its values
    #[test]
    fn test_components_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accelerator.yaml");
        fs::write(&path, SAMPLE).unwrap();

        let config = AcceleratorConfig::from_file(&path).unwrap();

        let counter = TokenCounter::from_config(&config.token_counter);
        assert_eq!(counter.cache_size(), 3);

        let pool = ConnectionPool::from_config(&config.connection_pool);
        assert_eq!(pool.get_pool_stats().max_connections_per_provider, 2);
        pool.get_connection("p").unwrap();
        pool.get_connection("p").unwrap();
        assert!(pool.get_connection("p").is_err());

        let limiter = RateLimiter::from_config(&config.rate_limiter);
        assert!(limiter.check_rate_limit("k", 1, 60));

        let router = Router::new(config.router.clone());
        assert_eq!(
            router.config().routing_strategy,
            RoutingStrategy::LeastBusyWithPenalty
        );
        assert_eq!(router.config().cooldown_time_seconds, 10);
        assert_eq!(config.logging.level, "debug");
    }

    /// A file override merges over environment-derived settings
    #[test]
    fn test_layered_sources() {
        let from_env = AcceleratorConfig::from_lookup(|key| match key {
            "FAST_LITELLM_MAX_RETRIES" => Some("6".to_string()),
            "FAST_LITELLM_ROUTING_STRATEGY" => Some("1".to_string()),
            _ => None,
        })
        .unwrap();
        let from_file = AcceleratorConfig::from_yaml_str(SAMPLE).unwrap();

        let merged = from_env.merge(from_file);
        assert_eq!(merged.router.max_retries, 6);
        assert_eq!(
            merged.router.routing_strategy,
            RoutingStrategy::LeastBusyWithPenalty
        );
        assert_eq!(merged.token_counter.cache_size, 3);
        assert!(merged.validate().is_ok());
    }

    /// Invalid sections are reported with their name
    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "connection_pool:\n  max_connections_per_provider: 0\n").unwrap();

        let err = AcceleratorConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, AcceleratorError::Validation(_)));
        assert!(err.to_string().contains("connection_pool"));
        assert_eq!(err.kind(), ErrorKind::Invalid);

        let section = ConnectionPoolConfig {
            max_connections_per_provider: 0,
            ..ConnectionPoolConfig::default()
        };
        assert!(section.validate().is_err());
    }

    /// Every standalone health check passes
    #[test]
    fn test_component_health_checks() {
        assert!(fast_litellm::token_health_check());
        assert!(fast_litellm::rate_limit_health_check());
        assert!(fast_litellm::connection_pool_health_check());
        assert!(fast_litellm::router_health_check());
    }
}
