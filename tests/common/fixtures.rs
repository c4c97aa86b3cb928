//! Test fixtures and data factories
//!
//! Provides factory methods for creating test data with sensible defaults.
//! All factories create real objects, not mocks.

use fast_litellm::config::RateLimiterConfig;
use fast_litellm::{
    Clock, ConnectionPool, Deployment, ManualClock, RateLimiter, Router, RouterConfig,
    RoutingStrategy,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Factory for creating test deployments
pub struct DeploymentFactory;

impl DeploymentFactory {
    /// A deployment in `group`, backed by an OpenAI-style model
    pub fn in_group(name: &str, group: &str) -> Deployment {
        Deployment::new(
            name,
            json!({
                "model": "openai/gpt-3.5-turbo",
                "api_base": format!("https://{}.example.com", name),
            }),
            json!({"model_group": group}),
        )
    }

    /// A deployment with a declared input cost per token
    pub fn with_cost(name: &str, group: &str, cost: f64) -> Deployment {
        Deployment::new(
            name,
            json!({"model": "openai/gpt-3.5-turbo"}),
            json!({"model_group": group, "input_cost_per_token": cost}),
        )
    }
}

/// Factory for request payloads
pub struct PayloadFactory;

impl PayloadFactory {
    /// Chat payload with a single user message
    pub fn chat(text: &str) -> Value {
        json!({"messages": [{"role": "user", "content": text}]})
    }

    /// Payload with nothing to count
    pub fn empty() -> Value {
        json!({})
    }
}

/// A manual clock and constructors for components that read it
pub struct TestClock {
    pub clock: Arc<ManualClock>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            clock: ManualClock::shared(1_000_000),
        }
    }

    pub fn handle(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn advance_secs(&self, secs: u64) {
        self.clock.advance(Duration::from_secs(secs));
    }

    pub fn advance_ms(&self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
    }

    pub fn router(&self, strategy: RoutingStrategy) -> Router {
        self.router_with(RouterConfig::with_strategy(strategy))
    }

    pub fn router_with(&self, config: RouterConfig) -> Router {
        Router::with_clock(config, self.handle())
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::with_clock(&RateLimiterConfig::default(), self.handle())
    }

    pub fn pool(&self, max: usize) -> ConnectionPool {
        ConnectionPool::with_clock(max, self.handle())
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}
