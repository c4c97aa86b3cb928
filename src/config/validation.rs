//! Configuration validation

use super::AcceleratorConfig;
use super::models::{ConnectionPoolConfig, LoggingConfig, RateLimiterConfig, TokenCounterConfig};
use crate::core::router::RouterConfig;
use tracing::debug;

/// Validation trait for configuration structures
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

impl Validate for AcceleratorConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating accelerator configuration");

        self.token_counter
            .validate()
            .map_err(|e| format!("token_counter: {}", e))?;
        self.rate_limiter
            .validate()
            .map_err(|e| format!("rate_limiter: {}", e))?;
        self.connection_pool
            .validate()
            .map_err(|e| format!("connection_pool: {}", e))?;
        self.router.validate().map_err(|e| format!("router: {}", e))?;
        self.logging
            .validate()
            .map_err(|e| format!("logging: {}", e))?;

        Ok(())
    }
}

impl Validate for TokenCounterConfig {
    fn validate(&self) -> Result<(), String> {
        if self.cache_size == 0 {
            return Err("Cache size must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Validate for RateLimiterConfig {
    fn validate(&self) -> Result<(), String> {
        if self.default_window_secs == 0 {
            return Err("Default window must be greater than 0".to_string());
        }
        if self.cleanup_interval_secs == 0 {
            return Err("Cleanup interval must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Validate for ConnectionPoolConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_connections_per_provider == 0 {
            return Err("Max connections per provider must be greater than 0".to_string());
        }
        if self.idle_timeout_secs == 0 {
            return Err("Idle timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Validate for RouterConfig {
    fn validate(&self) -> Result<(), String> {
        if self.timeout_seconds == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }
        if self.penalty_decay_secs == 0 {
            return Err("Penalty decay must be greater than 0".to_string());
        }
        if self.usage_half_life_secs == 0 {
            return Err("Usage half-life must be greater than 0".to_string());
        }
        if !self.failure_penalty.is_finite() || self.failure_penalty < 0.0 {
            return Err("Failure penalty must be a non-negative number".to_string());
        }
        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        tracing_subscriber::EnvFilter::try_new(&self.level)
            .map(|_| ())
            .map_err(|e| format!("Invalid log level '{}': {}", self.level, e))
    }
}
