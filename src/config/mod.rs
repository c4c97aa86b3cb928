//! Configuration management for the accelerator
//!
//! This module handles loading, merging and validation of the settings for
//! all four components and for logging.

mod models;
mod validation;


pub use models::{ConnectionPoolConfig, LoggingConfig, RateLimiterConfig, TokenCounterConfig};
pub use validation::Validate;

use crate::core::router::{RouterConfig, RoutingStrategy};
use crate::utils::error::{AcceleratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Prefix shared by every environment variable
pub const ENV_PREFIX: &str = "FAST_LITELLM_";

/// Main configuration struct for the accelerator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AcceleratorConfig {
    #[serde(default)]
    pub token_counter: TokenCounterConfig,
    #[serde(default)]
    pub rate_limiter: RateLimiterConfig,
    #[serde(default)]
    pub connection_pool: ConnectionPoolConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AcceleratorConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| {
            AcceleratorError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_yaml_str(&content)
    }

    /// Parse and validate YAML configuration
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };

        config.validate_all()?;
        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from `FAST_LITELLM_*` environment variables over defaults
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a variable lookup
    ///
    /// Recognised variables (all prefixed with `FAST_LITELLM_`):
    /// `TOKEN_CACHE_SIZE`, `RATE_LIMIT_WINDOW_SECS`,
    /// `RATE_LIMIT_CLEANUP_INTERVAL_SECS`, `MAX_CONNECTIONS_PER_PROVIDER`,
    /// `POOL_IDLE_TIMEOUT_SECS`, `ROUTING_STRATEGY` (name or id),
    /// `COOLDOWN_TIME_SECONDS`, `MAX_RETRIES`, `TIMEOUT_SECONDS`,
    /// `FAILURE_PENALTY`, `PENALTY_DECAY_SECS`, `USAGE_HALF_LIFE_SECS`,
    /// `LOG_LEVEL`, `LOG_JSON`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let mut config = Self::default();

        env.set("TOKEN_CACHE_SIZE", &mut config.token_counter.cache_size)?;
        env.set(
            "RATE_LIMIT_WINDOW_SECS",
            &mut config.rate_limiter.default_window_secs,
        )?;
        env.set(
            "RATE_LIMIT_CLEANUP_INTERVAL_SECS",
            &mut config.rate_limiter.cleanup_interval_secs,
        )?;
        env.set(
            "MAX_CONNECTIONS_PER_PROVIDER",
            &mut config.connection_pool.max_connections_per_provider,
        )?;
        env.set(
            "POOL_IDLE_TIMEOUT_SECS",
            &mut config.connection_pool.idle_timeout_secs,
        )?;
        env.set::<RoutingStrategy>("ROUTING_STRATEGY", &mut config.router.routing_strategy)?;
        env.set(
            "COOLDOWN_TIME_SECONDS",
            &mut config.router.cooldown_time_seconds,
        )?;
        env.set("MAX_RETRIES", &mut config.router.max_retries)?;
        env.set("TIMEOUT_SECONDS", &mut config.router.timeout_seconds)?;
        env.set("FAILURE_PENALTY", &mut config.router.failure_penalty)?;
        env.set("PENALTY_DECAY_SECS", &mut config.router.penalty_decay_secs)?;
        env.set(
            "USAGE_HALF_LIFE_SECS",
            &mut config.router.usage_half_life_secs,
        )?;
        env.set("LOG_LEVEL", &mut config.logging.level)?;
        if let Some(json) = env.get("LOG_JSON")? {
            config.logging.json = Some(json);
        }

        config.validate_all()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate_all(&self) -> Result<()> {
        self.validate().map_err(AcceleratorError::validation)
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge(mut self, other: Self) -> Self {
        self.token_counter = self.token_counter.merge(other.token_counter);
        self.rate_limiter = self.rate_limiter.merge(other.rate_limiter);
        self.connection_pool = self.connection_pool.merge(other.connection_pool);
        self.router = self.router.merge(other.router);
        self.logging = self.logging.merge(other.logging);
        self
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            AcceleratorError::config(format!("Failed to serialize config to JSON: {}", e))
        })
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Parse the variable, `None` when it is unset
    fn get<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let key = format!("{}{}", ENV_PREFIX, name);
        let Some(raw) = (self.lookup)(&key) else {
            return Ok(None);
        };

        let value = raw.trim().parse().map_err(|e: T::Err| {
            AcceleratorError::config(format!("Invalid value for {}: '{}' ({})", key, raw, e))
        })?;
        debug!("Applied {} from environment", key);
        Ok(Some(value))
    }

    /// Overwrite `target` when the variable is set
    fn set<T>(&self, name: &str, target: &mut T) -> Result<()>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.get(name)? {
            *target = value;
        }
        Ok(())
    }
}
