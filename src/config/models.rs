//! Configuration sections
//!
//! Every field has a serde default, so partial files are valid. `merge`
//! lets a later source override an earlier one: a field in `other` wins
//! when it differs from its default.

use crate::core::router::RouterConfig;
use serde::{Deserialize, Serialize};

/// Token counter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounterConfig {
    /// Encoding tables kept in the LRU cache
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

impl Default for TokenCounterConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
        }
    }
}

impl TokenCounterConfig {
    /// Merge two configurations, with other taking precedence
    pub fn merge(mut self, other: Self) -> Self {
        if other.cache_size != default_cache_size() {
            self.cache_size = other.cache_size;
        }
        self
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Retention for keys that have only been consumed against, never checked
    #[serde(default = "default_window_secs")]
    pub default_window_secs: u64,
    /// Period of the background sweep
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            default_window_secs: default_window_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl RateLimiterConfig {
    /// Merge two configurations, with other taking precedence
    pub fn merge(mut self, other: Self) -> Self {
        if other.default_window_secs != default_window_secs() {
            self.default_window_secs = other.default_window_secs;
        }
        if other.cleanup_interval_secs != default_cleanup_interval_secs() {
            self.cleanup_interval_secs = other.cleanup_interval_secs;
        }
        self
    }
}

/// Connection pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPoolConfig {
    #[serde(default = "default_max_connections_per_provider")]
    pub max_connections_per_provider: usize,
    /// Available handles idle longer than this are closed by the idle sweep
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_connections_per_provider: default_max_connections_per_provider(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl ConnectionPoolConfig {
    /// Merge two configurations, with other taking precedence
    pub fn merge(mut self, other: Self) -> Self {
        if other.max_connections_per_provider != default_max_connections_per_provider() {
            self.max_connections_per_provider = other.max_connections_per_provider;
        }
        if other.idle_timeout_secs != default_idle_timeout_secs() {
            self.idle_timeout_secs = other.idle_timeout_secs;
        }
        self
    }
}

impl RouterConfig {
    /// Merge two configurations, with other taking precedence
    pub fn merge(mut self, other: Self) -> Self {
        let defaults = RouterConfig::default();
        if other.routing_strategy != defaults.routing_strategy {
            self.routing_strategy = other.routing_strategy;
        }
        if other.cooldown_time_seconds != defaults.cooldown_time_seconds {
            self.cooldown_time_seconds = other.cooldown_time_seconds;
        }
        if other.max_retries != defaults.max_retries {
            self.max_retries = other.max_retries;
        }
        if other.timeout_seconds != defaults.timeout_seconds {
            self.timeout_seconds = other.timeout_seconds;
        }
        if other.failure_penalty != defaults.failure_penalty {
            self.failure_penalty = other.failure_penalty;
        }
        if other.penalty_decay_secs != defaults.penalty_decay_secs {
            self.penalty_decay_secs = other.penalty_decay_secs;
        }
        if other.usage_half_life_secs != defaults.usage_half_life_secs {
            self.usage_half_life_secs = other.usage_half_life_secs;
        }
        self
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output; unset means off
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: None,
        }
    }
}

impl LoggingConfig {
    /// Merge two configurations, with other taking precedence
    pub fn merge(mut self, other: Self) -> Self {
        if other.level != default_log_level() {
            self.level = other.level;
        }
        if other.json.is_some() {
            self.json = other.json;
        }
        self
    }

    /// Whether JSON output was requested
    pub fn json_enabled(&self) -> bool {
        self.json.unwrap_or(false)
    }
}

fn default_cache_size() -> usize {
    100
}

fn default_window_secs() -> u64 {
    60
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_max_connections_per_provider() -> usize {
    10
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}
