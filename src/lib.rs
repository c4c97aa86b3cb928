//! # fast-litellm
//!
//! Native hot-path components for an LLM gateway.
//!
//! ## Components
//!
//! - **TokenCounter**: BPE token counting with an LRU cache of encoding tables
//! - **RateLimiter**: per-key sliding-window admission control
//! - **ConnectionPool**: bounded, per-provider reusable connection handles
//! - **Router**: deployment selection under seven strategies, with cooldown
//!   after failures and aggregate statistics
//!
//! Every component is `Send + Sync` and meant to be shared behind an `Arc`.
//! Each also exposes a standalone health check (`token_health_check`,
//! `rate_limit_health_check`, `connection_pool_health_check`,
//! `router_health_check`) that never panics on expected conditions.
//!
//! ## Quick Start
//!
//! ```rust
//! use fast_litellm::{Deployment, RateLimiter, Router, RouterConfig, RoutingStrategy};
//! use serde_json::json;
//!
//! let router = Router::new(RouterConfig::with_strategy(RoutingStrategy::LeastBusy));
//! router
//!     .add_deployment(Deployment::new(
//!         "gpt-4-east",
//!         json!({"model": "azure/gpt-4"}),
//!         json!({"model_group": "gpt-4"}),
//!     ))
//!     .unwrap();
//!
//! let chosen = router.route_request("gpt-4", &json!({})).unwrap();
//! assert_eq!(chosen.model_name, "gpt-4-east");
//!
//! let limiter = RateLimiter::new();
//! assert!(limiter.check_rate_limit("user-1", 10, 60));
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod utils;

// Re-export main types
pub use config::{AcceleratorConfig, Validate};
pub use utils::error::{AcceleratorError, ErrorKind, Result};
pub use utils::logging::init_logging;

pub use core::clock::{Clock, ManualClock, SystemClock};
pub use core::connection_pool::{
    ConnectionPool, PoolError, PoolStats, connection_pool_health_check,
};
pub use core::rate_limiter::{RateLimitResult, RateLimiter, rate_limit_health_check};
pub use core::router::{
    Deployment, Router, RouterConfig, RouterError, RouterStats, RoutingStrategy,
    router_health_check,
};
pub use core::tokens::{TokenCounter, TokenError, token_health_check};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
