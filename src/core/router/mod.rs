//! Request router across deployments
//!
//! This module selects one deployment per request under a configurable
//! strategy, tracks per-deployment health, and keeps failed deployments out
//! of rotation for a cooldown period.
//!
//! ## Module Structure
//!
//! - `config` - Router configuration and routing strategy definitions
//! - `error` - Error types
//! - `deployment` - Deployment records and live state
//! - `router` - Core Router struct, deployment management and feedback
//! - `selection` - Deployment selection logic
//! - `strategy_impl` - Routing strategy implementations
//! - `metrics` - Statistics snapshots

pub mod config;
pub mod deployment;
pub mod error;
pub mod metrics;
pub mod router;
pub mod selection;
pub mod strategy_impl;

#[cfg(test)]
mod tests;

pub use config::{RouterConfig, RoutingStrategy};
pub use deployment::{Deployment, DeploymentId, DeploymentState, RoutedDeployment};
pub use error::RouterError;
pub use metrics::{DeploymentStats, RouterStats, router_health_check};
pub use router::Router;
