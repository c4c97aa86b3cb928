//! Router statistics
//!
//! Read-only snapshots of the per-deployment counters. Snapshots are plain
//! serde data so the glue layer can log or export them directly.

use super::config::RouterConfig;
use super::deployment::{Deployment, RoutedDeployment};
use super::router::Router;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering::Relaxed;
use tracing::info;

/// Snapshot of one deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentStats {
    pub model_name: String,
    pub group: String,
    /// Requests routed and not yet resolved
    pub active_requests: u64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Requests this minute
    pub rpm: u64,
    /// Tokens this minute
    pub tpm: u64,
    /// Average latency, `None` before the first success
    pub avg_latency_ms: Option<f64>,
    /// Decayed usage score
    pub usage_score: f64,
    pub in_cooldown: bool,
    pub cooldown_remaining_ms: u64,
    pub last_failure_at_ms: Option<u64>,
}

/// Router-wide statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterStats {
    /// Requests routed (lifetime)
    pub total_requests: u64,
    pub total_deployments: usize,
    /// Deployments not in cooldown
    pub healthy_deployments: usize,
    /// Per-deployment snapshots, registration order
    pub deployments: Vec<DeploymentStats>,
}

impl Router {
    /// Snapshot all counters
    pub fn get_stats(&self) -> RouterStats {
        let now = self.clock.now_ms();
        let half_life = self.usage_half_life_ms();

        let deployments: Vec<DeploymentStats> = self
            .ordered_deployments()
            .iter()
            .map(|routed| snapshot(routed, now, half_life))
            .collect();

        RouterStats {
            total_requests: self.total_requests.load(Relaxed),
            total_deployments: deployments.len(),
            healthy_deployments: deployments.iter().filter(|d| !d.in_cooldown).count(),
            deployments,
        }
    }

    /// Snapshot one deployment
    pub fn get_deployment_stats(&self, name: &str) -> Option<DeploymentStats> {
        let routed = self.lookup(name).ok()?;
        Some(snapshot(
            &routed,
            self.clock.now_ms(),
            self.usage_half_life_ms(),
        ))
    }

    /// Check that the deployment table and group index agree
    pub fn health_check(&self) -> bool {
        self.deployments.iter().all(|entry| {
            let routed = entry.value();
            self.model_index
                .get(&routed.group)
                .is_some_and(|names| names.iter().any(|name| name == routed.name()))
        })
    }
}

fn snapshot(routed: &RoutedDeployment, now_ms: u64, half_life_ms: u64) -> DeploymentStats {
    let state = &routed.state;
    state.roll_minute(now_ms);

    DeploymentStats {
        model_name: routed.name().to_string(),
        group: routed.group.clone(),
        active_requests: state.active_requests.load(Relaxed),
        total_requests: state.total_requests.load(Relaxed),
        successful_requests: state.success_requests.load(Relaxed),
        failed_requests: state.fail_requests.load(Relaxed),
        rpm: state.rpm_current.load(Relaxed),
        tpm: state.tpm_current.load(Relaxed),
        avg_latency_ms: state.avg_latency_ms(),
        usage_score: state.decayed_usage(now_ms, half_life_ms),
        in_cooldown: state.is_in_cooldown(now_ms),
        cooldown_remaining_ms: state.cooldown_remaining_ms(now_ms),
        last_failure_at_ms: state.last_failure_at_ms(),
    }
}

/// Health check for the routing component
///
/// Routes a sample request through a scratch router.
pub fn router_health_check() -> bool {
    info!("Router health check called");
    let router = Router::new(RouterConfig::default());
    router
        .add_deployment(Deployment::named("__health_check__"))
        .is_ok()
        && router
            .route_request("__health_check__", &serde_json::Value::Null)
            .is_ok()
        && router.health_check()
}
