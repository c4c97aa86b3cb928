//! Router core structure
//!
//! Manages the deployment table, the group index and the feedback calls
//! that drive health and cooldown.

use super::config::RouterConfig;
use super::deployment::{Deployment, DeploymentId, RoutedDeployment};
use super::error::RouterError;
use crate::core::clock::{Clock, system_clock};
use crate::core::tokens::TokenCounter;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Router
///
/// Holds the deployment set and selects one deployment per request under the
/// configured [`RoutingStrategy`](super::RoutingStrategy). Deployment state
/// is per-deployment and lock-free, so selection for unrelated deployments
/// never serializes.
pub struct Router {
    /// All deployments by `model_name`
    pub(crate) deployments: DashMap<DeploymentId, Arc<RoutedDeployment>>,

    /// Route key (group or model name) to deployment names, registration order
    pub(crate) model_index: DashMap<String, Vec<DeploymentId>>,

    /// Router configuration
    pub(crate) config: RouterConfig,

    /// Optional counter for charging prompt tokens at route time
    pub(crate) token_counter: Option<Arc<TokenCounter>>,

    /// Requests routed (lifetime)
    pub(crate) total_requests: AtomicU64,

    /// Registration sequence
    pub(crate) next_seq: AtomicU64,

    pub(crate) clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("strategy", &self.config.routing_strategy)
            .field("deployments", &self.deployments.len())
            .field("token_counter", &self.token_counter.is_some())
            .finish()
    }
}

impl Router {
    /// Create a new router with the given configuration
    pub fn new(config: RouterConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    /// Create a router reading time from `clock`
    pub fn with_clock(config: RouterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            deployments: DashMap::new(),
            model_index: DashMap::new(),
            config,
            token_counter: None,
            total_requests: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            clock,
        }
    }

    /// Attach a token counter used to estimate prompt tokens (builder pattern)
    pub fn with_token_counter(mut self, counter: Arc<TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    /// Get the router configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Retry budget for the caller's retry loop
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Advisory per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    // ========== Deployment Management ==========

    /// Register a deployment
    ///
    /// Fails with `DuplicateDeployment` if the name is taken; the existing
    /// registration is left untouched.
    pub fn add_deployment(&self, deployment: Deployment) -> Result<(), RouterError> {
        let name = deployment.model_name.clone();
        let now = self.clock.now_ms();

        let routed = match self.deployments.entry(name.clone()) {
            Entry::Occupied(_) => {
                warn!("Rejected duplicate deployment: {}", name);
                return Err(RouterError::DuplicateDeployment(name));
            }
            Entry::Vacant(vacant) => {
                let seq = self.next_seq.fetch_add(1, Relaxed);
                let routed = Arc::new(RoutedDeployment::new(deployment, seq, now));
                vacant.insert(Arc::clone(&routed));
                routed
            }
        };

        self.index(&routed.group, &name);
        if routed.group != name {
            self.index(&name, &name);
        }

        info!("Added deployment {} (group {})", name, routed.group);
        Ok(())
    }

    /// Remove a deployment, returning whether it existed
    pub fn remove_deployment(&self, name: &str) -> bool {
        let Some((_, removed)) = self.deployments.remove(name) else {
            return false;
        };

        for key in [removed.group.as_str(), name] {
            if let Some(mut names) = self.model_index.get_mut(key) {
                names.retain(|candidate| candidate != name);
            }
        }
        self.model_index.remove_if(&removed.group, |_, names| names.is_empty());
        self.model_index.remove_if(name, |_, names| names.is_empty());

        info!("Removed deployment {}", name);
        true
    }

    /// Get a registered deployment by name
    pub fn get_deployment(&self, name: &str) -> Option<Arc<Deployment>> {
        self.deployments
            .get(name)
            .map(|entry| Arc::clone(&entry.value().deployment))
    }

    /// Names of every registered deployment, in registration order
    pub fn get_deployment_names(&self) -> Vec<String> {
        self.ordered_deployments()
            .iter()
            .map(|routed| routed.name().to_string())
            .collect()
    }

    /// Route keys (groups and names) with at least one deployment
    pub fn list_models(&self) -> Vec<String> {
        self.model_index
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    // ========== Recording Methods ==========

    /// Record a successful call
    ///
    /// `tokens` are the tokens reported by the call (typically completion
    /// tokens); prompt tokens estimated at route time are already charged.
    pub fn record_success(
        &self,
        name: &str,
        latency_ms: f64,
        tokens: u64,
    ) -> Result<(), RouterError> {
        let routed = self.lookup(name)?;
        routed.state.record_success(
            self.clock.now_ms(),
            latency_ms,
            tokens,
            self.usage_half_life_ms(),
        );
        debug!("Recorded success for {} ({:.1} ms)", name, latency_ms);
        Ok(())
    }

    /// Record a failed call and put the deployment into cooldown
    pub fn record_failure(&self, name: &str) -> Result<(), RouterError> {
        let routed = self.lookup(name)?;
        let now = self.clock.now_ms();

        routed.state.record_failure(now);
        routed
            .state
            .enter_cooldown(now, self.config.cooldown_time_seconds.saturating_mul(1000));

        warn!(
            "Deployment {} failed; cooling down for {}s",
            name, self.config.cooldown_time_seconds
        );
        Ok(())
    }

    /// Resolve an in-flight request without reporting an outcome
    pub fn release_deployment(&self, name: &str) -> Result<(), RouterError> {
        self.lookup(name)?.state.finish_request();
        Ok(())
    }

    /// Whether a deployment is cooling down right now
    pub fn is_in_cooldown(&self, name: &str) -> Result<bool, RouterError> {
        let routed = self.lookup(name)?;
        Ok(routed.state.is_in_cooldown(self.clock.now_ms()))
    }

    // ========== Background Tasks ==========

    /// Reset per-minute counters for all deployments
    pub fn reset_minute_counters(&self) {
        let now = self.clock.now_ms();
        for entry in self.deployments.iter() {
            entry.value().state.reset_minute(now);
        }
    }

    /// Start background task to reset minute counters
    pub fn start_minute_reset_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                self.reset_minute_counters();
            }
        })
    }

    // ========== Internals ==========

    pub(crate) fn lookup(&self, name: &str) -> Result<Arc<RoutedDeployment>, RouterError> {
        self.deployments
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RouterError::DeploymentNotFound(name.to_string()))
    }

    /// All deployments, registration order
    pub(crate) fn ordered_deployments(&self) -> Vec<Arc<RoutedDeployment>> {
        let mut all: Vec<_> = self
            .deployments
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by_key(|routed| routed.seq);
        all
    }

    pub(crate) fn usage_half_life_ms(&self) -> u64 {
        self.config.usage_half_life_secs.saturating_mul(1000)
    }

    fn index(&self, key: &str, name: &str) {
        let mut names = self.model_index.entry(key.to_string()).or_default();
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}
