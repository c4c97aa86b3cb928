//! Deployment records and their live routing state
//!
//! - `Deployment`: the caller's immutable record (name, params, info)
//! - `DeploymentState`: lock-free runtime counters owned by the router
//!
//! ## Design Philosophy
//!
//! Counters use atomic operations with `Relaxed` ordering. Routing decisions
//! tolerate slightly stale values and no cross-field invariant has to hold
//! atomically. The decayed usage score is the exception: its value and
//! timestamp change together, so it sits behind a small mutex.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Deployment identifier (unique within router)
pub type DeploymentId = String;

/// `model_info` key naming the group a deployment serves
pub const MODEL_GROUP_KEY: &str = "model_group";

const MINUTE_MS: u64 = 60_000;
const NEVER: u64 = u64::MAX;
/// Latency samples are capped at one day
const MAX_LATENCY_MS: f64 = 86_400_000.0;

/// Deployment - a named, routable backend target
///
/// `litellm_params` and `model_info` are opaque to the router except for a
/// few well-known keys:
///
/// - `model_info.model_group`: group served by this deployment
/// - `model_info.input_cost_per_token` / `output_cost_per_token`: cost
/// - `litellm_params.model`: model used to estimate prompt tokens
/// - `litellm_params.weight`: relative weight for simple shuffle
///
/// ```rust
/// use fast_litellm::core::router::Deployment;
/// use serde_json::json;
///
/// let deployment = Deployment::new(
///     "gpt-4-east",
///     json!({"model": "azure/gpt-4", "api_base": "https://east.example.com"}),
///     json!({"model_group": "gpt-4", "input_cost_per_token": 0.00003}),
/// );
/// assert_eq!(deployment.group(), "gpt-4");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    /// Identity key inside a router
    pub model_name: String,

    /// Provider, API base, credentials reference...
    #[serde(default)]
    pub litellm_params: Value,

    /// Cost per token, max tokens, description...
    #[serde(default)]
    pub model_info: Value,
}

impl Deployment {
    /// Create a new deployment
    pub fn new(model_name: impl Into<String>, litellm_params: Value, model_info: Value) -> Self {
        Self {
            model_name: model_name.into(),
            litellm_params,
            model_info,
        }
    }

    /// Create a deployment with empty params and info
    pub fn named(model_name: impl Into<String>) -> Self {
        Self::new(model_name, Value::Null, Value::Null)
    }

    /// Group this deployment serves: `model_info.model_group`, else its own name
    pub fn group(&self) -> &str {
        self.model_info
            .get(MODEL_GROUP_KEY)
            .and_then(Value::as_str)
            .unwrap_or(&self.model_name)
    }

    /// Input plus output cost per token, 0 for missing entries
    pub fn cost_per_token(&self) -> f64 {
        let cost = |key: &str| {
            self.model_info
                .get(key)
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
        };
        cost("input_cost_per_token") + cost("output_cost_per_token")
    }

    /// Declared shuffle weight, if any
    pub fn weight(&self) -> Option<f64> {
        self.litellm_params
            .get("weight")
            .and_then(Value::as_f64)
            .filter(|weight| weight.is_finite() && *weight >= 0.0)
    }

    /// Underlying model used for token estimation
    pub fn model(&self) -> Option<&str> {
        self.litellm_params.get("model").and_then(Value::as_str)
    }

    /// Split into `(model_name, litellm_params, model_info)`
    pub fn into_parts(self) -> (String, Value, Value) {
        (self.model_name, self.litellm_params, self.model_info)
    }

    /// Copy out `(model_name, litellm_params, model_info)`
    pub fn to_parts(&self) -> (String, Value, Value) {
        self.clone().into_parts()
    }
}

/// Exponentially decayed usage score
#[derive(Debug, Default)]
struct DecayedUsage {
    score: f64,
    updated_at_ms: u64,
}

impl DecayedUsage {
    fn value_at(&self, now_ms: u64, half_life_ms: u64) -> f64 {
        if self.score == 0.0 || half_life_ms == 0 {
            return self.score;
        }
        let elapsed = now_ms.saturating_sub(self.updated_at_ms) as f64;
        self.score * 0.5_f64.powf(elapsed / half_life_ms as f64)
    }

    fn add(&mut self, amount: f64, now_ms: u64, half_life_ms: u64) {
        self.score = self.value_at(now_ms, half_life_ms) + amount;
        self.updated_at_ms = self.updated_at_ms.max(now_ms);
    }
}

/// Deployment runtime state
///
/// All timestamps are clock milliseconds. The per-minute `rpm`/`tpm`
/// counters roll over lazily when read or written a minute after the
/// current minute began, and can also be reset by a background task.
#[derive(Debug)]
pub struct DeploymentState {
    /// Requests routed here and not yet resolved by feedback
    pub active_requests: AtomicU64,
    /// Requests routed here (lifetime)
    pub total_requests: AtomicU64,
    /// Successful requests (lifetime)
    pub success_requests: AtomicU64,
    /// Failed requests (lifetime)
    pub fail_requests: AtomicU64,
    /// Requests this minute
    pub rpm_current: AtomicU64,
    /// Tokens this minute
    pub tpm_current: AtomicU64,
    /// Start of the current minute
    pub minute_started_at_ms: AtomicU64,
    /// Average latency in microseconds (EMA)
    pub avg_latency_us: AtomicU64,
    /// Latency samples folded into the average
    pub latency_samples: AtomicU64,
    /// Cooldown end; the deployment is eligible again at this instant
    pub cooldown_until_ms: AtomicU64,
    /// Last failure, `u64::MAX` if none
    pub last_failure_at_ms: AtomicU64,
    usage: Mutex<DecayedUsage>,
}

impl DeploymentState {
    /// Create new deployment state starting its first minute at `now_ms`
    pub fn new(now_ms: u64) -> Self {
        Self {
            active_requests: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            success_requests: AtomicU64::new(0),
            fail_requests: AtomicU64::new(0),
            rpm_current: AtomicU64::new(0),
            tpm_current: AtomicU64::new(0),
            minute_started_at_ms: AtomicU64::new(now_ms),
            avg_latency_us: AtomicU64::new(0),
            latency_samples: AtomicU64::new(0),
            cooldown_until_ms: AtomicU64::new(0),
            last_failure_at_ms: AtomicU64::new(NEVER),
            usage: Mutex::new(DecayedUsage {
                score: 0.0,
                updated_at_ms: now_ms,
            }),
        }
    }

    /// Reset per-minute counters
    pub fn reset_minute(&self, now_ms: u64) {
        self.rpm_current.store(0, Relaxed);
        self.tpm_current.store(0, Relaxed);
        self.minute_started_at_ms.store(now_ms, Relaxed);
    }

    /// Reset per-minute counters if the current minute is over
    pub fn roll_minute(&self, now_ms: u64) {
        let started = self.minute_started_at_ms.load(Relaxed);
        if now_ms >= started.saturating_add(MINUTE_MS)
            && self
                .minute_started_at_ms
                .compare_exchange(started, now_ms, Relaxed, Relaxed)
                .is_ok()
        {
            self.rpm_current.store(0, Relaxed);
            self.tpm_current.store(0, Relaxed);
        }
    }

    /// Check if the deployment is cooling down at `now_ms`
    pub fn is_in_cooldown(&self, now_ms: u64) -> bool {
        now_ms < self.cooldown_until_ms.load(Relaxed)
    }

    /// Milliseconds of cooldown left
    pub fn cooldown_remaining_ms(&self, now_ms: u64) -> u64 {
        self.cooldown_until_ms
            .load(Relaxed)
            .saturating_sub(now_ms)
    }

    /// Enter cooldown until `now_ms + duration_ms`
    pub fn enter_cooldown(&self, now_ms: u64, duration_ms: u64) {
        self.cooldown_until_ms
            .store(now_ms.saturating_add(duration_ms), Relaxed);
    }

    /// Record that a request was routed here, charging `tokens`
    pub fn record_routed(&self, now_ms: u64, tokens: u64, half_life_ms: u64) {
        self.roll_minute(now_ms);
        self.active_requests.fetch_add(1, Relaxed);
        self.total_requests.fetch_add(1, Relaxed);
        self.rpm_current.fetch_add(1, Relaxed);
        self.tpm_current.fetch_add(tokens, Relaxed);
        self.usage
            .lock()
            .add(1.0 + tokens as f64, now_ms, half_life_ms);
    }

    /// Record a successful request
    ///
    /// Folds the latency into the exponential moving average (alpha = 0.2)
    /// and charges the reported tokens to this minute's usage.
    pub fn record_success(&self, now_ms: u64, latency_ms: f64, tokens: u64, half_life_ms: u64) {
        self.finish_request();
        self.success_requests.fetch_add(1, Relaxed);

        if tokens > 0 {
            self.roll_minute(now_ms);
            self.tpm_current.fetch_add(tokens, Relaxed);
            self.usage.lock().add(tokens as f64, now_ms, half_life_ms);
        }

        // NaN and negative samples count as zero
        let latency_us = (latency_ms.max(0.0).min(MAX_LATENCY_MS) * 1000.0) as u64;
        let samples = self.latency_samples.fetch_add(1, Relaxed);
        let new_avg = if samples == 0 {
            latency_us
        } else {
            // EMA: new_avg = alpha * new_value + (1 - alpha) * old_avg
            let current_avg = self.avg_latency_us.load(Relaxed);
            latency_us.saturating_add(current_avg.saturating_mul(4)) / 5
        };
        self.avg_latency_us.store(new_avg, Relaxed);
    }

    /// Record a failed request
    pub fn record_failure(&self, now_ms: u64) {
        self.finish_request();
        self.fail_requests.fetch_add(1, Relaxed);
        self.last_failure_at_ms.store(now_ms, Relaxed);
    }

    /// Resolve one in-flight request without an outcome
    pub fn finish_request(&self) {
        // Saturate: feedback for a request routed before a reset is harmless
        let _ = self
            .active_requests
            .fetch_update(Relaxed, Relaxed, |active| active.checked_sub(1));
    }

    /// Average latency in milliseconds, `None` before the first sample
    pub fn avg_latency_ms(&self) -> Option<f64> {
        (self.latency_samples.load(Relaxed) > 0)
            .then(|| self.avg_latency_us.load(Relaxed) as f64 / 1000.0)
    }

    /// Usage score decayed to `now_ms`
    pub fn decayed_usage(&self, now_ms: u64, half_life_ms: u64) -> f64 {
        self.usage.lock().value_at(now_ms, half_life_ms)
    }

    /// Requests plus tokens in the current minute
    pub fn minute_usage(&self, now_ms: u64) -> u64 {
        self.roll_minute(now_ms);
        self.rpm_current.load(Relaxed) + self.tpm_current.load(Relaxed)
    }

    /// Failure penalty at `now_ms`: `penalty` right after a failure, falling
    /// linearly to zero over `decay_ms`
    pub fn failure_penalty(&self, now_ms: u64, penalty: f64, decay_ms: u64) -> f64 {
        let failed_at = self.last_failure_at_ms.load(Relaxed);
        if failed_at == NEVER || decay_ms == 0 {
            return 0.0;
        }

        let elapsed = now_ms.saturating_sub(failed_at);
        if elapsed >= decay_ms {
            return 0.0;
        }
        penalty * (1.0 - elapsed as f64 / decay_ms as f64)
    }

    /// Last failure time, if any
    pub fn last_failure_at_ms(&self) -> Option<u64> {
        let failed_at = self.last_failure_at_ms.load(Relaxed);
        (failed_at != NEVER).then_some(failed_at)
    }
}

/// A registered deployment plus the router's bookkeeping for it
#[derive(Debug)]
pub struct RoutedDeployment {
    /// The caller's record, shared with every route result
    pub deployment: Arc<Deployment>,
    /// Group this deployment serves
    pub group: String,
    /// Registration order, used for stable tie-breaks
    pub seq: u64,
    /// Runtime state (lock-free)
    pub state: DeploymentState,
}

impl RoutedDeployment {
    pub(crate) fn new(deployment: Deployment, seq: u64, now_ms: u64) -> Self {
        let group = deployment.group().to_string();
        Self {
            deployment: Arc::new(deployment),
            group,
            seq,
            state: DeploymentState::new(now_ms),
        }
    }

    pub fn name(&self) -> &str {
        &self.deployment.model_name
    }

    /// Whether a route request for `name` should consider this deployment
    pub fn serves(&self, name: &str) -> bool {
        self.group == name || self.deployment.model_name == name
    }
}
