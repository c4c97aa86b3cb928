//! Deployment selection logic
//!
//! This module contains the core routing logic for selecting
//! the best deployment for a given model.

use super::config::RoutingStrategy;
use super::deployment::{Deployment, RoutedDeployment};
use super::error::RouterError;
use super::router::Router;
use super::strategy_impl;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::Ordering::Relaxed;
use tracing::debug;

/// Model used for token estimation when a deployment's own model has no table
const ESTIMATION_FALLBACK_MODEL: &str = "gpt-3.5-turbo";

impl Router {
    /// Select a deployment for `model_name` (core routing method)
    ///
    /// # Flow
    ///
    /// 1. Collect deployments whose group or name equals `model_name`
    /// 2. Drop those in cooldown
    /// 3. Select based on routing strategy
    /// 4. Charge the request (and estimated prompt tokens) to the selection
    pub fn route_request(
        &self,
        model_name: &str,
        payload: &Value,
    ) -> Result<Arc<Deployment>, RouterError> {
        let now = self.clock.now_ms();
        let candidates = self.eligible_candidates(model_name, now);

        if candidates.is_empty() {
            debug!("No healthy deployment for {}", model_name);
            return Err(RouterError::NoHealthyDeployment(model_name.to_string()));
        }

        let index = match self.config.routing_strategy {
            RoutingStrategy::SimpleShuffle => strategy_impl::simple_shuffle(&candidates),
            RoutingStrategy::LeastBusy => strategy_impl::least_busy(&candidates),
            RoutingStrategy::LatencyBased => strategy_impl::lowest_latency(&candidates),
            RoutingStrategy::CostBased => strategy_impl::lowest_cost(&candidates),
            RoutingStrategy::UsageBasedV1 => strategy_impl::usage_based_v1(&candidates, now),
            RoutingStrategy::UsageBasedV2 => {
                strategy_impl::usage_based_v2(&candidates, now, self.usage_half_life_ms())
            }
            RoutingStrategy::LeastBusyWithPenalty => strategy_impl::least_busy_with_penalty(
                &candidates,
                now,
                self.config.failure_penalty,
                self.config.penalty_decay_secs.saturating_mul(1000),
            ),
        };
        let selected = &candidates[index.min(candidates.len() - 1)];

        let tokens = self.estimate_prompt_tokens(selected, model_name, payload);
        selected
            .state
            .record_routed(now, tokens, self.usage_half_life_ms());
        self.total_requests.fetch_add(1, Relaxed);

        debug!(
            "Routed {} to {} via {} ({} prompt tokens)",
            model_name,
            selected.name(),
            self.config.routing_strategy,
            tokens
        );
        Ok(Arc::clone(&selected.deployment))
    }

    /// Names of deployments `route_request(model_name, ..)` could pick now
    pub fn get_healthy_deployments(&self, model_name: &str) -> Vec<String> {
        self.eligible_candidates(model_name, self.clock.now_ms())
            .iter()
            .map(|routed| routed.name().to_string())
            .collect()
    }

    /// Deployments serving `model_name`, registration order
    pub(crate) fn candidates(&self, model_name: &str) -> Vec<Arc<RoutedDeployment>> {
        let Some(names) = self.model_index.get(model_name).map(|names| names.clone()) else {
            return Vec::new();
        };

        let mut candidates: Vec<_> = names
            .iter()
            .filter_map(|name| self.deployments.get(name).map(|e| Arc::clone(e.value())))
            .filter(|routed| routed.serves(model_name))
            .collect();
        candidates.sort_by_key(|routed| routed.seq);
        candidates
    }

    fn eligible_candidates(&self, model_name: &str, now_ms: u64) -> Vec<Arc<RoutedDeployment>> {
        let mut candidates = self.candidates(model_name);
        candidates.retain(|routed| !routed.state.is_in_cooldown(now_ms));
        candidates
    }

    /// Prompt tokens in `payload`, or 0 without an attached counter
    fn estimate_prompt_tokens(
        &self,
        selected: &RoutedDeployment,
        model_name: &str,
        payload: &Value,
    ) -> u64 {
        let Some(counter) = &self.token_counter else {
            return 0;
        };

        let texts = prompt_texts(payload);
        if texts.is_empty() {
            return 0;
        }

        let models = [
            selected.deployment.model(),
            Some(model_name),
            Some(ESTIMATION_FALLBACK_MODEL),
        ];
        for model in models.into_iter().flatten() {
            if let Ok(counts) = counter.count_tokens_batch(&texts, model) {
                return counts.iter().sum::<usize>() as u64;
            }
        }

        debug!("Could not estimate prompt tokens for {}", model_name);
        0
    }
}

/// Text fragments of a request payload
///
/// Reads `messages[*].content` (plain strings or `{"text": ..}` parts),
/// `prompt` and `input` (strings or arrays of strings).
pub(crate) fn prompt_texts(payload: &Value) -> Vec<&str> {
    let mut texts = Vec::new();

    if let Some(messages) = payload.get("messages").and_then(Value::as_array) {
        for message in messages {
            collect_text(message.get("content"), &mut texts);
        }
    }
    collect_text(payload.get("prompt"), &mut texts);
    collect_text(payload.get("input"), &mut texts);

    texts
}

fn collect_text<'a>(value: Option<&'a Value>, texts: &mut Vec<&'a str>) {
    match value {
        Some(Value::String(text)) => texts.push(text),
        Some(Value::Array(parts)) => {
            for part in parts {
                match part {
                    Value::String(text) => texts.push(text),
                    Value::Object(fields) => {
                        if let Some(text) = fields.get("text").and_then(Value::as_str) {
                            texts.push(text);
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
}
