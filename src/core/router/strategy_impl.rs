//! Routing strategy implementations
//!
//! Every function takes the eligible candidates in registration order and
//! returns the index of the chosen one. Callers guarantee `candidates` is
//! non-empty; deterministic strategies break ties by taking the earliest
//! registered deployment.

use super::deployment::RoutedDeployment;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::Ordering::Relaxed;

/// Uniform random selection (SimpleShuffle)
///
/// When any candidate declares `litellm_params.weight`, selection is
/// weighted instead, with undeclared weights counting as 1.
pub fn simple_shuffle(candidates: &[Arc<RoutedDeployment>]) -> usize {
    if candidates.len() <= 1 {
        return 0;
    }

    let declared = candidates
        .iter()
        .any(|routed| routed.deployment.weight().is_some());
    if !declared {
        return rand::thread_rng().gen_range(0..candidates.len());
    }

    let weights: Vec<f64> = candidates
        .iter()
        .map(|routed| routed.deployment.weight().unwrap_or(1.0))
        .collect();
    weighted_index(&weights)
}

/// Select deployment with fewest in-flight requests (LeastBusy)
pub fn least_busy(candidates: &[Arc<RoutedDeployment>]) -> usize {
    min_index_by(candidates, |routed| {
        routed.state.active_requests.load(Relaxed) as f64
    })
}

/// Select deployment with lowest average latency (LatencyBased)
///
/// Deployments without samples count as zero latency, so new deployments
/// are tried first.
pub fn lowest_latency(candidates: &[Arc<RoutedDeployment>]) -> usize {
    min_index_by(candidates, |routed| {
        routed.state.avg_latency_ms().unwrap_or(0.0)
    })
}

/// Select deployment with lowest cost per token (CostBased)
pub fn lowest_cost(candidates: &[Arc<RoutedDeployment>]) -> usize {
    min_index_by(candidates, |routed| routed.deployment.cost_per_token())
}

/// Weighted random on this minute's requests plus tokens (UsageBasedV1)
pub fn usage_based_v1(candidates: &[Arc<RoutedDeployment>], now_ms: u64) -> usize {
    inverse_usage(candidates, |routed| routed.state.minute_usage(now_ms) as f64)
}

/// Weighted random on the exponentially decayed usage score (UsageBasedV2)
pub fn usage_based_v2(
    candidates: &[Arc<RoutedDeployment>],
    now_ms: u64,
    half_life_ms: u64,
) -> usize {
    inverse_usage(candidates, |routed| {
        routed.state.decayed_usage(now_ms, half_life_ms)
    })
}

/// Least busy with a decaying failure penalty (LeastBusyWithPenalty)
///
/// Score is in-flight requests plus `penalty` scaled down linearly over
/// `decay_ms` since the deployment's last failure.
pub fn least_busy_with_penalty(
    candidates: &[Arc<RoutedDeployment>],
    now_ms: u64,
    penalty: f64,
    decay_ms: u64,
) -> usize {
    min_index_by(candidates, |routed| {
        routed.state.active_requests.load(Relaxed) as f64
            + routed.state.failure_penalty(now_ms, penalty, decay_ms)
    })
}

/// Weighted random choice with weight `1 / (1 + usage)`
fn inverse_usage(
    candidates: &[Arc<RoutedDeployment>],
    usage: impl Fn(&RoutedDeployment) -> f64,
) -> usize {
    if candidates.len() <= 1 {
        return 0;
    }

    let weights: Vec<f64> = candidates
        .iter()
        .map(|routed| 1.0 / (1.0 + usage(routed.as_ref()).max(0.0)))
        .collect();
    weighted_index(&weights)
}

/// Index of the first candidate with the smallest key
fn min_index_by(
    candidates: &[Arc<RoutedDeployment>],
    key: impl Fn(&RoutedDeployment) -> f64,
) -> usize {
    let mut best_index = 0;
    let mut best_key = f64::INFINITY;

    for (index, routed) in candidates.iter().enumerate() {
        let value = key(routed.as_ref());
        if value < best_key {
            best_key = value;
            best_index = index;
        }
    }

    best_index
}

/// Pick an index with probability proportional to its weight
///
/// Falls back to uniform choice when no weight is positive.
pub(crate) fn weighted_index(weights: &[f64]) -> usize {
    if weights.len() <= 1 {
        return 0;
    }

    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    let mut rng = rand::thread_rng();
    if !(total > 0.0 && total.is_finite()) {
        return rng.gen_range(0..weights.len());
    }

    // Generate random point in [0, total)
    let mut point = rng.gen_range(0.0..total);
    for (index, weight) in weights.iter().enumerate() {
        if *weight <= 0.0 {
            continue;
        }
        if point < *weight {
            return index;
        }
        point -= weight;
    }

    // Rounding can leave the point just past the last bucket
    weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
}
