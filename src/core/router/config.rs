//! Router configuration types
//!
//! This module defines the routing strategies and the router settings.

use super::error::RouterError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Routing strategy enumeration
///
/// Defines how the router picks one deployment when several serve the same
/// model group. Each strategy has a canonical integer id and a canonical
/// lowercase-hyphenated name; both map to the same variant.
///
/// | id | name                      |
/// |----|---------------------------|
/// | 0  | `simple-shuffle`          |
/// | 1  | `least-busy`              |
/// | 2  | `latency-based-routing`   |
/// | 3  | `cost-based-routing`      |
/// | 4  | `usage-based-routing`     |
/// | 5  | `usage-based-routing-v2`  |
/// | 6  | `least-busy-with-penalty` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoutingStrategy {
    /// Uniform random choice (weighted when deployments declare a `weight`)
    #[default]
    SimpleShuffle,
    /// Fewest in-flight requests
    LeastBusy,
    /// Lowest rolling average latency
    LatencyBased,
    /// Lowest `model_info` cost per token
    CostBased,
    /// Weighted random, inversely proportional to this minute's usage
    UsageBasedV1,
    /// Weighted random, inversely proportional to exponentially decayed usage
    UsageBasedV2,
    /// Least busy, with an additive penalty after a recent failure
    LeastBusyWithPenalty,
}

impl RoutingStrategy {
    pub const ALL: [RoutingStrategy; 7] = [
        RoutingStrategy::SimpleShuffle,
        RoutingStrategy::LeastBusy,
        RoutingStrategy::LatencyBased,
        RoutingStrategy::CostBased,
        RoutingStrategy::UsageBasedV1,
        RoutingStrategy::UsageBasedV2,
        RoutingStrategy::LeastBusyWithPenalty,
    ];

    /// Canonical integer id
    pub fn id(&self) -> u8 {
        match self {
            RoutingStrategy::SimpleShuffle => 0,
            RoutingStrategy::LeastBusy => 1,
            RoutingStrategy::LatencyBased => 2,
            RoutingStrategy::CostBased => 3,
            RoutingStrategy::UsageBasedV1 => 4,
            RoutingStrategy::UsageBasedV2 => 5,
            RoutingStrategy::LeastBusyWithPenalty => 6,
        }
    }

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingStrategy::SimpleShuffle => "simple-shuffle",
            RoutingStrategy::LeastBusy => "least-busy",
            RoutingStrategy::LatencyBased => "latency-based-routing",
            RoutingStrategy::CostBased => "cost-based-routing",
            RoutingStrategy::UsageBasedV1 => "usage-based-routing",
            RoutingStrategy::UsageBasedV2 => "usage-based-routing-v2",
            RoutingStrategy::LeastBusyWithPenalty => "least-busy-with-penalty",
        }
    }
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingStrategy {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if let Ok(id) = name.parse::<u8>() {
            return RoutingStrategy::try_from(id);
        }

        RoutingStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| RouterError::UnknownStrategy(s.to_string()))
    }
}

impl TryFrom<u8> for RoutingStrategy {
    type Error = RouterError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        RoutingStrategy::ALL
            .get(usize::from(id))
            .copied()
            .ok_or_else(|| RouterError::UnknownStrategy(id.to_string()))
    }
}

impl Serialize for RoutingStrategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Either accepted spelling of a strategy
#[derive(Deserialize)]
#[serde(untagged)]
enum StrategyRepr {
    Id(u8),
    Name(String),
}

impl<'de> Deserialize<'de> for RoutingStrategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match StrategyRepr::deserialize(deserializer)? {
            StrategyRepr::Id(id) => RoutingStrategy::try_from(id),
            StrategyRepr::Name(name) => name.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// Router configuration
///
/// Immutable once handed to a [`Router`](super::Router).
///
/// ## Defaults
///
/// - `routing_strategy`: SimpleShuffle
/// - `cooldown_time_seconds`: 60
/// - `max_retries`: 3
/// - `timeout_seconds`: 30
/// - `failure_penalty`: 5.0
/// - `penalty_decay_secs`: 60
/// - `usage_half_life_secs`: 60
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Routing strategy to use for deployment selection
    pub routing_strategy: RoutingStrategy,

    /// How long a failed deployment is excluded from selection
    pub cooldown_time_seconds: u64,

    /// Retry budget for the caller's retry loop; the router never retries
    pub max_retries: u32,

    /// Advisory per-call timeout for the caller
    pub timeout_seconds: u64,

    /// Busy-count penalty applied right after a failure (LeastBusyWithPenalty)
    pub failure_penalty: f64,

    /// Seconds over which the failure penalty decays linearly to zero
    pub penalty_decay_secs: u64,

    /// Half-life of the decayed usage score (UsageBasedV2)
    pub usage_half_life_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            routing_strategy: RoutingStrategy::SimpleShuffle,
            cooldown_time_seconds: 60,
            max_retries: 3,
            timeout_seconds: 30,
            failure_penalty: 5.0,
            penalty_decay_secs: 60,
            usage_half_life_secs: 60,
        }
    }
}

impl RouterConfig {
    /// Router configuration with the given strategy and default everything else
    pub fn with_strategy(routing_strategy: RoutingStrategy) -> Self {
        Self {
            routing_strategy,
            ..Self::default()
        }
    }
}
