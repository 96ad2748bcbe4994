//! Aggregation configuration: method, threshold, and gap handling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Threshold used when none is configured.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Combination policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    /// Normalized weighted sum of continuous signals, binarized with `> threshold`.
    #[default]
    WeightedAverage,
    /// Normalized weighted share of binary votes, binarized with `> threshold`.
    MajorityVote,
    /// Unanimity over binary votes: 1 (all buy), 0 (all sell), 0.5 otherwise.
    /// Ignores the threshold and the weights.
    Consensus,
}

/// Returned by the strict parser for names outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown aggregation method '{0}' (expected weighted_average, majority_vote, or consensus)")]
pub struct UnknownMethod(pub String);

impl AggregationMethod {
    pub const ALL: [AggregationMethod; 3] = [
        AggregationMethod::WeightedAverage,
        AggregationMethod::MajorityVote,
        AggregationMethod::Consensus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeightedAverage => "weighted_average",
            Self::MajorityVote => "majority_vote",
            Self::Consensus => "consensus",
        }
    }

    /// Whether the configured threshold influences this method's output.
    pub fn uses_threshold(&self) -> bool {
        !matches!(self, Self::Consensus)
    }

    /// Whether strategy weights influence this method's output.
    pub fn uses_weights(&self) -> bool {
        !matches!(self, Self::Consensus)
    }

    /// Resolve a configured method name, never failing.
    ///
    /// Unknown names resolve to [`AggregationMethod::WeightedAverage`] with a
    /// warning, so a typo in a config file degrades the run instead of
    /// aborting it.
    pub fn from_name_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|err: UnknownMethod| {
            warn!("{err}, using weighted_average");
            Self::WeightedAverage
        })
    }
}

impl FromStr for AggregationMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// How undefined (NaN) inputs are combined.
///
/// Gaps appear when reconciliation widens a series onto timestamps it did
/// not cover, or when a source emits NaN during its warm-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Any undefined input makes the combined value undefined at that
    /// timestamp. The binary stays defined: 0 for the weighted methods,
    /// 0.5 for consensus.
    #[default]
    Propagate,
    /// Undefined inputs sit out that timestamp; the remaining weights are
    /// re-normalized. Consensus only looks at the defined votes.
    Skip,
    /// Undefined inputs count as 0.0.
    Zero,
}

impl MissingPolicy {
    pub const ALL: [MissingPolicy; 3] = [
        MissingPolicy::Propagate,
        MissingPolicy::Skip,
        MissingPolicy::Zero,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Propagate => "propagate",
            Self::Skip => "skip",
            Self::Zero => "zero",
        }
    }
}

/// Returned when parsing a missing-value policy name fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown missing-value policy '{0}' (expected propagate, skip, or zero)")]
pub struct UnknownMissingPolicy(pub String);

impl FromStr for MissingPolicy {
    type Err = UnknownMissingPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| UnknownMissingPolicy(s.to_string()))
    }
}

impl fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Immutable configuration for one aggregation run.
///
/// `threshold` binarizes the combined signal for the weighted methods with a
/// strict `>`; consensus never reads it. The core does not range-check it,
/// that is the configuration layer's job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default)]
    pub method: AggregationMethod,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub missing: MissingPolicy,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            method: AggregationMethod::default(),
            threshold: DEFAULT_THRESHOLD,
            missing: MissingPolicy::default(),
        }
    }
}

impl AggregationConfig {
    pub fn new(method: AggregationMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_missing(mut self, missing: MissingPolicy) -> Self {
        self.missing = missing;
        self
    }
}
