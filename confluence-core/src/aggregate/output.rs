//! Aggregation output: the combined series and the record of how it was built.

use serde::{Deserialize, Serialize};

use crate::domain::Timestamp;

use super::config::{AggregationMethod, MissingPolicy};

/// Binary value consensus emits when strategies disagree.
pub const NO_CONSENSUS: f64 = 0.5;

/// Combined signal on the reconciled index.
///
/// `binary_signal` is defined at every timestamp. `signal` may hold NaN
/// where undefined inputs propagated through a weighted sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSignal {
    pub timestamps: Vec<Timestamp>,
    #[serde(with = "crate::serde_nan")]
    pub signal: Vec<f64>,
    pub binary_signal: Vec<f64>,
}

/// Decision carried by one combined binary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Binary 1.
    Buy,
    /// Binary 0: "not buy" for the threshold methods, sell consensus for consensus.
    Sell,
    /// Binary 0.5, consensus only.
    NoConsensus,
}

impl Decision {
    pub fn from_binary(value: f64) -> Option<Self> {
        if value == 1.0 {
            Some(Self::Buy)
        } else if value == 0.0 {
            Some(Self::Sell)
        } else if value == NO_CONSENSUS {
            Some(Self::NoConsensus)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::NoConsensus => "no_consensus",
        }
    }

    /// Reader-facing name under `method`.
    ///
    /// The threshold methods only say whether the combined value cleared the
    /// threshold, so their binary 0 reads as "no_buy", not "sell".
    pub fn label(&self, method: AggregationMethod) -> &'static str {
        match self {
            Self::Sell if method.uses_threshold() => "no_buy",
            _ => self.as_str(),
        }
    }
}

impl AggregatedSignal {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Decision at position `i`, if `i` is in range.
    pub fn decision_at(&self, i: usize) -> Option<Decision> {
        self.binary_signal.get(i).copied().and_then(Decision::from_binary)
    }

    /// Decisions for every timestamp, in index order.
    pub fn decisions(&self) -> impl Iterator<Item = (Timestamp, Decision)> + '_ {
        self.timestamps
            .iter()
            .zip(&self.binary_signal)
            .filter_map(|(ts, &b)| Decision::from_binary(b).map(|d| (*ts, d)))
    }

    /// The most recent decision, if any.
    pub fn latest(&self) -> Option<(Timestamp, Decision)> {
        let i = self.len().checked_sub(1)?;
        self.decision_at(i).map(|d| (self.timestamps[i], d))
    }
}

/// How the last aggregation was performed.
///
/// The default value is the empty record: no method, no strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationMetadata {
    /// Method actually applied (after fallback of unknown names).
    pub method: Option<AggregationMethod>,
    /// Threshold, for the methods that use one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Number of series that contributed.
    pub num_strategies: usize,
    /// Normalized weights in contributing-series order, for the methods that use them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    /// Names of the contributing series.
    pub strategies: Vec<String>,
    /// Names of series skipped for lacking a required column.
    pub skipped: Vec<String>,
    /// Whether inputs had to be reindexed onto a union index.
    pub reindexed: bool,
    /// Gap handling in effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_policy: Option<MissingPolicy>,
}

impl AggregationMetadata {
    /// True for the record of a run that has not happened.
    pub fn is_empty(&self) -> bool {
        self.method.is_none()
    }

    /// Normalized weight of a named contributing strategy.
    pub fn weight_of(&self, strategy: &str) -> Option<f64> {
        let weights = self.weights.as_ref()?;
        self.strategies
            .iter()
            .position(|s| s == strategy)
            .and_then(|i| weights.get(i).copied())
    }
}
