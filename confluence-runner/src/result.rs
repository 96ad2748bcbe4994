//! Pipeline results and their summary counts.

use serde::{Deserialize, Serialize};

use confluence_core::aggregate::{
    AggregatedSignal, AggregationConfig, AggregationMetadata, Decision,
};
use confluence_core::domain::Timestamp;

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Deterministic id over the resolved config and the input series.
    pub run_id: String,
    /// Caller-supplied name for this run (e.g. the signal-set file stem).
    pub label: String,
    pub config: AggregationConfig,
    pub aggregated: AggregatedSignal,
    pub metadata: AggregationMetadata,
    pub summary: SignalSummary,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Decision counts over a combined signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub timestamps: usize,
    pub buy: usize,
    pub sell: usize,
    pub no_consensus: usize,
    /// Timestamps where the combined continuous value is undefined.
    pub undefined_signal: usize,
    pub latest: Option<(Timestamp, Decision)>,
}

impl SignalSummary {
    pub fn from_signal(signal: &AggregatedSignal) -> Self {
        let mut summary = SignalSummary {
            timestamps: signal.len(),
            undefined_signal: signal.signal.iter().filter(|v| v.is_nan()).count(),
            latest: signal.latest(),
            ..Default::default()
        };
        for (_, decision) in signal.decisions() {
            match decision {
                Decision::Buy => summary.buy += 1,
                Decision::Sell => summary.sell += 1,
                Decision::NoConsensus => summary.no_consensus += 1,
            }
        }
        summary
    }

    /// Share of timestamps with a buy decision (0.0 for an empty signal).
    pub fn buy_ratio(&self) -> f64 {
        if self.timestamps == 0 {
            0.0
        } else {
            self.buy as f64 / self.timestamps as f64
        }
    }
}
