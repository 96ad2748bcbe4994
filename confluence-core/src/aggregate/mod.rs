//! Aggregation engine: combines per-strategy signal series into one decision.
//!
//! - `Aggregator`: reconciles inputs, dispatches on the configured method.
//! - `combine`: one function per method (weighted average, majority vote, consensus).
//! - `weights`: shared weight normalization.
//! - `reporter`: optional holder for the last run's metadata.
//!
//! The engine is stateless: `aggregate` returns the combined signal together
//! with its metadata, so one `Aggregator` can be shared across threads.

pub mod combine;
pub mod config;
pub mod output;
pub mod reporter;
pub mod weights;

pub use config::{
    AggregationConfig, AggregationMethod, MissingPolicy, UnknownMethod, UnknownMissingPolicy,
    DEFAULT_THRESHOLD,
};
pub use output::{AggregatedSignal, AggregationMetadata, Decision, NO_CONSENSUS};
pub use reporter::{MetadataReporter, ReportingAggregator};
pub use weights::normalize_weights;

use tracing::{debug, warn};

use crate::domain::SignalSeries;
use crate::reconcile::reconcile;

/// Combines signal series under one [`AggregationConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    config: AggregationConfig,
}

impl Aggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    /// Build from a method name as it appears in configuration.
    /// Unknown names fall back to weighted average with a warning.
    pub fn from_method_name(name: &str, threshold: f64) -> Self {
        let method = AggregationMethod::from_name_lenient(name);
        Self::new(AggregationConfig::new(method).with_threshold(threshold))
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn method(&self) -> AggregationMethod {
        self.config.method
    }

    /// Reconcile `series` onto a common index and combine them.
    ///
    /// Never fails. Empty input, or input where no series carries the
    /// columns the method needs, yields an empty [`AggregatedSignal`].
    pub fn aggregate(&self, series: &[SignalSeries]) -> (AggregatedSignal, AggregationMetadata) {
        let method = self.config.method;
        if series.is_empty() {
            warn!("no signals to aggregate");
            let metadata = AggregationMetadata {
                method: Some(method),
                threshold: method.uses_threshold().then_some(self.config.threshold),
                weights: method.uses_weights().then(Vec::new),
                missing_policy: Some(self.config.missing),
                ..AggregationMetadata::default()
            };
            return (AggregatedSignal::empty(), metadata);
        }

        let reconciled = reconcile(series);
        let index = &reconciled.index;
        let combine_fn = match method {
            AggregationMethod::WeightedAverage => combine::weighted_average,
            AggregationMethod::MajorityVote => combine::majority_vote,
            AggregationMethod::Consensus => combine::consensus,
        };
        let (signal, metadata) = combine_fn(
            &reconciled.series,
            index,
            &self.config,
            reconciled.reindexed,
        );

        debug!(
            method = method.as_str(),
            strategies = metadata.num_strategies,
            skipped = metadata.skipped.len(),
            timestamps = signal.len(),
            "aggregated signals"
        );
        (signal, metadata)
    }
}

/// Aggregate with a one-off configuration.
pub fn aggregate(
    series: &[SignalSeries],
    config: &AggregationConfig,
) -> (AggregatedSignal, AggregationMetadata) {
    Aggregator::new(*config).aggregate(series)
}
