//! Parallel batch aggregation over independent signal sets.
//!
//! Each run builds its own aggregator, so runs share no mutable state and
//! can execute on any rayon worker.

use rayon::prelude::*;
use tracing::{info, warn};

use confluence_core::domain::SignalSeries;

use crate::config::PipelineConfig;
use crate::result::PipelineResult;
use crate::runner::{aggregate_signal_set, RunError};

/// One labelled signal set waiting to be aggregated.
pub type LabelledSet = (String, Vec<SignalSeries>);

/// Aggregate every set under the same configuration.
///
/// Output order matches input order. A failed run does not stop the others.
pub fn run_batch(
    config: &PipelineConfig,
    sets: Vec<LabelledSet>,
) -> Vec<Result<PipelineResult, RunError>> {
    let total = sets.len();
    let results: Vec<Result<PipelineResult, RunError>> = sets
        .into_par_iter()
        .map(|(label, series)| {
            let outcome = aggregate_signal_set(config, &label, series);
            if let Err(ref err) = outcome {
                warn!(label = label.as_str(), %err, "aggregation run failed");
            }
            outcome
        })
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(total, failed, "batch complete");
    results
}
