//! The three combination policies.
//!
//! Each function takes series already reconciled onto `index` and returns
//! the combined signal plus its metadata. None of them fail: a series
//! missing its required column is skipped with a warning, and if nothing
//! survives the result is empty.

use tracing::{debug, warn};

use crate::domain::{SignalSeries, Timestamp};

use super::config::{AggregationConfig, AggregationMethod, MissingPolicy};
use super::output::{AggregatedSignal, AggregationMetadata, NO_CONSENSUS};
use super::weights::normalize_weights;

/// One surviving input: its name, value column, and raw weight.
struct Column {
    name: String,
    values: Vec<f64>,
    weight: f64,
}

/// Surviving columns plus the names of the skipped series.
struct Extracted {
    columns: Vec<Column>,
    skipped: Vec<String>,
}

fn extract_signals(series: &[SignalSeries]) -> Extracted {
    let mut columns = Vec::with_capacity(series.len());
    let mut skipped = Vec::new();
    for s in series {
        match s.signal() {
            Some(values) => columns.push(Column {
                name: s.name().to_string(),
                values: values.to_vec(),
                weight: s.effective_weight(),
            }),
            None => {
                warn!(series = s.name(), "series has no 'signal' column, skipping");
                skipped.push(s.name().to_string());
            }
        }
    }
    Extracted { columns, skipped }
}

fn extract_votes(series: &[SignalSeries]) -> Extracted {
    let mut columns = Vec::with_capacity(series.len());
    let mut skipped = Vec::new();
    for s in series {
        match s.binary_votes() {
            Some(values) => columns.push(Column {
                name: s.name().to_string(),
                values,
                weight: s.effective_weight(),
            }),
            None => {
                warn!(
                    series = s.name(),
                    "series has neither 'binary_signal' nor 'signal' column, skipping"
                );
                skipped.push(s.name().to_string());
            }
        }
    }
    Extracted { columns, skipped }
}

/// Metadata for a run where no series survived extraction.
fn empty_run(
    method: AggregationMethod,
    config: &AggregationConfig,
    skipped: Vec<String>,
    reindexed: bool,
) -> (AggregatedSignal, AggregationMetadata) {
    warn!(method = method.as_str(), "no valid signal columns found");
    let metadata = AggregationMetadata {
        method: Some(method),
        threshold: method.uses_threshold().then_some(config.threshold),
        num_strategies: 0,
        weights: method.uses_weights().then(Vec::new),
        strategies: Vec::new(),
        skipped,
        reindexed,
        missing_policy: Some(config.missing),
    };
    (AggregatedSignal::empty(), metadata)
}

/// Normalized weighted sum of `columns` at every timestamp.
fn weighted_sum(
    columns: &[Column],
    weights: &[f64],
    len: usize,
    missing: MissingPolicy,
) -> Vec<f64> {
    (0..len)
        .map(|t| match missing {
            MissingPolicy::Propagate => columns
                .iter()
                .zip(weights)
                .map(|(c, w)| w * c.values[t])
                .sum(),
            MissingPolicy::Zero => columns
                .iter()
                .zip(weights)
                .map(|(c, w)| {
                    let v = c.values[t];
                    if v.is_nan() {
                        0.0
                    } else {
                        w * v
                    }
                })
                .sum(),
            MissingPolicy::Skip => {
                let present: Vec<&Column> =
                    columns.iter().filter(|c| !c.values[t].is_nan()).collect();
                if present.is_empty() {
                    return f64::NAN;
                }
                let raw: Vec<f64> = present.iter().map(|c| c.weight).collect();
                present
                    .iter()
                    .zip(normalize_weights(&raw))
                    .map(|(c, w)| w * c.values[t])
                    .sum()
            }
        })
        .collect()
}

/// Strict `>`: a value equal to the threshold, or undefined, maps to 0.
fn binarize(signal: &[f64], threshold: f64) -> Vec<f64> {
    signal
        .iter()
        .map(|&s| if s > threshold { 1.0 } else { 0.0 })
        .collect()
}

fn weighted_run(
    method: AggregationMethod,
    extracted: Extracted,
    index: &[Timestamp],
    config: &AggregationConfig,
    reindexed: bool,
) -> (AggregatedSignal, AggregationMetadata) {
    let Extracted { columns, skipped } = extracted;
    if columns.is_empty() {
        return empty_run(method, config, skipped, reindexed);
    }

    let raw: Vec<f64> = columns.iter().map(|c| c.weight).collect();
    let weights = normalize_weights(&raw);
    if raw.iter().sum::<f64>() <= 0.0 {
        debug!(
            total = raw.iter().sum::<f64>(),
            "non-positive total weight, using uniform weights"
        );
    }

    let signal = weighted_sum(&columns, &weights, index.len(), config.missing);
    let binary_signal = binarize(&signal, config.threshold);

    let metadata = AggregationMetadata {
        method: Some(method),
        threshold: Some(config.threshold),
        num_strategies: columns.len(),
        weights: Some(weights),
        strategies: columns.into_iter().map(|c| c.name).collect(),
        skipped,
        reindexed,
        missing_policy: Some(config.missing),
    };

    (
        AggregatedSignal {
            timestamps: index.to_vec(),
            signal,
            binary_signal,
        },
        metadata,
    )
}

/// Weighted average of continuous signals.
pub fn weighted_average(
    series: &[SignalSeries],
    index: &[Timestamp],
    config: &AggregationConfig,
    reindexed: bool,
) -> (AggregatedSignal, AggregationMetadata) {
    weighted_run(
        AggregationMethod::WeightedAverage,
        extract_signals(series),
        index,
        config,
        reindexed,
    )
}

/// Weighted share of binary votes.
///
/// Votes come from `binary_signal` where present, otherwise from
/// `signal > 0.5` regardless of `config.threshold`.
pub fn majority_vote(
    series: &[SignalSeries],
    index: &[Timestamp],
    config: &AggregationConfig,
    reindexed: bool,
) -> (AggregatedSignal, AggregationMetadata) {
    weighted_run(
        AggregationMethod::MajorityVote,
        extract_votes(series),
        index,
        config,
        reindexed,
    )
}

/// Unanimous agreement over binary votes.
///
/// All votes 1 gives 1.0, all votes 0 gives 0.0, anything else gives 0.5.
/// Weights and `config.threshold` are not used.
pub fn consensus(
    series: &[SignalSeries],
    index: &[Timestamp],
    config: &AggregationConfig,
    reindexed: bool,
) -> (AggregatedSignal, AggregationMetadata) {
    let method = AggregationMethod::Consensus;
    let Extracted { columns, skipped } = extract_votes(series);
    if columns.is_empty() {
        return empty_run(method, config, skipped, reindexed);
    }

    let binary_signal: Vec<f64> = (0..index.len())
        .map(|t| {
            let mut defined = 0usize;
            let mut buys = 0usize;
            let mut sells = 0usize;
            for c in &columns {
                let v = match (c.values[t].is_nan(), config.missing) {
                    (true, MissingPolicy::Propagate) => return NO_CONSENSUS,
                    (true, MissingPolicy::Skip) => continue,
                    (true, MissingPolicy::Zero) => 0.0,
                    (false, _) => c.values[t],
                };
                defined += 1;
                if v == 1.0 {
                    buys += 1;
                } else if v == 0.0 {
                    sells += 1;
                }
            }
            if defined == 0 {
                NO_CONSENSUS
            } else if buys == defined {
                1.0
            } else if sells == defined {
                0.0
            } else {
                NO_CONSENSUS
            }
        })
        .collect();

    let metadata = AggregationMetadata {
        method: Some(method),
        threshold: None,
        num_strategies: columns.len(),
        weights: None,
        strategies: columns.into_iter().map(|c| c.name).collect(),
        skipped,
        reindexed,
        missing_policy: Some(config.missing),
    };

    (
        AggregatedSignal {
            timestamps: index.to_vec(),
            signal: binary_signal.clone(),
            binary_signal,
        },
        metadata,
    )
}
