//! Pipeline runner: wires together sources, configured weights, and the aggregator.
//!
//! Two entry points:
//! - `run_sources()`: runs strategy sources over bars, then aggregates. The
//!   full in-process pipeline.
//! - `aggregate_signal_set()`: takes series that were produced elsewhere
//!   (e.g. loaded from a signal-set file). Used by the CLI and batch runs.

use thiserror::Error;
use tracing::{debug, info, warn};

use confluence_core::aggregate::{AggregationConfig, Aggregator};
use confluence_core::domain::{Bar, SeriesError, SignalSeries};
use confluence_core::source::SignalSource;

use crate::config::PipelineConfig;
use crate::result::{PipelineResult, SignalSummary, SCHEMA_VERSION};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot apply configured weight: {0}")]
    Weight(#[from] SeriesError),
    #[error("failed to fingerprint run: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Apply the `[[strategies]]` entries to a set of series.
///
/// Disabled strategies are removed. A configured weight replaces the weight
/// a series carries; series without a config entry are left untouched.
pub fn apply_strategy_weights(
    series: Vec<SignalSeries>,
    config: &PipelineConfig,
) -> Result<Vec<SignalSeries>, RunError> {
    let mut kept = Vec::with_capacity(series.len());
    for mut s in series {
        match config.strategy(s.name()) {
            Some(entry) if !entry.enabled => {
                info!(strategy = s.name(), "strategy disabled in config, excluding");
            }
            Some(entry) => {
                if entry.weight.is_some() {
                    s.set_weight(entry.weight)?;
                }
                kept.push(s);
            }
            None => {
                debug!(strategy = s.name(), "strategy not in config, keeping its own weight");
                kept.push(s);
            }
        }
    }
    Ok(kept)
}

/// Deterministic run id: BLAKE3 over the resolved config and the inputs.
///
/// Two runs with identical config and series share an id.
pub fn run_id(config: &AggregationConfig, series: &[SignalSeries]) -> Result<String, RunError> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&serde_json::to_vec(config)?);
    hasher.update(&serde_json::to_vec(series)?);
    Ok(hasher.finalize().to_hex().to_string())
}

/// Aggregate series produced elsewhere.
///
/// Applies the configured strategy weights, then combines. Aggregation
/// itself never fails; errors here come from weight application or
/// fingerprinting.
pub fn aggregate_signal_set(
    config: &PipelineConfig,
    label: &str,
    series: Vec<SignalSeries>,
) -> Result<PipelineResult, RunError> {
    let aggregation_config = config.aggregation_config();
    let series = apply_strategy_weights(series, config)?;
    let run_id = run_id(&aggregation_config, &series)?;

    let aggregator = Aggregator::new(aggregation_config);
    let (aggregated, metadata) = aggregator.aggregate(&series);
    let summary = SignalSummary::from_signal(&aggregated);

    info!(
        label,
        method = aggregation_config.method.as_str(),
        strategies = metadata.num_strategies,
        timestamps = summary.timestamps,
        buy = summary.buy,
        "aggregation complete"
    );

    Ok(PipelineResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        label: label.to_string(),
        config: aggregation_config,
        aggregated,
        metadata,
        summary,
    })
}

/// Run each source over `bars`, then aggregate their series.
///
/// A source that fails to produce a valid series is dropped from the run
/// with a warning.
pub fn run_sources(
    config: &PipelineConfig,
    label: &str,
    bars: &[Bar],
    sources: &[Box<dyn SignalSource>],
) -> Result<PipelineResult, RunError> {
    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        warn!(
            bars = bars.len(),
            insane,
            "market data contains void or inconsistent bars"
        );
    }

    let mut series = Vec::with_capacity(sources.len());
    for source in sources {
        match source.generate(bars) {
            Ok(s) => {
                debug!(
                    strategy = source.name(),
                    timestamps = s.len(),
                    "processed data through strategy"
                );
                series.push(s);
            }
            Err(err) => warn!(
                strategy = source.name(),
                %err,
                "strategy produced an invalid series, skipping"
            ),
        }
    }

    aggregate_signal_set(config, label, series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyEntry;
    use chrono::NaiveDate;
    use confluence_core::aggregate::AggregationMethod;
    use confluence_core::domain::Timestamp;

    fn ts(day: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn series(name: &str, value: f64) -> SignalSeries {
        SignalSeries::new(name, vec![ts(1), ts(2)], vec![value, value]).unwrap()
    }

    fn config_with(strategies: Vec<StrategyEntry>) -> PipelineConfig {
        PipelineConfig {
            strategies,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn configured_weight_overrides_series_weight() {
        let input = vec![
            series("rsi", 0.2).with_weight(5.0).unwrap(),
            series("other", 0.1),
        ];
        let config = config_with(vec![StrategyEntry::new("rsi", 0.8)]);
        let out = apply_strategy_weights(input, &config).unwrap();
        assert_eq!(out[0].weight(), Some(0.8));
        assert_eq!(out[1].weight(), None);
    }

    #[test]
    fn entry_without_weight_keeps_series_weight() {
        let input = vec![series("rsi", 0.2).with_weight(5.0).unwrap()];
        let config = config_with(vec![StrategyEntry {
            name: "rsi".into(),
            weight: None,
            enabled: true,
        }]);
        let out = apply_strategy_weights(input, &config).unwrap();
        assert_eq!(out[0].weight(), Some(5.0));
    }

    #[test]
    fn disabled_strategy_is_excluded() {
        let input = vec![series("rsi", 0.9), series("macd", 0.1)];
        let config = config_with(vec![StrategyEntry {
            name: "macd".into(),
            weight: Some(1.0),
            enabled: false,
        }]);
        let result = aggregate_signal_set(&config, "test", input).unwrap();
        assert_eq!(result.metadata.strategies, vec!["rsi".to_string()]);
        assert_eq!(result.aggregated.binary_signal, vec![1.0, 1.0]);
    }

    #[test]
    fn run_id_is_deterministic_and_input_sensitive() {
        let config = AggregationConfig::default();
        let a = vec![series("rsi", 0.2)];
        let b = vec![series("rsi", 0.3)];
        assert_eq!(run_id(&config, &a).unwrap(), run_id(&config, &a).unwrap());
        assert_ne!(run_id(&config, &a).unwrap(), run_id(&config, &b).unwrap());

        let consensus = AggregationConfig::new(AggregationMethod::Consensus);
        assert_ne!(run_id(&config, &a).unwrap(), run_id(&consensus, &a).unwrap());
    }

    #[test]
    fn empty_signal_set_is_not_an_error() {
        let result =
            aggregate_signal_set(&PipelineConfig::default(), "empty", Vec::new()).unwrap();
        assert!(result.aggregated.is_empty());
        assert_eq!(result.summary.timestamps, 0);
    }
}
