//! Serializable pipeline configuration.
//!
//! A TOML file with an `[aggregator]` table and a list of `[[strategies]]`:
//!
//! ```toml
//! [aggregator]
//! method = "weighted_average"   # weighted_average | majority_vote | consensus
//! threshold = 0.5
//! missing = "propagate"         # propagate | skip | zero
//!
//! [[strategies]]
//! name = "rsi"
//! weight = 0.8
//! ```
//!
//! The method is kept as a raw string here and resolved leniently: an
//! unknown name is a warning, not a load error.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use confluence_core::aggregate::{
    AggregationConfig, AggregationMethod, MissingPolicy, DEFAULT_THRESHOLD,
};

/// Errors from loading or validating a pipeline config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("threshold must be a finite number in [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("strategy '{0}' is configured more than once")]
    DuplicateStrategy(String),
    #[error("strategy '{name}' has a non-finite weight {weight}")]
    InvalidWeight { name: String, weight: f64 },
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub aggregator: AggregatorSection,
    #[serde(default)]
    pub strategies: Vec<StrategyEntry>,
}

/// `[aggregator]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorSection {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub missing: MissingPolicy,
}

/// One `[[strategies]]` entry: how a named strategy participates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub name: String,
    /// Overrides the weight carried by the strategy's series. `None` keeps it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_method() -> String {
    AggregationMethod::default().as_str().to_string()
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_enabled() -> bool {
    true
}

impl Default for AggregatorSection {
    fn default() -> Self {
        Self {
            method: default_method(),
            threshold: DEFAULT_THRESHOLD,
            missing: MissingPolicy::default(),
        }
    }
}

impl StrategyEntry {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight: Some(weight),
            enabled: true,
        }
    }
}

impl Default for PipelineConfig {
    /// Weighted average at 0.5 over the three stock strategies.
    fn default() -> Self {
        Self {
            aggregator: AggregatorSection::default(),
            strategies: vec![
                StrategyEntry::new("moving_average_crossover", 1.0),
                StrategyEntry::new("rsi", 0.8),
                StrategyEntry::new("macd", 0.9),
            ],
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the fields the surrounding system is responsible for.
    ///
    /// The method name is deliberately not checked here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.aggregator.threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        let mut seen = HashSet::new();
        for entry in &self.strategies {
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateStrategy(entry.name.clone()));
            }
            if let Some(weight) = entry.weight {
                if !weight.is_finite() {
                    return Err(ConfigError::InvalidWeight {
                        name: entry.name.clone(),
                        weight,
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve into the core configuration. Unknown method names fall back
    /// to weighted average with a warning.
    pub fn aggregation_config(&self) -> AggregationConfig {
        AggregationConfig::new(AggregationMethod::from_name_lenient(&self.aggregator.method))
            .with_threshold(self.aggregator.threshold)
            .with_missing(self.aggregator.missing)
    }

    pub fn strategy(&self, name: &str) -> Option<&StrategyEntry> {
        self.strategies.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let toml = r#"
[aggregator]
method = "majority_vote"
threshold = 0.6
missing = "skip"

[[strategies]]
name = "rsi"
weight = 0.8

[[strategies]]
name = "macd"
enabled = false
"#;
        let config = PipelineConfig::from_toml(toml).unwrap();
        let agg = config.aggregation_config();
        assert_eq!(agg.method, AggregationMethod::MajorityVote);
        assert_eq!(agg.threshold, 0.6);
        assert_eq!(agg.missing, MissingPolicy::Skip);

        assert_eq!(config.strategy("rsi").unwrap().weight, Some(0.8));
        let macd = config.strategy("macd").unwrap();
        assert_eq!(macd.weight, None);
        assert!(!macd.enabled);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config.aggregation_config(), AggregationConfig::default());
        assert!(config.strategies.is_empty());
    }

    #[test]
    fn unknown_method_is_not_an_error() {
        let config = PipelineConfig::from_toml("[aggregator]\nmethod = \"median\"\n").unwrap();
        assert_eq!(
            config.aggregation_config().method,
            AggregationMethod::WeightedAverage
        );
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let err = PipelineConfig::from_toml("[aggregator]\nthreshold = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold(t) if t == 1.5));

        let err = PipelineConfig::from_toml("[aggregator]\nthreshold = nan\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold(_)));
    }

    #[test]
    fn duplicate_strategy_rejected() {
        let toml = "[[strategies]]\nname = \"rsi\"\n\n[[strategies]]\nname = \"rsi\"\n";
        let err = PipelineConfig::from_toml(toml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateStrategy(ref n) if n == "rsi"));
    }

    #[test]
    fn negative_weight_allowed() {
        let toml = "[[strategies]]\nname = \"contrarian\"\nweight = -0.5\n";
        let config = PipelineConfig::from_toml(toml).unwrap();
        assert_eq!(config.strategy("contrarian").unwrap().weight, Some(-0.5));
    }

    #[test]
    fn invalid_missing_policy_is_a_parse_error() {
        let err = PipelineConfig::from_toml("[aggregator]\nmissing = \"drop\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = PipelineConfig::default();
        let toml = config.to_toml().unwrap();
        let back = PipelineConfig::from_toml(&toml).unwrap();
        assert_eq!(config, back);
        assert_eq!(back.strategy("macd").unwrap().weight, Some(0.9));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/confluence.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/confluence.toml"));
    }
}
