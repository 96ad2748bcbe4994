//! SignalSeries: one strategy's output over time.
//!
//! A series carries up to two value columns aligned to its timestamps:
//! - `signal`: continuous conviction, linearly combinable.
//! - `binary_signal`: an already-derived 0/1 decision.
//!
//! Either column may be absent (a strategy that only emits votes, or a
//! malformed source). Undefined values inside a column are `f64::NAN`,
//! which is also what reconciliation inserts at timestamps a series did
//! not cover.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Timestamp;

/// Cutoff used to turn a continuous signal into a per-series vote when no
/// `binary_signal` column is present.
///
/// This is deliberately independent of the aggregation threshold: it
/// normalizes a strategy's output into a vote, it is not the final decision.
pub const DERIVED_BINARY_CUTOFF: f64 = 0.5;

/// Weight assumed for a series that does not carry one.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Structural problems with a series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("series '{name}': timestamps must be strictly increasing (violated at position {position})")]
    NonMonotonicIndex { name: String, position: usize },

    #[error("series '{name}': column '{column}' has {actual} values but the index has {expected}")]
    LengthMismatch {
        name: String,
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("series '{name}': weight must be finite, got {weight}")]
    NonFiniteWeight { name: String, weight: f64 },
}

/// A time-indexed strategy output.
///
/// Constructed through [`SignalSeries::new`] or [`SignalSeries::votes_only`]
/// plus the `with_*` helpers, all of which validate the index and column
/// lengths. Deserialization runs the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesRecord")]
pub struct SignalSeries {
    name: String,
    timestamps: Vec<Timestamp>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::serde_nan::option::serialize"
    )]
    signal: Option<Vec<f64>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::serde_nan::option::serialize"
    )]
    binary_signal: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
}

/// Unvalidated wire shape of a series.
#[derive(Debug, Deserialize)]
struct SeriesRecord {
    name: String,
    timestamps: Vec<Timestamp>,
    #[serde(default, deserialize_with = "crate::serde_nan::option::deserialize")]
    signal: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "crate::serde_nan::option::deserialize")]
    binary_signal: Option<Vec<f64>>,
    #[serde(default)]
    weight: Option<f64>,
}

impl TryFrom<SeriesRecord> for SignalSeries {
    type Error = SeriesError;

    fn try_from(record: SeriesRecord) -> Result<Self, Self::Error> {
        let series = SignalSeries {
            name: record.name,
            timestamps: record.timestamps,
            signal: record.signal,
            binary_signal: record.binary_signal,
            weight: record.weight,
        };
        series.validate()?;
        Ok(series)
    }
}

impl SignalSeries {
    /// Create a series with a continuous `signal` column.
    pub fn new(
        name: impl Into<String>,
        timestamps: Vec<Timestamp>,
        signal: Vec<f64>,
    ) -> Result<Self, SeriesError> {
        let series = Self {
            name: name.into(),
            timestamps,
            signal: Some(signal),
            binary_signal: None,
            weight: None,
        };
        series.validate()?;
        Ok(series)
    }

    /// Create a series that only carries a `binary_signal` column.
    pub fn votes_only(
        name: impl Into<String>,
        timestamps: Vec<Timestamp>,
        binary_signal: Vec<f64>,
    ) -> Result<Self, SeriesError> {
        let series = Self {
            name: name.into(),
            timestamps,
            signal: None,
            binary_signal: Some(binary_signal),
            weight: None,
        };
        series.validate()?;
        Ok(series)
    }

    /// Create a series with no value columns at all.
    ///
    /// Such a series is valid structurally but is skipped by every
    /// aggregation method.
    pub fn index_only(
        name: impl Into<String>,
        timestamps: Vec<Timestamp>,
    ) -> Result<Self, SeriesError> {
        let series = Self {
            name: name.into(),
            timestamps,
            signal: None,
            binary_signal: None,
            weight: None,
        };
        series.validate()?;
        Ok(series)
    }

    /// Attach a `binary_signal` column.
    pub fn with_binary(mut self, binary_signal: Vec<f64>) -> Result<Self, SeriesError> {
        self.binary_signal = Some(binary_signal);
        self.validate()?;
        Ok(self)
    }

    /// Attach a constant weight.
    pub fn with_weight(mut self, weight: f64) -> Result<Self, SeriesError> {
        self.weight = Some(weight);
        self.validate()?;
        Ok(self)
    }

    /// Replace (or clear) the weight. Used by the runner to apply configured
    /// strategy weights on top of whatever the source emitted.
    pub fn set_weight(&mut self, weight: Option<f64>) -> Result<(), SeriesError> {
        if let Some(w) = weight {
            if !w.is_finite() {
                return Err(SeriesError::NonFiniteWeight {
                    name: self.name.clone(),
                    weight: w,
                });
            }
        }
        self.weight = weight;
        Ok(())
    }

    fn validate(&self) -> Result<(), SeriesError> {
        if let Some(position) = self
            .timestamps
            .windows(2)
            .position(|pair| pair[0] >= pair[1])
        {
            return Err(SeriesError::NonMonotonicIndex {
                name: self.name.clone(),
                position: position + 1,
            });
        }

        let expected = self.timestamps.len();
        for (column, values) in [
            ("signal", &self.signal),
            ("binary_signal", &self.binary_signal),
        ] {
            if let Some(values) = values {
                if values.len() != expected {
                    return Err(SeriesError::LengthMismatch {
                        name: self.name.clone(),
                        column,
                        expected,
                        actual: values.len(),
                    });
                }
            }
        }

        if let Some(weight) = self.weight {
            if !weight.is_finite() {
                return Err(SeriesError::NonFiniteWeight {
                    name: self.name.clone(),
                    weight,
                });
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn signal(&self) -> Option<&[f64]> {
        self.signal.as_deref()
    }

    pub fn binary_signal(&self) -> Option<&[f64]> {
        self.binary_signal.as_deref()
    }

    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    /// Weight used in combination: the series weight, or [`DEFAULT_WEIGHT`].
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Per-timestamp votes for vote-based methods.
    ///
    /// Prefers the `binary_signal` column, gaps included. Otherwise derives
    /// votes from `signal > DERIVED_BINARY_CUTOFF`, so an undefined signal
    /// is a 0 vote. Returns `None` when the series has neither column.
    pub fn binary_votes(&self) -> Option<Vec<f64>> {
        if let Some(binary) = &self.binary_signal {
            return Some(binary.clone());
        }
        self.signal.as_ref().map(|signal| {
            signal
                .iter()
                .map(|&s| if s > DERIVED_BINARY_CUTOFF { 1.0 } else { 0.0 })
                .collect()
        })
    }

    /// Rebuild this series on a wider index, filling uncovered timestamps
    /// with NaN. `index` must be a sorted superset of this series' index.
    pub(crate) fn reindexed(&self, index: &[Timestamp]) -> SignalSeries {
        let own = &self.timestamps;
        let mut cursor = 0;
        let positions: Vec<Option<usize>> = index
            .iter()
            .map(|ts| {
                if cursor < own.len() && own[cursor] == *ts {
                    cursor += 1;
                    Some(cursor - 1)
                } else {
                    None
                }
            })
            .collect();

        let spread = |values: &Vec<f64>| -> Vec<f64> {
            positions
                .iter()
                .map(|p| p.map_or(f64::NAN, |i| values[i]))
                .collect()
        };

        SignalSeries {
            name: self.name.clone(),
            timestamps: index.to_vec(),
            signal: self.signal.as_ref().map(spread),
            binary_signal: self.binary_signal.as_ref().map(spread),
            weight: self.weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let err = SignalSeries::new("ma", vec![ts(1), ts(2), ts(2)], vec![0.1, 0.2, 0.3])
            .unwrap_err();
        assert_eq!(
            err,
            SeriesError::NonMonotonicIndex {
                name: "ma".into(),
                position: 2
            }
        );
    }

    #[test]
    fn rejects_unsorted_timestamps() {
        assert!(SignalSeries::new("ma", vec![ts(3), ts(1)], vec![0.1, 0.2]).is_err());
    }

    #[test]
    fn rejects_column_length_mismatch() {
        let err = SignalSeries::new("rsi", vec![ts(1), ts(2)], vec![0.1])
            .unwrap_err();
        assert!(matches!(
            err,
            SeriesError::LengthMismatch {
                column: "signal",
                expected: 2,
                actual: 1,
                ..
            }
        ));

        let series = SignalSeries::new("rsi", vec![ts(1), ts(2)], vec![0.1, 0.2]).unwrap();
        assert!(series.with_binary(vec![1.0]).is_err());
    }

    #[test]
    fn rejects_non_finite_weight() {
        let series = SignalSeries::new("macd", vec![ts(1)], vec![0.4]).unwrap();
        assert!(series.clone().with_weight(f64::INFINITY).is_err());
        let mut series = series;
        assert!(series.set_weight(Some(f64::NAN)).is_err());
        assert_eq!(series.weight(), None);
    }

    #[test]
    fn effective_weight_defaults_to_one() {
        let series = SignalSeries::new("ma", vec![ts(1)], vec![0.4]).unwrap();
        assert_eq!(series.effective_weight(), 1.0);
        let series = series.with_weight(0.8).unwrap();
        assert_eq!(series.effective_weight(), 0.8);
    }

    #[test]
    fn binary_votes_prefer_existing_column() {
        let series = SignalSeries::new("ma", vec![ts(1), ts(2)], vec![0.9, 0.9])
            .unwrap()
            .with_binary(vec![0.0, 1.0])
            .unwrap();
        assert_eq!(series.binary_votes().unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn binary_votes_derived_with_fixed_cutoff() {
        let series = SignalSeries::new(
            "ma",
            vec![ts(1), ts(2), ts(3), ts(4)],
            vec![0.51, 0.5, -1.0, f64::NAN],
        )
        .unwrap();
        assert_eq!(series.binary_votes().unwrap(), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn binary_votes_keep_gaps_in_existing_column() {
        let series =
            SignalSeries::votes_only("rsi", vec![ts(1), ts(2)], vec![f64::NAN, 1.0]).unwrap();
        let votes = series.binary_votes().unwrap();
        assert!(votes[0].is_nan());
        assert_eq!(votes[1], 1.0);
    }

    #[test]
    fn binary_votes_absent_without_columns() {
        let series = SignalSeries::index_only("empty", vec![ts(1)]).unwrap();
        assert!(series.binary_votes().is_none());
    }

    #[test]
    fn reindexed_fills_gaps_with_nan() {
        let series = SignalSeries::new("ma", vec![ts(2), ts(4)], vec![0.2, 0.4])
            .unwrap()
            .with_weight(0.5)
            .unwrap();
        let wide = series.reindexed(&[ts(1), ts(2), ts(3), ts(4), ts(5)]);

        let signal = wide.signal().unwrap();
        assert!(signal[0].is_nan());
        assert_eq!(signal[1], 0.2);
        assert!(signal[2].is_nan());
        assert_eq!(signal[3], 0.4);
        assert!(signal[4].is_nan());
        assert!(wide.binary_signal().is_none());
        assert_eq!(wide.weight(), Some(0.5));
    }

    #[test]
    fn deserialization_validates() {
        let good = r#"{"name":"ma","timestamps":["2024-01-01T00:00:00","2024-01-02T00:00:00"],"signal":[0.1,0.2],"weight":0.7}"#;
        let series: SignalSeries = serde_json::from_str(good).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.weight(), Some(0.7));
        assert!(series.binary_signal().is_none());

        let gappy = r#"{"name":"rsi","timestamps":["2024-01-01T00:00:00","2024-01-02T00:00:00"],"binary_signal":[null,1]}"#;
        let series: SignalSeries = serde_json::from_str(gappy).unwrap();
        assert!(series.signal().is_none());
        assert!(series.binary_signal().unwrap()[0].is_nan());

        let bad = r#"{"name":"ma","timestamps":["2024-01-02T00:00:00","2024-01-01T00:00:00"],"signal":[0.1,0.2]}"#;
        let err = serde_json::from_str::<SignalSeries>(bad).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }
}
