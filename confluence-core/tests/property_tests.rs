//! Property tests for aggregation invariants.
//!
//! Uses proptest to verify:
//! 1. Normalized weights sum to one (or are uniform when the total is not positive)
//! 2. Reconciliation keeps every input timestamp and sorts the union
//! 3. The combined binary is defined for every reconciled timestamp
//! 4. Weighted average equals the closed-form weighted mean
//! 5. Consensus output only takes the values 0, 0.5, and 1

use chrono::{Duration, NaiveDate};
use confluence_core::aggregate::{
    aggregate, normalize_weights, AggregationConfig, AggregationMethod, MissingPolicy,
};
use confluence_core::domain::{SignalSeries, Timestamp};
use confluence_core::reconcile::reconcile;
use proptest::prelude::*;
use std::collections::BTreeSet;

// ── Strategies (proptest) ────────────────────────────────────────────

fn base() -> Timestamp {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// A sorted, unique set of day offsets.
fn arb_offsets() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(0i64..60, 1..20).prop_map(|s| s.into_iter().collect())
}

fn arb_series(name: &'static str) -> impl Strategy<Value = SignalSeries> {
    arb_offsets().prop_flat_map(move |offsets| {
        let n = offsets.len();
        (
            Just(offsets),
            prop::collection::vec(-1.0..1.0_f64, n),
            prop::option::of(-0.5..2.0_f64),
        )
            .prop_map(move |(offsets, values, weight)| {
                let timestamps = offsets.iter().map(|d| base() + Duration::days(*d)).collect();
                let series = SignalSeries::new(name, timestamps, values).unwrap();
                match weight {
                    Some(w) => series.with_weight(w).unwrap(),
                    None => series,
                }
            })
    })
}

fn arb_method() -> impl Strategy<Value = AggregationMethod> {
    prop::sample::select(AggregationMethod::ALL.to_vec())
}

fn arb_policy() -> impl Strategy<Value = MissingPolicy> {
    prop::sample::select(MissingPolicy::ALL.to_vec())
}

// ── 1. Weight normalization ──────────────────────────────────────────

proptest! {
    #[test]
    fn normalized_weights_sum_to_one(raw in prop::collection::vec(-2.0..5.0_f64, 1..10)) {
        let weights = normalize_weights(&raw);
        prop_assert_eq!(weights.len(), raw.len());
        let total: f64 = weights.iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);

        if raw.iter().sum::<f64>() <= 0.0 {
            let uniform = 1.0 / raw.len() as f64;
            prop_assert!(weights.iter().all(|w| (*w - uniform).abs() < 1e-12));
        }
    }
}

// ── 2. Reconciliation ────────────────────────────────────────────────

proptest! {
    #[test]
    fn reconciled_index_is_sorted_union(
        a in arb_series("a"),
        b in arb_series("b"),
        c in arb_series("c"),
    ) {
        let inputs = vec![a, b, c];
        let reconciled = reconcile(&inputs);

        let expected: BTreeSet<Timestamp> = inputs
            .iter()
            .flat_map(|s| s.timestamps().iter().copied())
            .collect();
        let expected: Vec<Timestamp> = expected.into_iter().collect();
        prop_assert_eq!(&reconciled.index, &expected);

        for (original, aligned) in inputs.iter().zip(&reconciled.series) {
            prop_assert_eq!(aligned.timestamps(), expected.as_slice());
            // every original value survives at its own timestamp
            let aligned_values = aligned.signal().unwrap();
            for (ts, v) in original.timestamps().iter().zip(original.signal().unwrap()) {
                let pos = expected.binary_search(ts).unwrap();
                prop_assert_eq!(aligned_values[pos], *v);
            }
        }
    }
}

// ── 3. Defined binary output ─────────────────────────────────────────

proptest! {
    #[test]
    fn binary_defined_for_every_timestamp(
        a in arb_series("a"),
        b in arb_series("b"),
        method in arb_method(),
        missing in arb_policy(),
        threshold in 0.0..1.0_f64,
    ) {
        let config = AggregationConfig::new(method)
            .with_threshold(threshold)
            .with_missing(missing);
        let (signal, meta) = aggregate(&[a, b], &config);

        prop_assert_eq!(signal.binary_signal.len(), signal.timestamps.len());
        prop_assert_eq!(signal.signal.len(), signal.timestamps.len());
        prop_assert!(signal.binary_signal.iter().all(|v| !v.is_nan()));
        prop_assert_eq!(meta.num_strategies, 2);

        if method == AggregationMethod::Consensus {
            prop_assert!(signal
                .binary_signal
                .iter()
                .all(|v| *v == 0.0 || *v == 0.5 || *v == 1.0));
        } else {
            prop_assert!(signal.binary_signal.iter().all(|v| *v == 0.0 || *v == 1.0));
        }
    }
}

// ── 4. Weighted mean ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn weighted_average_equals_weighted_mean(
        values in prop::collection::vec((0.0..1.0_f64, 0.01..3.0_f64), 1..8),
        threshold in 0.0..1.0_f64,
    ) {
        let ts = vec![base()];
        let series: Vec<SignalSeries> = values
            .iter()
            .enumerate()
            .map(|(i, (v, w))| {
                SignalSeries::new(format!("s{i}"), ts.clone(), vec![*v])
                    .unwrap()
                    .with_weight(*w)
                    .unwrap()
            })
            .collect();

        let config = AggregationConfig::new(AggregationMethod::WeightedAverage)
            .with_threshold(threshold);
        let (signal, _) = aggregate(&series, &config);

        let total: f64 = values.iter().map(|(_, w)| w).sum();
        let mean: f64 = values.iter().map(|(v, w)| v * w).sum::<f64>() / total;
        prop_assert!((signal.signal[0] - mean).abs() < 1e-9);
        let expected_binary = if signal.signal[0] > threshold { 1.0 } else { 0.0 };
        prop_assert_eq!(signal.binary_signal[0], expected_binary);
    }
}
