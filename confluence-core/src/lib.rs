//! Confluence Core: signal series, index reconciliation, and the aggregation engine.
//!
//! This crate contains the decision logic of the pipeline:
//! - Domain types (bars, signal series with optional columns and weight)
//! - The signal source contract implemented by strategies
//! - Union-index reconciliation of misaligned series
//! - Aggregation under weighted average, majority vote, or consensus
//! - Metadata describing each aggregation run
//!
//! No I/O happens here. Configuration files, signal-set loading, and result
//! export live in `confluence-runner`.

pub mod aggregate;
pub mod domain;
pub mod reconcile;
pub mod serde_nan;
pub mod source;

pub use aggregate::{
    aggregate, AggregatedSignal, AggregationConfig, AggregationMetadata, AggregationMethod,
    Aggregator, Decision, MissingPolicy,
};
pub use domain::{Bar, SeriesError, SignalSeries, Timestamp};
pub use reconcile::{reconcile, Reconciled};
pub use source::SignalSource;
