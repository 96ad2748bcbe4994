//! Signal sources: the strategy side of the contract.
//!
//! A source turns OHLCV history into one [`SignalSeries`]. Indicator math
//! lives with the implementors; the aggregation side only relies on the
//! shape of the output: a `signal` column, optionally a `binary_signal`
//! column and a constant weight.

use crate::domain::{Bar, SeriesError, SignalSeries};

/// A strategy that emits a per-timestamp signal series.
///
/// Sources are pure with respect to their input: the same bars must produce
/// the same series. They never see other sources' output or the aggregate.
pub trait SignalSource: Send + Sync {
    /// Strategy name, used as the series name and to look up configured weights.
    fn name(&self) -> &str;

    /// Produce this strategy's series for `bars`.
    ///
    /// A structurally invalid series is reported as an error; callers drop
    /// that strategy from the run instead of aborting it.
    fn generate(&self, bars: &[Bar]) -> Result<SignalSeries, SeriesError>;
}
