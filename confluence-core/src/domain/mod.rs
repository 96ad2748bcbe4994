//! Domain types: market bars in, signal series out.

pub mod bar;
pub mod series;

pub use bar::Bar;
pub use series::{SeriesError, SignalSeries, DEFAULT_WEIGHT, DERIVED_BINARY_CUTOFF};

/// Time key shared by bars and signal series.
pub type Timestamp = chrono::NaiveDateTime;
