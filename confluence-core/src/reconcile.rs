//! Index reconciliation.
//!
//! Given signal series from several strategies, align them to a common
//! timeline before any combination runs. The timeline is the union of every
//! series' timestamps; a series that did not cover a timestamp gets NaN there
//! (no forward-fill). Timestamps are never dropped, so a strategy with a long
//! warm-up or a late start stays visible in the combined view.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::domain::{SignalSeries, Timestamp};

/// Signal series sharing one timeline.
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    /// The common index (sorted ascending).
    pub index: Vec<Timestamp>,
    /// Input series in input order, each with `timestamps() == index`.
    pub series: Vec<SignalSeries>,
    /// True if at least one series had to be widened onto the union index.
    pub reindexed: bool,
}

impl Reconciled {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Align `series` to the union of their indices.
///
/// If every series already has the same index (by value) the inputs are
/// cloned as they are. Inputs are never mutated.
pub fn reconcile(series: &[SignalSeries]) -> Reconciled {
    let Some(first) = series.first() else {
        return Reconciled::default();
    };

    if series
        .iter()
        .all(|s| s.timestamps() == first.timestamps())
    {
        debug!(
            series = series.len(),
            timestamps = first.len(),
            "signal series already share an index"
        );
        return Reconciled {
            index: first.timestamps().to_vec(),
            series: series.to_vec(),
            reindexed: false,
        };
    }

    let mut all_timestamps = BTreeSet::new();
    for s in series {
        all_timestamps.extend(s.timestamps().iter().copied());
    }
    let index: Vec<Timestamp> = all_timestamps.into_iter().collect();

    warn!(
        series = series.len(),
        union = index.len(),
        "signal series have different indices, reindexing onto their union"
    );

    let aligned = series.iter().map(|s| s.reindexed(&index)).collect();

    Reconciled {
        index,
        series: aligned,
        reindexed: true,
    }
}
