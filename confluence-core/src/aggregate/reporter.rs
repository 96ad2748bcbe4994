//! Metadata reporter: keeps the last aggregation's metadata for readers.
//!
//! `Aggregator::aggregate` already returns metadata by value. These types are
//! for hosts that want a "last run" view (a report or a status display)
//! without threading the record through themselves.

use std::sync::{Mutex, MutexGuard};

use crate::domain::SignalSeries;

use super::output::{AggregatedSignal, AggregationMetadata};
use super::Aggregator;

/// Thread-safe holder of the most recent [`AggregationMetadata`].
#[derive(Debug, Default)]
pub struct MetadataReporter {
    last: Mutex<Option<AggregationMetadata>>,
}

impl MetadataReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<AggregationMetadata>> {
        // The guarded value is replaced wholesale, so a poisoned lock still
        // holds a complete record.
        self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, metadata: AggregationMetadata) {
        *self.lock() = Some(metadata);
    }

    /// The last recorded metadata, or the empty record if none.
    pub fn latest(&self) -> AggregationMetadata {
        self.lock().clone().unwrap_or_default()
    }

    pub fn has_run(&self) -> bool {
        self.lock().is_some()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }
}

/// An [`Aggregator`] that remembers the metadata of its last run.
///
/// `aggregate` holds the reporter lock for the whole run, so concurrent
/// callers on one instance are serialized and `metadata()` always returns a
/// record that matches some completed call.
#[derive(Debug, Default)]
pub struct ReportingAggregator {
    aggregator: Aggregator,
    reporter: MetadataReporter,
}

impl ReportingAggregator {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator,
            reporter: MetadataReporter::new(),
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn aggregate(&self, series: &[SignalSeries]) -> AggregatedSignal {
        let mut last = self.reporter.lock();
        let (signal, metadata) = self.aggregator.aggregate(series);
        *last = Some(metadata);
        signal
    }

    /// Metadata of the last run, or the empty record before the first run.
    pub fn metadata(&self) -> AggregationMetadata {
        self.reporter.latest()
    }
}
