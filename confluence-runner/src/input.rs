//! Signal-set loading.
//!
//! A signal set is a JSON array of series, one per strategy:
//!
//! ```json
//! [
//!   {"name": "rsi", "timestamps": ["2024-01-02T00:00:00"], "signal": [0.7], "weight": 0.8},
//!   {"name": "macd", "timestamps": ["2024-01-02T00:00:00"], "binary_signal": [1]}
//! ]
//! ```
//!
//! `null` inside a value column marks an undefined value. Each series is
//! validated on load (sorted unique timestamps, matching column lengths).

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use confluence_core::domain::SignalSeries;

/// Errors from the signal-set loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read signal set '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid signal set '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a signal set from a JSON string.
pub fn parse_signal_set(json: &str) -> Result<Vec<SignalSeries>, serde_json::Error> {
    let series: Vec<SignalSeries> = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    for s in &series {
        if !seen.insert(s.name()) {
            warn!(series = s.name(), "signal set contains the same strategy name twice");
        }
    }
    Ok(series)
}

/// Read and parse a signal set file.
pub fn load_signal_set(path: &Path) -> Result<Vec<SignalSeries>, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let series = parse_signal_set(&contents).map_err(|source| LoadError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), series = series.len(), "loaded signal set");
    Ok(series)
}

/// Label for a signal set loaded from `path`: its file stem.
pub fn label_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "signals".to_string())
}
