//! Result persistence: pretty JSON with schema versioning.
//!
//! Every persisted result carries a `schema_version`. Results written by a
//! newer version are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::result::{PipelineResult, SCHEMA_VERSION};

/// Characters of the run id used in result file names.
const RUN_ID_PREFIX: usize = 12;

/// Serialize a `PipelineResult` to pretty JSON.
pub fn export_json(result: &PipelineResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize PipelineResult to JSON")
}

/// Deserialize a `PipelineResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<PipelineResult> {
    let result: PipelineResult =
        serde_json::from_str(json).context("failed to deserialize PipelineResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

/// File name for a result: `{label}_{run_id prefix}.json`.
///
/// Path separators in the label are replaced so the file always lands
/// directly under the output directory.
pub fn result_file_name(result: &PipelineResult) -> String {
    let label: String = result
        .label
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    let id: String = result.run_id.chars().take(RUN_ID_PREFIX).collect();
    format!("{label}_{id}.json")
}

/// Write one result under `output_dir`, creating the directory if needed.
///
/// Returns the path of the written file.
pub fn save_result(output_dir: &Path, result: &PipelineResult) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let path = output_dir.join(result_file_name(result));
    let json = export_json(result)?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), "saved aggregation result");
    Ok(path)
}

/// Read a result file written by [`save_result`].
pub fn load_result(path: &Path) -> Result<PipelineResult> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
