//! Confluence Runner: configuration, signal-set loading, and pipeline orchestration.
//!
//! This crate builds on `confluence-core` to provide:
//! - TOML pipeline configuration with per-strategy weights
//! - JSON signal-set loading
//! - The source → weights → aggregate pipeline and its summary
//! - Parallel batch runs over independent signal sets
//! - Deterministic run ids and JSON result export

pub mod batch;
pub mod config;
pub mod export;
pub mod input;
pub mod result;
pub mod runner;

pub use batch::{run_batch, LabelledSet};
pub use config::{AggregatorSection, ConfigError, PipelineConfig, StrategyEntry};
pub use export::{export_json, import_json, load_result, save_result};
pub use input::{label_for, load_signal_set, parse_signal_set, LoadError};
pub use result::{PipelineResult, SignalSummary, SCHEMA_VERSION};
pub use runner::{aggregate_signal_set, apply_strategy_weights, run_id, run_sources, RunError};
