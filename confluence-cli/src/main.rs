//! Confluence CLI: aggregate signal sets and manage pipeline configuration.
//!
//! Commands:
//! - `aggregate`: combine one or more signal-set files and save the results
//! - `init-config`: write the default pipeline config as TOML
//! - `methods`: list the aggregation methods and how they binarize

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use confluence_core::aggregate::{AggregationMethod, MissingPolicy, NO_CONSENSUS};
use confluence_core::domain::DERIVED_BINARY_CUTOFF;
use confluence_runner::{
    label_for, load_signal_set, run_batch, save_result, LabelledSet, PipelineConfig,
    PipelineResult,
};

#[derive(Parser)]
#[command(
    name = "confluence",
    about = "Confluence: combine per-strategy trading signals into one decision"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate one or more signal-set JSON files.
    Aggregate {
        /// Path to a TOML pipeline config. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Signal-set files (JSON arrays of series). Each is aggregated independently.
        #[arg(long, required = true, num_args = 1..)]
        signals: Vec<PathBuf>,

        /// Override the aggregation method (weighted_average, majority_vote, consensus).
        #[arg(long)]
        method: Option<String>,

        /// Override the binarization threshold.
        #[arg(long)]
        threshold: Option<f64>,

        /// Override gap handling (propagate, skip, zero).
        #[arg(long)]
        missing: Option<MissingPolicy>,

        /// Output directory for result JSON.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Write the default pipeline config to a TOML file.
    InitConfig {
        /// Destination path.
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// List the aggregation methods and their decision rules.
    Methods,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Aggregate {
            config,
            signals,
            method,
            threshold,
            missing,
            output_dir,
        } => run_aggregate_cmd(config, signals, method, threshold, missing, output_dir),
        Commands::InitConfig { path, force } => run_init_config(&path, force),
        Commands::Methods => {
            print_methods();
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(level, "logging initialized");
}

fn run_aggregate_cmd(
    config_path: Option<PathBuf>,
    signals: Vec<PathBuf>,
    method: Option<String>,
    threshold: Option<f64>,
    missing: Option<MissingPolicy>,
    output_dir: PathBuf,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_file(&path)?,
        None => PipelineConfig::default(),
    };

    // CLI overrides go through the same validation as the file
    if let Some(method) = method {
        config.aggregator.method = method;
    }
    if let Some(threshold) = threshold {
        config.aggregator.threshold = threshold;
    }
    if let Some(missing) = missing {
        config.aggregator.missing = missing;
    }
    config.validate()?;

    let sets = signals
        .iter()
        .map(|path| Ok((label_for(path), load_signal_set(path)?)))
        .collect::<Result<Vec<LabelledSet>>>()?;

    let results = run_batch(&config, sets);

    let mut failures = 0usize;
    for (path, outcome) in signals.iter().zip(results) {
        match outcome {
            Ok(result) => {
                print_summary(&result);
                let saved = save_result(&output_dir, &result)?;
                println!("Result saved to: {}", saved.display());
            }
            Err(err) => {
                eprintln!("Error for {}: {err}", path.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} signal set(s) failed", signals.len());
    }
    Ok(())
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    let toml = PipelineConfig::default().to_toml()?;
    std::fs::write(path, toml).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Default config written to: {}", path.display());
    Ok(())
}

fn print_methods() {
    for method in AggregationMethod::ALL {
        println!("{method}");
        match method {
            AggregationMethod::WeightedAverage => {
                println!("  signal: normalized weighted sum of each strategy's continuous signal");
                println!("  binary: 1 if signal > threshold, else 0");
            }
            AggregationMethod::MajorityVote => {
                println!("  signal: normalized weighted share of buy votes");
                println!("  binary: 1 if share > threshold, else 0");
                println!(
                    "  votes:  binary_signal column, else signal > {DERIVED_BINARY_CUTOFF}"
                );
                println!("          (an undefined signal votes 0)");
            }
            AggregationMethod::Consensus => {
                println!("  binary: 1 if every vote is buy, 0 if every vote is sell,");
                println!("          {NO_CONSENSUS} otherwise");
                println!("  ignores weights and threshold");
            }
        }
        println!();
    }
    println!("Gap handling (--missing):");
    for policy in MissingPolicy::ALL {
        let rule = match policy {
            MissingPolicy::Propagate => "an undefined input makes the combined value undefined",
            MissingPolicy::Skip => "undefined inputs sit out; remaining weights re-normalized",
            MissingPolicy::Zero => "undefined inputs count as 0",
        };
        println!("  {policy:<10} {rule}");
    }
}

fn print_summary(result: &PipelineResult) {
    let s = &result.summary;
    let m = &result.metadata;
    println!();
    println!("=== Aggregation Result: {} ===", result.label);
    println!("Method:         {}", result.config.method);
    if result.config.method.uses_threshold() {
        println!("Threshold:      {}", result.config.threshold);
    }
    println!("Missing:        {}", result.config.missing);
    println!("Run id:         {}", result.run_id);
    println!("Timestamps:     {}", s.timestamps);
    if m.reindexed {
        println!("                (inputs reindexed onto a union index)");
    }
    println!();
    println!("--- Strategies ---");
    for name in &m.strategies {
        match m.weight_of(name) {
            Some(w) => println!("  {name:<28} {w:.3}"),
            None => println!("  {name}"),
        }
    }
    for name in &m.skipped {
        println!("  {name:<28} skipped (no usable column)");
    }
    println!();
    println!("--- Decisions ---");
    println!("Buy:            {} ({:.1}%)", s.buy, s.buy_ratio() * 100.0);
    let zero_label = if result.config.method.uses_threshold() {
        "No buy:"
    } else {
        "Sell:"
    };
    println!("{zero_label:<16}{}", s.sell);
    if s.no_consensus > 0 {
        println!("No consensus:   {}", s.no_consensus);
    }
    if s.undefined_signal > 0 {
        println!("Undefined:      {}", s.undefined_signal);
    }
    match s.latest {
        Some((ts, decision)) => {
            println!("Latest:         {ts} {}", decision.label(result.config.method))
        }
        None => println!("Latest:         (no data)"),
    }
    println!();
}
