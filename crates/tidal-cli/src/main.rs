//! Tidal CLI
//!
//! Loads a JSON snapshot of series data (pages, buffered writes, update and
//! delete intervals) together with a group-by plan, runs the plan and prints
//! one line per window.
//!
//! ## Usage
//!
//! ```bash
//! # Run the plan embedded in a snapshot (uses tidal.yml if present)
//! tidal query snapshot.json
//!
//! # Emit rows as JSON lines, custom config
//! tidal --config /etc/tidal.yml query snapshot.json --json
//!
//! # Write the default configuration
//! tidal generate-config
//! ```

mod config;
mod snapshot;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::CliConfig;
use snapshot::Snapshot;
use std::path::PathBuf;
use std::time::Instant;
use tidal_core::Value;
use tidal_query::{GroupByEngine, Row};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tidal")]
#[command(author, version, about = "Run group-by queries over a tidal series snapshot")]
struct Cli {
    /// Path to tidal.yml config file (default: ./tidal.yml)
    #[arg(short, long, global = true, default_value = "tidal.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the group-by plan of a snapshot
    Query {
        /// Path to the JSON snapshot
        snapshot: PathBuf,

        /// Print rows as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Write the default configuration and exit
    GenerateConfig {
        /// Output path
        #[arg(default_value = "tidal.yml")]
        path: PathBuf,
    },
}

fn init_logging(config: &CliConfig) {
    // RUST_LOG takes precedence over the configured level
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level().as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.logging.show_target)
        .with_thread_ids(config.logging.show_thread_ids)
        .with_file(config.logging.show_location)
        .with_line_number(config.logging.show_location)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::GenerateConfig { path } => {
            CliConfig::write_default(&path)?;
            println!("Generated default configuration: {}", path.display());
            Ok(())
        }
        Commands::Query { snapshot, json } => {
            let config = CliConfig::load_or_default(&cli.config);
            init_logging(&config);
            run_query(&config, snapshot, json)
        }
    }
}

fn run_query(config: &CliConfig, snapshot_path: PathBuf, json: bool) -> Result<()> {
    let start = Instant::now();

    let snapshot = Snapshot::from_file(&snapshot_path)?;
    let store = snapshot.build_store()?;
    let plan = snapshot.build_plan()?;
    info!(
        "Loaded {} series and {} aggregations from {}",
        snapshot.series.len(),
        plan.aggregations.len(),
        snapshot_path.display()
    );

    let columns: Vec<String> = plan
        .aggregations
        .iter()
        .map(|r| format!("{}({})", r.function, r.path))
        .collect();
    let engine = GroupByEngine::new(plan, &store, &config.query.group_by)?;

    if !json {
        println!("window\t{}", columns.join("\t"));
    }
    let mut rows = 0usize;
    for row in engine {
        let row = row?;
        if json {
            println!("{}", serde_json::to_string(&row)?);
        } else {
            println!("{}", format_row(&row));
        }
        rows += 1;
    }

    info!("{} rows in {:.2?}", rows, start.elapsed());
    Ok(())
}

fn format_row(row: &Row) -> String {
    let fields: Vec<String> = row
        .fields
        .iter()
        .map(|f| f.as_ref().map(Value::to_string).unwrap_or_else(|| "null".to_string()))
        .collect();
    format!("[{}, {})\t{}", row.start, row.end, fields.join("\t"))
}
