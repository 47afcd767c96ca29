//! namebase - maintenance CLI for the sharded name store
//!
//! Subcommands cover the offline batch jobs: `consolidate` (dedup/merge and
//! origin classification), `enrich` (resumable oracle enrichment),
//! `analyze` (origin-group coverage), `add` (enrich and append new names),
//! and `status` (checkpoint inspection).

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use namebase_common::config as common_config;
use namebase_enrich::config as enrich_config;
use namebase_enrich::enrich::{
    EnrichmentOrchestrator, ErrorLog, OpenAiOracle, RunState, RunStatus,
};
use namebase_enrich::{pipeline, ChunkStore};

const CHECKPOINT_FILE: &str = "enrichment-progress.json";
const ERROR_LOG_FILE: &str = "enrichment-errors.json";

#[derive(Parser)]
#[command(
    name = "namebase",
    version,
    about = "Consolidation and enrichment tools for the sharded name store"
)]
struct Cli {
    /// Data directory holding names-index.json and the shard files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deduplicate, merge, and classify origins across all shards
    Consolidate,

    /// Run oracle enrichment for records missing meaning/origin data
    Enrich {
        /// Names per oracle call
        #[arg(long)]
        batch_size: Option<usize>,

        /// Concurrent in-flight oracle calls
        #[arg(long)]
        concurrency: Option<usize>,

        /// Wall-clock budget in hours; checkpoint and pause when exceeded
        #[arg(long)]
        max_hours: Option<f64>,

        /// Skip the higher-quality second pass for weak results
        #[arg(long)]
        no_quality_gate: bool,
    },

    /// Report origin-group coverage (read-only)
    Analyze,

    /// Enrich new names via the oracle and append them to a chunk
    Add {
        /// Comma-separated list of names
        names: String,

        /// Target chunk key from the index
        #[arg(long, default_value = "chunk1")]
        chunk: String,
    },

    /// Show checkpoint/progress state without running anything
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let toml_config = common_config::load_toml_config()?;
    let data_dir = common_config::resolve_data_dir(cli.data_dir.as_deref(), toml_config.as_ref());

    info!("namebase {}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", data_dir.display());

    match cli.command {
        Command::Consolidate => {
            let store = ChunkStore::open(&data_dir)?;
            let summary = pipeline::consolidate_store(&store)?;
            println!("{}", summary.render());
        }

        Command::Enrich {
            batch_size,
            concurrency,
            max_hours,
            no_quality_gate,
        } => {
            let store = ChunkStore::open(&data_dir)?;
            let api_key = enrich_config::resolve_oracle_api_key(toml_config.as_ref())?;
            let oracle = OpenAiOracle::new(api_key)
                .map_err(|e| anyhow!("failed to create oracle client: {}", e))?;
            let options = enrich_config::resolve_enrich_options(
                toml_config.as_ref(),
                batch_size,
                concurrency,
                max_hours,
                !no_quality_gate,
            );

            let checkpoint_path = data_dir.join(CHECKPOINT_FILE);
            let error_log = ErrorLog::new(data_dir.join(ERROR_LOG_FILE));
            let mut state = RunState::load(&checkpoint_path)?;

            let orchestrator = EnrichmentOrchestrator::new(oracle, options);
            let stats = orchestrator
                .enrich_store(&store, &mut state, &checkpoint_path, &error_log)
                .await?;

            println!("{}", stats.display_string());
            if state.status == RunStatus::Paused {
                println!(
                    "Run paused at batch {}; re-run `namebase enrich` to resume.",
                    state.last_batch_index
                );
            }
        }

        Command::Analyze => {
            let store = ChunkStore::open(&data_dir)?;
            let report = pipeline::analyze_store(&store)?;
            println!("{}", report.render());
        }

        Command::Add { names, chunk } => {
            let store = ChunkStore::open(&data_dir)?;
            let names: Vec<String> = names
                .split(',')
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect();
            if names.is_empty() {
                return Err(anyhow!("no valid names given"));
            }

            let api_key = enrich_config::resolve_oracle_api_key(toml_config.as_ref())?;
            let oracle = OpenAiOracle::new(api_key)
                .map_err(|e| anyhow!("failed to create oracle client: {}", e))?;

            let stats = pipeline::add_names(&store, &oracle, &names, &chunk).await?;
            println!(
                "Added {} names to {} ({} duplicates skipped)",
                stats.added, chunk, stats.unchanged
            );
        }

        Command::Status => {
            let checkpoint_path = data_dir.join(CHECKPOINT_FILE);
            let state = RunState::load(&checkpoint_path)?;
            println!(
                "Status: {:?}\n  batches completed: {}\n  names processed:   {}\n  names errored:     {}\n  estimated cost:    ${:.2}",
                state.status,
                state.last_batch_index,
                state.total_processed,
                state.total_errors,
                state.estimated_cost
            );
            if let Some(chunk) = &state.current_chunk {
                println!("  current chunk:     {}", chunk);
            }
            if let Some(updated) = &state.last_update {
                println!("  last update:       {}", updated);
            }

            let error_log = ErrorLog::new(data_dir.join(ERROR_LOG_FILE));
            let failed = error_log.failed_names()?;
            if !failed.is_empty() {
                println!("  names pending retry: {}", failed.len());
            }
        }
    }

    Ok(())
}
