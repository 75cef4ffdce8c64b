//! cti-queue CLI
//!
//! Local execution entry point for every pipeline stage.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use cti_queue::{
    config::load_all,
    error::Result,
    pipeline::{self, PipelineOptions, SelectRequest},
    storage::{LocalStorage, QueueStorage},
};

/// cti-queue - threat-intel link queue builder
#[derive(Parser, Debug)]
#[command(
    name = "cti-queue",
    version,
    about = "Collect, score, deduplicate and select threat-intel article links"
)]
struct Cli {
    /// Path to storage directory containing config files and the queue
    #[arg(short, long, default_value = "data")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Run time used for recency scoring (RFC 3339, defaults to now)
    #[arg(long, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch registry feeds and index pages into a scored batch
    Collect,

    /// Score links from a JSON or JSON-lines file into a batch
    Score {
        /// File of raw items (`url`, `title`, `summary`, `published`, ...)
        input: PathBuf,
    },

    /// Merge pending batches into the queue
    Merge {
        /// Write the queue even if it would lose rows
        #[arg(long)]
        force: bool,
    },

    /// Recompute quality flags on the queue
    Flag,

    /// Select winners per category
    Select(SelectArgs),

    /// Write the selected-only views under export/
    Export,

    /// Run full pipeline: Collect → Merge → Flag → Select → Export
    Pipeline {
        /// Skip fetching, process already stored batches
        #[arg(long)]
        skip_collect: bool,

        /// Skip writing export files
        #[arg(long)]
        skip_export: bool,

        /// Write the queue even if it would lose rows
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        select: SelectArgs,
    },

    /// Validate configuration files
    Validate,

    /// Show queue and batch info
    Info,
}

#[derive(Args, Debug, Clone)]
struct SelectArgs {
    /// Winners per category (overrides config)
    #[arg(long)]
    per_category: Option<usize>,

    /// Only select for these categories (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Return earlier winners to pending before selecting
    #[arg(long)]
    reset_selected: bool,

    /// Allow a rejected URL to be selected (repeatable)
    #[arg(long)]
    allow_rejected: Vec<String>,
}

impl From<SelectArgs> for SelectRequest {
    fn from(args: SelectArgs) -> Self {
        Self {
            per_category: args.per_category,
            only_categories: (!args.categories.is_empty()).then_some(args.categories),
            reset_selected: args.reset_selected,
            allow_rejected: args.allow_rejected,
        }
    }
}

fn parse_now(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let now = cli.now.unwrap_or_else(Utc::now);
    let storage = LocalStorage::new(&cli.storage_dir);

    if let Command::Validate = cli.command {
        pipeline::run_validate(&cli.storage_dir)?;
        log::info!("All validations passed!");
        return Ok(());
    }

    let (config, seed) = load_all(&cli.storage_dir)?;
    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    match cli.command {
        Command::Collect => {
            let report = pipeline::run_collect(&config, &seed, &storage, now).await?;
            if report.source_failures > 0 {
                log::warn!("{} sources could not be collected", report.source_failures);
            }
        }

        Command::Score { input } => {
            let raws = pipeline::load_raw_items(&input).await?;
            log::info!(
                "Loaded {} raw items from {} ({} skipped)",
                raws.items.len(),
                input.display(),
                raws.skipped
            );
            pipeline::run_score(&config, &seed, &storage, &raws.items, now).await?;
        }

        Command::Merge { force } => {
            pipeline::run_merge(&config, &seed, &storage, now, force).await?;
        }

        Command::Flag => {
            pipeline::run_flag(&config, &seed, &storage, now).await?;
        }

        Command::Select(args) => {
            pipeline::run_select(&config, &seed, &storage, &args.into(), now).await?;
        }

        Command::Export => {
            pipeline::run_export(&config, &seed, &storage).await?;
        }

        Command::Pipeline {
            skip_collect,
            skip_export,
            force,
            select,
        } => {
            let options = PipelineOptions {
                skip_collect,
                skip_export,
                force,
                select: select.into(),
            };
            pipeline::run_pipeline(&config, &seed, &storage, now, &options).await?;
        }

        Command::Info => {
            log::info!("Storage directory: {}", storage.root().display());

            let queue = storage.load_queue().await?;
            log::info!("Queue rows: {}", queue.len());

            let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
            let mut by_category: BTreeMap<&str, usize> = BTreeMap::new();
            for item in &queue {
                *by_status.entry(item.status.to_string()).or_default() += 1;
                let category = item.category.as_deref().unwrap_or("(uncategorized)");
                *by_category.entry(category).or_default() += 1;
            }
            for (status, count) in &by_status {
                log::info!("  {status}: {count}");
            }
            for (category, count) in &by_category {
                log::info!("  {category}: {count}");
            }

            let pending = storage.pending_batches().await?;
            log::info!("Pending batches: {}", pending.len());
            for batch in &pending {
                log::info!("  {} ({} rows)", batch.key, batch.data.count);
            }
        }

        Command::Validate => unreachable!("handled above"),
    }

    log::info!("Done!");

    Ok(())
}
