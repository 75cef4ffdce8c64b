// src/pipeline/pipeline.rs

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Config, Seed};
use crate::storage::QueueStorage;
use crate::utils;

use super::collect::run_collect;
use super::export::run_export;
use super::queue::{SelectRequest, run_flag, run_merge, run_select};

/// Options for a full pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Merge only what is already stored
    pub skip_collect: bool,
    pub skip_export: bool,
    /// Allow the merged queue to be smaller than the stored one
    pub force: bool,
    pub select: SelectRequest,
}

/// Run the full pipeline.
pub async fn run_pipeline(
    config: &Config,
    seed: &Seed,
    storage: &dyn QueueStorage,
    now: DateTime<Utc>,
    options: &PipelineOptions,
) -> Result<()> {
    utils::log::header("CTI link queue pipeline");

    let mut total_steps = 3;
    if !options.skip_collect {
        total_steps += 1;
    }
    if !options.skip_export {
        total_steps += 1;
    }
    let mut current_step = 1;

    if !options.skip_collect {
        utils::log::step(current_step, total_steps, "Collect - Fetching and scoring sources");
        run_collect(config, seed, storage, now).await?;
        current_step += 1;
    }

    utils::log::step(current_step, total_steps, "Merge - Deduplicating batches");
    run_merge(config, seed, storage, now, options.force).await?;
    current_step += 1;

    utils::log::step(current_step, total_steps, "Flag - Computing quality flags");
    run_flag(config, seed, storage, now).await?;
    current_step += 1;

    utils::log::step(current_step, total_steps, "Select - Picking winners");
    run_select(config, seed, storage, &options.select, now).await?;
    current_step += 1;

    if !options.skip_export {
        utils::log::step(current_step, total_steps, "Export - Writing selected views");
        run_export(config, seed, storage).await?;
    }

    utils::log::success("Pipeline complete");
    Ok(())
}
