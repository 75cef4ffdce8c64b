// src/pipeline/collect.rs

//! Collection and scoring runs that produce new batches.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Config, RawItem, Seed};
use crate::services::{FeedCollector, Scorer};
use crate::storage::QueueStorage;
use crate::utils;

/// Result of a collect or score run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Storage key of the written batch, if anything was written
    pub batch_key: Option<String>,
    pub scored: usize,
    pub uncategorized: usize,
    pub source_failures: usize,
}

/// Fetch every registry source, score the entries and store them as a batch.
pub async fn run_collect(
    config: &Config,
    seed: &Seed,
    storage: &dyn QueueStorage,
    now: DateTime<Utc>,
) -> Result<BatchReport> {
    utils::log::header("Collect - Fetching feeds and index pages");

    let scorer = Scorer::new(config, seed)?;
    let collector = FeedCollector::new(&config.crawler)?;

    let source_count: usize = seed.sources.iter().map(|s| s.rss.len() + s.indexes.len()).sum();
    utils::log::sub_item(&format!(
        "{} registry domains, {} feeds and index pages",
        scorer.registry().len(),
        source_count
    ));

    let outcome = collector.collect(&seed.sources).await;
    utils::log::sub_item(&format!(
        "{} entries collected ({} duplicate links dropped, {}/{} sources failed)",
        outcome.items.len(),
        outcome.duplicates,
        outcome.source_failures,
        outcome.source_total
    ));

    let mut report = score_and_store(&scorer, storage, &outcome.items, now).await?;
    report.source_failures = outcome.source_failures;
    Ok(report)
}

/// Score externally supplied raw items (e.g. a manual link list) into a batch.
pub async fn run_score(
    config: &Config,
    seed: &Seed,
    storage: &dyn QueueStorage,
    raws: &[RawItem],
    now: DateTime<Utc>,
) -> Result<BatchReport> {
    utils::log::header("Score - Scoring supplied links");
    let scorer = Scorer::new(config, seed)?;
    score_and_store(&scorer, storage, raws, now).await
}

async fn score_and_store(
    scorer: &Scorer,
    storage: &dyn QueueStorage,
    raws: &[RawItem],
    now: DateTime<Utc>,
) -> Result<BatchReport> {
    let mut items = scorer.score_all(raws, now);
    crate::pipeline::merge::sort_by_score(&mut items);

    let uncategorized = items.iter().filter(|i| i.category.is_none()).count();
    let batch_key = if items.is_empty() {
        log::warn!("Nothing to score, no batch written");
        None
    } else {
        Some(storage.write_batch(&items, now).await?)
    };

    utils::log::summary(
        "Scored batch",
        &[
            ("rows", items.len().to_string()),
            ("uncategorized", uncategorized.to_string()),
            ("batch", batch_key.clone().unwrap_or_else(|| "-".to_string())),
        ],
    );

    Ok(BatchReport {
        batch_key,
        scored: items.len(),
        uncategorized,
        source_failures: 0,
    })
}

/// Raw items read from a file.
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    pub items: Vec<RawItem>,
    /// Records that could not be read and were left out
    pub skipped: usize,
}

/// Read raw items from a JSON array or a JSON-lines file.
///
/// A record that does not deserialize is logged and skipped; only an
/// unreadable file or a malformed top-level array is an error.
pub async fn load_raw_items(path: &Path) -> Result<RawInput> {
    let text = tokio::fs::read_to_string(path).await?;
    let input = parse_raw_items(&text)
        .map_err(|e| AppError::validation(format!("{}: {}", path.display(), e)))?;
    if input.skipped > 0 {
        log::warn!("{}: skipped {} unreadable records", path.display(), input.skipped);
    }
    Ok(input)
}

fn parse_raw_items(text: &str) -> Result<RawInput> {
    let mut input = RawInput::default();

    if text.trim_start().starts_with('[') {
        let values: Vec<serde_json::Value> = serde_json::from_str(text)?;
        for (index, value) in values.into_iter().enumerate() {
            match serde_json::from_value(value) {
                Ok(item) => input.items.push(item),
                Err(e) => {
                    log::warn!("Skipping record {}: {}", index + 1, e);
                    input.skipped += 1;
                }
            }
        }
        return Ok(input);
    }

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(item) => input.items.push(item),
            Err(e) => {
                log::warn!("Skipping line {}: {}", index + 1, e);
                input.skipped += 1;
            }
        }
    }
    Ok(input)
}
