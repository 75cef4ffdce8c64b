// src/pipeline/queue.rs

//! Queue stages: Score → Merge → Flag → Select.
//!
//! [`QueueProcessor`] holds the pure stage functions with their configuration
//! bound. The `run_*` functions wrap single stages around storage.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{CandidateItem, Config, RawItem, Seed};
use crate::pipeline::flag::flag_batch;
use crate::pipeline::merge::{MergeOutcome, MergeReport, merge_batches};
use crate::pipeline::select::{SelectionOptions, SelectionReport, select_winners};
use crate::services::Scorer;
use crate::storage::QueueStorage;
use crate::utils::{self, Canonicalizer};

/// Result of running every stage over a queue.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub items: Vec<CandidateItem>,
    pub merge: MergeReport,
    pub selection: SelectionReport,
}

/// Stage functions bound to one configuration.
#[derive(Debug)]
pub struct QueueProcessor<'a> {
    config: &'a Config,
    categories: Vec<String>,
    scorer: Scorer,
    canonicalizer: Canonicalizer,
}

impl<'a> QueueProcessor<'a> {
    pub fn new(config: &'a Config, seed: &Seed) -> Result<Self> {
        config.flagging.validate()?;
        Ok(Self {
            config,
            categories: seed.category_names(),
            scorer: Scorer::new(config, seed)?,
            canonicalizer: Canonicalizer::new(&config.canonical.tracking_params),
        })
    }

    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    /// Selection options from `[selection]`.
    pub fn default_options(&self) -> SelectionOptions {
        SelectionOptions::from_config(&self.config.selection, &self.canonicalizer)
    }

    pub fn score(&self, raws: &[RawItem], now: DateTime<Utc>) -> Vec<CandidateItem> {
        self.scorer.score_all(raws, now)
    }

    /// Merge batches given oldest first.
    pub fn merge(&self, batches: Vec<Vec<CandidateItem>>) -> MergeOutcome {
        merge_batches(batches, &self.canonicalizer)
    }

    pub fn flag(&self, items: Vec<CandidateItem>) -> Vec<CandidateItem> {
        flag_batch(items, &self.config.flagging)
    }

    pub fn select(
        &self,
        items: Vec<CandidateItem>,
        options: &SelectionOptions,
    ) -> (Vec<CandidateItem>, SelectionReport) {
        select_winners(items, &self.categories, &self.canonicalizer, options)
    }

    /// Score raw batches and run them through the whole queue.
    ///
    /// `existing` is the stored queue and counts as the oldest batch.
    pub fn process(
        &self,
        existing: Vec<CandidateItem>,
        raw_batches: &[Vec<RawItem>],
        now: DateTime<Utc>,
        options: &SelectionOptions,
    ) -> ProcessOutcome {
        let mut batches = Vec::with_capacity(raw_batches.len() + 1);
        batches.push(existing);
        batches.extend(raw_batches.iter().map(|raws| self.score(raws, now)));

        let merged = self.merge(batches);
        let flagged = self.flag(merged.items);
        let (items, selection) = self.select(flagged, options);

        ProcessOutcome {
            items,
            merge: merged.report,
            selection,
        }
    }
}

/// Fold every pending batch into the stored queue.
pub async fn run_merge(
    config: &Config,
    seed: &Seed,
    storage: &dyn QueueStorage,
    now: DateTime<Utc>,
    force: bool,
) -> Result<MergeReport> {
    utils::log::header("Merge - Deduplicating batches into the queue");

    let processor = QueueProcessor::new(config, seed)?;
    let queue = storage.load_queue().await?;
    let pending = storage.pending_batches().await?;
    utils::log::sub_item(&format!(
        "{} queued rows, {} pending batches",
        queue.len(),
        pending.len()
    ));

    let keys: Vec<String> = pending.iter().map(|b| b.key.clone()).collect();
    let mut batches = Vec::with_capacity(pending.len() + 1);
    batches.push(queue);
    batches.extend(pending.into_iter().map(|b| b.data.items));

    let outcome = processor.merge(batches);
    storage.write_queue(&outcome.items, now, force).await?;
    storage.archive_batches(&keys).await?;

    let report = outcome.report;
    utils::log::summary(
        "Merge",
        &[
            ("input rows", report.input_rows.to_string()),
            ("unique rows", report.unique_rows.to_string()),
            ("duplicates", report.duplicates.to_string()),
            ("replaced", report.replaced.to_string()),
        ],
    );
    Ok(report)
}

/// Recompute flags on the stored queue.
pub async fn run_flag(
    config: &Config,
    seed: &Seed,
    storage: &dyn QueueStorage,
    now: DateTime<Utc>,
) -> Result<usize> {
    utils::log::header("Flag - Computing quality flags");

    let processor = QueueProcessor::new(config, seed)?;
    let items = processor.flag(storage.load_queue().await?);

    let reputable = items.iter().filter(|i| i.rep_flag).count();
    let with_signal = items.iter().filter(|i| i.sig_flag).count();
    storage.write_queue(&items, now, false).await?;

    utils::log::summary(
        "Flag",
        &[
            ("rows", items.len().to_string()),
            ("reputable", reputable.to_string()),
            ("with signal", with_signal.to_string()),
        ],
    );
    Ok(items.len())
}

/// Extra selection knobs supplied per run.
#[derive(Debug, Clone, Default)]
pub struct SelectRequest {
    pub per_category: Option<usize>,
    pub only_categories: Option<Vec<String>>,
    pub reset_selected: bool,
    /// URLs added to the configured rejection allow-list for this run
    pub allow_rejected: Vec<String>,
}

impl SelectRequest {
    fn options(&self, processor: &QueueProcessor<'_>) -> Result<SelectionOptions> {
        let mut options = processor.default_options();
        match self.per_category {
            Some(0) => return Err(AppError::config("per-category quota must be > 0")),
            Some(n) => options.per_category = n,
            None => {}
        }
        options.only_categories = self.only_categories.clone();
        options.reset_selected = self.reset_selected;
        let canonicalizer = processor.canonicalizer();
        options.allow_rejected.extend(
            self.allow_rejected
                .iter()
                .map(|u| canonicalizer.canonicalize(u)),
        );
        Ok(options)
    }
}

/// Pick winners in the stored queue.
pub async fn run_select(
    config: &Config,
    seed: &Seed,
    storage: &dyn QueueStorage,
    request: &SelectRequest,
    now: DateTime<Utc>,
) -> Result<SelectionReport> {
    utils::log::header("Select - Picking winners per category");

    let processor = QueueProcessor::new(config, seed)?;
    let options = request.options(&processor)?;
    let (items, report) = processor.select(storage.load_queue().await?, &options);
    storage.write_queue(&items, now, false).await?;

    log_selection(&report);
    Ok(report)
}

pub(crate) fn log_selection(report: &SelectionReport) {
    let rows: Vec<(&str, String)> = report
        .categories
        .iter()
        .map(|c| {
            (
                c.category.as_str(),
                format!("{} of {} eligible", c.winners.len(), c.eligible),
            )
        })
        .collect();
    utils::log::summary("Selection", &rows);
    if report.unknown_category_rows > 0 {
        log::warn!(
            "{} rows carry a category that is not configured",
            report.unknown_category_rows
        );
    }
    if report.reset_rows > 0 {
        utils::log::sub_item(&format!("{} earlier winners reset", report.reset_rows));
    }
}
