// src/pipeline/export.rs

//! Selected-only views of the queue.
//!
//! - `selected.jsonl`: scrape queue, one line per winner, at most
//!   `max_per_category` lines per category, best score first
//! - `selected_<category>.json`: all winners of a category in ranking order
//! - `selected_summary.json`: winner counts per category
//! - `triage_<category>.json`: top `triage_top` rows of a category by score,
//!   whatever their status

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{CandidateItem, Config, ExportConfig, Seed};
use crate::pipeline::select::rank;
use crate::storage::QueueStorage;
use crate::utils::{self, Canonicalizer, safe_name};

const UNCATEGORIZED: &str = "uncategorized";

/// One line of the scrape queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeEntry {
    /// Stable id derived from the canonical URL
    pub id: String,
    pub url: String,
    pub title: String,
    pub category: String,
    pub source_domain: String,
    pub published_at: Option<DateTime<Utc>>,
    pub score: f64,
    pub quality4: u8,
}

/// Winner counts of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    /// Rows with status `selected`
    pub selected: usize,
    /// Of those, rows written to the scrape queue
    pub exported: usize,
}

/// A file to be written under `export/`.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Everything one export run writes.
#[derive(Debug, Clone, Default)]
pub struct ExportBundle {
    pub files: Vec<ExportFile>,
    pub summary: Vec<CategorySummary>,
}

impl ExportBundle {
    pub fn exported_rows(&self) -> usize {
        self.summary.iter().map(|s| s.exported).sum()
    }
}

/// Build the export files from a queue.
///
/// `categories` fixes the order of the summary; categories found only on rows
/// follow in name order.
pub fn build_export(
    items: &[CandidateItem],
    categories: &[String],
    config: &ExportConfig,
    canonicalizer: &Canonicalizer,
) -> Result<ExportBundle> {
    let keyed: Vec<(String, &CandidateItem)> = items
        .iter()
        .map(|i| (canonicalizer.canonicalize(&i.url), i))
        .collect();

    let mut winners: BTreeMap<&str, Vec<&(String, &CandidateItem)>> = BTreeMap::new();
    for entry in keyed.iter().filter(|(_, i)| i.is_selected()) {
        let category = entry.1.category.as_deref().unwrap_or(UNCATEGORIZED);
        winners.entry(category).or_default().push(entry);
    }

    let mut order: Vec<&str> = categories.iter().map(String::as_str).collect();
    order.extend(winners.keys().filter(|k| !categories.iter().any(|c| c == *k)));

    let mut bundle = ExportBundle::default();
    let mut jsonl = Vec::new();

    for category in order {
        let mut rows = winners.remove(category).unwrap_or_default();

        rows.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then_with(|| a.0.cmp(&b.0)));
        let exported = rows.len().min(config.max_per_category);
        for (key, item) in rows.iter().take(exported).map(|e| (&e.0, e.1)) {
            let entry = ScrapeEntry {
                id: CandidateItem::id_for(key),
                url: item.url.clone(),
                title: item.title.clone(),
                category: category.to_string(),
                source_domain: item.source_domain.clone(),
                published_at: item.published_at,
                score: item.score,
                quality4: item.quality4,
            };
            serde_json::to_writer(&mut jsonl, &entry)?;
            jsonl.push(b'\n');
        }

        if !rows.is_empty() {
            rows.sort_by(|a, b| rank(a.1, &a.0, b.1, &b.0));
            let ranked: Vec<&CandidateItem> = rows.iter().map(|e| e.1).collect();
            bundle.files.push(ExportFile {
                name: format!("selected_{}.json", safe_name(category)),
                bytes: serde_json::to_vec_pretty(&ranked)?,
            });
        }

        bundle.summary.push(CategorySummary {
            category: category.to_string(),
            selected: rows.len(),
            exported,
        });
    }

    bundle.files.push(ExportFile {
        name: "selected.jsonl".to_string(),
        bytes: jsonl,
    });
    bundle.files.push(ExportFile {
        name: "selected_summary.json".to_string(),
        bytes: serde_json::to_vec_pretty(&bundle.summary)?,
    });

    if config.triage_top > 0 {
        for category in categories {
            let mut rows: Vec<&(String, &CandidateItem)> = keyed
                .iter()
                .filter(|(_, i)| i.category.as_deref() == Some(category.as_str()))
                .collect();
            rows.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then_with(|| a.0.cmp(&b.0)));
            let top: Vec<&CandidateItem> = rows.iter().take(config.triage_top).map(|e| e.1).collect();
            bundle.files.push(ExportFile {
                name: format!("triage_{}.json", safe_name(category)),
                bytes: serde_json::to_vec_pretty(&top)?,
            });
        }
    }

    Ok(bundle)
}

/// Write the selected-only views of the stored queue.
pub async fn run_export(config: &Config, seed: &Seed, storage: &dyn QueueStorage) -> Result<ExportBundle> {
    utils::log::header("Export - Writing selected views");

    let items = storage.load_queue().await?;
    let canonicalizer = Canonicalizer::new(&config.canonical.tracking_params);
    let bundle = build_export(&items, &seed.category_names(), &config.export, &canonicalizer)?;

    for file in &bundle.files {
        let location = storage.write_export(&file.name, &file.bytes).await?;
        utils::log::sub_item(&format!("{} ({} bytes)", location, file.bytes.len()));
    }

    let rows: Vec<(&str, String)> = bundle
        .summary
        .iter()
        .map(|s| (s.category.as_str(), format!("{} selected, {} exported", s.selected, s.exported)))
        .collect();
    utils::log::summary("Export", &rows);
    utils::log::success(&format!("{} rows in the scrape queue", bundle.exported_rows()));

    Ok(bundle)
}
