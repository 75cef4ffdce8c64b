// src/services/scorer.rs

//! Priority scoring for raw link observations.
//!
//! The score is a weighted sum of four normalized components:
//!
//! | Component | Value |
//! |---|---|
//! | domain   | registry weight of the source domain |
//! | recency  | `2^(-age_days / half_life_days)`, 1.0 for today |
//! | category | `min(category_hits / category_divisor, 1)` |
//! | signal   | `min(signal_score / signal_divisor, 1)` |
//!
//! With the default weights (0.35 / 0.30 / 0.25 / 0.10) the score stays in
//! `[0, 1]`.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CandidateItem, Config, RawItem, ScoringConfig, Seed};
use crate::services::{CategoryMatcher, SignalDetector, SourceRegistry};
use crate::utils::date::parse_published;
use crate::utils::get_domain;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Turns raw observations into scored candidates.
///
/// Scoring is pure: the run time is passed in, so the same item and the same
/// `now` always give a bit-identical record.
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
    registry: SourceRegistry,
    matcher: CategoryMatcher,
    signals: SignalDetector,
}

impl Scorer {
    /// Build a scorer; rejects scoring settings that could yield NaN or
    /// out-of-range scores.
    pub fn new(config: &Config, seed: &Seed) -> Result<Self> {
        config.scoring.validate()?;
        Ok(Self {
            registry: SourceRegistry::new(&seed.sources, config.scoring.default_domain_weight),
            matcher: CategoryMatcher::new(&seed.categories),
            signals: SignalDetector::new(&config.scoring.ioc_tokens)?,
            config: config.scoring.clone(),
        })
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Score a single item as of `now`.
    pub fn score(&self, raw: &RawItem, now: DateTime<Utc>) -> CandidateItem {
        let mut item = CandidateItem::new(raw.url.trim());
        item.title = raw.title.clone();
        item.summary = raw.summary.clone();
        item.source_type = raw.source_type;
        item.added_on = Some(now);

        let raw_date = raw.published.as_deref().map(str::trim).unwrap_or("");
        item.published_at = parse_published(raw_date);
        if item.published_at.is_none() {
            if raw_date.is_empty() {
                item.note("missing publish date");
            } else {
                item.note(format!("unparseable publish date '{raw_date}'"));
            }
        }
        item.recency_score = self.recency(item.published_at, now);

        let domain = raw
            .source_domain
            .as_deref()
            .map(|d| d.trim().trim_end_matches('.').to_lowercase())
            .filter(|d| !d.is_empty())
            .or_else(|| get_domain(&raw.url))
            .unwrap_or_default();
        item.domain_weight = self.registry.weight(&domain);
        if !self.registry.contains(&domain) {
            item.note(format!("unknown source domain '{domain}'"));
        }
        item.source_domain = domain;

        match self.matcher.best_match(&raw.title, &raw.summary) {
            Some(m) => {
                item.category = Some(m.category);
                item.category_hits = m.hits;
            }
            None => item.note("no category keyword match"),
        }

        let text = format!("{} {}", raw.title, raw.summary);
        item.signal_score = self.signals.count(&text);

        item.score = self.combine(
            item.domain_weight,
            item.recency_score,
            item.category_hits,
            item.signal_score,
        );
        item.reason = format!(
            "dom_w={}, rec={:.2}, cat_hits={}, sig={}",
            item.domain_weight, item.recency_score, item.category_hits, item.signal_score
        );
        item
    }

    /// Score a batch, keeping input order.
    pub fn score_all(&self, raws: &[RawItem], now: DateTime<Utc>) -> Vec<CandidateItem> {
        raws.iter().map(|raw| self.score(raw, now)).collect()
    }

    /// Exponential decay on age; future dates count as age zero.
    pub fn recency(&self, published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(published) = published else {
            return self.config.undated_recency;
        };
        let age_days = ((now - published).num_seconds() as f64 / SECONDS_PER_DAY).max(0.0);
        (-age_days / self.config.half_life_days).exp2().clamp(0.0, 1.0)
    }

    /// Weighted sum of the normalized components.
    pub fn combine(&self, domain_weight: f64, recency: f64, hits: u32, signal: u32) -> f64 {
        let c = &self.config;
        let category = (f64::from(hits) / c.category_divisor).min(1.0);
        let signal = (f64::from(signal) / c.signal_divisor).min(1.0);
        c.weight_domain * domain_weight
            + c.weight_recency * recency
            + c.weight_category * category
            + c.weight_signal * signal
    }
}
