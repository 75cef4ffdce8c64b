//! Per-category winner selection.
//!
//! Candidates of each category are ranked by, all descending:
//!
//! 1. `quality4`
//! 2. `quality2`
//! 3. `rep_flag`
//! 4. `sig_flag`
//! 5. `score`
//!
//! with the canonical URL (ascending) as the final tie-break, so the outcome
//! never depends on input order. The top `per_category` rows become
//! `Selected`; no other row changes status.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{CandidateItem, SelectionConfig, Status};
use crate::utils::Canonicalizer;

/// Knobs for one selection run.
#[derive(Debug, Clone)]
pub struct SelectionOptions {
    /// Winners per category
    pub per_category: usize,
    /// Canonical URLs of rejected rows that may still be selected
    pub allow_rejected: HashSet<String>,
    /// Restrict the run to these categories (all configured ones when `None`)
    pub only_categories: Option<Vec<String>>,
    /// Return earlier winners of the targeted categories to `Pending` first
    pub reset_selected: bool,
}

impl SelectionOptions {
    pub fn from_config(config: &SelectionConfig, canonicalizer: &Canonicalizer) -> Self {
        Self {
            per_category: config.per_category,
            allow_rejected: config
                .allow_rejected
                .iter()
                .map(|u| canonicalizer.canonicalize(u))
                .collect(),
            only_categories: None,
            reset_selected: false,
        }
    }
}

/// Winner counts for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySelection {
    pub category: String,
    /// Rows that competed
    pub eligible: usize,
    /// Display URLs of this run's winners, best first
    pub winners: Vec<String>,
}

/// Outcome of a selection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionReport {
    pub categories: Vec<CategorySelection>,
    /// Rows whose category is not configured; they never compete
    pub unknown_category_rows: usize,
    /// Previously selected rows returned to pending by `reset_selected`
    pub reset_rows: usize,
}

impl SelectionReport {
    pub fn total_selected(&self) -> usize {
        self.categories.iter().map(|c| c.winners.len()).sum()
    }

    /// Winner count per category name.
    pub fn counts(&self) -> BTreeMap<&str, usize> {
        self.categories
            .iter()
            .map(|c| (c.category.as_str(), c.winners.len()))
            .collect()
    }
}

/// Ordering of two candidates, best first.
pub fn rank(a: &CandidateItem, a_key: &str, b: &CandidateItem, b_key: &str) -> Ordering {
    b.quality4
        .cmp(&a.quality4)
        .then(b.quality2.cmp(&a.quality2))
        .then(b.rep_flag.cmp(&a.rep_flag))
        .then(b.sig_flag.cmp(&a.sig_flag))
        .then(b.score.total_cmp(&a.score))
        .then_with(|| a_key.cmp(b_key))
}

/// Picks winners per category.
#[derive(Debug)]
pub struct Selector<'a> {
    categories: &'a [String],
    canonicalizer: &'a Canonicalizer,
}

impl<'a> Selector<'a> {
    /// `categories` are the configured category names in declaration order.
    pub fn new(categories: &'a [String], canonicalizer: &'a Canonicalizer) -> Self {
        Self {
            categories,
            canonicalizer,
        }
    }

    pub fn select(
        &self,
        mut items: Vec<CandidateItem>,
        options: &SelectionOptions,
    ) -> (Vec<CandidateItem>, SelectionReport) {
        let mut report = SelectionReport::default();
        let targets = self.targets(options);

        let known: HashSet<&str> = self.categories.iter().map(String::as_str).collect();
        for item in &mut items {
            let unknown = match item.category.as_deref() {
                Some(category) if !known.contains(category) => category.to_string(),
                _ => continue,
            };
            report.unknown_category_rows += 1;
            item.note(format!("unknown category '{unknown}', not selectable"));
        }

        if options.reset_selected {
            for item in &mut items {
                let targeted = item
                    .category
                    .as_deref()
                    .is_some_and(|c| targets.iter().any(|t| t == c));
                if targeted && item.status == Status::Selected {
                    item.status = Status::Pending;
                    report.reset_rows += 1;
                }
            }
        }

        let keys: Vec<String> = items
            .iter()
            .map(|i| self.canonicalizer.canonicalize(&i.url))
            .collect();

        for category in targets {
            let mut pool: Vec<usize> = items
                .iter()
                .enumerate()
                .filter(|(i, item)| {
                    item.category.as_deref() == Some(category.as_str())
                        && (!item.is_rejected() || options.allow_rejected.contains(&keys[*i]))
                })
                .map(|(i, _)| i)
                .collect();

            let eligible = pool.len();
            pool.sort_by(|&a, &b| rank(&items[a], &keys[a], &items[b], &keys[b]));
            pool.truncate(options.per_category);

            let winners = pool
                .iter()
                .map(|&i| {
                    items[i].status = Status::Selected;
                    items[i].url.clone()
                })
                .collect::<Vec<_>>();

            report.categories.push(CategorySelection {
                category,
                eligible,
                winners,
            });
        }

        (items, report)
    }

    /// Categories this run selects for, in declaration order.
    fn targets(&self, options: &SelectionOptions) -> Vec<String> {
        match &options.only_categories {
            None => self.categories.to_vec(),
            Some(wanted) => {
                for name in wanted {
                    if !self.categories.contains(name) {
                        log::warn!("Category '{name}' is not configured, skipping");
                    }
                }
                self.categories
                    .iter()
                    .filter(|c| wanted.contains(c))
                    .cloned()
                    .collect()
            }
        }
    }
}

/// Convenience function to run a selection.
pub fn select_winners(
    items: Vec<CandidateItem>,
    categories: &[String],
    canonicalizer: &Canonicalizer,
    options: &SelectionOptions,
) -> (Vec<CandidateItem>, SelectionReport) {
    Selector::new(categories, canonicalizer).select(items, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SSH: &str = "SSH";
    const NFS: &str = "NFS";

    fn categories() -> Vec<String> {
        vec![SSH.to_string(), NFS.to_string()]
    }

    fn canon() -> Canonicalizer {
        Canonicalizer::new(&["utm_*".to_string()])
    }

    fn options(per_category: usize) -> SelectionOptions {
        SelectionOptions {
            per_category,
            allow_rejected: HashSet::new(),
            only_categories: None,
            reset_selected: false,
        }
    }

    fn item(url: &str, category: &str, quality4: u8, score: f64) -> CandidateItem {
        let mut item = CandidateItem::new(url);
        item.category = Some(category.to_string());
        item.quality4 = quality4;
        item.score = score;
        item
    }

    fn selected_urls(items: &[CandidateItem]) -> Vec<&str> {
        let mut urls: Vec<&str> = items
            .iter()
            .filter(|i| i.is_selected())
            .map(|i| i.url.as_str())
            .collect();
        urls.sort();
        urls
    }

    #[test]
    fn test_quota_and_ranking() {
        let items = vec![
            item("https://a.example/low", SSH, 1, 0.9),
            item("https://a.example/high", SSH, 3, 0.2),
            item("https://a.example/mid", SSH, 2, 0.5),
        ];
        let (items, report) = select_winners(items, &categories(), &canon(), &options(2));
        assert_eq!(
            selected_urls(&items),
            vec!["https://a.example/high", "https://a.example/mid"]
        );
        assert_eq!(report.categories[0].winners[0], "https://a.example/high");
        assert_eq!(report.categories[0].eligible, 3);
        assert_eq!(report.total_selected(), 2);
    }

    #[test]
    fn test_key_order_dominates_score() {
        let mut rep = item("https://a.example/rep", SSH, 2, 0.1);
        rep.quality2 = 1;
        rep.rep_flag = true;
        let mut sig = item("https://a.example/sig", SSH, 2, 0.9);
        sig.quality2 = 1;
        sig.sig_flag = true;

        let (items, _) = select_winners(vec![sig, rep], &categories(), &canon(), &options(1));
        assert_eq!(selected_urls(&items), vec!["https://a.example/rep"]);
    }

    #[test]
    fn test_winners_are_a_ranking_prefix_for_every_quota() {
        let mut pool = vec![
            item("https://a.example/q4", SSH, 4, 0.30),
            item("https://a.example/q3-high", SSH, 3, 0.90),
            item("https://a.example/q3-low", SSH, 3, 0.10),
            item("https://a.example/q2-rep", SSH, 2, 0.20),
            item("https://a.example/q2-sig", SSH, 2, 0.95),
            item("https://a.example/q1", SSH, 1, 0.99),
            item("https://b.example/tie", SSH, 0, 0.50),
            item("https://a.example/tie", SSH, 0, 0.50),
            item("https://a.example/nfs", NFS, 4, 1.00),
        ];
        pool[3].quality2 = 1;
        pool[3].rep_flag = true;
        pool[4].quality2 = 1;
        pool[4].sig_flag = true;
        let mut rejected = item("https://a.example/rejected", SSH, 4, 1.0);
        rejected.status = Status::Rejected;
        pool.push(rejected);

        let ranking = vec![
            "https://a.example/q4",
            "https://a.example/q3-high",
            "https://a.example/q3-low",
            "https://a.example/q2-rep",
            "https://a.example/q2-sig",
            "https://a.example/q1",
            "https://a.example/tie",
            "https://b.example/tie",
        ];

        for quota in 1..=pool.len() {
            let (items, report) = select_winners(pool.clone(), &categories(), &canon(), &options(quota));
            let ssh = &report.categories[0];
            assert_eq!(ssh.eligible, ranking.len());
            assert_eq!(ssh.winners, ranking[..quota.min(ranking.len())], "quota {quota}");
            assert_eq!(items[9].status, Status::Rejected);
        }
    }

    #[test]
    fn test_full_tie_breaks_on_canonical_url() {
        let items = vec![
            item("https://b.example/x", SSH, 2, 0.5),
            item("https://a.example/x", SSH, 2, 0.5),
        ];
        let (forward, _) = select_winners(items.clone(), &categories(), &canon(), &options(1));
        let reversed: Vec<_> = items.into_iter().rev().collect();
        let (backward, _) = select_winners(reversed, &categories(), &canon(), &options(1));
        assert_eq!(selected_urls(&forward), vec!["https://a.example/x"]);
        assert_eq!(selected_urls(&forward), selected_urls(&backward));
    }

    #[test]
    fn test_rejected_never_selected() {
        let mut rejected = item("https://a.example/best", SSH, 4, 1.0);
        rejected.status = Status::Rejected;
        let other = item("https://a.example/other", SSH, 0, 0.1);

        let (items, report) = select_winners(vec![rejected, other], &categories(), &canon(), &options(5));
        assert_eq!(selected_urls(&items), vec!["https://a.example/other"]);
        assert_eq!(items[0].status, Status::Rejected);
        assert_eq!(report.categories[0].eligible, 1);
    }

    #[test]
    fn test_allow_list_overrides_rejection() {
        let mut rejected = item("https://a.example/best?utm_source=x", SSH, 4, 1.0);
        rejected.status = Status::Rejected;
        let mut opts = options(1);
        opts.allow_rejected.insert(canon().canonicalize("https://a.example/best"));

        let (items, _) = select_winners(vec![rejected], &categories(), &canon(), &opts);
        assert_eq!(items[0].status, Status::Selected);
    }

    #[test]
    fn test_empty_pool_and_oversized_quota() {
        let (items, report) = select_winners(
            vec![item("https://a.example/1", SSH, 1, 0.1)],
            &categories(),
            &canon(),
            &options(1000),
        );
        assert_eq!(selected_urls(&items).len(), 1);
        assert_eq!(report.counts()[NFS], 0);
    }

    #[test]
    fn test_unknown_and_uncategorized_rows_stay_pending() {
        let unknown = item("https://a.example/u", "Quantum", 4, 1.0);
        let mut none = item("https://a.example/n", SSH, 4, 1.0);
        none.category = None;

        let (items, report) = select_winners(vec![unknown, none], &categories(), &canon(), &options(5));
        assert!(items.iter().all(|i| i.status == Status::Pending));
        assert_eq!(report.unknown_category_rows, 1);
        assert_eq!(items[0].notes.len(), 1);
    }

    #[test]
    fn test_selection_is_stable_across_runs() {
        let items = vec![
            item("https://a.example/1", SSH, 2, 0.4),
            item("https://a.example/2", SSH, 3, 0.3),
            item("https://a.example/3", NFS, 1, 0.9),
        ];
        let (once, _) = select_winners(items, &categories(), &canon(), &options(1));
        let (twice, report) = select_winners(once.clone(), &categories(), &canon(), &options(1));
        assert_eq!(once, twice);
        assert_eq!(report.total_selected(), 2);
    }

    #[test]
    fn test_reset_selected_only_touches_targets() {
        let mut old_ssh = item("https://a.example/old", SSH, 0, 0.1);
        old_ssh.status = Status::Selected;
        let mut old_nfs = item("https://a.example/nfs", NFS, 0, 0.1);
        old_nfs.status = Status::Selected;
        let mut rejected = item("https://a.example/rej", SSH, 0, 0.1);
        rejected.status = Status::Rejected;
        let fresh = item("https://a.example/new", SSH, 3, 0.8);

        let mut opts = options(1);
        opts.reset_selected = true;
        opts.only_categories = Some(vec![SSH.to_string(), "Bogus".to_string()]);

        let (items, report) =
            select_winners(vec![old_ssh, old_nfs, rejected, fresh], &categories(), &canon(), &opts);
        assert_eq!(items[0].status, Status::Pending);
        assert_eq!(items[1].status, Status::Selected);
        assert_eq!(items[2].status, Status::Rejected);
        assert_eq!(items[3].status, Status::Selected);
        assert_eq!(report.reset_rows, 1);
        assert_eq!(report.categories.len(), 1);
    }

    #[test]
    fn test_without_reset_earlier_winners_keep_status() {
        let mut old = item("https://a.example/old", SSH, 0, 0.1);
        old.status = Status::Selected;
        let fresh = item("https://a.example/new", SSH, 3, 0.8);

        let (items, report) = select_winners(vec![old, fresh], &categories(), &canon(), &options(1));
        assert!(items.iter().all(|i| i.is_selected()));
        assert_eq!(report.categories[0].winners, vec!["https://a.example/new"]);
    }
}
