//! Dedupe and merge of scored candidate batches.
//!
//! Batches are unioned by canonical URL. When two rows share a canonical URL
//! the survivor is chosen by:
//!
//! 1. higher `score`
//! 2. a triaged status (`Selected`/`Rejected`) over `Pending`
//! 3. the row from the later batch (or later in the same batch)
//!
//! Rows are never dropped for any other reason.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{CandidateItem, Status};
use crate::utils::Canonicalizer;

/// Counts describing one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Rows across all input batches
    pub input_rows: usize,
    /// Rows in the merged queue
    pub unique_rows: usize,
    /// Rows that collapsed into an existing canonical URL
    pub duplicates: usize,
    /// Duplicates that displaced the previously kept row
    pub replaced: usize,
}

/// Merged queue plus its report.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// One row per canonical URL, in canonical-URL order
    pub items: Vec<CandidateItem>,
    pub report: MergeReport,
}

impl MergeOutcome {
    pub fn has_duplicates(&self) -> bool {
        self.report.duplicates > 0
    }
}

/// Whether `incoming` should displace `kept`.
///
/// `incoming` always comes later in input order, so a full tie goes to it.
fn supersedes(incoming: &CandidateItem, kept: &CandidateItem) -> bool {
    match incoming.score.total_cmp(&kept.score) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => {
            let triaged = |i: &CandidateItem| i.status != Status::Pending;
            !(triaged(kept) && !triaged(incoming))
        }
    }
}

/// Merges candidate batches into a deduplicated queue.
#[derive(Debug, Clone)]
pub struct Merger<'a> {
    canonicalizer: &'a Canonicalizer,
}

impl<'a> Merger<'a> {
    pub fn new(canonicalizer: &'a Canonicalizer) -> Self {
        Self { canonicalizer }
    }

    /// Merge batches given oldest first.
    pub fn merge<I>(&self, batches: I) -> MergeOutcome
    where
        I: IntoIterator<Item = Vec<CandidateItem>>,
    {
        let mut by_key: BTreeMap<String, CandidateItem> = BTreeMap::new();
        let mut report = MergeReport::default();

        for batch in batches {
            for item in batch {
                report.input_rows += 1;
                let key = self.canonicalizer.canonicalize(&item.url);
                match by_key.get_mut(&key) {
                    None => {
                        by_key.insert(key, item);
                    }
                    Some(kept) => {
                        report.duplicates += 1;
                        if supersedes(&item, kept) {
                            report.replaced += 1;
                            *kept = item;
                        }
                    }
                }
            }
        }

        report.unique_rows = by_key.len();
        MergeOutcome {
            items: by_key.into_values().collect(),
            report,
        }
    }
}

/// Convenience function to merge batches.
pub fn merge_batches<I>(batches: I, canonicalizer: &Canonicalizer) -> MergeOutcome
where
    I: IntoIterator<Item = Vec<CandidateItem>>,
{
    Merger::new(canonicalizer).merge(batches)
}

/// Stable re-sort by score, highest first.
pub fn sort_by_score(items: &mut [CandidateItem]) {
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon() -> Canonicalizer {
        Canonicalizer::new(&["utm_*".to_string(), "fbclid".to_string()])
    }

    fn item(url: &str, score: f64) -> CandidateItem {
        let mut item = CandidateItem::new(url);
        item.score = score;
        item.title = format!("{url} @ {score}");
        item
    }

    #[test]
    fn test_no_duplicates() {
        let outcome = merge_batches(
            vec![vec![item("https://a.example/1", 0.5), item("https://a.example/2", 0.4)]],
            &canon(),
        );
        assert_eq!(outcome.items.len(), 2);
        assert!(!outcome.has_duplicates());
        assert_eq!(outcome.report.input_rows, 2);
    }

    #[test]
    fn test_higher_score_wins_across_variants() {
        let outcome = merge_batches(
            vec![
                vec![item("https://A.example/post/?utm_source=rss", 0.7)],
                vec![item("https://a.example/post", 0.3)],
            ],
            &canon(),
        );
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].score, 0.7);
        // Display URL is kept verbatim.
        assert_eq!(outcome.items[0].url, "https://A.example/post/?utm_source=rss");
        assert_eq!(outcome.report.duplicates, 1);
        assert_eq!(outcome.report.replaced, 0);
    }

    #[test]
    fn test_triaged_status_beats_pending_on_tie() {
        let mut selected = item("https://a.example/x", 0.5);
        selected.status = Status::Selected;
        let pending = item("https://a.example/x#frag", 0.5);

        let outcome = merge_batches(vec![vec![selected.clone()], vec![pending.clone()]], &canon());
        assert_eq!(outcome.items[0].status, Status::Selected);

        let outcome = merge_batches(vec![vec![pending], vec![selected]], &canon());
        assert_eq!(outcome.items[0].status, Status::Selected);
    }

    #[test]
    fn test_full_tie_goes_to_later_batch() {
        let mut first = item("https://a.example/x", 0.5);
        first.title = "first".into();
        let mut second = item("https://a.example/x/", 0.5);
        second.title = "second".into();

        let outcome = merge_batches(vec![vec![first], vec![second]], &canon());
        assert_eq!(outcome.items[0].title, "second");
        assert_eq!(outcome.report.replaced, 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let batches = vec![
            vec![item("https://a.example/1", 0.2), item("https://b.example/2?fbclid=1", 0.9)],
            vec![item("https://a.example/1/", 0.6), item("https://c.example/3", 0.1)],
        ];
        let once = merge_batches(batches, &canon());
        let twice = merge_batches(vec![once.items.clone()], &canon());
        assert_eq!(once.items, twice.items);
        assert!(!twice.has_duplicates());
    }

    #[test]
    fn test_surviving_records_independent_of_batch_order() {
        let a = vec![item("https://a.example/1", 0.2), item("https://b.example/2", 0.9)];
        let b = vec![item("https://a.example/1?utm_medium=x", 0.6), item("https://b.example/2/", 0.1)];

        let ab = merge_batches(vec![a.clone(), b.clone()], &canon());
        let ba = merge_batches(vec![b, a], &canon());
        assert_eq!(ab.items, ba.items);
    }

    #[test]
    fn test_three_batch_permutations_keep_same_survivors() {
        let mut triaged = item("https://z.example/t", 0.5);
        triaged.status = Status::Rejected;
        let batches = [
            vec![item("https://a.example/1", 0.2), item("https://b.example/2", 0.9), triaged],
            vec![
                item("https://a.example/1?utm_medium=x", 0.6),
                item("https://b.example/2/", 0.1),
                item("https://z.example/t#top", 0.5),
            ],
            vec![
                item("https://a.example/1/", 0.4),
                item("https://c.example/3", 0.3),
                item("https://z.example/t/", 0.3),
            ],
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        let expected = merge_batches(batches.clone(), &canon());
        assert_eq!(expected.items.len(), 4);
        let z = expected.items.iter().find(|i| i.url.contains("z.example")).unwrap();
        assert_eq!(z.status, Status::Rejected);

        for order in orders {
            let permuted: Vec<_> = order.iter().map(|&i| batches[i].clone()).collect();
            let outcome = merge_batches(permuted, &canon());
            assert_eq!(outcome.items, expected.items, "order {order:?}");
            assert_eq!(outcome.report.duplicates, 5);
        }
    }

    #[test]
    fn test_sort_by_score() {
        let mut items = vec![item("https://a.example/1", 0.2), item("https://a.example/2", 0.9)];
        sort_by_score(&mut items);
        assert_eq!(items[0].score, 0.9);
    }
}
