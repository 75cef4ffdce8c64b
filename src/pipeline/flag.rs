//! Reputation, signal and composite quality flags.

use crate::models::{CandidateItem, FlaggingConfig};

/// Number of ascending `buckets` boundaries that `score` reaches.
fn score_bucket(score: f64, buckets: &[f64]) -> u8 {
    buckets.iter().filter(|&&b| score >= b).count() as u8
}

/// Recompute the flags of one row from its scored fields.
///
/// Only `rep_flag`, `sig_flag`, `quality2` and `quality4` are written, so
/// flagging twice gives the same row.
pub fn flag_item(item: &mut CandidateItem, config: &FlaggingConfig) {
    item.rep_flag = item.domain_weight >= config.reputable_threshold;
    item.sig_flag = item.signal_score > 0;
    item.quality2 = u8::from(item.rep_flag) + u8::from(item.sig_flag);
    item.quality4 = item
        .quality2
        .saturating_add(score_bucket(item.score, &config.score_buckets))
        .min(4);
}

/// Flag every row of a batch.
pub fn flag_batch(mut items: Vec<CandidateItem>, config: &FlaggingConfig) -> Vec<CandidateItem> {
    for item in &mut items {
        flag_item(item, config);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(domain_weight: f64, signal_score: u32, score: f64) -> CandidateItem {
        let mut item = CandidateItem::new("https://a.example/x");
        item.domain_weight = domain_weight;
        item.signal_score = signal_score;
        item.score = score;
        item
    }

    #[test]
    fn test_flags_follow_thresholds() {
        let config = FlaggingConfig::default();
        let mut row = item(0.9, 2, 0.7);
        flag_item(&mut row, &config);
        assert!(row.rep_flag);
        assert!(row.sig_flag);
        assert_eq!(row.quality2, 2);
        assert_eq!(row.quality4, 4);

        let mut row = item(0.2, 0, 0.1);
        flag_item(&mut row, &config);
        assert!(!row.rep_flag);
        assert!(!row.sig_flag);
        assert_eq!(row.quality2, 0);
        assert_eq!(row.quality4, 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let config = FlaggingConfig::default();
        let mut row = item(0.75, 0, 0.45);
        flag_item(&mut row, &config);
        assert!(row.rep_flag);
        assert_eq!(row.quality4, 2);
    }

    #[test]
    fn test_flagging_is_idempotent() {
        let config = FlaggingConfig::default();
        let once = flag_batch(vec![item(0.8, 1, 0.5), item(0.1, 0, 0.9)], &config);
        let twice = flag_batch(once.clone(), &config);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_quality4_monotone_in_score() {
        let config = FlaggingConfig::default();
        let mut previous = 0;
        for score in [0.0, 0.3, 0.45, 0.5, 0.65, 0.99] {
            let mut row = item(0.5, 1, score);
            flag_item(&mut row, &config);
            assert!(row.quality4 >= previous);
            assert!(row.quality4 <= 4);
            previous = row.quality4;
        }
    }

    #[test]
    fn test_quality4_is_capped() {
        let config = FlaggingConfig {
            reputable_threshold: 0.5,
            score_buckets: vec![0.1, 0.2, 0.3, 0.4],
        };
        let mut row = item(1.0, 5, 1.0);
        flag_item(&mut row, &config);
        assert_eq!(row.quality4, 4);
    }
}
