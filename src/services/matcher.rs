// src/services/matcher.rs

//! Category keyword matching over title and summary text.

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

use crate::models::{CategoryDef, MatchMode};

/// Result of matching one item against the configured categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatch {
    pub category: String,
    /// Distinct include keywords found
    pub hits: u32,
}

#[derive(Debug, Clone)]
struct CompiledCategory {
    name: String,
    include: Vec<String>,
    exclude: Vec<String>,
    mode: MatchMode,
}

/// Assigns at most one category per item.
///
/// A category is eligible when at least one include keyword and no exclude
/// keyword matches. The eligible category with the most distinct include hits
/// wins; equal counts go to the category declared first.
#[derive(Debug, Clone)]
pub struct CategoryMatcher {
    categories: Vec<CompiledCategory>,
}

impl CategoryMatcher {
    pub fn new(categories: &[CategoryDef]) -> Self {
        let categories = categories
            .iter()
            .map(|c| CompiledCategory {
                name: c.name.clone(),
                include: normalize_keywords(&c.include),
                exclude: normalize_keywords(&c.exclude),
                mode: c.match_mode,
            })
            .collect();
        Self { categories }
    }

    /// Best category for the given text, if any is eligible.
    pub fn best_match(&self, title: &str, summary: &str) -> Option<CategoryMatch> {
        let text = format!("{title}\n{summary}").to_lowercase();
        let words: Vec<&str> = text.unicode_words().collect();

        let mut best: Option<CategoryMatch> = None;
        for category in &self.categories {
            let matches = |kw: &String| match category.mode {
                MatchMode::Substring => text.contains(kw.as_str()),
                MatchMode::Token => contains_phrase(&words, kw),
            };

            if category.exclude.iter().any(matches) {
                continue;
            }
            let hits = category.include.iter().filter(|&kw| matches(kw)).count() as u32;
            if hits == 0 {
                continue;
            }
            // Strictly greater keeps the earlier category on ties.
            if best.as_ref().is_none_or(|b| hits > b.hits) {
                best = Some(CategoryMatch {
                    category: category.name.clone(),
                    hits,
                });
            }
        }
        best
    }
}

/// Lower-case, trim and drop empty or repeated keywords.
fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty() && seen.insert(k.clone()))
        .collect()
}

/// Whether the words of `phrase` appear consecutively in `words`.
fn contains_phrase(words: &[&str], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.unicode_words().collect();
    if needle.is_empty() || needle.len() > words.len() {
        return false;
    }
    words.windows(needle.len()).any(|w| w == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, include: &[&str], exclude: &[&str], mode: MatchMode) -> CategoryDef {
        CategoryDef {
            name: name.to_string(),
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            match_mode: mode,
        }
    }

    fn matcher() -> CategoryMatcher {
        CategoryMatcher::new(&[
            category("SSH", &["ssh", "openssh", "brute force"], &["sshfs mount tutorial"], MatchMode::Substring),
            category("Mining", &["xmrig", "monero", "ssh"], &[], MatchMode::Substring),
        ])
    }

    #[test]
    fn test_counts_distinct_include_hits() {
        let m = matcher().best_match("OpenSSH flaw", "ssh ssh SSH brute force").unwrap();
        assert_eq!(m.category, "SSH");
        assert_eq!(m.hits, 3);
    }

    #[test]
    fn test_highest_hits_wins() {
        let m = matcher().best_match("XMRig miner spread over SSH", "mines Monero").unwrap();
        assert_eq!(m.category, "Mining");
        assert_eq!(m.hits, 3);
    }

    #[test]
    fn test_tie_goes_to_declaration_order() {
        let m = matcher().best_match("ssh", "").unwrap();
        assert_eq!(m.category, "SSH");
        assert_eq!(m.hits, 1);
    }

    #[test]
    fn test_exclude_disqualifies_category() {
        let m = matcher().best_match("An sshfs mount tutorial", "").unwrap();
        assert_eq!(m.category, "Mining");
    }

    #[test]
    fn test_no_match_is_none() {
        assert_eq!(matcher().best_match("Quarterly earnings", "nothing here"), None);
    }

    #[test]
    fn test_token_mode_requires_whole_words() {
        let m = CategoryMatcher::new(&[category("NFS", &["nfs", "file share"], &[], MatchMode::Token)]);
        assert_eq!(m.best_match("confs and nfsd", ""), None);
        let hit = m.best_match("NFS exports on a file share", "").unwrap();
        assert_eq!(hit.hits, 2);
    }

    #[test]
    fn test_duplicate_keywords_count_once() {
        let m = CategoryMatcher::new(&[category("A", &["ssh", "SSH ", "ssh"], &[], MatchMode::Substring)]);
        assert_eq!(m.best_match("ssh", "").unwrap().hits, 1);
    }
}
