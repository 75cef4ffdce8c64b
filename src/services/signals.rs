// src/services/signals.rs

//! Threat-intel signal token detection.
//!
//! Counts distinct CVE identifiers, MITRE ATT&CK technique IDs, defanged
//! indicators, bare hash digests and configured IOC keywords.

use std::collections::BTreeSet;

use regex::Regex;

use crate::error::Result;

/// Detects distinct signal tokens in free text.
#[derive(Debug, Clone)]
pub struct SignalDetector {
    cve: Regex,
    technique: Regex,
    defanged: Regex,
    digest: Regex,
    ioc_tokens: Vec<String>,
}

impl SignalDetector {
    /// Compile the built-in patterns and normalize the IOC keywords.
    pub fn new(ioc_tokens: &[String]) -> Result<Self> {
        let mut tokens: Vec<String> = ioc_tokens
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        tokens.sort();
        tokens.dedup();

        Ok(Self {
            cve: Regex::new(r"(?i)\bCVE-\d{4}-\d{4,7}\b")?,
            technique: Regex::new(r"\bT\d{4}(?:\.\d{3})?\b")?,
            defanged: Regex::new(
                r"(?i)\bhxxps?://\S+|\b[a-z0-9-]+(?:\[\.\]|\(\.\))[a-z0-9.\[\]()-]+",
            )?,
            digest: Regex::new(r"(?i)\b(?:[a-f0-9]{64}|[a-f0-9]{40}|[a-f0-9]{32})\b")?,
            ioc_tokens: tokens,
        })
    }

    /// Distinct signal tokens found in `text`, normalized and sorted.
    pub fn tokens(&self, text: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();

        for m in self.cve.find_iter(text) {
            found.insert(m.as_str().to_uppercase());
        }
        for m in self.technique.find_iter(text) {
            found.insert(m.as_str().to_string());
        }
        for m in self.defanged.find_iter(text) {
            found.insert(m.as_str().to_lowercase());
        }
        for m in self.digest.find_iter(text) {
            found.insert(m.as_str().to_lowercase());
        }

        let lowered = text.to_lowercase();
        for token in &self.ioc_tokens {
            if lowered.contains(token.as_str()) {
                found.insert(format!("ioc:{token}"));
            }
        }
        found
    }

    /// Number of distinct signal tokens in `text`.
    pub fn count(&self, text: &str) -> u32 {
        self.tokens(text).len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> SignalDetector {
        SignalDetector::new(&["sha256".to_string(), "ioc".to_string(), "ip address".to_string()]).unwrap()
    }

    #[test]
    fn test_cve_ids_are_distinct_and_case_insensitive() {
        let d = detector();
        assert_eq!(d.count("Fix for CVE-2024-6387 (cve-2024-6387) and CVE-2023-48795"), 2);
    }

    #[test]
    fn test_cve_requires_four_to_seven_digits() {
        let d = detector();
        assert_eq!(d.count("CVE-2024-123 is not an id"), 0);
        assert_eq!(d.count("CVE-2024-1234567"), 1);
    }

    #[test]
    fn test_mitre_technique_ids() {
        let d = detector();
        assert_eq!(d.count("Uses T1110 and T1110.003 plus T1496"), 3);
        assert_eq!(d.count("ST1110X and t1110"), 0);
    }

    #[test]
    fn test_ioc_keywords_count_once_each() {
        let d = detector();
        assert_eq!(d.count("IOC list: IOC, ioc, and an IP address"), 2);
    }

    #[test]
    fn test_defanged_and_digest_indicators() {
        let d = detector();
        let text = "C2 at evil[.]example and hxxp://bad.example/x, \
                    payload d41d8cd98f00b204e9800998ecf8427e";
        let tokens = d.tokens(text);
        assert!(tokens.contains("evil[.]example"));
        assert!(tokens.iter().any(|t| t.starts_with("hxxp://")));
        assert!(tokens.contains("d41d8cd98f00b204e9800998ecf8427e"));
    }

    #[test]
    fn test_plain_text_has_no_signal() {
        assert_eq!(detector().count("Vendor announces quarterly results"), 0);
    }
}
