// src/services/registry.rs

//! Source registry: domain reliability weights and category hints.

use std::collections::HashMap;

use crate::models::SourceEntry;

#[derive(Debug, Clone)]
struct SourceInfo {
    weight: f64,
    categories: Vec<String>,
}

/// Lookup table from exact domain to reliability weight.
///
/// Domains are compared case-insensitively and without a trailing dot.
/// `www.example.com` and `example.com` are different keys.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: HashMap<String, SourceInfo>,
    default_weight: f64,
}

impl SourceRegistry {
    /// Build the registry, clamping weights into `[0, 1]`.
    pub fn new(entries: &[SourceEntry], default_weight: f64) -> Self {
        let mut sources = HashMap::with_capacity(entries.len());
        for entry in entries {
            let weight = if entry.weight.is_nan() {
                log::warn!(
                    "Source {} has weight NaN, using default {}",
                    entry.domain,
                    default_weight
                );
                default_weight
            } else if !(0.0..=1.0).contains(&entry.weight) {
                let clamped = entry.weight.clamp(0.0, 1.0);
                log::warn!(
                    "Source {} weight {} outside [0, 1], clamped to {}",
                    entry.domain,
                    entry.weight,
                    clamped
                );
                clamped
            } else {
                entry.weight
            };

            sources.insert(
                normalize(&entry.domain),
                SourceInfo {
                    weight,
                    categories: entry.categories.clone(),
                },
            );
        }

        Self {
            sources,
            default_weight: default_weight.clamp(0.0, 1.0),
        }
    }

    /// Weight for `domain`, or the default for unknown domains.
    pub fn weight(&self, domain: &str) -> f64 {
        self.lookup(domain).unwrap_or(self.default_weight)
    }

    /// Weight for `domain` if it is registered.
    pub fn lookup(&self, domain: &str) -> Option<f64> {
        self.sources.get(&normalize(domain)).map(|s| s.weight)
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.sources.contains_key(&normalize(domain))
    }

    /// Categories the source is expected to cover.
    pub fn category_hints(&self, domain: &str) -> &[String] {
        self.sources
            .get(&normalize(domain))
            .map(|s| s.categories.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn normalize(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_lowercase()
}
