// src/pipeline/validate.rs

use std::collections::HashMap;
use std::path::Path;

use crate::config::load_all;
use crate::error::Result;
use crate::models::{Config, Seed};
use crate::services::SourceRegistry;
use crate::utils;

/// Validate configuration and seed data using load_all.
pub fn run_validate(storage_dir: &Path) -> Result<(Config, Seed)> {
    utils::log::header("Validating configuration");

    match load_all(storage_dir) {
        Ok((config, seed)) => {
            utils::log::success("config.toml OK");
            utils::log::sub_item(&format!("User agent: {}", config.crawler.user_agent));
            utils::log::sub_item(&format!("Half-life: {} days", config.scoring.half_life_days));
            utils::log::sub_item(&format!(
                "Weights: domain {} / recency {} / category {} / signal {}",
                config.scoring.weight_domain,
                config.scoring.weight_recency,
                config.scoring.weight_category,
                config.scoring.weight_signal
            ));
            utils::log::sub_item(&format!("Winners per category: {}", config.selection.per_category));

            utils::log::success("seed.toml OK");
            let registry = SourceRegistry::new(&seed.sources, config.scoring.default_domain_weight);
            utils::log::sub_item(&format!("Sources: {}", registry.len()));

            let names = seed.category_names();
            let mut covered: HashMap<&str, usize> = HashMap::new();
            for source in &seed.sources {
                for hint in registry.category_hints(&source.domain) {
                    if names.contains(hint) {
                        *covered.entry(hint.as_str()).or_default() += 1;
                    } else {
                        log::warn!("Source {} hints unknown category '{}'", source.domain, hint);
                    }
                }
            }

            for category in &seed.categories {
                utils::log::sub_item(&format!(
                    "{}: {} include / {} exclude keywords, {} sources",
                    category.name,
                    category.include.len(),
                    category.exclude.len(),
                    covered.get(category.name.as_str()).copied().unwrap_or(0)
                ));
            }
            Ok((config, seed))
        }
        Err(e) => {
            log::error!("Validation failed: {e}");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_empty_dir_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let (config, seed) = run_validate(tmp.path()).unwrap();
        assert_eq!(config.selection.per_category, 100);
        assert_eq!(seed.categories.len(), 4);
    }

    #[test]
    fn test_validate_tolerates_unknown_category_hint() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("seed.toml"),
            r#"
[[sources]]
domain = "cisa.gov"
weight = 0.95
categories = ["Only", "Retired"]

[[categories]]
name = "Only"
include = ["ssh"]
"#,
        )
        .unwrap();
        let (_, seed) = run_validate(tmp.path()).unwrap();
        assert_eq!(seed.sources[0].categories.len(), 2);
    }

    #[test]
    fn test_validate_reports_bad_config() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("config.toml"), "[flagging]\nscore_buckets = [0.6, 0.4]\n").unwrap();
        assert!(run_validate(tmp.path()).is_err());
    }
}
