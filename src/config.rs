// src/config.rs

//! Configuration loading utilities.
//!
//! Both files live in the storage directory. A missing file falls back to the
//! built-in defaults; a file that is present but malformed or invalid stops
//! the run before any batch is touched.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Config, Seed};

pub const CONFIG_FILE: &str = "config.toml";
pub const SEED_FILE: &str = "seed.toml";

/// Load configuration from `config.toml` under `storage_dir`.
pub fn load_config(storage_dir: &Path) -> Result<Config> {
    let config = Config::load_or_default(storage_dir.join(CONFIG_FILE))?;
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid {CONFIG_FILE}: {e}")))?;
    Ok(config)
}

/// Load seed data from `seed.toml` under `storage_dir`.
pub fn load_seed(storage_dir: &Path) -> Result<Seed> {
    let seed = Seed::load_or_default(storage_dir.join(SEED_FILE))?;
    seed.validate()
        .map_err(|e| AppError::config(format!("Invalid {SEED_FILE}: {e}")))?;
    Ok(seed)
}

/// Load and validate both config and seed data.
pub fn load_all(storage_dir: &Path) -> Result<(Config, Seed)> {
    Ok((load_config(storage_dir)?, load_seed(storage_dir)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_all_reads_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "[selection]\nper_category = 7\n").unwrap();
        std::fs::write(
            tmp.path().join(SEED_FILE),
            "[[categories]]\nname = \"Only\"\ninclude = [\"ssh\"]\n",
        )
        .unwrap();

        let (config, seed) = load_all(tmp.path()).unwrap();
        assert_eq!(config.selection.per_category, 7);
        assert_eq!(seed.category_names(), vec!["Only".to_string()]);
        assert!(seed.sources.is_empty());
    }

    #[test]
    fn test_malformed_file_is_not_replaced_by_defaults() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "[scoring]\nweight_domain = \"high\"\n").unwrap();
        assert!(load_config(tmp.path()).is_err());
    }

    #[test]
    fn test_invalid_seed_fails_fast() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(SEED_FILE), "categories = []\n").unwrap();
        let err = load_seed(tmp.path()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
