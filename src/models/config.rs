//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and collection behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Priority score weights and normalization
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Reputation threshold and quality buckets
    #[serde(default)]
    pub flagging: FlaggingConfig,

    /// Winner quota and rejection overrides
    #[serde(default)]
    pub selection: SelectionConfig,

    /// URL canonicalization rules
    #[serde(default)]
    pub canonical: CanonicalConfig,

    /// Export sizes for the scrape queue and triage packs
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, using defaults only when the file does not exist.
    ///
    /// A file that exists but does not parse is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load(&path) {
            Ok(config) => Ok(config),
            Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "Config not found at {:?}. Using defaults.",
                    path.as_ref()
                );
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        self.scoring.validate()?;
        self.flagging.validate()?;
        if self.selection.per_category == 0 {
            return Err(AppError::validation("selection.per_category must be > 0"));
        }
        if self.canonical.tracking_params.iter().any(|p| p.trim().is_empty()) {
            return Err(AppError::validation(
                "canonical.tracking_params contains an empty entry",
            ));
        }
        if self.export.max_per_category == 0 {
            return Err(AppError::validation("export.max_per_category must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client and collection behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Cap on entries taken from a single feed or index page (0 = no cap)
    #[serde(default)]
    pub limit_per_feed: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            limit_per_feed: 0,
        }
    }
}

/// Weights and normalization for the priority score.
///
/// `score = weight_domain * domain_weight + weight_recency * recency
///        + weight_category * min(hits / category_divisor, 1)
///        + weight_signal * min(signal / signal_divisor, 1)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Days for the recency score to halve; very large values flatten decay
    #[serde(default = "defaults::half_life_days")]
    pub half_life_days: f64,

    /// Recency given to rows without a usable publish date
    #[serde(default)]
    pub undated_recency: f64,

    /// Weight for domains missing from the source registry
    #[serde(default = "defaults::default_domain_weight")]
    pub default_domain_weight: f64,

    #[serde(default = "defaults::weight_domain")]
    pub weight_domain: f64,

    #[serde(default = "defaults::weight_recency")]
    pub weight_recency: f64,

    #[serde(default = "defaults::weight_category")]
    pub weight_category: f64,

    #[serde(default = "defaults::weight_signal")]
    pub weight_signal: f64,

    #[serde(default = "defaults::divisor")]
    pub category_divisor: f64,

    #[serde(default = "defaults::divisor")]
    pub signal_divisor: f64,

    /// Case-insensitive substrings counted as IOC signal tokens
    #[serde(default = "defaults::ioc_tokens")]
    pub ioc_tokens: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            half_life_days: defaults::half_life_days(),
            undated_recency: 0.0,
            default_domain_weight: defaults::default_domain_weight(),
            weight_domain: defaults::weight_domain(),
            weight_recency: defaults::weight_recency(),
            weight_category: defaults::weight_category(),
            weight_signal: defaults::weight_signal(),
            category_divisor: defaults::divisor(),
            signal_divisor: defaults::divisor(),
            ioc_tokens: defaults::ioc_tokens(),
        }
    }
}

impl ScoringConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.half_life_days.is_finite() && self.half_life_days > 0.0) {
            return Err(AppError::validation(
                "scoring.half_life_days must be a positive number",
            ));
        }
        for (name, value) in [
            ("scoring.undated_recency", self.undated_recency),
            ("scoring.default_domain_weight", self.default_domain_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::validation(format!("{name} must be within [0, 1]")));
            }
        }
        for (name, value) in [
            ("scoring.weight_domain", self.weight_domain),
            ("scoring.weight_recency", self.weight_recency),
            ("scoring.weight_category", self.weight_category),
            ("scoring.weight_signal", self.weight_signal),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(AppError::validation(format!("{name} must be >= 0")));
            }
        }
        for (name, value) in [
            ("scoring.category_divisor", self.category_divisor),
            ("scoring.signal_divisor", self.signal_divisor),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(AppError::validation(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

/// Reputation and quality-bucket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggingConfig {
    /// Minimum domain weight for a row to count as reputable
    #[serde(default = "defaults::reputable_threshold")]
    pub reputable_threshold: f64,

    /// Ascending score boundaries; each one reached adds a quality4 step
    #[serde(default = "defaults::score_buckets")]
    pub score_buckets: Vec<f64>,
}

impl Default for FlaggingConfig {
    fn default() -> Self {
        Self {
            reputable_threshold: defaults::reputable_threshold(),
            score_buckets: defaults::score_buckets(),
        }
    }
}

impl FlaggingConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.reputable_threshold) {
            return Err(AppError::validation(
                "flagging.reputable_threshold must be within [0, 1]",
            ));
        }
        if self.score_buckets.iter().any(|b| !b.is_finite()) {
            return Err(AppError::validation(
                "flagging.score_buckets must be finite numbers",
            ));
        }
        if self.score_buckets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AppError::validation(
                "flagging.score_buckets must be strictly ascending",
            ));
        }
        Ok(())
    }
}

/// Winner selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Winners per category
    #[serde(default = "defaults::per_category")]
    pub per_category: usize,

    /// URLs an operator allows back into selection even when rejected
    #[serde(default)]
    pub allow_rejected: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            per_category: defaults::per_category(),
            allow_rejected: Vec::new(),
        }
    }
}

/// URL canonicalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalConfig {
    /// Query parameters removed before comparing URLs; `prefix*` matches a prefix
    #[serde(default = "defaults::tracking_params")]
    pub tracking_params: Vec<String>,
}

impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            tracking_params: defaults::tracking_params(),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Cap on selected rows per category in the scrape queue
    #[serde(default = "defaults::max_per_category")]
    pub max_per_category: usize,

    /// Rows per category in triage packs (0 disables them)
    #[serde(default = "defaults::triage_top")]
    pub triage_top: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_per_category: defaults::max_per_category(),
            triage_top: defaults::triage_top(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; cti-queue/0.1)".into()
    }
    pub fn timeout() -> u64 {
        25
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Scoring defaults
    pub fn half_life_days() -> f64 {
        9999.0
    }
    pub fn default_domain_weight() -> f64 {
        0.2
    }
    pub fn weight_domain() -> f64 {
        0.35
    }
    pub fn weight_recency() -> f64 {
        0.30
    }
    pub fn weight_category() -> f64 {
        0.25
    }
    pub fn weight_signal() -> f64 {
        0.10
    }
    pub fn divisor() -> f64 {
        3.0
    }
    pub fn ioc_tokens() -> Vec<String> {
        ["sha256", "md5", "indicator", "ioc", "hash", "ip address"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    // Flagging defaults
    pub fn reputable_threshold() -> f64 {
        0.75
    }
    pub fn score_buckets() -> Vec<f64> {
        vec![0.45, 0.65]
    }

    // Selection defaults
    pub fn per_category() -> usize {
        100
    }

    // Canonicalization defaults
    pub fn tracking_params() -> Vec<String> {
        [
            "utm_*", "fbclid", "gclid", "mc_cid", "mc_eid", "_hsenc", "_hsmi",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    // Export defaults
    pub fn max_per_category() -> usize {
        120
    }
    pub fn triage_top() -> usize {
        200
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_half_life() {
        let mut config = Config::default();
        config.scoring.half_life_days = 0.0;
        assert!(config.validate().is_err());
        config.scoring.half_life_days = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_weight_and_zero_divisor() {
        let mut config = Config::default();
        config.scoring.weight_signal = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.category_divisor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unsorted_buckets() {
        let mut config = Config::default();
        config.flagging.score_buckets = vec![0.7, 0.4];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.flagging.reputable_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scoring]
            half_life_days = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.scoring.half_life_days, 30.0);
        assert_eq!(config.scoring.weight_domain, 0.35);
        assert_eq!(config.selection.per_category, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_numeric_threshold_fails_to_parse() {
        let parsed: std::result::Result<Config, _> = toml::from_str(
            r#"
            [flagging]
            reputable_threshold = "high"
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.selection.per_category, 100);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scoring]\nweight_domain = \"lots\"\n").unwrap();
        assert!(Config::load_or_default(&path).is_err());
    }
}
