//! Candidate article records flowing through the queue.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Triage status of a queue row.
///
/// Rows start as `Pending`. Only the selector or an operator moves them on,
/// and nothing moves them back automatically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    #[default]
    Pending,
    Selected,
    Rejected,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Selected => "selected",
            Status::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "new" | "pending" => Ok(Status::Pending),
            "selected" => Ok(Status::Selected),
            "rejected" => Ok(Status::Rejected),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

// Hand-edited queue files carry free-form status cells; anything unknown is
// read as Pending rather than failing the whole file.
impl From<String> for Status {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|e| {
            log::warn!("{e}, treating row as pending");
            Status::Pending
        })
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.as_str().to_string()
    }
}

/// How a candidate link was discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Rss,
    Index,
    #[default]
    Manual,
}

/// An unscored link observation as produced by a collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub url: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub summary: String,

    /// Publication timestamp exactly as the source reported it
    #[serde(default)]
    pub published: Option<String>,

    /// Registry domain the item was collected under; falls back to the URL host
    #[serde(default)]
    pub source_domain: Option<String>,

    #[serde(default)]
    pub source_type: SourceType,
}

/// One scored article-link observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Display URL; identity is its canonical form
    pub url: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub source_domain: String,

    #[serde(default)]
    pub domain_weight: f64,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub category_hits: u32,

    #[serde(default)]
    pub signal_score: u32,

    #[serde(default)]
    pub recency_score: f64,

    #[serde(default)]
    pub score: f64,

    #[serde(default)]
    pub rep_flag: bool,

    #[serde(default)]
    pub sig_flag: bool,

    #[serde(default)]
    pub quality2: u8,

    #[serde(default)]
    pub quality4: u8,

    #[serde(default)]
    pub status: Status,

    #[serde(default)]
    pub source_type: SourceType,

    /// Scoring breakdown, e.g. `dom_w=0.9, rec=1.00, cat_hits=2, sig=1`
    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub added_on: Option<DateTime<Utc>>,

    /// Diagnostics attached while scoring or selecting
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl CandidateItem {
    /// Create an unscored pending row for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            summary: String::new(),
            published_at: None,
            source_domain: String::new(),
            domain_weight: 0.0,
            category: None,
            category_hits: 0,
            signal_score: 0,
            recency_score: 0.0,
            score: 0.0,
            rep_flag: false,
            sig_flag: false,
            quality2: 0,
            quality4: 0,
            status: Status::Pending,
            source_type: SourceType::Manual,
            reason: String::new(),
            added_on: None,
            notes: Vec::new(),
        }
    }

    /// Stable short identifier derived from a canonical URL.
    pub fn id_for(canonical_url: &str) -> String {
        let digest = Sha256::digest(canonical_url.as_bytes());
        hex::encode(&digest[..8])
    }

    pub fn is_rejected(&self) -> bool {
        self.status == Status::Rejected
    }

    pub fn is_selected(&self) -> bool {
        self.status == Status::Selected
    }

    /// Attach a diagnostic once.
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.notes.contains(&message) {
            self.notes.push(message);
        }
    }
}
