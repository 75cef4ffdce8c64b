//! Seed data: the source registry and category keyword sets.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root seed data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    /// Weighted feed/index sources
    #[serde(default)]
    pub sources: Vec<SourceEntry>,

    /// Categories in declaration order; order breaks equal-hit ties
    pub categories: Vec<CategoryDef>,
}

impl Seed {
    /// Load seed data from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load seed data, using built-in defaults only when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load(&path) {
            Ok(seed) => Ok(seed),
            Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Seed not found at {:?}. Using defaults.", path.as_ref());
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Validate that seed data is usable.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(AppError::validation("No categories defined in seed data"));
        }

        let mut names = HashSet::new();
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(AppError::validation("Category with empty name"));
            }
            if !names.insert(category.name.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate category '{}'",
                    category.name
                )));
            }
            if category.include.iter().all(|k| k.trim().is_empty()) {
                return Err(AppError::validation(format!(
                    "Category '{}' has no include keywords",
                    category.name
                )));
            }
        }

        let mut domains = HashSet::new();
        for source in &self.sources {
            if source.domain.trim().is_empty() {
                return Err(AppError::validation("Source with empty domain"));
            }
            if !source.weight.is_finite() {
                return Err(AppError::validation(format!(
                    "Source '{}' has a non-numeric weight",
                    source.domain
                )));
            }
            if !domains.insert(source.domain.to_lowercase()) {
                return Err(AppError::validation(format!(
                    "Duplicate source domain '{}'",
                    source.domain
                )));
            }
            for index in &source.indexes {
                if let Some(pattern) = &index.link_pattern {
                    regex::Regex::new(pattern)?;
                }
                if let Some(pattern) = &index.date_regex {
                    regex::Regex::new(pattern)?;
                }
            }
        }
        Ok(())
    }

    /// Category names in declaration order.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }
}

/// One entry of the source registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Registry key, matched exactly against item domains
    pub domain: String,

    /// Reliability weight; clamped to [0, 1] when the registry is built
    #[serde(default = "default_source_weight")]
    pub weight: f64,

    /// Categories this source usually covers
    #[serde(default)]
    pub categories: Vec<String>,

    /// RSS or Atom feed URLs
    #[serde(default)]
    pub rss: Vec<String>,

    /// HTML index pages listing article links
    #[serde(default)]
    pub indexes: Vec<IndexSource>,
}

fn default_source_weight() -> f64 {
    0.5
}

/// An HTML listing page scanned for article links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSource {
    pub url: String,

    /// Base for resolving relative links (defaults to `url`)
    #[serde(default)]
    pub base: Option<String>,

    /// Only links whose href matches are kept
    #[serde(default)]
    pub link_pattern: Option<String>,

    /// Pattern whose first capture group is the publish date near the link
    #[serde(default)]
    pub date_regex: Option<String>,
}

/// How include/exclude keywords are compared with item text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Case-insensitive substring
    #[default]
    Substring,
    /// Keyword must line up with whole words
    Token,
}

/// A category and its keyword sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDef {
    pub name: String,

    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub match_mode: MatchMode,
}

impl CategoryDef {
    fn new(name: &str, include: &[&str], exclude: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            match_mode: MatchMode::Substring,
        }
    }
}

impl SourceEntry {
    fn new(domain: &str, weight: f64, categories: &[&str], rss: &[&str]) -> Self {
        Self {
            domain: domain.to_string(),
            weight,
            categories: categories.iter().map(|s| s.to_string()).collect(),
            rss: rss.iter().map(|s| s.to_string()).collect(),
            indexes: Vec::new(),
        }
    }
}

pub const SSH: &str = "SSH & Credential Abuse";
pub const MINING: &str = "Cryptomining on HPC";
pub const NFS: &str = "NFS / File-Share Exposure";
pub const JUPYTER: &str = "JupyterHub / Open OnDemand";

impl Default for Seed {
    fn default() -> Self {
        Self {
            sources: Self::default_sources(),
            categories: Self::default_categories(),
        }
    }
}

impl Seed {
    fn default_categories() -> Vec<CategoryDef> {
        vec![
            CategoryDef::new(
                SSH,
                &[
                    "ssh",
                    "openssh",
                    "sshd",
                    "authorized_keys",
                    "known_hosts",
                    "brute force",
                    "password spraying",
                    "credential stuffing",
                    "stolen credentials",
                    "kerberos",
                    "gssapi",
                ],
                &["sshfs mount tutorial"],
            ),
            CategoryDef::new(
                MINING,
                &[
                    "cryptomining",
                    "cryptojacking",
                    "cryptominer",
                    "coin miner",
                    "xmrig",
                    "xmr-stak",
                    "monero",
                    "stratum",
                    "nicehash",
                    "supercomputer",
                    "hpc",
                ],
                &["bitcoin price", "crypto market"],
            ),
            CategoryDef::new(
                NFS,
                &[
                    "nfs",
                    "root_squash",
                    "no_root_squash",
                    "/etc/exports",
                    "nfs-ganesha",
                    "lustre",
                    "gpfs",
                    "beegfs",
                    "file share",
                    "smb share",
                    "krb5p",
                ],
                &[],
            ),
            CategoryDef::new(
                JUPYTER,
                &[
                    "jupyterhub",
                    "jupyter",
                    "jupyterlab",
                    "notebook server",
                    "open ondemand",
                    "openondemand",
                    "ood portal",
                ],
                &[],
            ),
        ]
    }

    fn default_sources() -> Vec<SourceEntry> {
        const ALL: &[&str] = &[SSH, MINING, NFS, JUPYTER];
        vec![
            SourceEntry::new(
                "cisa.gov",
                0.95,
                ALL,
                &["https://www.cisa.gov/cybersecurity-advisories/all.xml"],
            ),
            SourceEntry::new(
                "ubuntu.com",
                0.9,
                &[SSH, NFS],
                &["https://ubuntu.com/security/notices/rss.xml"],
            ),
            SourceEntry::new("access.redhat.com", 0.9, &[SSH, NFS], &[]),
            SourceEntry::new("suse.com", 0.85, &[SSH, NFS], &[]),
            SourceEntry::new("openssh.com", 0.9, &[SSH], &[]),
            SourceEntry::new("openondemand.org", 0.85, &[JUPYTER], &[]),
            SourceEntry::new(
                "blog.jupyter.org",
                0.85,
                &[JUPYTER],
                &["https://blog.jupyter.org/feed"],
            ),
            SourceEntry::new("lore.kernel.org", 0.8, &[NFS], &[]),
            SourceEntry::new(
                "unit42.paloaltonetworks.com",
                0.85,
                &[SSH, MINING],
                &["https://unit42.paloaltonetworks.com/feed/"],
            ),
            SourceEntry::new(
                "blog.talosintelligence.com",
                0.85,
                &[SSH, MINING],
                &["https://blog.talosintelligence.com/rss/"],
            ),
            SourceEntry::new("crowdstrike.com", 0.85, &[SSH, MINING], &[]),
            SourceEntry::new("microsoft.com", 0.85, &[SSH, MINING], &[]),
            SourceEntry::new("elastic.co", 0.8, &[SSH, MINING], &[]),
            SourceEntry::new("redcanary.com", 0.8, &[SSH, MINING], &[]),
            SourceEntry::new(
                "securelist.com",
                0.8,
                &[MINING],
                &["https://securelist.com/feed/"],
            ),
            SourceEntry::new("sysdig.com", 0.8, &[MINING], &[]),
            SourceEntry::new(
                "thedfirreport.com",
                0.85,
                &[SSH],
                &["https://thedfirreport.com/feed/"],
            ),
            SourceEntry::new(
                "krebsonsecurity.com",
                0.75,
                &[SSH],
                &["https://krebsonsecurity.com/feed/"],
            ),
            SourceEntry::new(
                "bleepingcomputer.com",
                0.7,
                ALL,
                &["https://www.bleepingcomputer.com/feed/"],
            ),
            SourceEntry::new("darkreading.com", 0.65, &[SSH, MINING], &[]),
            SourceEntry::new(
                "securityweek.com",
                0.65,
                &[SSH, MINING, NFS],
                &["https://www.securityweek.com/feed/"],
            ),
        ]
    }
}
