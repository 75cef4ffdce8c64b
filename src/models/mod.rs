// src/models/mod.rs

//! Domain models for the link queue.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod candidate;
mod config;
mod seed;

// Re-export all public types
pub use candidate::{CandidateItem, RawItem, SourceType, Status};
pub use config::{
    CanonicalConfig, Config, CrawlerConfig, ExportConfig, FlaggingConfig, ScoringConfig,
    SelectionConfig,
};
pub use seed::{CategoryDef, IndexSource, JUPYTER, MINING, MatchMode, NFS, SSH, Seed, SourceEntry};
