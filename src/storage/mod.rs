//! Storage abstractions for the link queue.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── queue.json                # Master queue (merged, flagged, selected)
//! ├── batches/                  # Scored batches awaiting merge
//! │   ├── 000001-20250601T120000.000Z.json  # write sequence, then scoring time
//! │   └── merged/               # Batches already folded into the queue
//! └── export/                   # Selected-only views
//!     ├── selected.jsonl
//!     ├── selected_<category>.json
//!     ├── selected_summary.json
//!     └── triage_<category>.json
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::CandidateItem;

pub use local::LocalStorage;

/// Metadata about a queue write.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Rows in the written queue
    pub count: usize,
    /// Rows in the queue that was replaced
    pub previous_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// On-disk layout of `queue.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueData {
    pub updated_at: DateTime<Utc>,
    pub count: usize,
    pub items: Vec<CandidateItem>,
}

impl QueueData {
    pub fn new(items: Vec<CandidateItem>, updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at,
            count: items.len(),
            items,
        }
    }
}

/// On-disk layout of a scored batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchData {
    pub created_at: DateTime<Utc>,
    pub count: usize,
    pub items: Vec<CandidateItem>,
}

/// A stored batch and its storage key.
#[derive(Debug, Clone)]
pub struct StoredBatch {
    pub key: String,
    pub data: BatchData,
}

/// Trait for queue storage backends.
#[async_trait]
pub trait QueueStorage: Send + Sync {
    /// Load the master queue; an absent queue is empty.
    async fn load_queue(&self) -> Result<Vec<CandidateItem>>;

    /// Replace the master queue.
    ///
    /// Fails when the new queue has fewer rows than the stored one, unless
    /// `force` is set.
    async fn write_queue(
        &self,
        items: &[CandidateItem],
        at: DateTime<Utc>,
        force: bool,
    ) -> Result<WriteMetadata>;

    /// Store a freshly scored batch and return its key.
    async fn write_batch(&self, items: &[CandidateItem], at: DateTime<Utc>) -> Result<String>;

    /// Batches not yet merged, oldest first.
    async fn pending_batches(&self) -> Result<Vec<StoredBatch>>;

    /// Move merged batches out of the pending set.
    async fn archive_batches(&self, keys: &[String]) -> Result<()>;

    /// Write an export file and return where it went.
    async fn write_export(&self, name: &str, bytes: &[u8]) -> Result<String>;
}
