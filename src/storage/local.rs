//! Local filesystem storage implementation.
//!
//! Every write goes to a temporary file first and is renamed into place, so a
//! crash never leaves a half-written queue behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::CandidateItem;
use crate::storage::{BatchData, QueueData, QueueStorage, StoredBatch, WriteMetadata};

const QUEUE_KEY: &str = "queue.json";
const BATCH_DIR: &str = "batches";
const MERGED_DIR: &str = "batches/merged";
const EXPORT_DIR: &str = "export";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Names of the `.json` files directly under `dir`.
    async fn list_json(&self, dir: &str) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(self.path(dir)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") && entry.file_type().await?.is_file() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Next batch key. The sequence prefix follows write order across pending
    /// and merged batches; the stamp is the scoring time and only informative.
    async fn next_batch_key(&self, at: DateTime<Utc>) -> Result<String> {
        let mut last = 0;
        for dir in [BATCH_DIR, MERGED_DIR] {
            for name in self.list_json(dir).await? {
                last = last.max(batch_seq(&name));
            }
        }

        let stamp = at.format("%Y%m%dT%H%M%S%.3fZ");
        let mut seq = last + 1;
        loop {
            let key = format!("{BATCH_DIR}/{seq:06}-{stamp}.json");
            if !tokio::fs::try_exists(self.path(&key)).await? {
                return Ok(key);
            }
            seq += 1;
        }
    }
}

/// Write-order sequence of a batch file name; names without one sort first.
fn batch_seq(name: &str) -> u64 {
    name.split('-')
        .next()
        .and_then(|prefix| prefix.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl QueueStorage for LocalStorage {
    async fn load_queue(&self) -> Result<Vec<CandidateItem>> {
        match self.read_json::<QueueData>(QUEUE_KEY).await? {
            Some(data) => Ok(data.items),
            None => {
                log::warn!("No {} found, starting from an empty queue", QUEUE_KEY);
                Ok(Vec::new())
            }
        }
    }

    async fn write_queue(
        &self,
        items: &[CandidateItem],
        at: DateTime<Utc>,
        force: bool,
    ) -> Result<WriteMetadata> {
        let previous_count = match self.read_json::<QueueData>(QUEUE_KEY).await? {
            Some(data) => data.items.len(),
            None => 0,
        };

        if items.len() < previous_count {
            if !force {
                log::error!(
                    "Refusing to shrink queue from {} to {} rows",
                    previous_count,
                    items.len()
                );
                return Err(AppError::validation(format!(
                    "queue would shrink from {} to {} rows; rerun with --force to allow",
                    previous_count,
                    items.len()
                )));
            }
            log::warn!(
                "Forcing queue shrink from {} to {} rows",
                previous_count,
                items.len()
            );
        }

        let data = QueueData::new(items.to_vec(), at);
        self.write_json(QUEUE_KEY, &data).await?;
        log::info!("Queue: {} rows written to {}", data.count, QUEUE_KEY);

        Ok(WriteMetadata {
            count: data.count,
            previous_count,
            timestamp: at,
        })
    }

    async fn write_batch(&self, items: &[CandidateItem], at: DateTime<Utc>) -> Result<String> {
        let key = self.next_batch_key(at).await?;
        let data = BatchData {
            created_at: at,
            count: items.len(),
            items: items.to_vec(),
        };
        self.write_json(&key, &data).await?;
        log::info!("Batch: {} rows written to {}", data.count, key);
        Ok(key)
    }

    async fn pending_batches(&self) -> Result<Vec<StoredBatch>> {
        let mut names = self.list_json(BATCH_DIR).await?;
        names.sort_by(|a, b| batch_seq(a).cmp(&batch_seq(b)).then_with(|| a.cmp(b)));

        let mut batches = Vec::with_capacity(names.len());
        for name in names {
            let key = format!("{BATCH_DIR}/{name}");
            if let Some(data) = self.read_json::<BatchData>(&key).await? {
                batches.push(StoredBatch { key, data });
            }
        }
        Ok(batches)
    }

    async fn archive_batches(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            let from = self.path(key);
            let name = from
                .file_name()
                .ok_or_else(|| AppError::validation(format!("bad batch key '{key}'")))?;
            let to = self.path(MERGED_DIR).join(name);
            self.ensure_dir(&to).await?;
            tokio::fs::rename(&from, &to).await?;
            log::debug!("Archived {} to {}", key, to.display());
        }
        Ok(())
    }

    async fn write_export(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let key = format!("{EXPORT_DIR}/{name}");
        self.write_bytes(&key, bytes).await?;
        Ok(self.path(&key).display().to_string())
    }
}
