//! Gzip snapshots of the document's previous content, with count-based
//! retention.
//!
//! Directory structure:
//! ```text
//! backup_dir/
//! ├── courses-20250101093000.json.gz
//! └── courses-20250101093512.json.gz
//! ```

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use futures::future::join_all;
use lectern_core::config::Retention;
use lectern_core::error::{LecternError, Result};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

const SNAPSHOT_SUFFIX: &str = ".json.gz";
const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A snapshot file found in the backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// What a prune pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Snapshots left in place.
    pub kept: usize,
    /// Snapshots deleted.
    pub removed: Vec<PathBuf>,
    /// Snapshots that could not be deleted, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Writes and prunes snapshots for one document.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    prefix: String,
    retention: Retention,
}

impl SnapshotStore {
    /// Creates a store whose files are named `<stem>-<timestamp>.json.gz`.
    pub fn new(dir: PathBuf, stem: &str, retention: Retention) -> Self {
        Self {
            dir,
            prefix: format!("{}-", stem),
            retention,
        }
    }

    /// Creates a store named after the document's file stem.
    pub fn for_document(document: &Path, dir: PathBuf, retention: Retention) -> Self {
        let stem = document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Self::new(dir, &stem, retention)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// File name for a snapshot taken at `at`.
    ///
    /// The token is the UTC time to the second with separators stripped, so
    /// two snapshots in the same second share a name and the later wins.
    pub fn file_name_at(&self, at: DateTime<Utc>) -> String {
        format!("{}{}{}", self.prefix, at.format(STAMP_FORMAT), SNAPSHOT_SUFFIX)
    }

    /// Whether `name` follows this store's naming convention.
    pub fn is_snapshot_name(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) && name.ends_with(SNAPSHOT_SUFFIX)
    }

    /// Compresses `raw` into a snapshot named after the current instant.
    pub async fn snapshot(&self, raw: &[u8]) -> Result<PathBuf> {
        self.snapshot_at(raw, Utc::now()).await
    }

    /// Compresses `raw` into a snapshot named after `at`.
    pub async fn snapshot_at(&self, raw: &[u8], at: DateTime<Utc>) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            LecternError::io(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let compressed = compress(raw)?;
        let target = self.dir.join(self.file_name_at(at));
        fs::write(&target, compressed).await.map_err(|e| {
            LecternError::io(format!("Failed to write snapshot {}: {}", target.display(), e))
        })?;

        tracing::debug!("Wrote snapshot {:?} ({} raw bytes)", target, raw.len());
        Ok(target)
    }

    /// Lists snapshots, most recently modified first.
    ///
    /// Ties on modification time fall back to the name, newest stamp first.
    /// A missing backup directory lists as empty.
    pub async fn list(&self) -> Result<Vec<SnapshotEntry>> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(LecternError::io(format!(
                    "Failed to list {}: {}",
                    self.dir.display(),
                    e
                )));
            }
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| {
            LecternError::io(format!("Failed to list {}: {}", self.dir.display(), e))
        })? {
            let name = entry.file_name();
            if !self.is_snapshot_name(&name.to_string_lossy()) {
                continue;
            }
            let metadata = entry.metadata().await.map_err(|e| {
                LecternError::io(format!("Failed to stat {:?}: {}", entry.path(), e))
            })?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().map_err(|e| {
                LecternError::io(format!("No modification time for {:?}: {}", entry.path(), e))
            })?;
            entries.push(SnapshotEntry {
                path: entry.path(),
                modified,
            });
        }

        entries.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.path.cmp(&a.path))
        });
        Ok(entries)
    }

    /// Deletes every snapshot beyond the retention count.
    ///
    /// Deletions run concurrently and are all awaited. A failed deletion is
    /// logged and reported but never stops the others.
    pub async fn prune(&self) -> Result<PruneReport> {
        let Some(keep) = self.retention.keep() else {
            return Ok(PruneReport::default());
        };

        let mut entries = self.list().await?;
        if entries.len() <= keep {
            return Ok(PruneReport {
                kept: entries.len(),
                ..Default::default()
            });
        }
        let victims: Vec<PathBuf> = entries
            .split_off(keep)
            .into_iter()
            .map(|entry| entry.path)
            .collect();

        let (removed, failed) = remove_all(victims).await;
        let report = PruneReport {
            kept: entries.len(),
            removed,
            failed,
        };

        if !report.removed.is_empty() {
            tracing::info!(
                "Pruned {} snapshot(s), kept {}",
                report.removed.len(),
                report.kept
            );
        }
        Ok(report)
    }

    /// Reads a snapshot back and decompresses it.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let compressed = fs::read(path).await.map_err(|e| {
            LecternError::io(format!("Failed to read snapshot {}: {}", path.display(), e))
        })?;
        decompress(&compressed)
    }
}

/// Deletes all `paths` concurrently and waits for every deletion.
async fn remove_all(paths: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<(PathBuf, String)>) {
    let results = join_all(paths.into_iter().map(|path| async move {
        let outcome = fs::remove_file(&path).await;
        (path, outcome)
    }))
    .await;

    let mut removed = Vec::new();
    let mut failed = Vec::new();
    for (path, outcome) in results {
        match outcome {
            Ok(()) => removed.push(path),
            Err(e) => {
                tracing::warn!("Failed to delete old snapshot {:?}: {}", path, e);
                failed.push((path, e.to_string()));
            }
        }
    }
    (removed, failed)
}

fn compress(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(raw)
        .map_err(|e| LecternError::io(format!("Failed to compress snapshot: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| LecternError::io(format!("Failed to compress snapshot: {}", e)))
}

fn decompress(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    GzDecoder::new(compressed)
        .read_to_end(&mut raw)
        .map_err(|e| LecternError::io(format!("Failed to decompress snapshot: {}", e)))?;
    Ok(raw)
}
