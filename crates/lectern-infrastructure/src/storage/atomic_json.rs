//! Atomic JSON document file.
//!
//! Readers of the canonical path only ever see a complete document: new
//! content is written and flushed to a hidden sibling file first, and a single
//! rename swaps it into place.

use lectern_core::error::{LecternError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// A handle to a document file that is only ever replaced by rename.
///
/// Provides:
/// - **Atomicity**: updates are all-or-nothing via tmp file + atomic rename
/// - **Durability**: explicit fsync of the tmp file before rename
///
/// There is no locking here. Writers must be serialized by the caller.
#[derive(Debug, Clone)]
pub struct AtomicJsonFile {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl AtomicJsonFile {
    /// Creates a new handle for the file at `path`.
    ///
    /// The temporary file lives next to it as `.<file name>.tmp`, so the
    /// final rename never crosses a filesystem boundary.
    pub fn new(path: PathBuf) -> Result<Self> {
        let tmp_path = Self::temp_path_for(&path)?;
        Ok(Self { path, tmp_path })
    }

    /// The canonical document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sibling path used while staging a write.
    pub fn temp_path(&self) -> &Path {
        &self.tmp_path
    }

    /// Reads the current raw content.
    ///
    /// A missing file reads as an empty string.
    pub async fn read_raw(&self) -> Result<String> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) if e.kind() == ErrorKind::InvalidData => Err(LecternError::corrupt(
                self.path.display().to_string(),
                format!("not valid UTF-8: {}", e),
            )),
            Err(e) => Err(LecternError::io(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Creates the file with `initial` content unless it already exists.
    ///
    /// Returns `true` when the file was created.
    pub async fn ensure_exists(&self, initial: &str) -> Result<bool> {
        if fs::try_exists(&self.path).await.map_err(|e| {
            LecternError::io(format!("Failed to stat {}: {}", self.path.display(), e))
        })? {
            return Ok(false);
        }
        self.write(initial.as_bytes()).await?;
        Ok(true)
    }

    /// Writes `bytes` to the temporary file and flushes it to disk.
    ///
    /// Nothing observable changes at the canonical path until the returned
    /// [`StagedWrite`] is committed. A staged write that is dropped leaves
    /// the tmp file behind; the next stage truncates it.
    pub async fn stage(&self, bytes: &[u8]) -> Result<StagedWrite<'_>> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                LecternError::io(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let mut tmp_file = File::create(&self.tmp_path).await.map_err(|e| {
            LecternError::io(format!(
                "Failed to create {}: {}",
                self.tmp_path.display(),
                e
            ))
        })?;
        tmp_file.write_all(bytes).await.map_err(|e| {
            LecternError::io(format!("Failed to write {}: {}", self.tmp_path.display(), e))
        })?;

        // Ensure data is written to disk
        tmp_file.sync_all().await.map_err(|e| {
            LecternError::io(format!("Failed to sync {}: {}", self.tmp_path.display(), e))
        })?;
        drop(tmp_file);

        Ok(StagedWrite { file: self })
    }

    /// Replaces the document with `bytes` (stage + commit).
    pub async fn write(&self, bytes: &[u8]) -> Result<()> {
        self.stage(bytes).await?.commit().await
    }

    fn temp_path_for(path: &Path) -> Result<PathBuf> {
        let file_name = path
            .file_name()
            .ok_or_else(|| LecternError::config(format!("{} has no file name", path.display())))?;
        let parent = path.parent().unwrap_or_else(|| Path::new(""));

        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(parent.join(tmp_name))
    }
}

/// A fully flushed tmp file waiting to be renamed into place.
#[must_use = "a staged write does nothing until committed"]
#[derive(Debug)]
pub struct StagedWrite<'a> {
    file: &'a AtomicJsonFile,
}

impl StagedWrite<'_> {
    /// Atomically renames the tmp file over the canonical path.
    pub async fn commit(self) -> Result<()> {
        fs::rename(&self.file.tmp_path, &self.file.path)
            .await
            .map_err(|e| {
                LecternError::io(format!(
                    "Failed to rename {} to {}: {}",
                    self.file.tmp_path.display(),
                    self.file.path.display(),
                    e
                ))
            })
    }
}
