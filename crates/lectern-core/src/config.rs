//! Store configuration model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Number of snapshots kept when nothing else is configured.
pub const DEFAULT_BACKUP_KEEP: usize = 50;

/// How many snapshots survive a prune.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Keep the `n` most recently modified snapshots.
    KeepLatest(usize),
    /// Never prune.
    Unbounded,
}

impl Retention {
    /// Builds a retention from a count; zero disables pruning.
    pub fn from_count(count: usize) -> Self {
        if count == 0 {
            Retention::Unbounded
        } else {
            Retention::KeepLatest(count)
        }
    }

    /// Parses a configured value such as `"50"`.
    ///
    /// Fractions round down. Values that are not finite numbers, or are
    /// below one, disable pruning. Returns `None` only when the text is not
    /// a number at all, so callers can warn about it.
    pub fn parse(value: &str) -> Option<Self> {
        let number: f64 = value.trim().parse().ok()?;
        if !number.is_finite() || number < 1.0 {
            return Some(Retention::Unbounded);
        }
        Some(Retention::KeepLatest(number.floor() as usize))
    }

    /// The count to keep, or `None` when pruning is disabled.
    pub fn keep(&self) -> Option<usize> {
        match self {
            Retention::KeepLatest(n) => Some(*n),
            Retention::Unbounded => None,
        }
    }
}

impl Default for Retention {
    fn default() -> Self {
        Retention::KeepLatest(DEFAULT_BACKUP_KEEP)
    }
}

/// Resolved locations and policies for a store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Canonical document path (e.g. `data/courses.json`).
    pub data_file: PathBuf,
    /// Directory receiving gzip snapshots.
    pub backup_dir: PathBuf,
    /// Directory for rolling log files.
    pub log_dir: PathBuf,
    /// Snapshot retention.
    pub retention: Retention,
}

/// The optional `config.toml` as written by an operator.
///
/// Every key is optional; relative paths are resolved against the base
/// directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub backup_keep: Option<usize>,
}
