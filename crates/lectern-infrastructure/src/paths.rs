//! Unified path management for lectern data, backups and logs.
//!
//! Everything lives under one base directory so a deployment can be moved or
//! backed up as a unit.

use std::path::{Path, PathBuf};

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform data directory could not be determined.
    DataDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::DataDirNotFound => write!(f, "Cannot find the platform data directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Path layout for a lectern store.
///
/// # Directory Structure
///
/// ```text
/// <base>/                      # ~/.local/share/lectern by default
/// ├── config.toml              # Optional store configuration
/// ├── data/
/// │   └── courses.json         # Canonical document
/// ├── backups/                 # Gzip snapshots
/// │   └── courses-YYYYMMDDhhmmss.json.gz
/// └── logs/
///     └── lectern.log.YYYY-MM-DD
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LecternPaths {
    base: PathBuf,
}

impl LecternPaths {
    pub const APP_NAME: &'static str = "lectern";
    pub const DOCUMENT_FILE: &'static str = "courses.json";

    /// Uses `base` as the store root.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Uses the platform data directory (e.g. `~/.local/share/lectern`).
    pub fn default_location() -> Result<Self, PathError> {
        let data_dir = dirs::data_dir().ok_or(PathError::DataDirNotFound)?;
        Ok(Self::new(data_dir.join(Self::APP_NAME)))
    }

    /// Uses `base` when given, the platform default otherwise.
    pub fn resolve(base: Option<&Path>) -> Result<Self, PathError> {
        match base {
            Some(base) => Ok(Self::new(base)),
            None => Self::default_location(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    pub fn data_file(&self) -> PathBuf {
        self.data_dir().join(Self::DOCUMENT_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.base.join("backups")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    /// Resolves a configured path; relative paths hang off the base directory.
    pub fn resolve_relative(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_base() {
        let paths = LecternPaths::new("/srv/lectern");
        assert_eq!(paths.config_file(), PathBuf::from("/srv/lectern/config.toml"));
        assert_eq!(
            paths.data_file(),
            PathBuf::from("/srv/lectern/data/courses.json")
        );
        assert_eq!(paths.backup_dir(), PathBuf::from("/srv/lectern/backups"));
        assert_eq!(paths.logs_dir(), PathBuf::from("/srv/lectern/logs"));
    }

    #[test]
    fn test_resolve_relative() {
        let paths = LecternPaths::new("/srv/lectern");
        assert_eq!(
            paths.resolve_relative(Path::new("snapshots")),
            PathBuf::from("/srv/lectern/snapshots")
        );
        assert_eq!(
            paths.resolve_relative(Path::new("/mnt/backups")),
            PathBuf::from("/mnt/backups")
        );
    }

    #[test]
    fn test_resolve_prefers_explicit_base() {
        let paths = LecternPaths::resolve(Some(Path::new("/tmp/store"))).unwrap();
        assert_eq!(paths.base_dir(), Path::new("/tmp/store"));
    }
}
