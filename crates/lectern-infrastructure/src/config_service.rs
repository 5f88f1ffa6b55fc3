//! Configuration service implementation.
//!
//! This module resolves a [`StoreConfig`] from the path layout, the optional
//! `config.toml` under the base directory, and environment overrides.

use crate::paths::LecternPaths;
use lectern_core::config::{ConfigFile, Retention, StoreConfig};
use lectern_core::error::{LecternError, Result};

/// Environment variable used by existing deployments.
pub const BACKUP_KEEP_ENV: &str = "BACKUP_KEEP";
/// Namespaced variant, wins over [`BACKUP_KEEP_ENV`].
pub const LECTERN_BACKUP_KEEP_ENV: &str = "LECTERN_BACKUP_KEEP";

/// Loads the store configuration for a base directory.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: LecternPaths,
}

impl ConfigService {
    pub fn new(paths: LecternPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &LecternPaths {
        &self.paths
    }

    /// Loads configuration using the process environment for overrides.
    pub fn load(&self) -> Result<StoreConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Loads configuration with a custom environment lookup.
    pub fn load_with_env<E>(&self, env: E) -> Result<StoreConfig>
    where
        E: Fn(&str) -> Option<String>,
    {
        let file = self.read_config_file()?;
        let mut config = self.apply_file(file);

        // Blank values count as unset.
        let lookup = |key: &'static str| {
            env(key)
                .filter(|value| !value.trim().is_empty())
                .map(|value| (key, value))
        };
        let keep = lookup(LECTERN_BACKUP_KEEP_ENV).or_else(|| lookup(BACKUP_KEEP_ENV));
        if let Some((key, value)) = keep {
            config.retention = match Retention::parse(&value) {
                Some(retention) => retention,
                None => {
                    tracing::warn!(
                        "{}={:?} is not a number, snapshot pruning disabled",
                        key,
                        value
                    );
                    Retention::Unbounded
                }
            };
        }

        tracing::debug!("Resolved store config: {:?}", config);
        Ok(config)
    }

    fn read_config_file(&self) -> Result<ConfigFile> {
        let path = self.paths.config_file();
        if !path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            LecternError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            LecternError::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn apply_file(&self, file: ConfigFile) -> StoreConfig {
        let paths = &self.paths;
        StoreConfig {
            data_file: file
                .data_file
                .map(|p| paths.resolve_relative(&p))
                .unwrap_or_else(|| paths.data_file()),
            backup_dir: file
                .backup_dir
                .map(|p| paths.resolve_relative(&p))
                .unwrap_or_else(|| paths.backup_dir()),
            log_dir: file
                .log_dir
                .map(|p| paths.resolve_relative(&p))
                .unwrap_or_else(|| paths.logs_dir()),
            retention: file
                .backup_keep
                .map(Retention::from_count)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(LecternPaths::new(temp_dir.path()));

        let config = service.load_with_env(env(&[])).unwrap();

        assert_eq!(config.data_file, temp_dir.path().join("data").join("courses.json"));
        assert_eq!(config.backup_dir, temp_dir.path().join("backups"));
        assert_eq!(config.log_dir, temp_dir.path().join("logs"));
        assert_eq!(config.retention, Retention::default());
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.toml"),
            "backup_dir = \"snapshots\"\nbackup_keep = 0\n",
        )
        .unwrap();
        let service = ConfigService::new(LecternPaths::new(temp_dir.path()));

        let config = service.load_with_env(env(&[])).unwrap();

        assert_eq!(config.backup_dir, temp_dir.path().join("snapshots"));
        assert_eq!(config.retention, Retention::Unbounded);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.toml"), "backup_keep = 10\n").unwrap();
        let service = ConfigService::new(LecternPaths::new(temp_dir.path()));

        let config = service.load_with_env(env(&[("BACKUP_KEEP", "3")])).unwrap();
        assert_eq!(config.retention, Retention::KeepLatest(3));

        let config = service
            .load_with_env(env(&[("BACKUP_KEEP", "3"), ("LECTERN_BACKUP_KEEP", "7")]))
            .unwrap();
        assert_eq!(config.retention, Retention::KeepLatest(7));
    }

    #[test]
    fn test_unparseable_env_disables_pruning() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(LecternPaths::new(temp_dir.path()));

        let config = service.load_with_env(env(&[("BACKUP_KEEP", "many")])).unwrap();

        assert_eq!(config.retention, Retention::Unbounded);
    }

    #[test]
    fn test_blank_env_keeps_default() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(LecternPaths::new(temp_dir.path()));

        let config = service.load_with_env(env(&[("BACKUP_KEEP", "")])).unwrap();
        assert_eq!(config.retention, Retention::default());

        let config = service
            .load_with_env(env(&[("LECTERN_BACKUP_KEEP", "  "), ("BACKUP_KEEP", "4")]))
            .unwrap();
        assert_eq!(config.retention, Retention::KeepLatest(4));
    }

    #[test]
    fn test_blank_env_keeps_config_file_value() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.toml"), "backup_keep = 9\n").unwrap();
        let service = ConfigService::new(LecternPaths::new(temp_dir.path()));

        let config = service.load_with_env(env(&[("BACKUP_KEEP", " ")])).unwrap();

        assert_eq!(config.retention, Retention::KeepLatest(9));
    }

    #[test]
    fn test_invalid_config_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.toml"), "backup_keep = \"lots\"\n").unwrap();
        let service = ConfigService::new(LecternPaths::new(temp_dir.path()));

        let err = service.load_with_env(env(&[])).unwrap_err();

        assert!(matches!(err, LecternError::Config(_)));
    }
}
