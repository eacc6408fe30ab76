//! Configuration management.
//!
//! The sync configuration lives in a single JSON file, by default
//! `~/.memos-sync/config.json`.
//!
//! Path priority:
//! 1. Explicit `--config` flag
//! 2. `MEMOS_SYNC_CONFIG` environment variable
//! 3. `~/.memos-sync/config.json`
//!
//! The orchestrator never touches the file directly: it persists the
//! checkpoint through the [`ConfigStore`] trait.

mod types;

pub use types::{
    DEFAULT_LAST_SYNC_TIME, DEFAULT_SIYUAN_URL, DownloadMode, ImageLayout, MarkMode, SyncConfig,
    SyncMode, TagScope,
};

use crate::error::{Error, Result};

use std::fs;
use std::path::{Path, PathBuf};

/// Get the global memos-sync directory location.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".memos-sync"))
}

/// Resolve the configuration file path.
///
/// # Errors
///
/// Returns `Error::Config` if no home directory can be determined.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var("MEMOS_SYNC_CONFIG") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    global_config_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Persistence for [`SyncConfig`].
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if stored configuration exists but cannot be read.
    fn load(&self) -> Result<SyncConfig>;

    /// Persist the full configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    fn save(&self, config: &SyncConfig) -> Result<()>;
}

/// JSON file backed configuration store.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Create a store for the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the resolved default location.
    ///
    /// # Errors
    ///
    /// Returns an error if no config location can be determined.
    pub fn resolve(explicit_path: Option<&Path>) -> Result<Self> {
        resolve_config_path(explicit_path).map(Self::new)
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sync lock file next to the config, `<config>.lock`.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<SyncConfig> {
        if !self.path.exists() {
            return Ok(SyncConfig::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| Error::ConfigFile {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| Error::ConfigFile {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn save(&self, config: &SyncConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        fs::write(&self.path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_config_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/config.json");
        let result = resolve_config_path(Some(&explicit)).unwrap();
        assert_eq!(result, explicit);
    }

    #[test]
    fn test_lock_path_sits_next_to_config() {
        let store = FileConfigStore::new("/home/me/.memos-sync/config.json");
        assert_eq!(
            store.lock_path(),
            PathBuf::from("/home/me/.memos-sync/config.json.lock")
        );
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("config.json"));
        assert_eq!(store.load().unwrap(), SyncConfig::default());
    }

    #[test]
    fn test_save_then_load_keeps_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("nested").join("config.json"));

        let config = SyncConfig {
            base_url: "http://memos.local".into(),
            sync_mode: Some(SyncMode::Page),
            page_path: "/Inbox".into(),
            last_sync_time: "2024-05-01 08:00:00".into(),
            ..SyncConfig::default()
        };
        store.save(&config).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"lastSyncTime\": \"2024-05-01 08:00:00\""));
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn test_corrupt_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileConfigStore::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::ConfigFile { .. }));
        assert_eq!(err.exit_code(), 7);
    }
}
