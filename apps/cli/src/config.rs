//! # Application Settings
//!
//! Where the catalog comes from, where history is kept, and what the product
//! is called on exported files.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ZHATAQI_PRODUCT_NAME, ZHATAQI_CATALOG, ZHATAQI_DATA_DIR,           │
//! │     ZHATAQI_HISTORY_BACKEND, ZHATAQI_HISTORY_SLOT                      │
//! │                                                                         │
//! │  2. TOML Settings File (--config, or the platform config dir)          │
//! │     ~/.config/packaging/settings.toml (Linux)                          │
//! │     ~/Library/Application Support/com.zhataqi.packaging/settings.toml  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     built-in catalog, JSON file history in the platform data dir       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Settings File Format
//! ```toml
//! product_name = "藏境扎塔奇"
//! catalog_path = "/srv/zhataqi/config.json"   # omit for the built-in catalog
//! data_dir = "/srv/zhataqi/data"
//!
//! [history]
//! backend = "sqlite"   # file | sqlite | memory
//! slot = "packaging_history"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zhataqi_core::{HistoryStore, DEFAULT_HISTORY_SLOT};
use zhataqi_store::{JsonFileStore, MemoryStore, SqliteStore};

use crate::error::{CliError, CliResult};

/// Database file used by the SQLite backend, inside `data_dir`.
pub const SQLITE_FILE_NAME: &str = "zhataqi.db";

const SETTINGS_FILE_NAME: &str = "settings.toml";

// =============================================================================
// History Backend
// =============================================================================

/// Where committed batches are kept.
///
/// ```text
/// FILE (Default)   <data_dir>/<slot>.json, replaced atomically on each save
/// SQLITE           <data_dir>/zhataqi.db, one kv_slots row per slot
/// MEMORY           nothing survives the process; for demos and dry runs
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryBackend {
    #[default]
    File,
    Sqlite,
    Memory,
}

impl std::fmt::Display for HistoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryBackend::File => write!(f, "file"),
            HistoryBackend::Sqlite => write!(f, "sqlite"),
            HistoryBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for HistoryBackend {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" | "json" => Ok(HistoryBackend::File),
            "sqlite" | "db" => Ok(HistoryBackend::Sqlite),
            "memory" | "none" => Ok(HistoryBackend::Memory),
            other => Err(CliError::InvalidSettings(format!(
                "Unknown history backend: '{}'. Valid options: file, sqlite, memory",
                other
            ))),
        }
    }
}

// =============================================================================
// History Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySettings {
    #[serde(default)]
    pub backend: HistoryBackend,

    /// Name of the slot holding the batch list.
    #[serde(default = "default_slot")]
    pub slot: String,
}

fn default_slot() -> String {
    DEFAULT_HISTORY_SLOT.to_string()
}

impl Default for HistorySettings {
    fn default() -> Self {
        HistorySettings {
            backend: HistoryBackend::default(),
            slot: default_slot(),
        }
    }
}

// =============================================================================
// App Settings
// =============================================================================

/// Complete settings for the command line tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Product name used in export file names.
    #[serde(default = "default_product_name")]
    pub product_name: String,

    /// Catalog document to load instead of the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Directory for history files. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub history: HistorySettings,
}

fn default_product_name() -> String {
    "藏境扎塔奇".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            product_name: default_product_name(),
            catalog_path: None,
            data_dir: None,
            history: HistorySettings::default(),
        }
    }
}

impl AppSettings {
    /// Loads settings from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Settings file (settings.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CliResult<Self> {
        let mut settings = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading settings from file");
                let contents = std::fs::read_to_string(&path)?;
                settings = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Settings file not found, using defaults");
            }
        }

        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;

        Ok(settings)
    }

    /// Saves settings to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> CliResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CliError::InvalidSettings("No settings path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Settings saved");
        Ok(path)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.product_name.trim().is_empty() {
            return Err(CliError::InvalidSettings(
                "product_name must not be empty".into(),
            ));
        }
        if self.history.slot.trim().is_empty() {
            return Err(CliError::InvalidSettings(
                "history.slot must not be empty".into(),
            ));
        }
        if self
            .history
            .slot
            .contains(|c: char| c == '/' || c == '\\' || c.is_control())
        {
            return Err(CliError::InvalidSettings(format!(
                "history.slot must be a plain name, got: {}",
                self.history.slot
            )));
        }
        Ok(())
    }

    /// Applies `ZHATAQI_*` overrides read through `var`.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> CliResult<()> {
        if let Some(name) = var("ZHATAQI_PRODUCT_NAME") {
            self.product_name = name;
        }

        if let Some(path) = var("ZHATAQI_CATALOG") {
            debug!(path = %path, "Overriding catalog path from environment");
            self.catalog_path = Some(PathBuf::from(path));
        }

        if let Some(dir) = var("ZHATAQI_DATA_DIR") {
            debug!(dir = %dir, "Overriding data dir from environment");
            self.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(backend) = var("ZHATAQI_HISTORY_BACKEND") {
            self.history.backend = backend.parse()?;
        }

        if let Some(slot) = var("ZHATAQI_HISTORY_SLOT") {
            self.history.slot = slot;
        }

        Ok(())
    }

    /// Returns the default settings file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "zhataqi", "packaging")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Directory holding history files.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "zhataqi", "packaging")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    pub fn catalog_path(&self) -> Option<&Path> {
        self.catalog_path.as_deref()
    }

    /// Opens the configured history backend.
    pub fn open_history_store(&self) -> CliResult<Box<dyn HistoryStore>> {
        let slot = &self.history.slot;
        let store: Box<dyn HistoryStore> = match self.history.backend {
            HistoryBackend::File => Box::new(JsonFileStore::new(self.data_dir(), slot)),
            HistoryBackend::Sqlite => Box::new(SqliteStore::open(
                self.data_dir().join(SQLITE_FILE_NAME),
                slot,
            )?),
            HistoryBackend::Memory => Box::new(MemoryStore::new()),
        };
        debug!(backend = %self.history.backend, slot = %slot, "History store ready");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("file".parse::<HistoryBackend>().unwrap(), HistoryBackend::File);
        assert_eq!("SQLite".parse::<HistoryBackend>().unwrap(), HistoryBackend::Sqlite);
        assert_eq!("memory".parse::<HistoryBackend>().unwrap(), HistoryBackend::Memory);
        assert!("redis".parse::<HistoryBackend>().is_err());
    }

    #[test]
    fn test_default_config() {
        let settings = AppSettings::default();
        assert_eq!(settings.product_name, "藏境扎塔奇");
        assert_eq!(settings.history.backend, HistoryBackend::File);
        assert_eq!(settings.history.slot, "packaging_history");
        assert!(settings.catalog_path.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut settings = AppSettings::default();
        assert!(settings.validate().is_ok());

        settings.history.slot = "../escape".to_string();
        assert!(settings.validate().is_err());

        settings.history.slot = "packaging_history".to_string();
        settings.product_name = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = AppSettings::default();
        settings
            .apply_overrides(env(&[
                ("ZHATAQI_PRODUCT_NAME", "扎塔奇"),
                ("ZHATAQI_DATA_DIR", "/tmp/zhataqi"),
                ("ZHATAQI_HISTORY_BACKEND", "sqlite"),
                ("ZHATAQI_HISTORY_SLOT", "trial"),
            ]))
            .unwrap();

        assert_eq!(settings.product_name, "扎塔奇");
        assert_eq!(settings.data_dir(), PathBuf::from("/tmp/zhataqi"));
        assert_eq!(settings.history.backend, HistoryBackend::Sqlite);
        assert_eq!(settings.history.slot, "trial");

        let mut settings = AppSettings::default();
        assert!(settings
            .apply_overrides(env(&[("ZHATAQI_HISTORY_BACKEND", "cloud")]))
            .is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let mut settings = AppSettings::default();
        settings.catalog_path = Some(PathBuf::from("/srv/config.json"));
        settings.history.backend = HistoryBackend::Sqlite;

        let toml_str = toml::to_string_pretty(&settings).unwrap();
        assert!(toml_str.contains("backend = \"sqlite\""));

        let parsed: AppSettings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: AppSettings = toml::from_str("[history]\nbackend = \"memory\"\n").unwrap();
        assert_eq!(parsed.product_name, "藏境扎塔奇");
        assert_eq!(parsed.history.slot, "packaging_history");
        assert_eq!(parsed.history.backend, HistoryBackend::Memory);
    }

    #[test]
    fn test_save_then_load_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut settings = AppSettings::default();
        settings.product_name = "测试品".to_string();
        settings.save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let loaded: AppSettings = toml::from_str(&text).unwrap();
        assert_eq!(loaded.product_name, "测试品");
    }

    #[test]
    fn test_open_store_per_backend() {
        let dir = tempdir().unwrap();
        let mut settings = AppSettings::default();
        settings.data_dir = Some(dir.path().to_path_buf());

        for backend in [HistoryBackend::File, HistoryBackend::Sqlite, HistoryBackend::Memory] {
            settings.history.backend = backend;
            let store = settings.open_history_store().unwrap();
            assert!(store.load().unwrap().is_empty());
        }
        assert!(dir.path().join(SQLITE_FILE_NAME).exists());
    }
}
