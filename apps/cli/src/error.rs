//! # CLI Error Types
//!
//! Everything a command can fail with, gathered into one type.
//!
//! ## Error Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError     (zhataqi-core)   → CliError::Core                       │
//! │  PersistError  (zhataqi-store)  → CliError::Persist                    │
//! │  toml errors                    → CliError::SettingsParse / Serialize  │
//! │  bad settings values            → CliError::InvalidSettings            │
//! │  bad command arguments          → CliError::InvalidInput               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One-shot commands log the error and exit with status 1. The shell prints
//! it and keeps reading.

use thiserror::Error;
use zhataqi_core::CoreError;
use zhataqi_store::PersistError;

#[derive(Debug, Error)]
pub enum CliError {
    /// Rejected by the engine (unknown spec, bad quantity, failed commit...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Catalog file, history store or export failure.
    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid TOML for [`crate::config::AppSettings`].
    #[error("Failed to parse settings: {0}")]
    SettingsParse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    SettingsSerialize(#[from] toml::ser::Error),

    /// Settings parsed but hold an unusable value.
    ///
    /// ## When This Occurs
    /// - Empty product name or history slot
    /// - Unknown `ZHATAQI_HISTORY_BACKEND`
    /// - No writable location for the settings file
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// An argument the parser accepted but the command cannot use.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Short machine-readable category, used as the shell's error prefix.
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Core(CoreError::SpecNotFound(_) | CoreError::RuleNotFound(_)) => {
                "NOT_FOUND"
            }
            CliError::Core(CoreError::Validation(_)) => "VALIDATION_ERROR",
            CliError::Core(CoreError::EmptyQueue) => "EMPTY_QUEUE",
            CliError::Core(CoreError::Storage(_)) | CliError::Persist(_) | CliError::Io(_) => {
                "STORAGE_ERROR"
            }
            CliError::Core(CoreError::RuleMismatch { .. }) => "INTERNAL_ERROR",
            CliError::SettingsParse(_)
            | CliError::SettingsSerialize(_)
            | CliError::InvalidSettings(_) => "SETTINGS_ERROR",
            CliError::InvalidInput(_) => "INVALID_INPUT",
        }
    }
}
