//! # Persistence Error Types
//!
//! Error types for disk, database, and export operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  io / serde_json / rusqlite / csv error                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PersistError (this module) ← Adds context and categorization          │
//! │       │                                                                 │
//! │       ├──► StoreError (through HistoryStore) ← seen by the engine      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CliError (in the app) ← logged, exit code 1                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use zhataqi_core::StoreError;

/// Persistence and export errors.
#[derive(Debug, Error)]
pub enum PersistError {
    /// File system failure.
    ///
    /// ## When This Occurs
    /// - Data directory can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON could not be parsed or produced.
    ///
    /// ## When This Occurs
    /// - History slot holds something other than a batch array
    /// - Catalog file is not a `{specs, bottleRules}` document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// CSV writer failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A lock guarding shared state was poisoned.
    #[error("Store lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

impl PersistError {
    /// Maps a failed read into the engine's view.
    ///
    /// ```text
    /// Json            → StoreError::Malformed
    /// everything else → StoreError::Unavailable
    /// ```
    pub fn into_load_error(self) -> StoreError {
        match self {
            PersistError::Json(err) => StoreError::Malformed(err.to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }

    /// Maps a failed write into the engine's view.
    pub fn into_save_error(self) -> StoreError {
        StoreError::WriteFailed(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_failure_is_malformed() {
        let err = serde_json::from_str::<Vec<u32>>("{").unwrap_err();
        assert!(matches!(
            PersistError::from(err).into_load_error(),
            StoreError::Malformed(_)
        ));
    }

    #[test]
    fn test_io_failure_is_unavailable() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            PersistError::from(err).into_load_error(),
            StoreError::Unavailable(_)
        ));
        let err = std::io::Error::new(std::io::ErrorKind::Other, "full");
        assert!(matches!(
            PersistError::from(err).into_save_error(),
            StoreError::WriteFailed(_)
        ));
    }
}
