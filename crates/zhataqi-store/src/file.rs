//! # JSON File Store
//!
//! A [`HistoryStore`] that keeps the slot in `<dir>/<slot>.json`.
//!
//! ## Write Path
//! ```text
//! save(batches)
//!     │
//!     ▼
//! <slot>.json.tmp  ◄── full JSON array written and flushed
//!     │
//!     ▼  rename (atomic on the same file system)
//! <slot>.json
//! ```
//! A crash mid-write leaves the previous file intact.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zhataqi_core::{Batch, HistoryStore, StoreError};

use crate::error::{PersistError, PersistResult};
use crate::slot::{decode_batches, encode_batches};

/// History slot backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Slot `slot` inside directory `dir`. Nothing is touched until first use.
    pub fn new(dir: impl AsRef<Path>, slot: &str) -> Self {
        JsonFileStore {
            path: dir.as_ref().join(format!("{}.json", slot)),
        }
    }

    /// Path of the slot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> PersistResult<Vec<Batch>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => decode_batches(&raw),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, batches: &[Batch]) -> PersistResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let payload = encode_batches(batches)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(payload.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Batch>, StoreError> {
        self.read().map_err(PersistError::into_load_error)
    }

    fn save(&mut self, batches: &[Batch]) -> Result<(), StoreError> {
        self.write(batches).map_err(PersistError::into_save_error)?;
        debug!(path = %self.path.display(), batches = batches.len(), "History saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use zhataqi_core::calculator::{Selection, WeightSelection};
    use zhataqi_core::{Catalog, History, Money, ProductSpec, Session};

    fn catalog() -> Catalog {
        Catalog::load(zhataqi_core::CatalogDocument {
            specs: vec![ProductSpec {
                id: "900".to_string(),
                name: "900".to_string(),
                roots_per_jin: 900,
                roots_per_gram_min: 1.8,
                roots_per_gram_max: 1.8,
                nagqu_price: Money::from_yuan(150),
                channel_price: Money::from_yuan(220),
                min_sales_price: Money::from_yuan(280),
                retail_price: Money::from_yuan(350),
            }],
            bottle_rules: vec![],
        })
        .catalog
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "packaging_history");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_history_survives_reopen() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data"), "packaging_history");

        let mut session = Session::new(catalog(), store.clone());
        let selection = Selection::Weight(WeightSelection {
            grams_per_box: 100.0,
            quantity: 2,
        });
        session.add("900", &selection).unwrap();
        let batch_id = session.commit().unwrap().id().to_string();

        let reopened = History::open(store.clone());
        assert_eq!(reopened.batches().len(), 1);
        assert_eq!(reopened.batches()[0].id(), batch_id);
        // 100 g × 1.8 = 180 roots per box, two boxes
        assert_eq!(reopened.batches()[0].items()[0].total_roots, 360);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_malformed() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "packaging_history");
        fs::write(store.path(), "[{\"id\": 3").unwrap();

        assert!(matches!(store.load(), Err(StoreError::Malformed(_))));
        let history = History::open(store);
        assert!(history.batches().is_empty());
        assert!(history.load_failure().is_some());
    }
}
