//! # In-Memory Store
//!
//! A [`HistoryStore`] kept in process memory.
//!
//! Clones share one slot, so a test can hand one clone to a session and
//! inspect or corrupt the slot through another.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;
use zhataqi_core::{Batch, HistoryStore, StoreError};

use crate::error::PersistError;
use crate::slot::{decode_batches, encode_batches};

#[derive(Debug, Default)]
struct Slot {
    raw: Option<String>,
    fail_writes: bool,
}

/// Process-memory history slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Slot>>,
}

impl MemoryStore {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-filled with raw content, e.g. to simulate a corrupt value.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        let store = Self::default();
        if let Ok(mut slot) = store.slot.lock() {
            slot.raw = Some(raw.into());
        }
        store
    }

    /// Makes every following save fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut slot) = self.slot.lock() {
            slot.fail_writes = fail;
        }
    }

    /// Current raw slot content, if anything was ever written.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.raw.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slot>, PersistError> {
        self.slot
            .lock()
            .map_err(|e| PersistError::LockPoisoned(e.to_string()))
    }
}

impl HistoryStore for MemoryStore {
    fn load(&self) -> Result<Vec<Batch>, StoreError> {
        let slot = self.lock().map_err(PersistError::into_load_error)?;
        match slot.raw.as_deref() {
            Some(raw) => decode_batches(raw).map_err(PersistError::into_load_error),
            None => Ok(Vec::new()),
        }
    }

    fn save(&mut self, batches: &[Batch]) -> Result<(), StoreError> {
        let mut slot = self.lock().map_err(PersistError::into_save_error)?;
        if slot.fail_writes {
            return Err(StoreError::WriteFailed("memory slot is read-only".to_string()));
        }

        slot.raw = Some(encode_batches(batches).map_err(PersistError::into_save_error)?);
        debug!(batches = batches.len(), "History saved to memory slot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zhataqi_core::{Catalog, CatalogDocument, History, Session};

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());

        store.save(&[]).unwrap();
        assert_eq!(store.raw().as_deref(), Some("[]"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_slot_falls_back_to_empty_history() {
        let history = History::open(MemoryStore::with_raw("[{\"id\":"));
        assert!(history.batches().is_empty());
        assert!(matches!(history.load_failure(), Some(StoreError::Malformed(_))));
    }

    #[test]
    fn test_failed_write_keeps_previous_content() {
        let store = MemoryStore::with_raw("[]");
        let observer = store.clone();
        let mut session = Session::new(Catalog::load(CatalogDocument::default()).catalog, store);

        observer.set_fail_writes(true);
        assert!(session.clear_history().is_err());
        assert_eq!(observer.raw().as_deref(), Some("[]"));

        observer.set_fail_writes(false);
        session.clear_history().unwrap();
    }
}
