//! # Batch & History
//!
//! Committed batches and the persisted, newest-first history list.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Commit Flow                                     │
//! │                                                                         │
//! │  ItemQueue (n items)                                                   │
//! │       │                                                                 │
//! │       │  n == 0 ─────────────────────► CoreError::EmptyQueue           │
//! │       ▼                                 (nothing changes)              │
//! │  Batch { id, date, items (frozen copy), itemCount, 3 sums }            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  History::append ── [batch, ..old] ──► HistoryStore::save(all)         │
//! │       │                                     │                           │
//! │       │                         failed ─────┴──► in-memory unchanged   │
//! │       ▼                                                                 │
//! │  history = [batch, ..old]                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Aggregates
//! `itemCount` and the three totals are derived from `items` and never
//! trusted from disk: a stored batch is rebuilt through [`BatchRecord`] on
//! load, which recomputes them. A stored batch whose sums leave the i64 range
//! fails to load rather than wrapping.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, StoreError, ValidationError};
use crate::money::Money;
use crate::queue::{PriceTotals, ProductionItem};
use crate::validation::ValidationResult;

/// Display format of a batch date, e.g. `2024/3/7 14:05:09`.
pub const BATCH_DATE_FORMAT: &str = "%Y/%-m/%-d %H:%M:%S";

// =============================================================================
// Batch
// =============================================================================

/// An immutable group of committed items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", try_from = "BatchRecord")]
pub struct Batch {
    id: String,
    date: String,
    items: Vec<ProductionItem>,

    #[ts(type = "number")]
    total_nagqu_price: Money,

    #[ts(type = "number")]
    total_channel_price: Money,

    #[ts(type = "number")]
    total_retail: Money,

    item_count: usize,

    #[serde(skip)]
    #[ts(skip)]
    total_roots: i64,
}

/// Stored shape of a batch. Only the identity and the items are read.
#[derive(Deserialize)]
struct BatchRecord {
    id: String,
    date: String,
    #[serde(default)]
    items: Vec<ProductionItem>,
}

impl TryFrom<BatchRecord> for Batch {
    type Error = ValidationError;

    fn try_from(record: BatchRecord) -> Result<Self, Self::Error> {
        Batch::assemble(record.id, record.date, record.items)
    }
}

impl Batch {
    /// Builds a batch from `items`, stamped with a fresh id and the local time.
    ///
    /// ## Errors
    /// [`CoreError::EmptyQueue`] when `items` is empty.
    pub fn from_items(items: Vec<ProductionItem>) -> CoreResult<Self> {
        Self::from_items_at(items, Local::now())
    }

    /// Like [`Batch::from_items`] with an explicit commit time.
    ///
    /// ## Errors
    /// [`CoreError::EmptyQueue`] for no items, [`CoreError::Validation`] when
    /// the sums overflow.
    pub fn from_items_at(items: Vec<ProductionItem>, at: DateTime<Local>) -> CoreResult<Self> {
        if items.is_empty() {
            return Err(CoreError::EmptyQueue);
        }

        Ok(Self::assemble(
            Uuid::new_v4().to_string(),
            at.format(BATCH_DATE_FORMAT).to_string(),
            items,
        )?)
    }

    fn assemble(id: String, date: String, items: Vec<ProductionItem>) -> ValidationResult<Self> {
        let totals = PriceTotals::over(&items)?;
        let total_roots = items
            .iter()
            .try_fold(0i64, |acc, item| acc.checked_add(item.total_roots))
            .ok_or_else(|| ValidationError::Overflow {
                field: "totalRoots".to_string(),
            })?;

        Ok(Batch {
            id,
            date,
            item_count: items.len(),
            total_nagqu_price: totals.total_nagqu_price,
            total_channel_price: totals.total_channel_price,
            total_retail: totals.total_retail,
            total_roots,
            items,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Commit time as displayed.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn items(&self) -> &[ProductionItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// The three aggregate sums.
    pub fn totals(&self) -> PriceTotals {
        PriceTotals {
            total_nagqu_price: self.total_nagqu_price,
            total_channel_price: self.total_channel_price,
            total_retail: self.total_retail,
        }
    }

    /// Sum of `total_roots` over the items.
    pub fn total_roots(&self) -> i64 {
        self.total_roots
    }
}

// =============================================================================
// History Store
// =============================================================================

/// A single named slot holding the full batch list.
///
/// Written wholesale on every mutation, read wholesale at startup.
pub trait HistoryStore {
    /// Reads the slot. A slot that was never written is an empty list.
    fn load(&self) -> Result<Vec<Batch>, StoreError>;

    /// Replaces the slot contents with `batches`.
    fn save(&mut self, batches: &[Batch]) -> Result<(), StoreError>;
}

impl<S: HistoryStore + ?Sized> HistoryStore for Box<S> {
    fn load(&self) -> Result<Vec<Batch>, StoreError> {
        (**self).load()
    }

    fn save(&mut self, batches: &[Batch]) -> Result<(), StoreError> {
        (**self).save(batches)
    }
}

// =============================================================================
// History
// =============================================================================

/// Newest-first list of committed batches, mirrored to a [`HistoryStore`].
///
/// ## Invariants
/// - Read once in [`History::open`]; afterwards memory is authoritative
/// - Every mutation is saved before it becomes visible in memory
pub struct History<S: HistoryStore> {
    store: S,
    batches: Vec<Batch>,
    load_failure: Option<StoreError>,
}

impl<S: HistoryStore> History<S> {
    /// Reads the store.
    ///
    /// An unreadable or malformed slot is NOT fatal: history starts empty, the
    /// failure is logged and kept in [`History::load_failure`].
    pub fn open(store: S) -> Self {
        match store.load() {
            Ok(batches) => {
                info!(batches = batches.len(), "History loaded");
                History {
                    store,
                    batches,
                    load_failure: None,
                }
            }
            Err(err) => {
                warn!(error = %err, "History unreadable, starting with an empty history");
                History {
                    store,
                    batches: Vec::new(),
                    load_failure: Some(err),
                }
            }
        }
    }

    /// Batches, newest first.
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// The error that forced an empty start, if any.
    pub fn load_failure(&self) -> Option<&StoreError> {
        self.load_failure.as_ref()
    }

    /// Prepends `batch` and persists the full list.
    ///
    /// On a failed save the in-memory history is left as it was.
    pub fn append(&mut self, batch: Batch) -> CoreResult<&Batch> {
        let mut next = Vec::with_capacity(self.batches.len() + 1);
        next.push(batch);
        next.extend(self.batches.iter().cloned());

        self.store.save(&next)?;
        self.batches = next;

        let newest = &self.batches[0];
        debug!(
            batch_id = %newest.id,
            items = newest.item_count,
            total_retail = %newest.total_retail,
            "Batch appended to history"
        );
        Ok(newest)
    }

    /// Replaces the history with an empty list and persists it.
    ///
    /// Clearing an already empty history succeeds.
    pub fn clear(&mut self) -> CoreResult<()> {
        self.store.save(&[])?;
        let dropped = self.batches.len();
        self.batches.clear();
        info!(batches = dropped, "History cleared");
        Ok(())
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PackagingKind;
    use chrono::TimeZone;

    #[derive(Default)]
    struct FakeStore {
        saved: Option<Vec<Batch>>,
        fail_load: bool,
        fail_save: bool,
        saves: usize,
    }

    impl HistoryStore for FakeStore {
        fn load(&self) -> Result<Vec<Batch>, StoreError> {
            if self.fail_load {
                return Err(StoreError::Malformed("expected value at line 1".to_string()));
            }
            Ok(self.saved.clone().unwrap_or_default())
        }

        fn save(&mut self, batches: &[Batch]) -> Result<(), StoreError> {
            if self.fail_save {
                return Err(StoreError::WriteFailed("quota exceeded".to_string()));
            }
            self.saves += 1;
            self.saved = Some(batches.to_vec());
            Ok(())
        }
    }

    fn item(id: &str, roots: i64) -> ProductionItem {
        ProductionItem {
            id: id.to_string(),
            spec_name: "1000".to_string(),
            kind: PackagingKind::Bottle,
            details: format!("[总根数:{}]", roots),
            bottle_type: Some("小瓶".to_string()),
            box_type: Some("小盒".to_string()),
            packaging_color: None,
            roots_per_bottle: Some(5),
            bottle_count: Some(roots / 5),
            roots_per_gram: Some("2".to_string()),
            ecommerce_spec: None,
            total_roots: roots,
            total_nagqu_price: Money::from_yuan(137).multiply_quantity(roots),
            total_channel_price: Money::from_yuan(195).multiply_quantity(roots),
            total_retail: Money::from_yuan(300).multiply_quantity(roots),
            timestamp: 1,
        }
    }

    #[test]
    fn test_batch_aggregates_match_items() {
        let batch = Batch::from_items(vec![item("a", 30), item("b", 400)]).unwrap();

        assert_eq!(batch.item_count(), 2);
        assert_eq!(batch.total_roots(), 430);
        let expected = PriceTotals::over(batch.items()).unwrap();
        assert_eq!(batch.totals(), expected);
        assert_eq!(batch.totals().total_retail, Money::from_yuan(129_000));
    }

    #[test]
    fn test_batch_date_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 14, 5, 9).unwrap();
        let batch = Batch::from_items_at(vec![item("a", 30)], at).unwrap();
        assert_eq!(batch.date(), "2024/3/7 14:05:09");
    }

    #[test]
    fn test_batch_keeps_item_order() {
        let batch = Batch::from_items(vec![item("a", 30), item("b", 60)]).unwrap();
        assert_eq!(batch.items()[0].id, "a");
        assert_eq!(batch.items()[1].id, "b");
    }

    #[test]
    fn test_empty_batch_is_refused() {
        assert!(matches!(Batch::from_items(vec![]), Err(CoreError::EmptyQueue)));
    }

    #[test]
    fn test_overflowing_batch_is_refused() {
        let roots = 180_000_000_000_000;
        let err = Batch::from_items(vec![item("a", roots), item("b", roots)]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Overflow { .. })
        ));
    }

    #[test]
    fn test_stored_batch_with_overflowing_sums_fails_to_load() {
        let huge = serde_json::to_value(item("a", 180_000_000_000_000)).unwrap();
        let json = serde_json::json!([{
            "id": "1", "date": "2024/3/7 14:05:09", "items": [huge.clone(), huge]
        }]);
        let err = serde_json::from_value::<Vec<Batch>>(json).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_load_recomputes_aggregates() {
        let json = r#"[{"id":"1700000000000","date":"2023/11/15 06:13:20",
            "items":[{"id":"x","specName":"1000","type":"bottle","details":"d",
                      "totalRoots":30,"totalNagquPrice":4110,"totalChannelPrice":5850,
                      "totalRetail":9000,"timestamp":1700000000000}],
            "totalNagquPrice":1,"totalChannelPrice":2,"totalRetail":3,"itemCount":9}]"#;

        let batches: Vec<Batch> = serde_json::from_str(json).unwrap();
        assert_eq!(batches[0].item_count(), 1);
        assert_eq!(batches[0].totals().total_retail, Money::from_yuan(9000));
        assert_eq!(batches[0].id(), "1700000000000");
    }

    #[test]
    fn test_batch_json_shape() {
        let batch = Batch::from_items(vec![item("a", 30)]).unwrap();
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["itemCount"], 1);
        assert_eq!(json["totalRetail"], 9000);
        assert_eq!(json["items"][0]["type"], "bottle");

        let back: Batch = serde_json::from_value(json).unwrap();
        assert_eq!(back, batch);
    }

    #[test]
    fn test_history_prepends_and_persists() {
        let mut history = History::open(FakeStore::default());
        let first = Batch::from_items(vec![item("a", 30)]).unwrap();
        let second = Batch::from_items(vec![item("b", 60)]).unwrap();
        let (first_id, second_id) = (first.id().to_string(), second.id().to_string());

        history.append(first).unwrap();
        history.append(second).unwrap();

        let ids: Vec<&str> = history.batches().iter().map(Batch::id).collect();
        assert_eq!(ids, vec![second_id.as_str(), first_id.as_str()]);
        assert_eq!(history.store().saved.as_deref(), Some(history.batches()));
        assert_eq!(history.store().saves, 2);
    }

    #[test]
    fn test_failed_save_leaves_history_untouched() {
        let mut history = History::open(FakeStore::default());
        history
            .append(Batch::from_items(vec![item("a", 30)]).unwrap())
            .unwrap();

        let mut failing = History {
            store: FakeStore {
                fail_save: true,
                ..FakeStore::default()
            },
            batches: history.batches().to_vec(),
            load_failure: None,
        };
        let err = failing
            .append(Batch::from_items(vec![item("b", 60)]).unwrap())
            .unwrap_err();
        assert!(matches!(err, CoreError::Storage(StoreError::WriteFailed(_))));
        assert_eq!(failing.batches().len(), 1);

        assert!(failing.clear().is_err());
        assert_eq!(failing.batches().len(), 1);
    }

    #[test]
    fn test_unreadable_history_starts_empty() {
        let history = History::open(FakeStore {
            fail_load: true,
            ..FakeStore::default()
        });
        assert!(history.batches().is_empty());
        assert!(matches!(history.load_failure(), Some(StoreError::Malformed(_))));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut history = History::open(FakeStore::default());
        history
            .append(Batch::from_items(vec![item("a", 30)]).unwrap())
            .unwrap();

        history.clear().unwrap();
        assert!(history.batches().is_empty());
        history.clear().unwrap();
        assert!(history.batches().is_empty());
        assert_eq!(history.store().saved, Some(vec![]));
    }
}
