//! # Item Queue
//!
//! Calculated line items waiting to be committed as a batch.
//!
//! ## Queue Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Queue Operations                                     │
//! │                                                                         │
//! │  Operator Action          Operation               Queue Change          │
//! │  ───────────────          ─────────               ────────────          │
//! │                                                                         │
//! │  加入待办列表 ────────────► add(item) ────────────► items.push(item)     │
//! │                           (sums would overflow:                         │
//! │                            ValidationError, queue untouched)            │
//! │                                                                         │
//! │  Delete row ─────────────► remove(id) ───────────► items.retain(..)    │
//! │                           (absent id: no-op)                            │
//! │                                                                         │
//! │  Clear ──────────────────► clear() ──────────────► items.clear()       │
//! │                                                                         │
//! │  Totals panel ───────────► totals() ─────────────► (read only,         │
//! │                                                     kept in step)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;
use uuid::Uuid;

use crate::calculator::Calculation;
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{PackagingKind, PackagingTier};
use crate::validation::ValidationResult;

// =============================================================================
// Production Item
// =============================================================================

/// One calculation accepted into the queue.
///
/// ## Design Notes
/// Every descriptive field is frozen at add time. Later catalog edits do not
/// touch queued or committed items, and `details` alone is enough to read a
/// historical record.
///
/// The optional descriptors are absent on records written by older versions;
/// they load as `None` and export as `-`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductionItem {
    /// Unique id, generated at add time.
    pub id: String,

    pub spec_name: String,

    /// `bottle` or `box`.
    #[serde(rename = "type")]
    pub kind: PackagingKind,

    pub details: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottle_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging_color: Option<PackagingTier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots_per_bottle: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<f64>")]
    pub bottle_count: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots_per_gram: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecommerce_spec: Option<String>,

    #[ts(type = "number")]
    pub total_roots: i64,

    #[ts(type = "number")]
    pub total_nagqu_price: Money,

    #[ts(type = "number")]
    pub total_channel_price: Money,

    #[ts(type = "number")]
    pub total_retail: Money,

    /// Milliseconds since the Unix epoch.
    #[ts(type = "number")]
    pub timestamp: i64,
}

impl ProductionItem {
    /// Freezes a calculation into a queue item with a fresh id and timestamp.
    pub fn from_calculation(calc: &Calculation) -> Self {
        ProductionItem {
            id: Uuid::new_v4().to_string(),
            spec_name: calc.spec_name.clone(),
            kind: calc.kind(),
            details: calc.details.clone(),
            bottle_type: calc.bottle_type().map(str::to_string),
            box_type: Some(calc.box_type()),
            packaging_color: calc.packaging_color,
            roots_per_bottle: calc.roots_per_bottle(),
            bottle_count: calc.bottle_count(),
            roots_per_gram: Some(calc.roots_per_gram.clone()),
            ecommerce_spec: Some(calc.ecommerce_spec.clone()),
            total_roots: calc.total_roots,
            total_nagqu_price: calc.total_nagqu_price,
            total_channel_price: calc.total_channel_price,
            total_retail: calc.total_retail,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// This item's three price figures.
    pub fn totals(&self) -> PriceTotals {
        PriceTotals {
            total_nagqu_price: self.total_nagqu_price,
            total_channel_price: self.total_channel_price,
            total_retail: self.total_retail,
        }
    }
}

// =============================================================================
// Price Totals
// =============================================================================

/// Sums of the three price figures over a set of items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTotals {
    pub total_nagqu_price: Money,
    pub total_channel_price: Money,
    pub total_retail: Money,
}

impl PriceTotals {
    /// Field-wise sum over `items`.
    ///
    /// ## Errors
    /// [`ValidationError::Overflow`] when any of the three sums leaves the
    /// i64 fen range.
    pub fn over<'a, I>(items: I) -> ValidationResult<Self>
    where
        I: IntoIterator<Item = &'a ProductionItem>,
    {
        items
            .into_iter()
            .try_fold(PriceTotals::default(), |acc, item| acc.checked_add(&item.totals()))
    }

    /// Field-wise overflow-checked addition.
    pub fn checked_add(&self, other: &PriceTotals) -> ValidationResult<Self> {
        let sum = |field: &str, a: Money, b: Money| {
            a.checked_add(b).ok_or_else(|| ValidationError::Overflow {
                field: field.to_string(),
            })
        };
        Ok(PriceTotals {
            total_nagqu_price: sum(
                "totalNagquPrice",
                self.total_nagqu_price,
                other.total_nagqu_price,
            )?,
            total_channel_price: sum(
                "totalChannelPrice",
                self.total_channel_price,
                other.total_channel_price,
            )?,
            total_retail: sum("totalRetail", self.total_retail, other.total_retail)?,
        })
    }

    /// Field-wise subtraction of a part already counted in `self`.
    fn without(&self, part: &PriceTotals) -> Self {
        PriceTotals {
            total_nagqu_price: self.total_nagqu_price - part.total_nagqu_price,
            total_channel_price: self.total_channel_price - part.total_channel_price,
            total_retail: self.total_retail - part.total_retail,
        }
    }
}

// =============================================================================
// Item Queue
// =============================================================================

/// The pending-items queue. Insertion order is display order.
///
/// ## Invariants
/// - Every queued item has non-negative roots and prices
/// - `totals` and `total_roots` equal the sums over `items` and fit in i64,
///   so a batch built from the queue never overflows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQueue {
    items: Vec<ProductionItem>,
    totals: PriceTotals,
    total_roots: i64,
}

impl ItemQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item and returns it.
    ///
    /// ## Errors
    /// - [`ValidationError::MustNotBeNegative`] for an item with negative
    ///   roots or prices
    /// - [`ValidationError::Overflow`] when the running sums would leave the
    ///   i64 range
    ///
    /// On error the queue is unchanged.
    pub fn add(&mut self, item: ProductionItem) -> ValidationResult<&ProductionItem> {
        for (field, negative) in [
            ("totalRoots", item.total_roots < 0),
            ("totalNagquPrice", item.total_nagqu_price.is_negative()),
            ("totalChannelPrice", item.total_channel_price.is_negative()),
            ("totalRetail", item.total_retail.is_negative()),
        ] {
            if negative {
                return Err(ValidationError::MustNotBeNegative {
                    field: field.to_string(),
                });
            }
        }

        let totals = self.totals.checked_add(&item.totals())?;
        let total_roots = self
            .total_roots
            .checked_add(item.total_roots)
            .ok_or_else(|| ValidationError::Overflow {
                field: "totalRoots".to_string(),
            })?;

        debug!(item_id = %item.id, spec = %item.spec_name, roots = item.total_roots, "Item queued");
        self.totals = totals;
        self.total_roots = total_roots;
        let index = self.items.len();
        self.items.push(item);
        Ok(&self.items[index])
    }

    /// Removes the item with `id`. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<ProductionItem> {
        let index = self.items.iter().position(|i| i.id == id)?;
        debug!(item_id = %id, "Item removed from queue");
        let item = self.items.remove(index);
        // Each part is non-negative and already inside the sums.
        self.totals = self.totals.without(&item.totals());
        self.total_roots -= item.total_roots;
        Some(item)
    }

    /// Empties the queue.
    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            debug!(items = self.items.len(), "Queue cleared");
        }
        self.items.clear();
        self.totals = PriceTotals::default();
        self.total_roots = 0;
    }

    /// Live totals over the queued items.
    pub fn totals(&self) -> PriceTotals {
        self.totals
    }

    /// Roots over the queued items.
    pub fn total_roots(&self) -> i64 {
        self.total_roots
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[ProductionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
