//! # Session
//!
//! One operator session: the catalog, the pending queue and the history.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Session<S>                                                             │
//! │  ├── catalog: Catalog        (session configuration)                   │
//! │  ├── queue:   ItemQueue      (exclusive to this session)               │
//! │  └── history: History<S>     (process-wide, persisted through S)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation either fully applies or fails before touching state.

use tracing::debug;

use crate::batch::{Batch, History, HistoryStore};
use crate::calculator::{self, BottleShape, Calculation, Selection};
use crate::catalog::{Catalog, RulePatch, SpecPatch, SpecUpdate};
use crate::error::{CoreError, CoreResult};
use crate::queue::{ItemQueue, ProductionItem};
use crate::types::BottleRule;

pub struct Session<S: HistoryStore> {
    catalog: Catalog,
    queue: ItemQueue,
    history: History<S>,
}

impl<S: HistoryStore> Session<S> {
    /// Starts a session with an empty queue, reading history from `store`.
    pub fn new(catalog: Catalog, store: S) -> Self {
        Session {
            catalog,
            queue: ItemQueue::new(),
            history: History::open(store),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn update_spec(&mut self, spec_id: &str, patch: SpecPatch) -> CoreResult<SpecUpdate> {
        self.catalog.update(spec_id, patch)
    }

    pub fn update_rule(&mut self, spec_id: &str, patch: RulePatch) -> CoreResult<BottleRule> {
        self.catalog.update_rule(spec_id, patch).cloned()
    }

    /// Permitted box configs for a spec and shape.
    pub fn box_options(&self, spec_id: &str, shape: BottleShape) -> CoreResult<Vec<u32>> {
        let rule = self.catalog.lookup_rule(spec_id)?;
        Ok(calculator::box_options(rule, shape))
    }

    /// Prices a selection without queueing it.
    ///
    /// Weight mode only needs the spec; bottle mode also needs its rule.
    pub fn calculate(&self, spec_id: &str, selection: &Selection) -> CoreResult<Calculation> {
        let spec = self.catalog.lookup(spec_id)?;
        match selection {
            Selection::Bottle(bottle) => {
                let rule = self.catalog.lookup_rule(spec_id)?;
                calculator::compute_bottle(spec, rule, bottle)
            }
            Selection::Weight(weight) => Ok(calculator::compute_weight(spec, weight)?),
        }
    }

    /// Calculates and queues a selection.
    ///
    /// An item that would push the queue totals past the i64 range is
    /// refused with [`ValidationError::Overflow`](crate::ValidationError::Overflow)
    /// and nothing changes.
    pub fn add(&mut self, spec_id: &str, selection: &Selection) -> CoreResult<&ProductionItem> {
        let calc = self.calculate(spec_id, selection)?;
        Ok(self.queue.add(ProductionItem::from_calculation(&calc))?)
    }

    /// Removes a queued item; unknown ids are ignored.
    pub fn remove(&mut self, item_id: &str) -> Option<ProductionItem> {
        self.queue.remove(item_id)
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn queue(&self) -> &ItemQueue {
        &self.queue
    }

    /// Commits the queue as a new batch.
    ///
    /// The queue is emptied only after the history was persisted; if the save
    /// fails, the queue and the history both stay as they were.
    pub fn commit(&mut self) -> CoreResult<&Batch> {
        if self.queue.is_empty() {
            return Err(CoreError::EmptyQueue);
        }

        let batch = Batch::from_items(self.queue.items().to_vec())?;
        let batch = self.history.append(batch)?;
        self.queue.clear();

        debug!(batch_id = %batch.id(), items = batch.item_count(), "Queue committed");
        Ok(batch)
    }

    pub fn clear_history(&mut self) -> CoreResult<()> {
        self.history.clear()
    }

    pub fn history(&self) -> &History<S> {
        &self.history
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
