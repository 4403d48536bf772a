//! # zhataqi-core: Packaging Configuration & Pricing Engine
//!
//! This crate is the **heart** of the 藏境扎塔奇 packaging tool. It turns a
//! (spec, packaging mode, shape, quantity) selection into root counts and
//! prices, and groups approved calculations into historical batches.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Zhataqi Packaging Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Front-end (CLI shell)                        │   │
//! │  │    Spec picker ──► Calculator ──► Queue ──► History / Export   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ zhataqi-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌──────────┐  │   │
//! │  │   │  catalog  │  │ calculator │  │   queue   │  │  batch   │  │   │
//! │  │   │  specs    │─►│ Selection  │─►│ Production│─►│  Batch   │  │   │
//! │  │   │  rules    │  │ Calculation│  │   Item    │  │  History │  │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └────┬─────┘  │   │
//! │  │                                                      │        │   │
//! │  │   NO FILES • NO DATABASE • NO NETWORK                │        │   │
//! │  └──────────────────────────────────────────────────────┼────────┘   │
//! │                                    HistoryStore trait   │            │
//! │  ┌──────────────────────────────────────────────────────▼────────┐   │
//! │  │                 zhataqi-store (Persistence Layer)             │   │
//! │  │        JSON slot file, SQLite slot, catalog file, CSV         │   │
//! │  └───────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog records and packaging vocabulary
//! - [`money`] - Money in integer fen
//! - [`error`] - Domain error types
//! - [`validation`] - Input and record validation
//! - [`catalog`] - Spec and bottle-rule registry
//! - [`calculator`] - Pure packaging calculation
//! - [`queue`] - Production items pending commit
//! - [`batch`] - Batches and the persisted history
//! - [`session`] - One operator session over all of the above
//!
//! ## Design Principles
//!
//! 1. **Pure Calculation**: same selection and catalog, same result
//! 2. **No I/O**: persistence goes through the [`batch::HistoryStore`] trait
//! 3. **Integer Money**: prices and totals are fen (i64), never floats
//! 4. **Explicit Errors**: invalid input is a typed error, never clamped
//!
//! ## Example Usage
//!
//! ```rust
//! use zhataqi_core::calculator::{compute, BottleSelection, BottleShape, Selection};
//! use zhataqi_core::{BottleRule, BoxVariant, Money, ProductSpec};
//!
//! let spec = ProductSpec {
//!     id: "1000".into(),
//!     name: "1000".into(),
//!     roots_per_jin: 1000,
//!     roots_per_gram_min: 2.0,
//!     roots_per_gram_max: 2.0,
//!     nagqu_price: Money::from_yuan(137),
//!     channel_price: Money::from_yuan(195),
//!     min_sales_price: Money::from_yuan(240),
//!     retail_price: Money::from_yuan(300),
//! };
//! let rule = BottleRule {
//!     spec_id: "1000".into(),
//!     small_bottle_count: 5,
//!     medium_bottle_count: 12,
//!     small_bottles_small_box: vec![2, 3, 4],
//!     small_bottles_large_box: vec![8, 10],
//!     medium_bottles_per_box: vec![5],
//! };
//!
//! let selection = Selection::Bottle(BottleSelection {
//!     shape: BottleShape::Small(BoxVariant::SmallBox),
//!     box_config: 3,
//!     quantity: 2,
//! });
//! let calc = compute(&spec, &rule, &selection).unwrap();
//!
//! assert_eq!(calc.total_roots, 30);
//! assert_eq!(calc.total_retail, Money::from_yuan(9000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod calculator;
pub mod catalog;
pub mod error;
pub mod money;
pub mod queue;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use zhataqi_core::Money` instead of
// `use zhataqi_core::money::Money`

pub use batch::{Batch, History, HistoryStore};
pub use calculator::{Calculation, Selection};
pub use catalog::{Catalog, CatalogLoad, PriceWarning, RulePatch, SpecPatch, SpecUpdate};
pub use error::{ConfigurationError, CoreError, CoreResult, StoreError, ValidationError};
pub use money::Money;
pub use queue::{ItemQueue, PriceTotals, ProductionItem};
pub use session::Session;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum sales price must be at least `NUMERATOR / DENOMINATOR` of retail.
///
/// ## Business Reason
/// Channel partners may discount, but never below 80% of the suggested
/// retail price. Violations are flagged, not refused.
pub const PRICE_FLOOR_NUMERATOR: i64 = 8;

/// See [`PRICE_FLOOR_NUMERATOR`].
pub const PRICE_FLOOR_DENOMINATOR: i64 = 10;

/// Highest `roots_per_jin` that still gets tier A packaging.
pub const TIER_A_MAX_ROOTS_PER_JIN: u32 = 1500;

/// Highest `roots_per_jin` that still gets tier B packaging.
pub const TIER_B_MAX_ROOTS_PER_JIN: u32 = 2200;

/// Maximum length of a spec id.
pub const MAX_ID_LENGTH: usize = 50;

/// Name of the persisted history slot.
///
/// Existing deployments already hold their history under this key, so it
/// stays stable across versions.
pub const DEFAULT_HISTORY_SLOT: &str = "packaging_history";

/// Gift-box weights offered by the front-end, in grams.
///
/// Any positive weight is accepted by the calculator; these are shortcuts.
pub const GRAM_PRESETS: [u32; 2] = [50, 100];
