//! # zhataqi-store: Persistence & Export for the Packaging Engine
//!
//! Concrete [`HistoryStore`](zhataqi_core::HistoryStore) implementations and
//! every file format the tool reads or writes.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Zhataqi Data Flow                                │
//! │                                                                         │
//! │  Session::commit / clear_history                                       │
//! │       │  HistoryStore::save(all batches)                               │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   zhataqi-store (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │   │
//! │  │   │ History slot │   │   Catalog    │   │     Export       │  │   │
//! │  │   │              │   │              │   │                  │  │   │
//! │  │   │ MemoryStore  │   │ config.json  │   │ 生产记录_*.csv   │  │   │
//! │  │   │ JsonFileStore│   │ default (9)  │   │ BOM + header     │  │   │
//! │  │   │ SqliteStore  │   │              │   │                  │  │   │
//! │  │   └──────────────┘   └──────────────┘   └──────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  <data_dir>/packaging_history.json   or   <data_dir>/zhataqi.db        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`memory`] - In-process slot, shared between clones
//! - [`file`] - JSON file slot with atomic replace
//! - [`sqlite`] - Key-value row in SQLite
//! - [`catalog_file`] - Catalog import/export and the built-in catalog
//! - [`export`] - CSV production records
//! - [`error`] - Persistence error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use zhataqi_core::Session;
//! use zhataqi_store::{catalog_file, JsonFileStore};
//!
//! let load = catalog_file::load_catalog(None)?;
//! let store = JsonFileStore::new("./data", zhataqi_core::DEFAULT_HISTORY_SLOT);
//! let session = Session::new(load.catalog, store);
//! println!("{} batches on record", session.history().batches().len());
//! # Ok::<(), zhataqi_store::PersistError>(())
//! ```

pub mod catalog_file;
pub mod error;
pub mod export;
pub mod file;
pub mod memory;
mod slot;
pub mod sqlite;

pub use error::{PersistError, PersistResult};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
