//! # Catalog Files
//!
//! Reading and writing the `{ "specs": [...], "bottleRules": [...] }`
//! configuration document, plus the default catalog compiled into the binary.
//!
//! The export format is also the import format: a file written by
//! [`write_document`] can be handed to another installation as its catalog.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use zhataqi_core::{
    BottleRule, Catalog, CatalogDocument, CatalogLoad, ConfigurationError, ProductSpec,
    ValidationError,
};

use crate::error::PersistResult;

/// File name the front-end offers for configuration exports.
pub const CONFIG_EXPORT_FILE_NAME: &str = "config.json";

const DEFAULT_CONFIG: &str = include_str!("../assets/default_config.json");

/// The built-in catalog: nine grades from `900` to `2500-3000`.
pub fn default_document() -> PersistResult<CatalogDocument> {
    Ok(serde_json::from_str(DEFAULT_CONFIG)?)
}

/// Reads a catalog document from disk.
pub fn read_document(path: impl AsRef<Path>) -> PersistResult<CatalogDocument> {
    let raw = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&raw)?)
}

/// Pretty-printed JSON (two-space indent) of a catalog document.
pub fn to_pretty_json(document: &CatalogDocument) -> PersistResult<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Writes a catalog document as pretty-printed JSON.
pub fn write_document(path: impl AsRef<Path>, document: &CatalogDocument) -> PersistResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, to_pretty_json(document)?)?;
    info!(
        path = %path.display(),
        specs = document.specs.len(),
        rules = document.bottle_rules.len(),
        "Catalog exported"
    );
    Ok(())
}

/// Loads the catalog from `path`, or the built-in one when `path` is `None`.
///
/// Refused records and price warnings are reported in the returned
/// [`CatalogLoad`]; only an unreadable document is an error.
pub fn load_catalog(path: Option<&Path>) -> PersistResult<CatalogLoad> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog");
            parse_catalog(&fs::read_to_string(path)?)
        }
        None => parse_catalog(DEFAULT_CONFIG),
    }
}

/// Document shape with spec records left undecoded.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    #[serde(default)]
    specs: Vec<Value>,
    #[serde(default)]
    bottle_rules: Vec<BottleRule>,
}

/// Builds a catalog from a configuration document, one spec record at a time.
///
/// A spec that does not decode (for example a price finer than one fen) is
/// refused with [`ConfigurationError::InvalidSpec`] and the remaining records
/// still register. Malformed JSON overall is an error.
pub fn parse_catalog(raw: &str) -> PersistResult<CatalogLoad> {
    let document: RawDocument = serde_json::from_str(raw)?;

    let mut refused = Vec::new();
    let mut specs = Vec::with_capacity(document.specs.len());
    for value in document.specs {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match serde_json::from_value::<ProductSpec>(value) {
            Ok(spec) => specs.push(spec),
            Err(err) => {
                let err = ConfigurationError::InvalidSpec {
                    id,
                    source: ValidationError::InvalidNumber {
                        field: "spec".into(),
                        reason: err.to_string(),
                    },
                };
                warn!(error = %err, "Refused catalog record");
                refused.push(err);
            }
        }
    }

    let mut load = Catalog::load(CatalogDocument {
        specs,
        bottle_rules: document.bottle_rules,
    });
    refused.append(&mut load.rejected);
    load.rejected = refused;
    Ok(load)
}
