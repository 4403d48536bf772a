//! Payload encoding shared by every history slot.
//!
//! A slot holds one JSON array of batches, exactly as the browser build kept
//! it under `packaging_history`. Blank content reads as an empty history.

use zhataqi_core::Batch;

use crate::error::PersistResult;

/// Parses slot content.
pub fn decode_batches(raw: &str) -> PersistResult<Vec<Batch>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

/// Serializes a batch list for storage.
pub fn encode_batches(batches: &[Batch]) -> PersistResult<String> {
    Ok(serde_json::to_string(batches)?)
}
