//! # Error Types
//!
//! Domain-specific error types for zhataqi-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  zhataqi-core errors (this file)                                       │
//! │  ├── CoreError           - Anything an engine operation can return     │
//! │  ├── ValidationError     - Input outside the allowed domain            │
//! │  ├── ConfigurationError  - Catalog record refused at load time         │
//! │  └── StoreError          - History store failures                      │
//! │                                                                         │
//! │  zhataqi-store errors (separate crate)                                 │
//! │  └── PersistError        - io / json / sqlite / csv failures           │
//! │                                                                         │
//! │  Flow: PersistError → StoreError → CoreError → CLI                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Price-floor violations are NOT errors. They travel as
//! [`PriceWarning`](crate::catalog::PriceWarning) values next to successful
//! results.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No spec with this id is registered.
    #[error("Spec not found: {0}")]
    SpecNotFound(String),

    /// The spec exists but has no bottle rule.
    #[error("Bottle rule not found for spec: {0}")]
    RuleNotFound(String),

    /// A calculation was handed a rule that belongs to another spec.
    #[error("Bottle rule for {rule_spec_id} cannot price spec {spec_id}")]
    RuleMismatch {
        spec_id: String,
        rule_spec_id: String,
    },

    /// Commit attempted with nothing queued.
    ///
    /// ## User Workflow
    /// ```text
    /// Queue (0 items)
    ///      │
    ///      ▼
    /// commit() → EmptyQueue
    ///      │
    ///      ▼
    /// History untouched, nothing persisted
    /// ```
    #[error("Cannot commit an empty queue")]
    EmptyQueue,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// History store error (wraps StoreError).
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// The calculation is never performed when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Not a usable number (NaN, infinite, unparsable).
    #[error("{field} has invalid value: {reason}")]
    InvalidNumber { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Two related fields disagree.
    #[error("{field} is inconsistent: {reason}")]
    Inconsistent { field: String, reason: String },

    /// Arithmetic on the inputs would overflow.
    #[error("{field} is too large to calculate")]
    Overflow { field: String },
}

impl ValidationError {
    /// Creates a NotAllowed error from any displayable option list.
    pub fn not_allowed<T: ToString>(field: impl Into<String>, allowed: &[T]) -> Self {
        ValidationError::NotAllowed {
            field: field.into(),
            allowed: allowed.iter().map(ToString::to_string).collect(),
        }
    }
}

// =============================================================================
// Configuration Error
// =============================================================================

/// A catalog record that was refused at load time.
///
/// The offending record is skipped; every other record still registers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Two specs share an id; the later one is refused.
    #[error("Duplicate spec id '{0}'")]
    DuplicateSpec(String),

    /// A bottle rule points at a spec id that is not registered.
    #[error("Bottle rule references unknown spec '{0}'")]
    UnknownSpec(String),

    /// Two bottle rules target the same spec; the later one is refused.
    #[error("Duplicate bottle rule for spec '{0}'")]
    DuplicateRule(String),

    /// A spec record failed field validation.
    #[error("Spec '{id}' is invalid: {source}")]
    InvalidSpec {
        id: String,
        #[source]
        source: ValidationError,
    },

    /// A bottle rule failed field validation.
    #[error("Bottle rule for '{spec_id}' is invalid: {source}")]
    InvalidRule {
        spec_id: String,
        #[source]
        source: ValidationError,
    },
}

// =============================================================================
// Store Error
// =============================================================================

/// History store failures, as seen through the `HistoryStore` trait.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The backing medium could not be reached.
    #[error("History store unavailable: {0}")]
    Unavailable(String),

    /// The slot exists but does not hold a valid batch list.
    #[error("Stored history is malformed: {0}")]
    Malformed(String),

    /// Writing the slot failed; the previous contents are still in place.
    #[error("Failed to write history: {0}")]
    WriteFailed(String),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
