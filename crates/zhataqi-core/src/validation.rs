//! # Validation Module
//!
//! Input and record validation for the engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front-end (CLI / UI)                                         │
//! │  ├── Clamping and parsing (quantity >= 1, numeric fields)              │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Selection checks (quantity, grams, box option)                    │
//! │  └── Catalog record checks (prices, densities, bottle counts)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Calculator                                                   │
//! │  └── Overflow-checked arithmetic                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never clamps. A value outside the domain is an error here.
//!
//! ## Usage
//! ```rust
//! use zhataqi_core::validation::{validate_box_config, validate_quantity};
//!
//! assert!(validate_quantity(2).is_ok());
//! assert!(validate_quantity(0).is_err());
//! assert!(validate_box_config(3, &[2, 3, 4, 1]).is_ok());
//! assert!(validate_box_config(5, &[2, 3, 4, 1]).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{BottleRule, ProductSpec};
use crate::MAX_ID_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Selection Validators
// =============================================================================

/// Validates a box or bottle count.
///
/// ## Rules
/// - Must be at least 1
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 1 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates the gift-box weight in grams.
///
/// ## Rules
/// - Must be a finite number
/// - Must be greater than zero
pub fn validate_grams_per_box(grams: f64) -> ValidationResult<()> {
    if !grams.is_finite() {
        return Err(ValidationError::InvalidNumber {
            field: "gramsPerBox".to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    if grams <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "gramsPerBox".to_string(),
        });
    }

    Ok(())
}

/// Validates a bottles-per-box choice against the permitted options.
pub fn validate_box_config(box_config: u32, allowed: &[u32]) -> ValidationResult<()> {
    if !allowed.contains(&box_config) {
        return Err(ValidationError::not_allowed("boxConfig", allowed));
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates a spec id.
///
/// ## Rules
/// - Must not be blank
/// - At most 50 characters
pub fn validate_spec_id(id: &str) -> ValidationResult<()> {
    let trimmed = id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if trimmed.chars().count() > MAX_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max: MAX_ID_LENGTH,
        });
    }

    Ok(())
}

/// Validates a per-root price.
///
/// Zero is allowed; negative prices are not.
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a density range.
///
/// ## Rules
/// - Both bounds finite and positive
/// - `min <= max`
pub fn validate_density(min: f64, max: f64) -> ValidationResult<()> {
    for (field, value) in [("rootsPerGramMin", min), ("rootsPerGramMax", max)] {
        if !value.is_finite() {
            return Err(ValidationError::InvalidNumber {
                field: field.to_string(),
                reason: "must be a finite number".to_string(),
            });
        }
        if value <= 0.0 {
            return Err(ValidationError::MustBePositive {
                field: field.to_string(),
            });
        }
    }

    if min > max {
        return Err(ValidationError::Inconsistent {
            field: "rootsPerGram".to_string(),
            reason: format!("min {} exceeds max {}", min, max),
        });
    }

    Ok(())
}

/// Validates a full spec record.
///
/// The price floor is NOT checked here; it is advisory.
pub fn validate_product_spec(spec: &ProductSpec) -> ValidationResult<()> {
    validate_spec_id(&spec.id)?;

    if spec.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    validate_density(spec.roots_per_gram_min, spec.roots_per_gram_max)?;
    validate_price("nagquPrice", spec.nagqu_price)?;
    validate_price("channelPrice", spec.channel_price)?;
    validate_price("minSalesPrice", spec.min_sales_price)?;
    validate_price("retailPrice", spec.retail_price)?;

    Ok(())
}

/// Validates a full bottle rule.
///
/// ## Rules
/// - Both bottle capacities at least 1 root
/// - Every box option at least 1 bottle
/// - Empty option lists are fine (loose bottles only)
pub fn validate_bottle_rule(rule: &BottleRule) -> ValidationResult<()> {
    validate_spec_id(&rule.spec_id)?;

    for (field, count) in [
        ("smallBottleCount", rule.small_bottle_count),
        ("mediumBottleCount", rule.medium_bottle_count),
    ] {
        if count == 0 {
            return Err(ValidationError::MustBePositive {
                field: field.to_string(),
            });
        }
    }

    for (field, options) in [
        ("smallBottlesSmallBox", &rule.small_bottles_small_box),
        ("smallBottlesLargeBox", &rule.small_bottles_large_box),
        ("mediumBottlesPerBox", &rule.medium_bottles_per_box),
    ] {
        if options.contains(&0) {
            return Err(ValidationError::MustBePositive {
                field: field.to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
