//! # Packaging Calculator
//!
//! Pure mapping from a packaging selection to root counts and prices.
//!
//! ## Selection Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Selection                                       │
//! │                                                                         │
//! │  Bottle ─┬─ Small(SmallBox)  options: smallBottlesSmallBox ∪ {1}       │
//! │          ├─ Small(LargeBox)  options: smallBottlesLargeBox ∪ {1}       │
//! │          └─ Medium           options: mediumBottlesPerBox  ∪ {1}       │
//! │                                                                         │
//! │     totalBottles = quantity × boxConfig   (boxConfig 1 = loose)        │
//! │     totalRoots   = totalBottles × rootsPerBottle                        │
//! │                                                                         │
//! │  Weight ── gramsPerBox > 0                                             │
//! │                                                                         │
//! │     rootsPerBox  = round(gramsPerBox × avg(min, max))                  │
//! │     totalRoots   = rootsPerBox × quantity                              │
//! │                                                                         │
//! │  Both: total price = totalRoots × per-root price (exact, in fen)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here clamps. Out-of-domain input is a [`ValidationError`] and no
//! calculation is produced.

use serde::Serialize;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{BottleRule, BottleSize, BoxVariant, PackagingKind, PackagingTier, ProductSpec};
use crate::validation::{
    validate_box_config, validate_grams_per_box, validate_quantity, ValidationResult,
};

/// Box-config value meaning "not boxed".
pub const LOOSE: u32 = 1;

// =============================================================================
// Selection
// =============================================================================

/// Bottle size and, for small bottles, the box they go into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BottleShape {
    Small(BoxVariant),
    Medium,
}

impl BottleShape {
    /// Size of the bottle.
    pub const fn size(&self) -> BottleSize {
        match self {
            BottleShape::Small(_) => BottleSize::Small,
            BottleShape::Medium => BottleSize::Medium,
        }
    }

    /// The rule's option list for this shape (without the implicit loose choice).
    pub fn rule_options<'a>(&self, rule: &'a BottleRule) -> &'a [u32] {
        match self {
            BottleShape::Small(BoxVariant::SmallBox) => &rule.small_bottles_small_box,
            BottleShape::Small(BoxVariant::LargeBox) => &rule.small_bottles_large_box,
            BottleShape::Medium => &rule.medium_bottles_per_box,
        }
    }

    /// Box label used when the bottles are boxed.
    const fn box_label(&self) -> &'static str {
        match self {
            BottleShape::Small(variant) => variant.label(),
            BottleShape::Medium => "中瓶盒",
        }
    }
}

/// Bottle-mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BottleSelection {
    pub shape: BottleShape,
    /// Bottles per box; [`LOOSE`] means `quantity` counts bottles.
    pub box_config: u32,
    /// Boxes, or bottles when loose.
    pub quantity: i64,
}

/// Weight-mode selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSelection {
    pub grams_per_box: f64,
    pub quantity: i64,
}

/// What the operator picked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    Bottle(BottleSelection),
    Weight(WeightSelection),
}

impl Selection {
    /// Packaging paradigm of this selection.
    pub const fn kind(&self) -> PackagingKind {
        match self {
            Selection::Bottle(_) => PackagingKind::Bottle,
            Selection::Weight(_) => PackagingKind::Box,
        }
    }
}

// =============================================================================
// Calculation Result
// =============================================================================

/// Packaging breakdown of a calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Packaging {
    #[serde(rename_all = "camelCase")]
    Bottle {
        size: BottleSize,
        #[serde(skip_serializing_if = "Option::is_none")]
        box_variant: Option<BoxVariant>,
        roots_per_bottle: u32,
        box_config: u32,
        quantity: i64,
        total_bottles: i64,
    },
    #[serde(rename = "box", rename_all = "camelCase")]
    Weight {
        grams_per_box: f64,
        roots_per_box: i64,
        quantity: i64,
    },
}

/// Result of [`compute`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculation {
    pub spec_id: String,
    pub spec_name: String,
    pub packaging: Packaging,
    pub total_roots: i64,
    pub total_nagqu_price: Money,
    pub total_channel_price: Money,
    pub total_retail: Money,

    /// Self-describing record text: grade, density, packaging, counts, total.
    pub details: String,

    /// Density range label, e.g. `3.4-3.8`.
    pub roots_per_gram: String,

    /// Listing text for online shops.
    pub ecommerce_spec: String,

    /// Bottle mode only.
    pub packaging_color: Option<PackagingTier>,
}

impl Calculation {
    /// Packaging paradigm.
    pub const fn kind(&self) -> PackagingKind {
        match self.packaging {
            Packaging::Bottle { .. } => PackagingKind::Bottle,
            Packaging::Weight { .. } => PackagingKind::Box,
        }
    }

    /// `小瓶` / `中瓶`; `None` in weight mode.
    pub fn bottle_type(&self) -> Option<&'static str> {
        match &self.packaging {
            Packaging::Bottle { size, .. } => Some(size.label()),
            Packaging::Weight { .. } => None,
        }
    }

    /// Box description: `小盒`, `大盒`, `中瓶盒`, `散装`, or `50克礼盒`.
    pub fn box_type(&self) -> String {
        match &self.packaging {
            Packaging::Bottle { box_config, .. } if *box_config == LOOSE => "散装".to_string(),
            Packaging::Bottle {
                size, box_variant, ..
            } => match (size, box_variant) {
                (BottleSize::Small, Some(variant)) => variant.label().to_string(),
                _ => BottleShape::Medium.box_label().to_string(),
            },
            Packaging::Weight { grams_per_box, .. } => format!("{}克礼盒", grams_per_box),
        }
    }

    /// Roots per bottle; `None` in weight mode.
    pub fn roots_per_bottle(&self) -> Option<u32> {
        match &self.packaging {
            Packaging::Bottle {
                roots_per_bottle, ..
            } => Some(*roots_per_bottle),
            Packaging::Weight { .. } => None,
        }
    }

    /// Total bottles; `None` in weight mode.
    pub fn bottle_count(&self) -> Option<i64> {
        match &self.packaging {
            Packaging::Bottle { total_bottles, .. } => Some(*total_bottles),
            Packaging::Weight { .. } => None,
        }
    }

    /// Estimated roots per gift box; `None` in bottle mode.
    pub fn roots_per_box(&self) -> Option<i64> {
        match &self.packaging {
            Packaging::Weight { roots_per_box, .. } => Some(*roots_per_box),
            Packaging::Bottle { .. } => None,
        }
    }
}

// =============================================================================
// Box Options
// =============================================================================

/// Permitted `box_config` values for a shape: the rule's options in order,
/// then the loose choice.
///
/// ## Example
/// ```rust
/// use zhataqi_core::calculator::{box_options, BottleShape};
/// use zhataqi_core::{BottleRule, BoxVariant};
///
/// let rule = BottleRule {
///     spec_id: "900".into(),
///     small_bottle_count: 5,
///     medium_bottle_count: 12,
///     small_bottles_small_box: vec![2, 3, 4],
///     small_bottles_large_box: vec![8, 10],
///     medium_bottles_per_box: vec![],
/// };
/// assert_eq!(box_options(&rule, BottleShape::Small(BoxVariant::LargeBox)), vec![8, 10, 1]);
/// assert_eq!(box_options(&rule, BottleShape::Medium), vec![1]);
/// ```
pub fn box_options(rule: &BottleRule, shape: BottleShape) -> Vec<u32> {
    let mut options: Vec<u32> = Vec::new();
    for &option in shape.rule_options(rule) {
        if !options.contains(&option) {
            options.push(option);
        }
    }
    if !options.contains(&LOOSE) {
        options.push(LOOSE);
    }
    options
}

/// First listed option, or loose when the rule lists none.
pub fn default_box_config(rule: &BottleRule, shape: BottleShape) -> u32 {
    shape.rule_options(rule).first().copied().unwrap_or(LOOSE)
}

/// Keeps `current` if the new shape still offers it, otherwise falls back to
/// [`default_box_config`].
pub fn reconcile_box_config(rule: &BottleRule, shape: BottleShape, current: u32) -> u32 {
    if box_options(rule, shape).contains(&current) {
        current
    } else {
        default_box_config(rule, shape)
    }
}

// =============================================================================
// Compute
// =============================================================================

/// Calculates a selection against a spec and its bottle rule.
///
/// ## Errors
/// - [`CoreError::RuleMismatch`] if `rule` belongs to another spec
/// - [`CoreError::Validation`] for out-of-domain input or overflow
pub fn compute(spec: &ProductSpec, rule: &BottleRule, selection: &Selection) -> CoreResult<Calculation> {
    match selection {
        Selection::Bottle(bottle) => compute_bottle(spec, rule, bottle),
        Selection::Weight(weight) => {
            ensure_rule_matches(spec, rule)?;
            Ok(compute_weight(spec, weight)?)
        }
    }
}

/// Bottle-mode calculation.
pub fn compute_bottle(
    spec: &ProductSpec,
    rule: &BottleRule,
    selection: &BottleSelection,
) -> CoreResult<Calculation> {
    ensure_rule_matches(spec, rule)?;
    validate_quantity(selection.quantity)?;
    validate_box_config(selection.box_config, &box_options(rule, selection.shape))?;

    let size = selection.shape.size();
    let roots_per_bottle = rule.roots_per_bottle(size);

    let total_bottles = selection
        .quantity
        .checked_mul(i64::from(selection.box_config))
        .ok_or_else(|| overflow("quantity"))?;
    let total_roots = total_bottles
        .checked_mul(i64::from(roots_per_bottle))
        .ok_or_else(|| overflow("quantity"))?;

    let boxed = if selection.box_config > LOOSE {
        format!(
            "(共{}{}, 每盒{}瓶)",
            selection.quantity,
            match selection.shape {
                BottleShape::Small(variant) => variant.label(),
                BottleShape::Medium => "盒",
            },
            selection.box_config
        )
    } else {
        format!("({}瓶散装)", selection.quantity)
    };
    let details = format!(
        "规格:{} ({}根/克) - {} ({}根/瓶) x {}瓶 {} [总根数:{}]",
        spec.name,
        spec.density_label(),
        size.label(),
        roots_per_bottle,
        total_bottles,
        boxed,
        total_roots
    );

    let ecommerce_spec = if selection.box_config > LOOSE {
        format!(
            "{} {}根/瓶 {}瓶/盒",
            spec.name, roots_per_bottle, selection.box_config
        )
    } else {
        format!("{} {}根/瓶 单瓶", spec.name, roots_per_bottle)
    };

    let box_variant = match selection.shape {
        BottleShape::Small(variant) => Some(variant),
        BottleShape::Medium => None,
    };

    finish(
        spec,
        Packaging::Bottle {
            size,
            box_variant,
            roots_per_bottle,
            box_config: selection.box_config,
            quantity: selection.quantity,
            total_bottles,
        },
        total_roots,
        details,
        ecommerce_spec,
        Some(spec.packaging_tier()),
    )
    .map_err(CoreError::from)
}

/// Weight-mode calculation. Needs no bottle rule.
pub fn compute_weight(spec: &ProductSpec, selection: &WeightSelection) -> ValidationResult<Calculation> {
    validate_quantity(selection.quantity)?;
    let roots_per_box = estimate_roots_per_box(spec, selection.grams_per_box)?;

    let total_roots = roots_per_box
        .checked_mul(selection.quantity)
        .ok_or_else(|| overflow("quantity"))?;

    let details = format!(
        "规格:{} ({}根/克) - {}克礼盒 (约{}根) x {}盒 [总根数:{}]",
        spec.name,
        spec.density_label(),
        selection.grams_per_box,
        roots_per_box,
        selection.quantity,
        total_roots
    );
    let ecommerce_spec = format!(
        "{} {}克/盒 约{}根",
        spec.name, selection.grams_per_box, roots_per_box
    );

    finish(
        spec,
        Packaging::Weight {
            grams_per_box: selection.grams_per_box,
            roots_per_box,
            quantity: selection.quantity,
        },
        total_roots,
        details,
        ecommerce_spec,
        None,
    )
}

/// `round(grams × avg roots per gram)`, halves away from zero.
///
/// Also serves the "estimated roots" preview before a quantity is chosen.
pub fn estimate_roots_per_box(spec: &ProductSpec, grams_per_box: f64) -> ValidationResult<i64> {
    validate_grams_per_box(grams_per_box)?;

    let roots = (grams_per_box * spec.avg_roots_per_gram()).round();
    if !roots.is_finite() || roots >= i64::MAX as f64 {
        return Err(overflow("gramsPerBox"));
    }
    Ok(roots as i64)
}

fn finish(
    spec: &ProductSpec,
    packaging: Packaging,
    total_roots: i64,
    details: String,
    ecommerce_spec: String,
    packaging_color: Option<PackagingTier>,
) -> ValidationResult<Calculation> {
    let price = |per_root: Money| {
        per_root
            .checked_multiply_quantity(total_roots)
            .ok_or_else(|| overflow("totalRoots"))
    };

    Ok(Calculation {
        spec_id: spec.id.clone(),
        spec_name: spec.name.clone(),
        packaging,
        total_roots,
        total_nagqu_price: price(spec.nagqu_price)?,
        total_channel_price: price(spec.channel_price)?,
        total_retail: price(spec.retail_price)?,
        details,
        roots_per_gram: spec.density_label(),
        ecommerce_spec,
        packaging_color,
    })
}

fn ensure_rule_matches(spec: &ProductSpec, rule: &BottleRule) -> CoreResult<()> {
    if rule.spec_id != spec.id {
        return Err(CoreError::RuleMismatch {
            spec_id: spec.id.clone(),
            rule_spec_id: rule.spec_id.clone(),
        });
    }
    Ok(())
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
