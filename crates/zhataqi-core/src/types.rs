//! # Domain Types
//!
//! Catalog records and packaging vocabulary shared by every module.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌───────────────────────┐        ┌───────────────────────────┐        │
//! │  │     ProductSpec       │ 1    1 │       BottleRule          │        │
//! │  │  ───────────────────  │◄───────│  ───────────────────────  │        │
//! │  │  id ("1600-1800")     │ specId │  smallBottleCount         │        │
//! │  │  rootsPerJin          │        │  mediumBottleCount        │        │
//! │  │  rootsPerGramMin/Max  │        │  smallBottlesSmallBox[]   │        │
//! │  │  nagqu/channel/       │        │  smallBottlesLargeBox[]   │        │
//! │  │  minSales/retail      │        │  mediumBottlesPerBox[]    │        │
//! │  └───────────────────────┘        └───────────────────────────┘        │
//! │                                                                         │
//! │  CatalogDocument { specs[], bottleRules[] }  ← config.json shape        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::{PRICE_FLOOR_DENOMINATOR, PRICE_FLOOR_NUMERATOR, TIER_A_MAX_ROOTS_PER_JIN, TIER_B_MAX_ROOTS_PER_JIN};

/// Grade identifier, e.g. `"1000"` or `"1600-1800"`.
pub type SpecId = String;

// =============================================================================
// Product Spec
// =============================================================================

/// Pricing and density record for one grade.
///
/// All four prices are per root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductSpec {
    /// Unique grade key.
    pub id: SpecId,

    /// Display name.
    pub name: String,

    /// Nominal roots per jin (500 g). Only picks the packaging tier.
    pub roots_per_jin: u32,

    /// Lower bound of the density range (roots per gram).
    pub roots_per_gram_min: f64,

    /// Upper bound of the density range (roots per gram).
    pub roots_per_gram_max: f64,

    /// 那曲发货价.
    #[serde(deserialize_with = "crate::money::deserialize_exact")]
    #[ts(type = "number")]
    pub nagqu_price: Money,

    /// 藏境发货价.
    #[serde(deserialize_with = "crate::money::deserialize_exact")]
    #[ts(type = "number")]
    pub channel_price: Money,

    /// 最低销售限价. Expected to be at least 80% of retail.
    #[serde(deserialize_with = "crate::money::deserialize_exact")]
    #[ts(type = "number")]
    pub min_sales_price: Money,

    /// 建议零售价.
    #[serde(deserialize_with = "crate::money::deserialize_exact")]
    #[ts(type = "number")]
    pub retail_price: Money,
}

impl ProductSpec {
    /// Midpoint of the density range, used for weight-mode conversion.
    #[inline]
    pub fn avg_roots_per_gram(&self) -> f64 {
        (self.roots_per_gram_min + self.roots_per_gram_max) / 2.0
    }

    /// Density range as shown on records, e.g. `3.4-3.8` or `2` when min == max.
    pub fn density_label(&self) -> String {
        if self.roots_per_gram_min == self.roots_per_gram_max {
            format!("{}", self.roots_per_gram_min)
        } else {
            format!("{}-{}", self.roots_per_gram_min, self.roots_per_gram_max)
        }
    }

    /// Lowest acceptable `min_sales_price`: 80% of retail.
    pub fn min_sales_floor(&self) -> Money {
        let floor = self.retail_price.fen() as i128 * PRICE_FLOOR_NUMERATOR as i128
            / PRICE_FLOOR_DENOMINATOR as i128;
        // At most the retail price itself, so it fits back into i64.
        Money::from_fen(floor as i64)
    }

    /// True when `min_sales_price < retail_price × 0.8`.
    ///
    /// Advisory only: an invalid price never blocks updates or calculations.
    ///
    /// ## Example
    /// ```rust
    /// use zhataqi_core::{Money, ProductSpec};
    ///
    /// let mut spec = ProductSpec {
    ///     id: "1600-1800".into(),
    ///     name: "1600-1800".into(),
    ///     roots_per_jin: 1700,
    ///     roots_per_gram_min: 3.4,
    ///     roots_per_gram_max: 3.8,
    ///     nagqu_price: Money::from_yuan(47),
    ///     channel_price: Money::from_yuan(65),
    ///     min_sales_price: Money::from_yuan(50),
    ///     retail_price: Money::from_yuan(100),
    /// };
    /// assert!(spec.is_price_invalid());
    ///
    /// spec.min_sales_price = Money::from_yuan(85);
    /// assert!(!spec.is_price_invalid());
    /// ```
    pub fn is_price_invalid(&self) -> bool {
        !self.min_sales_price.meets_floor(
            self.retail_price,
            PRICE_FLOOR_NUMERATOR,
            PRICE_FLOOR_DENOMINATOR,
        )
    }

    /// Packaging colour recommendation for this grade.
    #[inline]
    pub fn packaging_tier(&self) -> PackagingTier {
        PackagingTier::from_roots_per_jin(self.roots_per_jin)
    }
}

// =============================================================================
// Bottle Rule
// =============================================================================

/// Packaging geometry for one grade.
///
/// The box option lists hold the "bottles per box" choices offered for each
/// shape. Loose bottles (`1`) are always allowed in addition to these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BottleRule {
    /// Spec this rule belongs to.
    pub spec_id: SpecId,

    /// Roots per small bottle.
    pub small_bottle_count: u32,

    /// Roots per medium bottle.
    pub medium_bottle_count: u32,

    /// Small bottles per small box, e.g. `[2, 3, 4]`.
    #[serde(default)]
    pub small_bottles_small_box: Vec<u32>,

    /// Small bottles per large box, e.g. `[8, 10]`.
    #[serde(default)]
    pub small_bottles_large_box: Vec<u32>,

    /// Medium bottles per box, e.g. `[5]`.
    #[serde(default)]
    pub medium_bottles_per_box: Vec<u32>,
}

impl BottleRule {
    /// Roots held by one bottle of the given size.
    #[inline]
    pub fn roots_per_bottle(&self, size: BottleSize) -> u32 {
        match size {
            BottleSize::Small => self.small_bottle_count,
            BottleSize::Medium => self.medium_bottle_count,
        }
    }
}

// =============================================================================
// Catalog Document
// =============================================================================

/// The configuration export format: `{ "specs": [...], "bottleRules": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    #[serde(default)]
    pub specs: Vec<ProductSpec>,

    #[serde(default)]
    pub bottle_rules: Vec<BottleRule>,
}

// =============================================================================
// Packaging Vocabulary
// =============================================================================

/// Bottle size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum BottleSize {
    Small,
    Medium,
}

impl BottleSize {
    /// Label used in records and exports.
    pub const fn label(&self) -> &'static str {
        match self {
            BottleSize::Small => "小瓶",
            BottleSize::Medium => "中瓶",
        }
    }
}

/// Box used for small bottles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum BoxVariant {
    SmallBox,
    LargeBox,
}

impl BoxVariant {
    /// Label used in records and exports.
    pub const fn label(&self) -> &'static str {
        match self {
            BoxVariant::SmallBox => "小盒",
            BoxVariant::LargeBox => "大盒",
        }
    }
}

/// Packaging paradigm of a queued item. Serialized as `bottle` / `box`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PackagingKind {
    /// Discrete bottles, optionally boxed.
    Bottle,
    /// Weighed gift box.
    Box,
}

/// Packaging colour recommendation derived from `roots_per_jin`.
///
/// ```text
/// roots_per_jin <= 1500  → A
/// roots_per_jin <= 2200  → B
/// otherwise              → C
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PackagingTier {
    A,
    B,
    C,
}

impl PackagingTier {
    /// Picks the tier for a nominal density.
    pub const fn from_roots_per_jin(roots_per_jin: u32) -> Self {
        if roots_per_jin <= TIER_A_MAX_ROOTS_PER_JIN {
            PackagingTier::A
        } else if roots_per_jin <= TIER_B_MAX_ROOTS_PER_JIN {
            PackagingTier::B
        } else {
            PackagingTier::C
        }
    }
}

impl fmt::Display for PackagingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackagingTier::A => write!(f, "A"),
            PackagingTier::B => write!(f, "B"),
            PackagingTier::C => write!(f, "C"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(min_sales: i64, retail: i64) -> ProductSpec {
        ProductSpec {
            id: "1000".to_string(),
            name: "1000".to_string(),
            roots_per_jin: 1000,
            roots_per_gram_min: 2.0,
            roots_per_gram_max: 2.0,
            nagqu_price: Money::from_yuan(137),
            channel_price: Money::from_yuan(195),
            min_sales_price: Money::from_yuan(min_sales),
            retail_price: Money::from_yuan(retail),
        }
    }

    #[test]
    fn test_price_floor() {
        assert!(spec(50, 100).is_price_invalid());
        assert!(!spec(85, 100).is_price_invalid());
        assert!(!spec(80, 100).is_price_invalid());
        assert_eq!(spec(50, 100).min_sales_floor(), Money::from_yuan(80));
    }

    #[test]
    fn test_spec_json_refuses_sub_fen_price() {
        let json = r#"{
            "id": "x", "name": "x", "rootsPerJin": 1000,
            "rootsPerGramMin": 2, "rootsPerGramMax": 2,
            "nagquPrice": 137, "channelPrice": 195,
            "minSalesPrice": 240, "retailPrice": 0.125
        }"#;
        assert!(serde_json::from_str::<ProductSpec>(json).is_err());

        let whole = json.replace("0.125", "300.5");
        let parsed: ProductSpec = serde_json::from_str(&whole).unwrap();
        assert_eq!(parsed.retail_price.fen(), 30050);
    }

    #[test]
    fn test_density() {
        let mut s = spec(240, 300);
        assert_eq!(s.avg_roots_per_gram(), 2.0);
        assert_eq!(s.density_label(), "2");

        s.roots_per_gram_min = 3.4;
        s.roots_per_gram_max = 3.8;
        assert!((s.avg_roots_per_gram() - 3.6).abs() < 1e-9);
        assert_eq!(s.density_label(), "3.4-3.8");
    }

    #[test]
    fn test_packaging_tier_thresholds() {
        assert_eq!(PackagingTier::from_roots_per_jin(900), PackagingTier::A);
        assert_eq!(PackagingTier::from_roots_per_jin(1500), PackagingTier::A);
        assert_eq!(PackagingTier::from_roots_per_jin(1501), PackagingTier::B);
        assert_eq!(PackagingTier::from_roots_per_jin(2200), PackagingTier::B);
        assert_eq!(PackagingTier::from_roots_per_jin(2350), PackagingTier::C);
    }

    #[test]
    fn test_spec_json_shape() {
        let json = serde_json::to_value(spec(240, 300)).unwrap();
        assert_eq!(json["rootsPerGramMin"], 2.0);
        assert_eq!(json["nagquPrice"], 137);
        assert_eq!(json["minSalesPrice"], 240);
        assert!(json.get("roots_per_jin").is_none());
    }

    #[test]
    fn test_rule_json_shape() {
        let rule: BottleRule = serde_json::from_str(
            r#"{"specId":"1000","smallBottleCount":5,"mediumBottleCount":12,
                "smallBottlesSmallBox":[2,3,4],"smallBottlesLargeBox":[8,10],
                "mediumBottlesPerBox":[5]}"#,
        )
        .unwrap();
        assert_eq!(rule.roots_per_bottle(BottleSize::Small), 5);
        assert_eq!(rule.roots_per_bottle(BottleSize::Medium), 12);
        assert_eq!(rule.small_bottles_large_box, vec![8, 10]);
    }
}
