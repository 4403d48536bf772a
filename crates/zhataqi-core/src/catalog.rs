//! # Catalog
//!
//! Registry of product specs and their bottle rules.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Catalog Lifecycle                                 │
//! │                                                                         │
//! │  1. LOAD                                                               │
//! │     └── Catalog::load(CatalogDocument) → CatalogLoad                   │
//! │         ├── valid records registered (document order kept)             │
//! │         ├── refused records reported as ConfigurationError             │
//! │         └── price-floor violations reported as PriceWarning            │
//! │                                                                         │
//! │  2. EDIT                                                               │
//! │     └── update(id, SpecPatch) → SpecUpdate { spec, is_price_invalid }  │
//! │     └── update_rule(id, RulePatch) → BottleRule                        │
//! │                                                                         │
//! │  3. EXPORT                                                             │
//! │     └── export() → CatalogDocument (round-trips through load)          │
//! │                                                                         │
//! │  Records are never deleted, only replaced wholesale.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ConfigurationError, CoreError, CoreResult};
use crate::money::Money;
use crate::types::{BottleRule, CatalogDocument, ProductSpec};
use crate::validation::{validate_bottle_rule, validate_product_spec};

// =============================================================================
// Load / Update Reports
// =============================================================================

/// Advisory notice that a spec's minimum sales price sits below 80% of retail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceWarning {
    pub spec_id: String,
    pub min_sales_price: Money,
    pub floor: Money,
}

impl PriceWarning {
    fn for_spec(spec: &ProductSpec) -> Option<Self> {
        spec.is_price_invalid().then(|| PriceWarning {
            spec_id: spec.id.clone(),
            min_sales_price: spec.min_sales_price,
            floor: spec.min_sales_floor(),
        })
    }
}

/// Result of [`Catalog::load`].
#[derive(Debug)]
pub struct CatalogLoad {
    /// The registry built from every accepted record.
    pub catalog: Catalog,

    /// Records that were refused, in document order.
    pub rejected: Vec<ConfigurationError>,

    /// Accepted specs whose minimum sales price is below the floor.
    pub price_warnings: Vec<PriceWarning>,
}

/// Result of a spec update: the stored record and its advisory flag.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecUpdate {
    pub spec: ProductSpec,
    pub is_price_invalid: bool,
}

// =============================================================================
// Patches
// =============================================================================

/// Field-wise edit of a spec. `None` leaves a field unchanged; the id is fixed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecPatch {
    pub name: Option<String>,
    pub roots_per_jin: Option<u32>,
    pub roots_per_gram_min: Option<f64>,
    pub roots_per_gram_max: Option<f64>,
    pub nagqu_price: Option<Money>,
    pub channel_price: Option<Money>,
    pub min_sales_price: Option<Money>,
    pub retail_price: Option<Money>,
}

impl SpecPatch {
    fn apply(self, spec: &mut ProductSpec) {
        if let Some(name) = self.name {
            spec.name = name;
        }
        if let Some(v) = self.roots_per_jin {
            spec.roots_per_jin = v;
        }
        if let Some(v) = self.roots_per_gram_min {
            spec.roots_per_gram_min = v;
        }
        if let Some(v) = self.roots_per_gram_max {
            spec.roots_per_gram_max = v;
        }
        if let Some(v) = self.nagqu_price {
            spec.nagqu_price = v;
        }
        if let Some(v) = self.channel_price {
            spec.channel_price = v;
        }
        if let Some(v) = self.min_sales_price {
            spec.min_sales_price = v;
        }
        if let Some(v) = self.retail_price {
            spec.retail_price = v;
        }
    }
}

/// Field-wise edit of a bottle rule. The spec id is fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulePatch {
    pub small_bottle_count: Option<u32>,
    pub medium_bottle_count: Option<u32>,
    pub small_bottles_small_box: Option<Vec<u32>>,
    pub small_bottles_large_box: Option<Vec<u32>>,
    pub medium_bottles_per_box: Option<Vec<u32>>,
}

impl RulePatch {
    fn apply(self, rule: &mut BottleRule) {
        if let Some(v) = self.small_bottle_count {
            rule.small_bottle_count = v;
        }
        if let Some(v) = self.medium_bottle_count {
            rule.medium_bottle_count = v;
        }
        if let Some(v) = self.small_bottles_small_box {
            rule.small_bottles_small_box = v;
        }
        if let Some(v) = self.small_bottles_large_box {
            rule.small_bottles_large_box = v;
        }
        if let Some(v) = self.medium_bottles_per_box {
            rule.medium_bottles_per_box = v;
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// The spec and bottle-rule registry.
///
/// ## Invariants
/// - Spec ids are unique
/// - Every rule's `spec_id` names a registered spec, at most one rule per spec
/// - Every stored record passes field validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    specs: Vec<ProductSpec>,
    rules: Vec<BottleRule>,
}

impl Catalog {
    /// Builds a registry from a configuration document.
    ///
    /// Offending records are refused and reported; the rest register.
    pub fn load(document: CatalogDocument) -> CatalogLoad {
        let mut catalog = Catalog::default();
        let mut rejected = Vec::new();

        for spec in document.specs {
            if catalog.spec_index(&spec.id).is_some() {
                rejected.push(ConfigurationError::DuplicateSpec(spec.id));
                continue;
            }
            if let Err(source) = validate_product_spec(&spec) {
                rejected.push(ConfigurationError::InvalidSpec {
                    id: spec.id,
                    source,
                });
                continue;
            }
            catalog.specs.push(spec);
        }

        for rule in document.bottle_rules {
            if catalog.spec_index(&rule.spec_id).is_none() {
                rejected.push(ConfigurationError::UnknownSpec(rule.spec_id));
                continue;
            }
            if catalog.rule_index(&rule.spec_id).is_some() {
                rejected.push(ConfigurationError::DuplicateRule(rule.spec_id));
                continue;
            }
            if let Err(source) = validate_bottle_rule(&rule) {
                rejected.push(ConfigurationError::InvalidRule {
                    spec_id: rule.spec_id,
                    source,
                });
                continue;
            }
            catalog.rules.push(rule);
        }

        for err in &rejected {
            warn!(error = %err, "Refused catalog record");
        }

        let price_warnings = catalog.price_warnings();
        for w in &price_warnings {
            warn!(
                spec_id = %w.spec_id,
                min_sales_price = %w.min_sales_price,
                floor = %w.floor,
                "Minimum sales price below 80% of retail"
            );
        }

        debug!(
            specs = catalog.specs.len(),
            rules = catalog.rules.len(),
            rejected = rejected.len(),
            "Catalog loaded"
        );

        CatalogLoad {
            catalog,
            rejected,
            price_warnings,
        }
    }

    /// Looks up a spec by id.
    pub fn lookup(&self, spec_id: &str) -> CoreResult<&ProductSpec> {
        self.spec_index(spec_id)
            .map(|i| &self.specs[i])
            .ok_or_else(|| CoreError::SpecNotFound(spec_id.to_string()))
    }

    /// Looks up the bottle rule of a spec.
    pub fn lookup_rule(&self, spec_id: &str) -> CoreResult<&BottleRule> {
        self.rule_index(spec_id)
            .map(|i| &self.rules[i])
            .ok_or_else(|| CoreError::RuleNotFound(spec_id.to_string()))
    }

    /// All specs in registration order.
    pub fn specs(&self) -> &[ProductSpec] {
        &self.specs
    }

    /// All bottle rules in registration order.
    pub fn rules(&self) -> &[BottleRule] {
        &self.rules
    }

    /// Applies a field-wise edit to a spec and re-derives its price flag.
    ///
    /// Field validation failures reject the edit and leave the record as it
    /// was. A price-floor violation does not.
    pub fn update(&mut self, spec_id: &str, patch: SpecPatch) -> CoreResult<SpecUpdate> {
        let index = self
            .spec_index(spec_id)
            .ok_or_else(|| CoreError::SpecNotFound(spec_id.to_string()))?;

        let mut next = self.specs[index].clone();
        patch.apply(&mut next);
        self.store_spec(index, next)
    }

    /// Replaces a spec record wholesale, matched by id.
    pub fn replace_spec(&mut self, spec: ProductSpec) -> CoreResult<SpecUpdate> {
        let index = self
            .spec_index(&spec.id)
            .ok_or_else(|| CoreError::SpecNotFound(spec.id.clone()))?;
        self.store_spec(index, spec)
    }

    /// Applies a field-wise edit to a bottle rule.
    pub fn update_rule(&mut self, spec_id: &str, patch: RulePatch) -> CoreResult<&BottleRule> {
        let index = self
            .rule_index(spec_id)
            .ok_or_else(|| CoreError::RuleNotFound(spec_id.to_string()))?;

        let mut next = self.rules[index].clone();
        patch.apply(&mut next);
        validate_bottle_rule(&next)?;

        debug!(spec_id = %spec_id, "Bottle rule updated");
        self.rules[index] = next;
        Ok(&self.rules[index])
    }

    /// Replaces a bottle rule wholesale, matched by spec id.
    pub fn replace_rule(&mut self, rule: BottleRule) -> CoreResult<&BottleRule> {
        let index = self
            .rule_index(&rule.spec_id)
            .ok_or_else(|| CoreError::RuleNotFound(rule.spec_id.clone()))?;
        validate_bottle_rule(&rule)?;

        self.rules[index] = rule;
        Ok(&self.rules[index])
    }

    /// Every registered spec currently below its price floor.
    pub fn price_warnings(&self) -> Vec<PriceWarning> {
        self.specs.iter().filter_map(PriceWarning::for_spec).collect()
    }

    /// Snapshot in the configuration export format.
    pub fn export(&self) -> CatalogDocument {
        CatalogDocument {
            specs: self.specs.clone(),
            bottle_rules: self.rules.clone(),
        }
    }

    fn store_spec(&mut self, index: usize, spec: ProductSpec) -> CoreResult<SpecUpdate> {
        validate_product_spec(&spec)?;

        let is_price_invalid = spec.is_price_invalid();
        if is_price_invalid {
            warn!(
                spec_id = %spec.id,
                min_sales_price = %spec.min_sales_price,
                floor = %spec.min_sales_floor(),
                "Minimum sales price below 80% of retail"
            );
        }
        debug!(spec_id = %spec.id, "Spec updated");

        self.specs[index] = spec.clone();
        Ok(SpecUpdate {
            spec,
            is_price_invalid,
        })
    }

    fn spec_index(&self, spec_id: &str) -> Option<usize> {
        self.specs.iter().position(|s| s.id == spec_id)
    }

    fn rule_index(&self, spec_id: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.spec_id == spec_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str, min_sales: i64, retail: i64) -> ProductSpec {
        ProductSpec {
            id: id.to_string(),
            name: id.to_string(),
            roots_per_jin: 1000,
            roots_per_gram_min: 2.0,
            roots_per_gram_max: 2.0,
            nagqu_price: Money::from_yuan(137),
            channel_price: Money::from_yuan(195),
            min_sales_price: Money::from_yuan(min_sales),
            retail_price: Money::from_yuan(retail),
        }
    }

    fn rule(spec_id: &str) -> BottleRule {
        BottleRule {
            spec_id: spec_id.to_string(),
            small_bottle_count: 5,
            medium_bottle_count: 12,
            small_bottles_small_box: vec![2, 3, 4],
            small_bottles_large_box: vec![8, 10],
            medium_bottles_per_box: vec![5],
        }
    }

    fn document() -> CatalogDocument {
        CatalogDocument {
            specs: vec![spec("1000", 240, 300), spec("1200", 180, 225)],
            bottle_rules: vec![rule("1000"), rule("1200")],
        }
    }

    #[test]
    fn test_load_and_lookup() {
        let load = Catalog::load(document());
        assert!(load.rejected.is_empty());
        assert!(load.price_warnings.is_empty());

        let catalog = load.catalog;
        assert_eq!(catalog.lookup("1200").unwrap().retail_price, Money::from_yuan(225));
        assert_eq!(catalog.lookup_rule("1000").unwrap().small_bottle_count, 5);
        assert!(matches!(catalog.lookup("9999"), Err(CoreError::SpecNotFound(_))));
        assert!(matches!(catalog.lookup_rule("9999"), Err(CoreError::RuleNotFound(_))));
    }

    #[test]
    fn test_load_refuses_offending_records() {
        let mut doc = document();
        doc.specs.push(spec("1000", 1, 1));
        doc.bottle_rules.push(rule("777"));
        doc.bottle_rules.push(rule("1200"));

        let load = Catalog::load(doc);
        assert_eq!(
            load.rejected,
            vec![
                ConfigurationError::DuplicateSpec("1000".to_string()),
                ConfigurationError::UnknownSpec("777".to_string()),
                ConfigurationError::DuplicateRule("1200".to_string()),
            ]
        );
        assert_eq!(load.catalog.specs().len(), 2);
        assert_eq!(load.catalog.rules().len(), 2);
        // The first record with a given id wins.
        assert_eq!(
            load.catalog.lookup("1000").unwrap().retail_price,
            Money::from_yuan(300)
        );
    }

    #[test]
    fn test_load_keeps_spec_with_price_warning() {
        let doc = CatalogDocument {
            specs: vec![spec("1600-1800", 50, 100)],
            bottle_rules: vec![],
        };
        let load = Catalog::load(doc);
        assert!(load.rejected.is_empty());
        assert_eq!(load.price_warnings.len(), 1);
        assert_eq!(load.price_warnings[0].floor, Money::from_yuan(80));
        assert!(load.catalog.lookup("1600-1800").is_ok());
    }

    #[test]
    fn test_update_flags_price_but_applies() {
        let mut catalog = Catalog::load(document()).catalog;

        let result = catalog
            .update(
                "1000",
                SpecPatch {
                    min_sales_price: Some(Money::from_yuan(50)),
                    retail_price: Some(Money::from_yuan(100)),
                    ..SpecPatch::default()
                },
            )
            .unwrap();
        assert!(result.is_price_invalid);
        assert_eq!(catalog.lookup("1000").unwrap().min_sales_price, Money::from_yuan(50));

        let result = catalog
            .update(
                "1000",
                SpecPatch {
                    min_sales_price: Some(Money::from_yuan(85)),
                    ..SpecPatch::default()
                },
            )
            .unwrap();
        assert!(!result.is_price_invalid);
        assert_eq!(catalog.price_warnings(), vec![]);
    }

    #[test]
    fn test_invalid_update_leaves_record_untouched() {
        let mut catalog = Catalog::load(document()).catalog;
        let before = catalog.lookup("1000").unwrap().clone();

        let err = catalog
            .update(
                "1000",
                SpecPatch {
                    roots_per_gram_min: Some(9.0),
                    ..SpecPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(catalog.lookup("1000").unwrap(), &before);
    }

    #[test]
    fn test_replace_spec_and_rule() {
        let mut catalog = Catalog::load(document()).catalog;

        let mut replacement = spec("1200", 100, 225);
        replacement.name = "1200特选".to_string();
        let result = catalog.replace_spec(replacement).unwrap();
        assert!(result.is_price_invalid);
        assert_eq!(catalog.lookup("1200").unwrap().name, "1200特选");

        assert!(matches!(
            catalog.replace_spec(spec("404", 1, 1)),
            Err(CoreError::SpecNotFound(_))
        ));

        let mut new_rule = rule("1200");
        new_rule.medium_bottles_per_box = vec![];
        catalog.replace_rule(new_rule).unwrap();
        assert!(catalog.lookup_rule("1200").unwrap().medium_bottles_per_box.is_empty());
    }

    #[test]
    fn test_update_rule() {
        let mut catalog = Catalog::load(document()).catalog;

        let updated = catalog
            .update_rule(
                "1000",
                RulePatch {
                    small_bottles_large_box: Some(vec![6, 12]),
                    ..RulePatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.small_bottles_large_box, vec![6, 12]);

        let err = catalog
            .update_rule(
                "1000",
                RulePatch {
                    small_bottle_count: Some(0),
                    ..RulePatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(catalog.lookup_rule("1000").unwrap().small_bottle_count, 5);
    }

    #[test]
    fn test_export_round_trip() {
        let catalog = Catalog::load(document()).catalog;
        let json = serde_json::to_string_pretty(&catalog.export()).unwrap();
        let reloaded: CatalogDocument = serde_json::from_str(&json).unwrap();

        assert_eq!(reloaded, document());
        assert_eq!(Catalog::load(reloaded).catalog, catalog);
    }
}
