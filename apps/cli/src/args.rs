//! # Shared Arguments
//!
//! Argument groups used by both the one-shot commands and the shell, and their
//! conversion into engine requests.

use clap::{Args, Subcommand, ValueEnum};
use zhataqi_core::calculator::{
    default_box_config, reconcile_box_config, BottleSelection, BottleShape, WeightSelection,
};
use zhataqi_core::{
    BoxVariant, Catalog, CoreError, Money, RulePatch, Selection, SpecPatch, ValidationError,
    GRAM_PRESETS,
};

use crate::error::{CliError, CliResult};

// =============================================================================
// Packaging Selection
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SizeArg {
    /// 小瓶
    Small,
    /// 中瓶
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BoxArg {
    /// 小盒
    SmallBox,
    /// 大盒
    LargeBox,
}

/// Bottle size plus, for small bottles, the box variant.
pub fn shape(size: SizeArg, box_variant: BoxArg) -> BottleShape {
    match (size, box_variant) {
        (SizeArg::Small, BoxArg::SmallBox) => BottleShape::Small(BoxVariant::SmallBox),
        (SizeArg::Small, BoxArg::LargeBox) => BottleShape::Small(BoxVariant::LargeBox),
        (SizeArg::Medium, _) => BottleShape::Medium,
    }
}

#[derive(Debug, Clone, Args)]
pub struct BottleArgs {
    #[arg(long, value_enum, default_value_t = SizeArg::Small)]
    pub size: SizeArg,

    /// Box for small bottles (ignored for medium bottles)
    #[arg(long = "box", value_enum, default_value_t = BoxArg::SmallBox)]
    pub box_variant: BoxArg,

    /// Bottles per box; 1 means loose bottles. Defaults to the first option.
    #[arg(long)]
    pub per_box: Option<u32>,

    /// Boxes, or bottles when loose
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    pub qty: i64,
}

fn grams_help() -> String {
    let presets: Vec<String> = GRAM_PRESETS.iter().map(|g| g.to_string()).collect();
    format!("Grams per gift box (presets: {})", presets.join(", "))
}

#[derive(Debug, Clone, Args)]
pub struct WeightArgs {
    #[arg(long, default_value_t = 50.0, help = grams_help())]
    pub grams: f64,

    /// Gift boxes
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    pub qty: i64,
}

#[derive(Debug, Clone, Subcommand)]
pub enum PackagingArgs {
    /// Bottles, boxed or loose
    Bottle(BottleArgs),
    /// Weighed gift boxes
    Box(WeightArgs),
}

/// A spec plus a packaging choice.
#[derive(Debug, Clone, Args)]
pub struct CalcArgs {
    /// Spec id (the shell falls back to the selected spec)
    #[arg(short, long)]
    pub spec: Option<String>,

    #[command(subcommand)]
    pub packaging: PackagingArgs,
}

impl PackagingArgs {
    /// Builds the engine selection.
    ///
    /// Without `--per-box` the box config comes from the rule: `previous` is
    /// kept if the shape still offers it, otherwise the shape's default is used.
    pub fn selection(
        &self,
        catalog: &Catalog,
        spec_id: &str,
        previous: Option<u32>,
    ) -> CliResult<Selection> {
        match self {
            PackagingArgs::Bottle(args) => {
                let shape = shape(args.size, args.box_variant);
                let box_config = match args.per_box {
                    Some(config) => config,
                    None => {
                        let rule = catalog.lookup_rule(spec_id)?;
                        match previous {
                            Some(current) => reconcile_box_config(rule, shape, current),
                            None => default_box_config(rule, shape),
                        }
                    }
                };
                Ok(Selection::Bottle(BottleSelection {
                    shape,
                    box_config,
                    quantity: args.qty,
                }))
            }
            PackagingArgs::Box(args) => Ok(Selection::Weight(WeightSelection {
                grams_per_box: args.grams,
                quantity: args.qty,
            })),
        }
    }
}

// =============================================================================
// Catalog Edits
// =============================================================================

/// Field edits for one spec. Prices are yuan per root.
#[derive(Debug, Clone, Args)]
pub struct SpecEditArgs {
    /// Spec id (not editable)
    pub spec: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub roots_per_jin: Option<u32>,

    #[arg(long)]
    pub density_min: Option<f64>,

    #[arg(long)]
    pub density_max: Option<f64>,

    /// 那曲发货价
    #[arg(long, allow_negative_numbers = true)]
    pub nagqu: Option<f64>,

    /// 藏境发货价
    #[arg(long, allow_negative_numbers = true)]
    pub channel: Option<f64>,

    /// 最低销售限价
    #[arg(long, allow_negative_numbers = true)]
    pub min_sales: Option<f64>,

    /// 建议零售价
    #[arg(long, allow_negative_numbers = true)]
    pub retail: Option<f64>,
}

/// Prices must name a whole number of fen; nothing is rounded.
fn price(field: &str, yuan: Option<f64>) -> CliResult<Option<Money>> {
    yuan.map(|value| {
        Money::from_yuan_exact(value).ok_or_else(|| {
            CliError::Core(CoreError::Validation(ValidationError::InvalidNumber {
                field: field.to_string(),
                reason: format!("{value} is not a whole number of fen"),
            }))
        })
    })
    .transpose()
}

impl SpecEditArgs {
    pub fn patch(&self) -> CliResult<SpecPatch> {
        Ok(SpecPatch {
            name: self.name.clone(),
            roots_per_jin: self.roots_per_jin,
            roots_per_gram_min: self.density_min,
            roots_per_gram_max: self.density_max,
            nagqu_price: price("nagqu", self.nagqu)?,
            channel_price: price("channel", self.channel)?,
            min_sales_price: price("min-sales", self.min_sales)?,
            retail_price: price("retail", self.retail)?,
        })
    }
}

/// Field edits for one bottle rule. Option lists are comma separated.
#[derive(Debug, Clone, Args)]
pub struct RuleEditArgs {
    /// Spec id the rule belongs to
    pub spec: String,

    /// Roots per small bottle
    #[arg(long)]
    pub small_count: Option<u32>,

    /// Roots per medium bottle
    #[arg(long)]
    pub medium_count: Option<u32>,

    /// Small bottles per small box, e.g. 2,3,4
    #[arg(long, value_delimiter = ',')]
    pub small_box: Option<Vec<u32>>,

    /// Small bottles per large box, e.g. 8,10
    #[arg(long, value_delimiter = ',')]
    pub large_box: Option<Vec<u32>>,

    /// Medium bottles per box, e.g. 5
    #[arg(long, value_delimiter = ',')]
    pub medium_box: Option<Vec<u32>>,
}

impl RuleEditArgs {
    pub fn patch(&self) -> RulePatch {
        RulePatch {
            small_bottle_count: self.small_count,
            medium_bottle_count: self.medium_count,
            small_bottles_small_box: self.small_box.clone(),
            small_bottles_large_box: self.large_box.clone(),
            medium_bottles_per_box: self.medium_box.clone(),
        }
    }
}
