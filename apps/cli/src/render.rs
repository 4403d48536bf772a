//! # Text Rendering
//!
//! Plain-text views of the catalog, calculations, the queue and the history.
//! Every function returns a `String`; printing is left to the caller.

use std::fmt::Write;

use zhataqi_core::calculator::LOOSE;
use zhataqi_core::{Batch, BottleRule, Calculation, Catalog, ItemQueue, PriceTotals, PriceWarning};

const SHORT_ID_LEN: usize = 8;

/// First characters of an item or batch id, enough to address it in the shell.
pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

fn totals_line(totals: &PriceTotals) -> String {
    format!(
        "那曲发货 {}  藏境发货 {}  建议零售 {}",
        totals.total_nagqu_price, totals.total_channel_price, totals.total_retail
    )
}

fn rule_summary(rule: &BottleRule) -> String {
    let list = |options: &[u32]| {
        if options.is_empty() {
            "-".to_string()
        } else {
            options
                .iter()
                .map(|o| o.to_string())
                .collect::<Vec<_>>()
                .join("/")
        }
    };
    format!(
        "小瓶{}根 中瓶{}根 小盒[{}] 大盒[{}] 中瓶盒[{}]",
        rule.small_bottle_count,
        rule.medium_bottle_count,
        list(&rule.small_bottles_small_box),
        list(&rule.small_bottles_large_box),
        list(&rule.medium_bottles_per_box),
    )
}

/// One row per spec with prices, packaging tier and bottle rule.
pub fn spec_table(catalog: &Catalog) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<9} {:>9} {:>9} {:>9} {:>9}  包装  装瓶规则",
        "规格", "根/克", "那曲", "藏境", "最低", "零售"
    );
    for spec in catalog.specs() {
        let rule = catalog
            .lookup_rule(&spec.id)
            .map(rule_summary)
            .unwrap_or_else(|_| "无装瓶规则".to_string());
        let _ = writeln!(
            out,
            "{:<12} {:<9} {:>9} {:>9} {:>9} {:>9}  {:<4}  {}{}",
            spec.id,
            spec.density_label(),
            spec.nagqu_price.to_string(),
            spec.channel_price.to_string(),
            spec.min_sales_price.to_string(),
            spec.retail_price.to_string(),
            spec.packaging_tier(),
            rule,
            if spec.is_price_invalid() { "  ⚠" } else { "" },
        );
    }
    out
}

pub fn price_warnings(warnings: &[PriceWarning]) -> String {
    let mut out = String::new();
    for warning in warnings {
        let _ = writeln!(
            out,
            "⚠ {}: 最低销售限价 {} 低于零售价的80% ({})",
            warning.spec_id, warning.min_sales_price, warning.floor
        );
    }
    out
}

/// `2瓶/盒, 3瓶/盒, 4瓶/盒, 散装`
pub fn box_options(options: &[u32]) -> String {
    options
        .iter()
        .map(|&option| {
            if option == LOOSE {
                "散装".to_string()
            } else {
                format!("{}瓶/盒", option)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn calculation(calc: &Calculation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", calc.details);
    let _ = writeln!(out, "  总根数    {}", calc.total_roots);
    if let Some(roots) = calc.roots_per_box() {
        let _ = writeln!(out, "  每盒约    {}根", roots);
    }
    let _ = writeln!(out, "  那曲发货  {}", calc.total_nagqu_price);
    let _ = writeln!(out, "  藏境发货  {}", calc.total_channel_price);
    let _ = writeln!(out, "  建议零售  {}", calc.total_retail);
    let _ = writeln!(out, "  电商规格  {}", calc.ecommerce_spec);
    if let Some(tier) = calc.packaging_color {
        let _ = writeln!(out, "  包装标志  {}", tier);
    }
    out
}

/// Queued items in insertion order, then the live totals.
pub fn queue(queue: &ItemQueue) -> String {
    if queue.is_empty() {
        return "队列为空\n".to_string();
    }

    let mut out = String::new();
    for (n, item) in queue.items().iter().enumerate() {
        let _ = writeln!(out, "{:>3}. [{}] {}", n + 1, short_id(&item.id), item.details);
    }
    let _ = writeln!(out, "共{}项  {}", queue.len(), totals_line(&queue.totals()));
    out
}

/// Newest batch first, each followed by its items.
pub fn history(batches: &[Batch]) -> String {
    if batches.is_empty() {
        return "暂无生产记录\n".to_string();
    }

    let mut out = String::new();
    for batch in batches {
        let _ = writeln!(
            out,
            "批次 [{}] {}  {}项  总根数 {}  {}",
            short_id(batch.id()),
            batch.date(),
            batch.item_count(),
            batch.total_roots(),
            totals_line(&batch.totals()),
        );
        for item in batch.items() {
            let _ = writeln!(out, "    {}", item.details);
        }
    }
    out
}
