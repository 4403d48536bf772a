//! # Production Record Export
//!
//! Flattens the history into one CSV row per item.
//!
//! ## Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EF BB BF                                      ← UTF-8 byte-order mark  │
//! │  日期,规格,规格(根/克),装瓶数量(根),瓶数(瓶),瓶型,盒型,包装辅助标志,    │
//! │  详情描述,电商规格,总根数,那曲发货,藏境发货,建议零售                   │
//! │  <batch date>,<item fields...>                 ← batch date per item    │
//! │  ...                                           ← "\n" line endings      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Fields containing `,` `"` or a line break are quoted with inner quotes
//! doubled. Descriptors missing on older records are written as `-`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::info;
use zhataqi_core::{Batch, ProductionItem};

use crate::error::PersistResult;

/// Column headers, in order.
pub const CSV_HEADER: [&str; 14] = [
    "日期",
    "规格",
    "规格(根/克)",
    "装瓶数量(根)",
    "瓶数(瓶)",
    "瓶型",
    "盒型",
    "包装辅助标志",
    "详情描述",
    "电商规格",
    "总根数",
    "那曲发货",
    "藏境发货",
    "建议零售",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const MISSING: &str = "-";

fn or_missing<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

fn item_row(date: &str, item: &ProductionItem) -> [String; 14] {
    [
        date.to_string(),
        item.spec_name.clone(),
        or_missing(item.roots_per_gram.as_deref()),
        or_missing(item.roots_per_bottle),
        or_missing(item.bottle_count),
        or_missing(item.bottle_type.as_deref()),
        or_missing(item.box_type.as_deref()),
        or_missing(item.packaging_color),
        item.details.clone(),
        or_missing(item.ecommerce_spec.as_deref()),
        item.total_roots.to_string(),
        item.total_nagqu_price.to_yuan_string(),
        item.total_channel_price.to_yuan_string(),
        item.total_retail.to_yuan_string(),
    ]
}

/// Writes the BOM, the header and one row per item across `batches`.
pub fn write_history_csv<W: Write>(mut out: W, batches: &[Batch]) -> PersistResult<()> {
    out.write_all(UTF8_BOM)?;

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);

    writer.write_record(CSV_HEADER)?;
    for batch in batches {
        for item in batch.items() {
            writer.write_record(item_row(batch.date(), item))?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// `<product>生产记录_<YYYY-MM-DD>.csv`
pub fn history_csv_file_name(product_name: &str, date: NaiveDate) -> String {
    format!("{}生产记录_{}.csv", product_name, date.format("%Y-%m-%d"))
}

/// Writes the export into `dir` under today's (UTC) file name.
pub fn export_history_csv(
    dir: impl AsRef<Path>,
    product_name: &str,
    batches: &[Batch],
) -> PersistResult<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(history_csv_file_name(product_name, Utc::now().date_naive()));

    let mut file = BufWriter::new(File::create(&path)?);
    write_history_csv(&mut file, batches)?;
    file.flush()?;

    info!(
        path = %path.display(),
        batches = batches.len(),
        rows = batches.iter().map(Batch::item_count).sum::<usize>(),
        "Production records exported"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn history() -> Vec<Batch> {
        serde_json::from_str(
            r#"[{"id":"b2","date":"2024/3/7 14:05:09","items":[
                  {"id":"i1","specName":"1000","type":"bottle",
                   "details":"规格:1000 (2根/克) - 小瓶 (5根/瓶) x 6瓶 (共2小盒, 每盒3瓶) [总根数:30]",
                   "bottleType":"小瓶","boxType":"小盒","packagingColor":"A","rootsPerBottle":5,
                   "bottleCount":6,"rootsPerGram":"2","ecommerceSpec":"1000 5根/瓶 3瓶/盒",
                   "totalRoots":30,"totalNagquPrice":4110,"totalChannelPrice":5850,
                   "totalRetail":9000,"timestamp":1709791509000}]},
                {"id":"b1","date":"2023/11/15 6:13:20","items":[
                  {"id":"i0","specName":"2200-2500","type":"box",
                   "details":"规格:2200-2500 - 50克礼盒 (约235根) x 1盒 \"旧\" [总根数:235]",
                   "totalRoots":235,"totalNagquPrice":7520,"totalChannelPrice":10692.5,
                   "totalRetail":16450,"timestamp":1700000000000}]}]"#,
        )
        .unwrap()
    }

    fn render(batches: &[Batch]) -> String {
        let mut out = Vec::new();
        write_history_csv(&mut out, batches).unwrap();
        assert!(out.starts_with(UTF8_BOM));
        String::from_utf8(out[UTF8_BOM.len()..].to_vec()).unwrap()
    }

    #[test]
    fn test_header_only_for_empty_history() {
        assert_eq!(
            render(&[]),
            "日期,规格,规格(根/克),装瓶数量(根),瓶数(瓶),瓶型,盒型,包装辅助标志,详情描述,电商规格,总根数,那曲发货,藏境发货,建议零售\n"
        );
    }

    #[test]
    fn test_rows_quote_and_fill_missing() {
        let text = render(&history());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(!text.contains('\r'));

        assert_eq!(
            lines[1],
            "2024/3/7 14:05:09,1000,2,5,6,小瓶,小盒,A,\
             \"规格:1000 (2根/克) - 小瓶 (5根/瓶) x 6瓶 (共2小盒, 每盒3瓶) [总根数:30]\",\
             1000 5根/瓶 3瓶/盒,30,4110,5850,9000"
        );
        assert_eq!(
            lines[2],
            "2023/11/15 6:13:20,2200-2500,-,-,-,-,-,-,\
             \"规格:2200-2500 - 50克礼盒 (约235根) x 1盒 \"\"旧\"\" [总根数:235]\",\
             -,235,7520,10692.5,16450"
        );
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            history_csv_file_name("藏境扎塔奇", date),
            "藏境扎塔奇生产记录_2024-03-07.csv"
        );
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempdir().unwrap();
        let path = export_history_csv(dir.path(), "藏境扎塔奇", &history()).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("藏境扎塔奇生产记录_"));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
    }
}
