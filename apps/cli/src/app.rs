//! # Application Facade
//!
//! Wires settings, the catalog file and the history store into one
//! [`Session`], and runs each command against it.
//!
//! ## Startup
//! ```text
//! AppSettings
//!     │
//!     ├── catalog_path ──► catalog_file::load_catalog ──► Catalog
//!     │                                                    │
//!     └── history.* ─────► open_history_store ──► Box<dyn HistoryStore>
//!                                                          │
//!                                             Session::new(catalog, store)
//! ```
//!
//! Command output goes to the writer passed in, so the shell and the tests
//! can capture it.

use std::io::Write;
use std::path::Path;

use tracing::info;
use zhataqi_core::calculator::BottleShape;
use zhataqi_core::{Catalog, HistoryStore, Selection, Session};
use zhataqi_store::{catalog_file, export};

use crate::args::{RuleEditArgs, SpecEditArgs};
use crate::config::AppSettings;
use crate::error::{CliError, CliResult};
use crate::render;

pub struct App {
    settings: AppSettings,
    session: Session<Box<dyn HistoryStore>>,
}

impl App {
    /// Loads the catalog and opens the history store named by `settings`.
    pub fn open(settings: AppSettings) -> CliResult<Self> {
        let load = catalog_file::load_catalog(settings.catalog_path())?;
        info!(
            specs = load.catalog.specs().len(),
            rules = load.catalog.rules().len(),
            rejected = load.rejected.len(),
            "Catalog loaded"
        );
        let store = settings.open_history_store()?;
        Ok(Self::with_store(settings, load.catalog, store))
    }

    pub fn with_store(
        settings: AppSettings,
        catalog: Catalog,
        store: Box<dyn HistoryStore>,
    ) -> Self {
        App {
            settings,
            session: Session::new(catalog, store),
        }
    }

    pub fn session(&self) -> &Session<Box<dyn HistoryStore>> {
        &self.session
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Notice shown when the stored history could not be read.
    pub fn history_notice(&self) -> Option<String> {
        self.session
            .history()
            .load_failure()
            .map(|err| format!("⚠ 历史记录无法读取, 已从空记录开始: {}", err))
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub fn specs(&self, out: &mut dyn Write) -> CliResult<()> {
        let catalog = self.session.catalog();
        write!(out, "{}", render::spec_table(catalog))?;
        write!(out, "{}", render::price_warnings(&catalog.price_warnings()))?;
        Ok(())
    }

    pub fn box_options(
        &self,
        out: &mut dyn Write,
        spec_id: &str,
        shape: BottleShape,
    ) -> CliResult<()> {
        let options = self.session.box_options(spec_id, shape)?;
        writeln!(out, "{}", render::box_options(&options))?;
        Ok(())
    }

    pub fn edit_spec(&mut self, out: &mut dyn Write, args: &SpecEditArgs) -> CliResult<()> {
        let update = self.session.update_spec(&args.spec, args.patch()?)?;
        writeln!(out, "已更新规格 {}", update.spec.id)?;
        if update.is_price_invalid {
            writeln!(
                out,
                "⚠ 最低销售限价 {} 低于零售价的80% ({})",
                update.spec.min_sales_price,
                update.spec.min_sales_floor()
            )?;
        }
        Ok(())
    }

    pub fn edit_rule(&mut self, out: &mut dyn Write, args: &RuleEditArgs) -> CliResult<()> {
        let rule = self.session.update_rule(&args.spec, args.patch())?;
        writeln!(out, "已更新装瓶规则 {}", rule.spec_id)?;
        Ok(())
    }

    /// Writes the catalog document to `path`, or prints it when `path` is `None`.
    pub fn export_config(&self, out: &mut dyn Write, path: Option<&Path>) -> CliResult<()> {
        let document = self.session.catalog().export();
        match path {
            Some(path) => {
                catalog_file::write_document(path, &document)?;
                writeln!(out, "配置已导出到 {}", path.display())?;
            }
            None => writeln!(out, "{}", catalog_file::to_pretty_json(&document)?)?,
        }
        Ok(())
    }

    // =========================================================================
    // Calculation & Queue
    // =========================================================================

    pub fn calculate(
        &self,
        out: &mut dyn Write,
        spec_id: &str,
        selection: &Selection,
    ) -> CliResult<()> {
        let calc = self.session.calculate(spec_id, selection)?;
        write!(out, "{}", render::calculation(&calc))?;
        Ok(())
    }

    pub fn add(&mut self, out: &mut dyn Write, spec_id: &str, selection: &Selection) -> CliResult<()> {
        let item = self.session.add(spec_id, selection)?;
        writeln!(out, "已加入队列 [{}] {}", render::short_id(&item.id), item.details)?;
        Ok(())
    }

    pub fn show_queue(&self, out: &mut dyn Write) -> CliResult<()> {
        write!(out, "{}", render::queue(self.session.queue()))?;
        Ok(())
    }

    /// Removes the item whose id equals, or uniquely starts with, `id`.
    pub fn remove(&mut self, out: &mut dyn Write, id: &str) -> CliResult<()> {
        let matches: Vec<String> = self
            .session
            .queue()
            .items()
            .iter()
            .filter(|item| item.id == id || item.id.starts_with(id))
            .map(|item| item.id.clone())
            .collect();

        let target = match matches.as_slice() {
            [] => {
                writeln!(out, "队列中没有 {}", id)?;
                return Ok(());
            }
            [only] => only.clone(),
            _ if matches.iter().any(|m| m == id) => id.to_string(),
            _ => {
                return Err(CliError::InvalidInput(format!(
                    "'{}' matches {} queued items",
                    id,
                    matches.len()
                )))
            }
        };

        if let Some(item) = self.session.remove(&target) {
            writeln!(out, "已移除 {}", item.details)?;
        }
        Ok(())
    }

    pub fn clear_queue(&mut self, out: &mut dyn Write) -> CliResult<()> {
        self.session.clear_queue();
        writeln!(out, "队列已清空")?;
        Ok(())
    }

    pub fn commit(&mut self, out: &mut dyn Write) -> CliResult<()> {
        let batch = self.session.commit()?;
        writeln!(
            out,
            "已提交批次 [{}] {}  {}项  总根数 {}",
            render::short_id(batch.id()),
            batch.date(),
            batch.item_count(),
            batch.total_roots()
        )?;
        Ok(())
    }

    // =========================================================================
    // History
    // =========================================================================

    pub fn show_history(&self, out: &mut dyn Write) -> CliResult<()> {
        if let Some(notice) = self.history_notice() {
            writeln!(out, "{}", notice)?;
        }
        write!(out, "{}", render::history(self.session.history().batches()))?;
        Ok(())
    }

    pub fn clear_history(&mut self, out: &mut dyn Write) -> CliResult<()> {
        self.session.clear_history()?;
        writeln!(out, "生产记录已清空")?;
        Ok(())
    }

    /// Writes the production-record CSV into `dir` (default: current directory).
    pub fn export_history(&self, out: &mut dyn Write, dir: Option<&Path>) -> CliResult<()> {
        let dir = dir.unwrap_or_else(|| Path::new("."));
        let path = export::export_history_csv(
            dir,
            &self.settings.product_name,
            self.session.history().batches(),
        )?;
        writeln!(out, "生产记录已导出到 {}", path.display())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use zhataqi_core::calculator::{BottleSelection, WeightSelection};
    use zhataqi_core::{BoxVariant, CoreError, StoreError};
    use zhataqi_store::MemoryStore;

    fn app_with(store: MemoryStore) -> App {
        let catalog = catalog_file::load_catalog(None).unwrap().catalog;
        App::with_store(AppSettings::default(), catalog, Box::new(store))
    }

    fn bottle(box_config: u32, quantity: i64) -> Selection {
        Selection::Bottle(BottleSelection {
            shape: BottleShape::Small(BoxVariant::SmallBox),
            box_config,
            quantity,
        })
    }

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_specs_lists_default_catalog() {
        let app = app_with(MemoryStore::new());
        let mut out = Vec::new();
        app.specs(&mut out).unwrap();
        let out = text(out);
        assert_eq!(out.lines().count(), 10);
        assert!(out.contains("2500-3000"));
    }

    #[test]
    fn test_add_commit_and_history() {
        let store = MemoryStore::new();
        let mut app = app_with(store.clone());
        let mut out = Vec::new();

        app.add(&mut out, "1000", &bottle(3, 2)).unwrap();
        app.add(
            &mut out,
            "1000",
            &Selection::Weight(WeightSelection {
                grams_per_box: 50.0,
                quantity: 1,
            }),
        )
        .unwrap();
        assert_eq!(app.session().queue().len(), 2);

        app.commit(&mut out).unwrap();
        assert!(app.session().queue().is_empty());
        assert!(store.raw().unwrap().contains("\"specName\":\"1000\""));

        let mut out = Vec::new();
        app.show_history(&mut out).unwrap();
        assert!(text(out).contains("2项"));
    }

    #[test]
    fn test_failed_commit_keeps_queue() {
        let store = MemoryStore::new();
        let mut app = app_with(store.clone());
        let mut out = Vec::new();
        app.add(&mut out, "1000", &bottle(3, 2)).unwrap();

        store.set_fail_writes(true);
        let err = app.commit(&mut out).unwrap_err();
        assert!(matches!(
            err,
            CliError::Core(CoreError::Storage(StoreError::WriteFailed(_)))
        ));
        assert_eq!(app.session().queue().len(), 1);
        assert!(app.session().history().batches().is_empty());
    }

    #[test]
    fn test_remove_by_prefix() {
        let mut app = app_with(MemoryStore::new());
        let mut out = Vec::new();
        app.add(&mut out, "1000", &bottle(3, 2)).unwrap();
        let id = app.session().queue().items()[0].id.clone();

        let mut out = Vec::new();
        app.remove(&mut out, "no-such-item").unwrap();
        assert!(text(out).starts_with("队列中没有"));
        assert_eq!(app.session().queue().len(), 1);

        let mut out = Vec::new();
        app.remove(&mut out, render::short_id(&id)).unwrap();
        assert!(app.session().queue().is_empty());
    }

    #[test]
    fn test_unreadable_history_is_reported() {
        let app = app_with(MemoryStore::with_raw("{not json"));
        assert!(app.history_notice().is_some());

        let mut out = Vec::new();
        app.show_history(&mut out).unwrap();
        let out = text(out);
        assert!(out.starts_with("⚠ 历史记录无法读取"));
        assert!(out.contains("暂无生产记录"));
    }

    #[test]
    fn test_edit_spec_reports_low_price() {
        let mut app = app_with(MemoryStore::new());
        let args = SpecEditArgs {
            spec: "1000".into(),
            name: None,
            roots_per_jin: None,
            density_min: None,
            density_max: None,
            nagqu: None,
            channel: None,
            min_sales: Some(1.0),
            retail: None,
        };
        let mut out = Vec::new();
        app.edit_spec(&mut out, &args).unwrap();
        assert!(text(out).contains("低于零售价的80%"));
        assert_eq!(app.session().catalog().price_warnings().len(), 1);
    }

    #[test]
    fn test_exports_write_files() {
        let dir = tempdir().unwrap();
        let mut app = app_with(MemoryStore::new());
        let mut out = Vec::new();
        app.add(&mut out, "1000", &bottle(3, 2)).unwrap();
        app.commit(&mut out).unwrap();

        let config = dir.path().join(catalog_file::CONFIG_EXPORT_FILE_NAME);
        app.export_config(&mut out, Some(&config)).unwrap();
        assert_eq!(
            catalog_file::read_document(&config).unwrap(),
            app.session().catalog().export()
        );

        app.export_history(&mut out, Some(dir.path())).unwrap();
        let csv = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .any(|entry| entry.file_name().to_string_lossy().ends_with(".csv"));
        assert!(csv);
    }
}
