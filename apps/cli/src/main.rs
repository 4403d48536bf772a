//! # zhataqi: Packaging Calculator CLI
//!
//! Command line front-end for the 藏境扎塔奇 packaging engine.
//!
//! ## Module Organization
//! ```text
//! zhataqi/
//! ├── main.rs     ◄─── You are here (arguments, logging, dispatch)
//! ├── config.rs   ◄─── AppSettings: TOML file + ZHATAQI_* environment
//! ├── app.rs      ◄─── Catalog + history store + session, one method per command
//! ├── args.rs     ◄─── Argument groups shared with the shell
//! ├── shell.rs    ◄─── Interactive session (queue, commit, catalog edits)
//! ├── render.rs   ◄─── Text views
//! └── error.rs    ◄─── CliError
//! ```
//!
//! ## Examples
//! ```text
//! zhataqi specs
//! zhataqi calc --spec 1000 bottle --per-box 3 --qty 2
//! zhataqi calc --spec 2200-2500 box --grams 100 --qty 4
//! zhataqi export-history --dir ./records
//! zhataqi shell
//! ```

mod app;
mod args;
mod config;
mod error;
mod render;
mod shell;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::args::CalcArgs;
use crate::config::AppSettings;
use crate::error::{CliError, CliResult};

#[derive(Parser)]
#[command(
    name = "zhataqi",
    author,
    version,
    about = "Packaging calculator and production records for 藏境扎塔奇"
)]
struct Cli {
    /// Settings file (default: settings.toml in the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog JSON to use instead of the configured one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List specs, prices and bottle rules
    Specs,

    /// Price one selection
    Calc(CalcArgs),

    /// Show committed batches, newest first
    History,

    /// Delete every committed batch
    ClearHistory,

    /// Export the catalog as JSON (printed unless --out is given)
    ExportConfig {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Export production records as CSV
    ExportHistory {
        /// Target directory (default: current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Write the effective settings to the settings file
    InitSettings {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Start an interactive session
    Shell,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so command output stays clean.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=zhataqi_core=trace` - Trace the engine only
/// - Default: INFO, DEBUG for zhataqi crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,zhataqi=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> CliResult<()> {
    let mut settings = AppSettings::load(cli.config.clone())?;
    if let Some(catalog) = cli.catalog {
        settings.catalog_path = Some(catalog);
    }

    if let Commands::InitSettings { force } = cli.command {
        return init_settings(&settings, cli.config, force);
    }

    let mut app = App::open(settings)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Specs => app.specs(&mut out)?,
        Commands::Calc(args) => {
            let spec_id = args
                .spec
                .clone()
                .ok_or_else(|| CliError::InvalidInput("--spec is required".into()))?;
            let selection = args
                .packaging
                .selection(app.session().catalog(), &spec_id, None)?;
            app.calculate(&mut out, &spec_id, &selection)?;
        }
        Commands::History => app.show_history(&mut out)?,
        Commands::ClearHistory => app.clear_history(&mut out)?,
        Commands::ExportConfig { out: path } => app.export_config(&mut out, path.as_deref())?,
        Commands::ExportHistory { dir } => app.export_history(&mut out, dir.as_deref())?,
        Commands::Shell => shell::run(&mut app, io::stdin().lock(), &mut out)?,
        Commands::InitSettings { .. } => {}
    }

    out.flush()?;
    Ok(())
}

fn init_settings(settings: &AppSettings, path: Option<PathBuf>, force: bool) -> CliResult<()> {
    let target = path
        .or_else(AppSettings::default_config_path)
        .ok_or_else(|| CliError::InvalidSettings("No settings path available".into()))?;

    if target.exists() && !force {
        return Err(CliError::InvalidSettings(format!(
            "{} already exists (use --force to overwrite)",
            target.display()
        )));
    }

    let written = settings.save(Some(target))?;
    info!(path = %written.display(), "Settings file written");
    println!("{}", written.display());
    Ok(())
}
