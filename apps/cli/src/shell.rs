//! # Interactive Shell
//!
//! A line-oriented session over one [`App`]: pick a spec, price selections,
//! build up the queue, commit it, and edit or export the catalog.
//!
//! ## Session Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  select 1600-1800                       ← remembered for calc / add    │
//! │  calc bottle --box large-box -q 3       ← preview only                 │
//! │  add bottle --box large-box -q 3        ← into the queue               │
//! │  add box --grams 100 -q 2                                              │
//! │  queue                                  ← items + live totals          │
//! │  commit                                 ← batch saved, queue emptied   │
//! │  export-history ./out                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each line is parsed with clap, so `help` and `<command> --help` work as
//! usual. A failing command prints its error and the shell keeps going.
//!
//! Words split on whitespace. Single or double quotes keep a value with spaces
//! together (`edit-spec 1000 --name "1000 特选"`), and a backslash outside
//! single quotes escapes the next character.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use zhataqi_core::Selection;
use zhataqi_store::catalog_file::CONFIG_EXPORT_FILE_NAME;

use crate::app::App;
use crate::args::{self, BoxArg, CalcArgs, RuleEditArgs, SizeArg, SpecEditArgs};
use crate::error::{CliError, CliResult};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, name = "zhataqi", disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// List specs, prices and bottle rules
    Specs,

    /// Select the spec used when --spec is omitted
    Select { spec: String },

    /// Show the box options for a bottle shape
    Options {
        #[arg(short, long)]
        spec: Option<String>,

        #[arg(long, value_enum, default_value_t = SizeArg::Small)]
        size: SizeArg,

        #[arg(long = "box", value_enum, default_value_t = BoxArg::SmallBox)]
        box_variant: BoxArg,
    },

    /// Price a selection without queueing it
    Calc(CalcArgs),

    /// Price a selection and add it to the queue
    Add(CalcArgs),

    /// Show queued items and totals
    Queue,

    /// Remove a queued item by id or id prefix
    Remove { id: String },

    /// Empty the queue
    ClearQueue,

    /// Commit the queue as a production batch
    Commit,

    /// Show committed batches, newest first
    History,

    /// Delete every committed batch
    ClearHistory,

    /// Edit a spec's name, density or prices
    EditSpec(SpecEditArgs),

    /// Edit a bottle rule
    EditRule(RuleEditArgs),

    /// Write the catalog as JSON
    ExportConfig {
        #[arg(default_value = CONFIG_EXPORT_FILE_NAME)]
        path: PathBuf,
    },

    /// Write the production records as CSV
    ExportHistory { dir: Option<PathBuf> },

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

enum Flow {
    Continue,
    Quit,
}

struct Shell<'a> {
    app: &'a mut App,
    selected: Option<String>,
    last_box_config: Option<u32>,
}

impl Shell<'_> {
    fn spec_for(&self, explicit: Option<&String>) -> CliResult<String> {
        explicit
            .or(self.selected.as_ref())
            .cloned()
            .ok_or_else(|| {
                CliError::InvalidInput("no spec selected; use `select <spec>` or --spec".into())
            })
    }

    fn selection(&self, args: &CalcArgs) -> CliResult<(String, Selection)> {
        let spec_id = self.spec_for(args.spec.as_ref())?;
        let selection =
            args.packaging
                .selection(self.app.session().catalog(), &spec_id, self.last_box_config)?;
        Ok((spec_id, selection))
    }

    fn remember(&mut self, selection: &Selection) {
        if let Selection::Bottle(bottle) = selection {
            self.last_box_config = Some(bottle.box_config);
        }
    }

    fn execute(&mut self, command: ShellCommand, out: &mut dyn Write) -> CliResult<Flow> {
        match command {
            ShellCommand::Specs => self.app.specs(out)?,
            ShellCommand::Select { spec } => {
                let found = self.app.session().catalog().lookup(&spec)?;
                writeln!(out, "已选择 {} ({}根/克)", found.name, found.density_label())?;
                self.selected = Some(spec);
            }
            ShellCommand::Options {
                spec,
                size,
                box_variant,
            } => {
                let spec_id = self.spec_for(spec.as_ref())?;
                self.app
                    .box_options(out, &spec_id, args::shape(size, box_variant))?;
            }
            ShellCommand::Calc(calc) => {
                let (spec_id, selection) = self.selection(&calc)?;
                self.app.calculate(out, &spec_id, &selection)?;
                self.remember(&selection);
            }
            ShellCommand::Add(calc) => {
                let (spec_id, selection) = self.selection(&calc)?;
                self.app.add(out, &spec_id, &selection)?;
                self.remember(&selection);
            }
            ShellCommand::Queue => self.app.show_queue(out)?,
            ShellCommand::Remove { id } => self.app.remove(out, &id)?,
            ShellCommand::ClearQueue => self.app.clear_queue(out)?,
            ShellCommand::Commit => self.app.commit(out)?,
            ShellCommand::History => self.app.show_history(out)?,
            ShellCommand::ClearHistory => self.app.clear_history(out)?,
            ShellCommand::EditSpec(edit) => self.app.edit_spec(out, &edit)?,
            ShellCommand::EditRule(edit) => self.app.edit_rule(out, &edit)?,
            ShellCommand::ExportConfig { path } => self.app.export_config(out, Some(&path))?,
            ShellCommand::ExportHistory { dir } => self.app.export_history(out, dir.as_deref())?,
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn prompt(&self) -> String {
        format!("{}> ", self.selected.as_deref().unwrap_or("zhataqi"))
    }
}

/// Reads commands from `input` until `quit` or end of input.
pub fn run<R: BufRead>(app: &mut App, input: R, out: &mut dyn Write) -> CliResult<()> {
    writeln!(out, "{} 包装计算 (输入 help 查看命令)", app.settings().product_name)?;
    if let Some(notice) = app.history_notice() {
        writeln!(out, "{}", notice)?;
    }

    let mut shell = Shell {
        app,
        selected: None,
        last_box_config: None,
    };

    let mut lines = input.lines();
    loop {
        write!(out, "{}", shell.prompt())?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            break;
        };
        let line = line?;
        let words = match split_line(&line) {
            Ok(words) if words.is_empty() => continue,
            Ok(words) => words,
            Err(err) => {
                writeln!(out, "[{}] {}", err.code(), err)?;
                continue;
            }
        };

        let command = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed.command,
            Err(err) => {
                write!(out, "{}", err.render())?;
                continue;
            }
        };

        match shell.execute(command, out) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(err) => {
                debug!(code = err.code(), error = %err, "Shell command failed");
                writeln!(out, "[{}] {}", err.code(), err)?;
            }
        }
    }
    Ok(())
}

/// Splits a shell line into words, honoring quotes and backslash escapes.
fn split_line(line: &str) -> CliResult<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('\''), c) => current.push(c),
            (_, '\\') => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| CliError::InvalidInput("line ends with a backslash".into()))?;
                current.push(escaped);
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(CliError::InvalidInput(format!("unclosed {q} quote")));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use zhataqi_store::{catalog_file, MemoryStore};

    use crate::config::AppSettings;

    fn session(script: &str) -> (String, App) {
        let catalog = catalog_file::load_catalog(None).unwrap().catalog;
        let mut app = App::with_store(
            AppSettings::default(),
            catalog,
            Box::new(MemoryStore::new()),
        );
        let mut out = Vec::new();
        run(&mut app, Cursor::new(script.to_string()), &mut out).unwrap();
        (String::from_utf8(out).unwrap(), app)
    }

    #[test]
    fn test_select_add_commit() {
        let (out, app) = session(
            "select 1000\n\
             add bottle --per-box 3 -q 2\n\
             add box --grams 100 -q 1\n\
             queue\n\
             commit\n",
        );
        assert!(out.contains("已选择 1000"));
        assert!(out.contains("共2项"));
        assert!(out.contains("已提交批次"));
        assert!(app.session().queue().is_empty());
        assert_eq!(app.session().history().batches()[0].item_count(), 2);
    }

    #[test]
    fn test_errors_do_not_end_the_shell() {
        let (out, app) = session(
            "add bottle\n\
             calc --spec nope bottle\n\
             commit\n\
             frobnicate\n\
             add --spec 1000 bottle -q 0\n\
             add --spec 1000 bottle\n",
        );
        assert!(out.contains("[INVALID_INPUT]"));
        assert!(out.contains("[NOT_FOUND]"));
        assert!(out.contains("[EMPTY_QUEUE]"));
        assert!(out.contains("[VALIDATION_ERROR]"));
        assert_eq!(app.session().queue().len(), 1);
    }

    #[test]
    fn test_box_config_carries_over_when_offered() {
        let (_, app) = session(
            "select 1000\n\
             add bottle --per-box 4\n\
             add bottle\n\
             add bottle --box large-box\n",
        );
        let items = app.session().queue().items();
        assert_eq!(items[1].bottle_count, Some(4));
        assert_eq!(items[2].bottle_count, Some(8));
    }

    #[test]
    fn test_quit_stops_reading() {
        let (out, app) = session("quit\nselect 1000\nadd bottle\n");
        assert!(!out.contains("已选择"));
        assert!(app.session().queue().is_empty());
    }

    #[test]
    fn test_split_line_keeps_quoted_words() {
        assert_eq!(
            split_line(r#"edit-spec 1000 --name "1000 特选""#).unwrap(),
            vec!["edit-spec", "1000", "--name", "1000 特选"]
        );
        assert_eq!(
            split_line(r#"export-history 'my records'  a\ b """#).unwrap(),
            vec!["export-history", "my records", "a b", ""]
        );
        assert!(split_line("   ").unwrap().is_empty());
        assert!(split_line(r#"select "1000"#).is_err());
    }

    #[test]
    fn test_spec_name_with_space() {
        let (out, app) = session(
            "edit-spec 1000 --name \"1000 特选\"\n\
             edit-spec 1000 --name \"unclosed\n",
        );
        assert!(out.contains("已更新规格 1000"));
        assert!(out.contains("[INVALID_INPUT] Invalid input: unclosed \" quote"));
        assert_eq!(app.session().catalog().lookup("1000").unwrap().name, "1000 特选");
    }

    #[test]
    fn test_catalog_edit_applies_to_next_calculation() {
        let (out, app) = session(
            "edit-rule 1000 --small-count 6\n\
             add --spec 1000 bottle --per-box 2\n",
        );
        assert!(out.contains("已更新装瓶规则 1000"));
        assert_eq!(app.session().queue().items()[0].total_roots, 12);
    }
}
