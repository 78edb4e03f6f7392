// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! bimq: interactive query shell for building models.
//!
//! Provides a readline-based interactive shell with:
//! - context-aware tab completion of classes, attributes, property sets and values
//! - query highlighting and STEP output highlighting
//! - multiline input (backslash continuation)
//! - tsv, csv, table and JSON output
//! - persistent history and a `~/.bimqrc` start-up file
//!
//! When stdin is not a terminal each line is executed without prompt,
//! completion or colour.

mod completer;
mod highlighter;
mod shell;

use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use bimq_core::{ModelSession, OutputFormat, OutputOptions, QueryEngine, SessionConfig};
use bimq_model::JsonModel;
use clap::Parser;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::hint::HistoryHinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::MatchingBracketValidator;
use rustyline_derive::{Completer, Helper, Highlighter, Hinter, Validator};
use tracing::{debug, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

use shell::{Flow, LogHandle, Shell, DEFAULT_LOG};

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

/// bimq: query a building model interactively.
#[derive(Parser, Debug)]
#[command(name = "bimq", version = VERSION, about = "Interactive building-model query shell")]
struct Cli {
    /// JSON model file to load.
    model: PathBuf,

    /// JSON file with sampling settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Entities sampled for value-clause completion.
    #[arg(long)]
    value_samples: Option<usize>,

    /// Entities inspected for filter-side completion (default: all matches).
    #[arg(long)]
    filter_samples: Option<usize>,

    /// Print a header row of value clauses.
    #[arg(long)]
    headers: bool,

    /// Output format (tsv, csv, table, json).
    #[arg(long, default_value = "tsv")]
    format: OutputFormat,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

// ---------------------------------------------------------------------------
// Rustyline helper
// ---------------------------------------------------------------------------

#[derive(Helper, Highlighter, Completer, Hinter, Validator)]
struct BimqHelper {
    #[rustyline(Highlighter)]
    highlighter: highlighter::BimqHighlighter,
    #[rustyline(Completer)]
    completer: completer::BimqCompleter,
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
    #[rustyline(Validator)]
    validator: MatchingBracketValidator,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log = init_tracing(cli.debug);

    let config = session_config(&cli)?;
    let model = JsonModel::open(&cli.model)
        .with_context(|| format!("failed to load model {}", cli.model.display()))?;
    let session = Rc::new(ModelSession::with_config(model, config));

    let interactive = io::stdin().is_terminal();
    let color = interactive && io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    if !color {
        colored::control::set_override(false);
    }

    let options = OutputOptions {
        format: cli.format,
        headers: cli.headers,
    };
    let mut shell = Shell::new(Rc::clone(&session), options, color).with_log(log, cli.debug);

    if interactive {
        run_interactive(&mut shell, &cli.model)
    } else {
        run_piped(&mut shell)
    }
}

/// Install the stderr subscriber behind a reloadable filter.
fn init_tracing(debug: bool) -> LogHandle {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG))
    };
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
    handle
}

/// Sampling settings: config file first, then command-line overrides.
fn session_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => SessionConfig::default(),
    };
    if let Some(limit) = cli.value_samples {
        config.value_sample_limit = limit;
    }
    if let Some(limit) = cli.filter_samples {
        config.filter_sample_limit = Some(limit);
    }
    debug!(?config, "session config");
    Ok(config)
}

// ---------------------------------------------------------------------------
// Read loops
// ---------------------------------------------------------------------------

/// Execute each line of stdin.
fn run_piped(shell: &mut Shell) -> Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    let mut err = io::stderr();

    for line in stdin.lock().lines() {
        let line = line.context("failed to read standard input")?;
        if shell.handle_line(&line, &mut out, &mut err)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

fn run_interactive(shell: &mut Shell, model_path: &Path) -> Result<()> {
    let mut out = io::stdout();
    let mut err = io::stderr();

    print_banner(shell, model_path);

    let helper = BimqHelper {
        highlighter: highlighter::BimqHighlighter,
        completer: completer::BimqCompleter::new(Rc::clone(shell.session())),
        hinter: HistoryHinter::new(),
        validator: MatchingBracketValidator::new(),
    };

    let mut editor = rustyline::Editor::<BimqHelper, DefaultHistory>::new()
        .context("failed to create line editor")?;
    editor.set_helper(Some(helper));
    editor.set_auto_add_history(true);

    let history_path = history_file_path();
    if let Some(path) = &history_path {
        // Missing on first run.
        let _ = editor.load_history(path);
    }

    load_bimqrc(shell);

    let mut query_buf = String::new();

    loop {
        let prompt = if query_buf.is_empty() {
            format!("{} ", "bimq>".bright_green().bold())
        } else {
            format!("{} ", "   ..".bright_green())
        };

        match editor.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                // An empty line ends a continued query.
                if trimmed.is_empty() {
                    if !query_buf.is_empty() {
                        let query = std::mem::take(&mut query_buf);
                        shell.run_query(query.trim(), &mut out, &mut err)?;
                    }
                    continue;
                }

                if let Some(head) = trimmed.strip_suffix('\\') {
                    if !query_buf.is_empty() {
                        query_buf.push(' ');
                    }
                    query_buf.push_str(head);
                    continue;
                }

                if !query_buf.is_empty() {
                    query_buf.push(' ');
                    query_buf.push_str(trimmed);
                    let query = std::mem::take(&mut query_buf);
                    shell.run_query(query.trim(), &mut out, &mut err)?;
                    continue;
                }

                if shell.handle_line(trimmed, &mut out, &mut err)? == Flow::Quit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                if !query_buf.is_empty() {
                    query_buf.clear();
                    println!("Query cancelled.");
                } else {
                    println!("Use \\quit or Ctrl-D to exit.");
                }
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Readline error: {e}");
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        save_history(&mut editor, path);
    }
    Ok(())
}

fn save_history(editor: &mut rustyline::Editor<BimqHelper, DefaultHistory>, path: &Path) {
    if let Some(dir) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(path = %dir.display(), error = %e, "cannot create history directory");
            return;
        }
    }
    if let Err(e) = editor.save_history(path) {
        warn!(path = %path.display(), error = %e, "cannot save history");
    }
}

// ---------------------------------------------------------------------------
// Start-up files
// ---------------------------------------------------------------------------

/// Run meta-commands from `~/.bimqrc` if it exists.
fn load_bimqrc(shell: &mut Shell) {
    let Some(home) = dirs::home_dir() else {
        return;
    };
    let Ok(contents) = std::fs::read_to_string(home.join(".bimqrc")) else {
        return;
    };
    if let Err(e) = shell.apply_rc(&contents, &mut io::stdout(), &mut io::stderr()) {
        warn!(error = %e, "failed to apply .bimqrc");
    }
}

/// `$XDG_STATE_HOME/bimq/history`, falling back to `~/.local/state/bimq/history`.
fn history_file_path() -> Option<PathBuf> {
    let state = dirs::state_dir().or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")))?;
    Some(state.join("bimq").join("history"))
}

fn print_banner(shell: &Shell, model_path: &Path) {
    let engine = shell.session().engine();
    println!();
    println!("{}", "  bimq".bright_cyan().bold());
    println!("  {} {}", "Version:".dimmed(), VERSION);
    println!(
        "  {} {} ({} entities, {})",
        "Model:  ".dimmed(),
        model_path.display(),
        engine.len(),
        engine.schema_name()
    );
    println!("  {} {}", "Format: ".dimmed(), shell.options.format);
    println!();
    println!(
        "  Type {} for help, {} to exit.",
        "\\help".bright_yellow(),
        "\\quit".bright_yellow()
    );
    println!();
}
