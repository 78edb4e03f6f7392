// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! Shell state and line handling.
//!
//! Query results go to the data writer; diagnostics, errors and status
//! messages go to the diagnostic writer. The two never mix, so the shell's
//! stdout can be piped into other tools.

use std::io::{self, Write};
use std::rc::Rc;
use std::time::Instant;

use bimq_core::{format_output, ModelSession, OutputFormat, OutputOptions};
use bimq_model::JsonModel;
use colored::Colorize;
use tracing::{debug, warn};
use tracing_subscriber::{reload, EnvFilter, Registry};

use crate::highlighter::highlight_step;

/// Handle used by `\debug` to swap the active log filter.
pub type LogHandle = reload::Handle<EnvFilter, Registry>;

/// Filter directive used when debug logging is off.
pub const DEFAULT_LOG: &str = "warn";

/// Whether the read loop keeps going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Mutable session state for the read loop.
pub struct Shell {
    session: Rc<ModelSession<JsonModel>>,
    pub options: OutputOptions,
    pub show_timing: bool,
    pub debug: bool,
    /// Highlight STEP output.
    color: bool,
    log: Option<LogHandle>,
}

impl Shell {
    pub fn new(session: Rc<ModelSession<JsonModel>>, options: OutputOptions, color: bool) -> Self {
        Self {
            session,
            options,
            show_timing: false,
            debug: false,
            color,
            log: None,
        }
    }

    /// Attach the log filter handle toggled by `\debug`.
    pub fn with_log(mut self, handle: LogHandle, debug: bool) -> Self {
        self.log = Some(handle);
        self.debug = debug;
        self
    }

    pub fn session(&self) -> &Rc<ModelSession<JsonModel>> {
        &self.session
    }

    /// Dispatch one complete input line.
    pub fn handle_line(
        &mut self,
        line: &str,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<Flow> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Flow::Continue);
        }
        if trimmed.starts_with('\\') {
            return self.meta_command(trimmed, out, err);
        }
        self.run_query(trimmed, out, err)?;
        Ok(Flow::Continue)
    }

    /// Execute a query and print its rows and diagnostics.
    pub fn run_query(&self, query: &str, out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
        let start = Instant::now();
        let result = match self.session.execute(query) {
            Ok(result) => result,
            Err(e) => {
                debug!(query, error = %e, "query abandoned");
                writeln!(err, "{} {e}", "Error:".red().bold())?;
                return Ok(());
            }
        };

        let entity_dump = result.is_entity_dump();
        for line in format_output(self.session.engine(), &result, &self.options) {
            if entity_dump && self.color {
                writeln!(out, "{}", highlight_step(&line))?;
            } else {
                writeln!(out, "{line}")?;
            }
        }
        out.flush()?;

        for diagnostic in &result.diagnostics {
            writeln!(err, "{} {diagnostic}", "Warning:".yellow().bold())?;
        }
        if self.show_timing {
            let elapsed = start.elapsed();
            writeln!(
                err,
                "{}",
                format!(
                    "Time: {:.3}ms ({} entities)",
                    elapsed.as_secs_f64() * 1000.0,
                    result.len()
                )
                .dimmed()
            )?;
        }
        Ok(())
    }

    /// Handle a line starting with `\`.
    pub fn meta_command(
        &mut self,
        line: &str,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<Flow> {
        let (cmd, arg) = match line.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line, ""),
        };

        match cmd {
            "\\quit" | "\\q" => return Ok(Flow::Quit),
            "\\help" | "\\h" | "\\?" => print_help(out)?,
            "\\headers" => match switch(arg, self.options.headers) {
                Ok(on) => {
                    self.options.headers = on;
                    writeln!(err, "Headers: {}", on_off(on))?;
                }
                Err(e) => writeln!(err, "{} {e}", "Error:".red().bold())?,
            },
            "\\timing" => match switch(arg, self.show_timing) {
                Ok(on) => {
                    self.show_timing = on;
                    writeln!(err, "Timing display: {}", on_off(on))?;
                }
                Err(e) => writeln!(err, "{} {e}", "Error:".red().bold())?,
            },
            "\\format" => {
                if arg.is_empty() {
                    writeln!(err, "Current format: {}", self.options.format)?;
                    writeln!(err, "Usage: \\format <tsv|csv|table|json>")?;
                } else {
                    match arg.parse::<OutputFormat>() {
                        Ok(format) => {
                            self.options.format = format;
                            writeln!(err, "Output format: {format}")?;
                        }
                        Err(e) => writeln!(err, "{} {e}", "Error:".red().bold())?,
                    }
                }
            }
            "\\debug" => match switch(arg, self.debug) {
                Ok(on) => self.set_debug(on, err)?,
                Err(e) => writeln!(err, "{} {e}", "Error:".red().bold())?,
            },
            "\\cache" => {
                writeln!(out, "Sampling cache: {}", self.session.cache_stats())?;
            }
            _ => {
                writeln!(
                    err,
                    "{} Unknown command: {cmd}. Type \\help for available commands.",
                    "Error:".red().bold()
                )?;
            }
        }

        Ok(Flow::Continue)
    }

    fn set_debug(&mut self, on: bool, err: &mut impl Write) -> io::Result<()> {
        let Some(handle) = &self.log else {
            return writeln!(err, "{} debug logging is not available", "Error:".red().bold());
        };
        let directive = if on { "debug" } else { DEFAULT_LOG };
        match handle.reload(EnvFilter::new(directive)) {
            Ok(()) => {
                self.debug = on;
                writeln!(err, "Debug logging: {}", on_off(on))
            }
            Err(e) => {
                warn!(error = %e, "failed to reload log filter");
                writeln!(err, "{} {e}", "Error:".red().bold())
            }
        }
    }

    /// Run the meta-commands of an rc file; other lines are skipped.
    pub fn apply_rc(&mut self, contents: &str, out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
        for line in contents.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with('\\') {
                self.meta_command(trimmed, out, err)?;
            } else {
                warn!(line = trimmed, "ignoring non-command line in rc file");
            }
        }
        Ok(())
    }
}

/// `on`/`off` set a flag, no argument toggles it.
fn switch(arg: &str, current: bool) -> Result<bool, String> {
    match arg.to_lowercase().as_str() {
        "" => Ok(!current),
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(format!("expected 'on' or 'off', got '{other}'")),
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Print the help text for meta-commands and query syntax.
pub fn print_help(out: &mut impl Write) -> io::Result<()> {
    let commands = [
        ("\\headers [on|off]   ", "Toggle the header row"),
        ("\\format <fmt>       ", "Set output format (tsv|csv|table|json)"),
        ("\\timing [on|off]    ", "Toggle query timing display"),
        ("\\debug [on|off]     ", "Toggle debug logging"),
        ("\\cache              ", "Show sampling cache statistics"),
        ("\\help               ", "Show this help message"),
        ("\\quit / \\q          ", "Exit the shell"),
    ];

    writeln!(out)?;
    writeln!(out, "{}", "  Meta-Commands".bright_cyan().bold())?;
    writeln!(out)?;
    for (usage, text) in commands {
        writeln!(out, "  {}  {text}", usage.bright_yellow())?;
    }
    writeln!(out)?;
    writeln!(out, "{}", "  Queries".bright_cyan().bold())?;
    writeln!(out)?;
    writeln!(out, "  <filter> [; <value> ; <value> ...]")?;
    writeln!(out, "  e.g. IfcWall, Pset_WallCommon.IsExternal=TRUE ; Name ; type.Name")?;
    writeln!(out, "  A filter alone prints the matching entities as STEP text.")?;
    writeln!(out, "  Press Tab to complete; end a line with \\ to continue it.")?;
    writeln!(out)?;
    Ok(())
}
