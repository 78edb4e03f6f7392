// SPDX-License-Identifier: PMPL-1.0-or-later
//! Output formatters for query results.
//!
//! Supports four output modes:
//! - **TSV**: tab-joined cells, the default and the pipeline-friendly form.
//! - **CSV**: comma-separated values with RFC 4180 quoting.
//! - **Table**: human-readable columnar output using `comfy-table`.
//! - **JSON**: pretty-printed array of objects keyed by clause text. A clause
//!   repeated in one query keys its later columns as `Name (2)`, `Name (3)`.
//!
//! Entity-dump results are the engine's canonical entity text in every mode.
//! A result with no entities produces no lines in every mode.

use comfy_table::{Cell as TableCell, ContentArrangement, Table};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::engine::QueryEngine;
use crate::query::{Cell, QueryResult};

/// Available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Tsv,
    Csv,
    Table,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Tsv => write!(f, "tsv"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tsv" => Ok(OutputFormat::Tsv),
            "csv" => Ok(OutputFormat::Csv),
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "Unknown format '{other}'. Valid formats: tsv, csv, table, json"
            )),
        }
    }
}

/// How a result is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Emit a header line of clause text (TSV and CSV; tables always have one).
    pub headers: bool,
}

/// Render a query result as output lines.
pub fn format_output<E: QueryEngine + ?Sized>(
    engine: &E,
    result: &QueryResult,
    options: &OutputOptions,
) -> Vec<String> {
    if result.is_empty() {
        return Vec::new();
    }
    if result.is_entity_dump() {
        return result.entities.iter().map(|&e| engine.render(e)).collect();
    }

    match options.format {
        OutputFormat::Tsv => delimited(result, options.headers, '\t', tsv_escape),
        OutputFormat::Csv => delimited(result, options.headers, ',', csv_escape),
        OutputFormat::Table => format_table(result),
        OutputFormat::Json => format_json(result),
    }
}

fn delimited(result: &QueryResult, headers: bool, sep: char, escape: fn(&str) -> String) -> Vec<String> {
    let join = |cells: Vec<String>| cells.join(&sep.to_string());
    let mut lines = Vec::with_capacity(result.rows.len() + 1);
    if headers {
        lines.push(join(result.columns.iter().map(|c| escape(c)).collect()));
    }
    for row in &result.rows {
        lines.push(join(row.iter().map(|cell| escape(cell_text(cell))).collect()));
    }
    lines
}

fn cell_text(cell: &Cell) -> &str {
    cell.as_deref().unwrap_or("")
}

/// Tabs and line breaks inside a cell would break the row shape.
fn tsv_escape(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

/// Escape a string for CSV output per RFC 4180.
fn csv_escape(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn format_table(result: &QueryResult) -> Vec<String> {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(result.columns.iter().map(TableCell::new));
    for row in &result.rows {
        table.add_row(row.iter().map(|cell| TableCell::new(cell_text(cell))));
    }

    let row_count = result.rows.len();
    let mut lines: Vec<String> = table.to_string().lines().map(str::to_string).collect();
    lines.push(format!("({row_count} row{})", if row_count == 1 { "" } else { "s" }));
    lines
}

/// Object keys for each column, numbering repeated clauses from 2.
fn json_keys(columns: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(columns.len());
    columns
        .iter()
        .map(|column| {
            let mut key = column.clone();
            let mut n = 2;
            while !seen.insert(key.clone()) {
                key = format!("{column} ({n})");
                n += 1;
            }
            key
        })
        .collect()
}

fn format_json(result: &QueryResult) -> Vec<String> {
    let keys = json_keys(&result.columns);
    let rows: Vec<Value> = result
        .rows
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            for (key, cell) in keys.iter().zip(row) {
                let value = cell.as_ref().map_or(Value::Null, |s| Value::String(s.clone()));
                obj.insert(key.clone(), value);
            }
            Value::Object(obj)
        })
        .collect();
    let value = Value::Array(rows);
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    text.lines().map(str::to_string).collect()
}
