// SPDX-License-Identifier: PMPL-1.0-or-later
//! Two-phase query execution: filter evaluation, then value resolution.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::{EntityId, QueryEngine, SchemaLookup};
use crate::error::QueryError;
use crate::resolve::{resolve, FailureKind, ResolvedValue, ValueExpr, ValueFailure};
use crate::segment::segment;
use crate::session::ModelSession;

/// One output cell; `None` renders empty.
pub type Cell = Option<String>;

/// A value failure summarised across every affected entity of one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub clause: String,
    pub reason: String,
    pub affected: usize,
    pub total: usize,
    pub first_entity: EntityId,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value '{}' unavailable for {} of {} entities (first {}): {}",
            self.clause, self.affected, self.total, self.first_entity, self.reason
        )
    }
}

/// Matched entities and, when value clauses were given, their resolved grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub filter: String,
    /// Value clause text in column order; empty in entity-dump mode.
    pub columns: Vec<String>,
    pub entities: Vec<EntityId>,
    /// One row per entity, one cell per column.
    pub rows: Vec<Vec<Cell>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl QueryResult {
    pub fn is_entity_dump(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[derive(Default)]
struct DiagnosticLog {
    entries: Vec<Diagnostic>,
    index: HashMap<(usize, FailureKind), usize>,
}

impl DiagnosticLog {
    /// Count a failure against its (column, kind) entry. The first entity's
    /// detail becomes the entry's reason.
    fn record(&mut self, column: usize, clause: &str, failure: ValueFailure, entity: EntityId, total: usize) {
        let key = (column, failure.kind);
        match self.index.get(&key) {
            Some(&at) => self.entries[at].affected += 1,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(Diagnostic {
                    clause: clause.to_string(),
                    reason: failure.reason,
                    affected: 1,
                    total,
                    first_entity: entity,
                });
            }
        }
    }
}

impl<E: QueryEngine + SchemaLookup> ModelSession<E> {
    /// Run a full query line.
    ///
    /// Filter failures abandon the query. Value failures degrade to empty
    /// cells and are reported once per clause and reason.
    pub fn execute(&self, raw: &str) -> Result<QueryResult, QueryError> {
        let segments = segment(raw);
        if segments.filter.is_empty() {
            return Err(QueryError::EmptyFilter);
        }

        let entities = self
            .engine()
            .evaluate(&segments.filter)
            .map_err(|source| {
                warn!(filter = %segments.filter, error = %source, "filter evaluation failed");
                QueryError::Filter {
                    clause: segments.filter.clone(),
                    schema: self.engine().schema_name().to_string(),
                    source,
                }
            })?;
        debug!(filter = %segments.filter, matched = entities.len(), "filter evaluated");

        if segments.is_filter_only() {
            return Ok(QueryResult {
                filter: segments.filter,
                columns: Vec::new(),
                entities,
                rows: Vec::new(),
                diagnostics: Vec::new(),
            });
        }

        let exprs: Vec<ValueExpr> = segments.values.iter().map(|c| ValueExpr::parse(c)).collect();
        let total = entities.len();
        let mut log = DiagnosticLog::default();
        let mut rows = Vec::with_capacity(total);

        for &entity in &entities {
            let mut row = Vec::with_capacity(exprs.len());
            for (column, expr) in exprs.iter().enumerate() {
                let clause = &segments.values[column];
                let cell = match resolve(self.engine(), entity, expr) {
                    ResolvedValue::Scalar(text) => Some(text),
                    ResolvedValue::Collection(items) if expr.explicit_selection() => Some(items.join(", ")),
                    ResolvedValue::Collection(_) => {
                        log.record(column, clause, ValueFailure::ambiguous_collection(), entity, total);
                        None
                    }
                    ResolvedValue::Missing => None,
                    ResolvedValue::Error(failure) => {
                        log.record(column, clause, failure, entity, total);
                        None
                    }
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Ok(QueryResult {
            filter: segments.filter,
            columns: segments.values,
            entities,
            rows,
            diagnostics: log.entries,
        })
    }
}
