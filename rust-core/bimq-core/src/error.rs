// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types shared by the query pipeline and its engine collaborators.

use thiserror::Error;

use crate::engine::EntityId;

/// Errors raised by a [`QueryEngine`](crate::QueryEngine) implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid filter: {0}")]
    Filter(String),

    /// The path does not exist on the entity (as opposed to existing with no value).
    #[error("'{path}' not found")]
    NotFound { path: String },

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("{function}(): {reason}")]
    Format { function: String, reason: String },

    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
}

/// Errors that abandon a whole query.
///
/// Per-cell value failures never surface here; they degrade to missing
/// cells and are reported as [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("filter clause is empty")]
    EmptyFilter,

    #[error("filter '{clause}' failed on {schema} model: {source}")]
    Filter {
        clause: String,
        schema: String,
        #[source]
        source: EngineError,
    },
}
