// SPDX-License-Identifier: PMPL-1.0-or-later
//! bimq core
//!
//! Context-aware completion and two-phase query execution for an interactive
//! building-model query shell. Model loading, filter evaluation, value lookup
//! and formatting functions are supplied by a [`QueryEngine`]; this crate
//! decides what to ask it and what to do with the answers.

pub mod candidates;
pub mod completion;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod output;
pub mod query;
pub mod resolve;
pub mod sampling;
pub mod schema;
pub mod segment;
pub mod session;

#[cfg(test)]
mod fixture;

pub use candidates::{CandidateSet, FILTER_KEYWORDS, SELECTOR_KEYWORDS, SET_PREFIXES};
pub use completion::{keyword_value_path, Completion};
pub use config::SessionConfig;
pub use context::{classify_syntax, CompletionContext, COMPARISON_OPERATORS};
pub use engine::{Declaration, EntityId, QueryEngine, RawValue, SchemaLookup};
pub use error::{EngineError, QueryError};
pub use output::{format_output, OutputFormat, OutputOptions};
pub use query::{Cell, Diagnostic, QueryResult};
pub use resolve::{resolve, FailureKind, ResolvedValue, ValueExpr, ValueFailure, AMBIGUOUS_COLLECTION};
pub use sampling::{CacheStats, Sample, SampleCache, SampleKey};
pub use schema::SchemaIndex;
pub use segment::{extract_partial_filter, segment, Segments, DELIMITER};
pub use session::ModelSession;
