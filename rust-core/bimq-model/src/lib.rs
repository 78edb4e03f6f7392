// SPDX-License-Identifier: PMPL-1.0-or-later
//! bimq model
//!
//! Reference [`QueryEngine`](bimq_core::QueryEngine) over a JSON-serialised
//! building model: loading and validation, a built-in IFC4 class hierarchy,
//! selector-style filters, value paths, formatting functions and STEP text.

pub mod error;
pub mod format;
pub mod model;
mod path;
pub mod schema;
mod selector;
pub mod step;

pub use error::ModelError;
pub use model::{Entity, EntityRecord, Georeference, JsonModel, ModelDocument, RelationTarget};
pub use schema::{ClassSpec, Schema};
