// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Model loading errors.
//
// Every variant is fatal to loading: a model either loads completely or not
// at all, so query-time code never sees a half-built model.

use thiserror::Error;

/// Errors that can occur while loading a JSON building model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON or does not have the model shape.
    #[error("invalid model document: {0}")]
    Json(#[from] serde_json::Error),

    /// Two entities share an id.
    #[error("duplicate entity #{0}")]
    DuplicateEntity(u64),

    /// An entity uses a class neither built in nor declared by the document.
    #[error("entity #{id} has undeclared class {class}")]
    UndeclaredClass {
        /// Entity id.
        id: u64,
        /// The class name as written.
        class: String,
    },

    /// A reference or relation points at an id that does not exist.
    #[error("entity #{from} references missing entity #{to}")]
    DanglingReference {
        /// Referencing entity.
        from: u64,
        /// Missing target.
        to: u64,
    },
}
