// SPDX-License-Identifier: PMPL-1.0-or-later
//! Contracts for the external query engine and schema lookup.
//!
//! The core never loads models, evaluates selector grammar or applies
//! formatting functions itself. It relies on the two traits below, which a
//! model backend implements once per loaded model.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Stable identity of one entity within a loaded model (`#<n>` in STEP text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A raw value as returned by [`QueryEngine::lookup`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// The path exists but carries no value.
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    /// Reference to another entity.
    Entity(EntityId),
    /// Several values, e.g. a relationship to many related entities.
    List(Vec<RawValue>),
    /// A property or quantity set reached without naming a property.
    Group(BTreeMap<String, RawValue>),
}

impl RawValue {
    /// Whether the value is list/tuple-like for completion purposes.
    pub fn is_collection(&self) -> bool {
        matches!(self, RawValue::List(_))
    }

    /// Text form of a plain scalar; `None` for references and containers.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            RawValue::Bool(true) => Some("True".to_string()),
            RawValue::Bool(false) => Some("False".to_string()),
            RawValue::Integer(i) => Some(i.to_string()),
            RawValue::Real(r) => Some(r.to_string()),
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Null | RawValue::Entity(_) | RawValue::List(_) | RawValue::Group(_) => None,
        }
    }
}

/// Schema declaration of one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    /// Direct supertype, `None` at the root of the hierarchy.
    pub supertype: Option<String>,
    #[serde(default)]
    pub is_abstract: bool,
}

/// Schema declaration lookup, used only by the [`SchemaIndex`](crate::SchemaIndex).
pub trait SchemaLookup {
    fn declaration_for(&self, class: &str) -> Option<Declaration>;
}

/// Filter evaluation, value lookup and rendering over one loaded model.
///
/// Implementations must treat the model as read-only and must not panic on
/// partial or malformed text: the completion engine feeds them half-typed
/// filters on every keystroke.
pub trait QueryEngine {
    /// Schema identifier of the loaded model (e.g. `IFC4`), used in diagnostics.
    fn schema_name(&self) -> &str;

    /// Concrete classes instantiated at least once in the model.
    fn classes(&self) -> Vec<String>;

    /// Evaluate a filter clause. Empty input yields an empty selection.
    fn evaluate(&self, filter: &str) -> Result<Vec<EntityId>, EngineError>;

    /// Resolve a value path against one entity.
    ///
    /// Returns [`EngineError::NotFound`] when the path does not exist and
    /// `Ok(RawValue::Null)` when it exists without a value.
    fn lookup(&self, entity: EntityId, path: &str) -> Result<RawValue, EngineError>;

    /// Apply a formatting function to already-resolved argument text.
    fn apply_format(&self, function: &str, args: &[String]) -> Result<String, EngineError>;

    /// Canonical single-line text of an entity.
    fn render(&self, entity: EntityId) -> String;

    fn class_of(&self, entity: EntityId) -> Option<String>;

    /// Direct and relationship attribute names present on the entity.
    fn attribute_names(&self, entity: EntityId) -> Vec<String>;

    /// Property and quantity sets attached to the entity, with their property names.
    fn property_sets(&self, entity: EntityId) -> BTreeMap<String, Vec<String>>;
}

impl<T: QueryEngine + ?Sized> QueryEngine for &T {
    fn schema_name(&self) -> &str {
        (**self).schema_name()
    }
    fn classes(&self) -> Vec<String> {
        (**self).classes()
    }
    fn evaluate(&self, filter: &str) -> Result<Vec<EntityId>, EngineError> {
        (**self).evaluate(filter)
    }
    fn lookup(&self, entity: EntityId, path: &str) -> Result<RawValue, EngineError> {
        (**self).lookup(entity, path)
    }
    fn apply_format(&self, function: &str, args: &[String]) -> Result<String, EngineError> {
        (**self).apply_format(function, args)
    }
    fn render(&self, entity: EntityId) -> String {
        (**self).render(entity)
    }
    fn class_of(&self, entity: EntityId) -> Option<String> {
        (**self).class_of(entity)
    }
    fn attribute_names(&self, entity: EntityId) -> Vec<String> {
        (**self).attribute_names(entity)
    }
    fn property_sets(&self, entity: EntityId) -> BTreeMap<String, Vec<String>> {
        (**self).property_sets(entity)
    }
}

impl<T: SchemaLookup + ?Sized> SchemaLookup for &T {
    fn declaration_for(&self, class: &str) -> Option<Declaration> {
        (**self).declaration_for(class)
    }
}
