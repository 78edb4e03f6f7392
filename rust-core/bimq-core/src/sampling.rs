// SPDX-License-Identifier: PMPL-1.0-or-later
//! Sampling cache.
//!
//! Completion never scans the whole model. Each context key is answered from
//! a bounded sample of representative entities, built on first use and kept
//! for the rest of the session. Names present only on unsampled entities do
//! not appear in completions; that approximation is accepted.
//!
//! An entry is committed only after its build returns successfully, so a
//! failed or abandoned build leaves the cache as it was.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::engine::{EntityId, QueryEngine, RawValue};
use crate::error::EngineError;

/// What a sample is drawn for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SampleKey {
    /// Filter-side discovery over the matched set of a filter prefix.
    Filter(String),
    /// Value-side discovery over a bounded slice of the matched set.
    Value(String),
    /// Concrete classes reachable from a class name.
    Class(String),
    /// What a value path prefix resolves to on the value sample of `filter`.
    Path { filter: String, path: String },
    /// Known values of a value path over the filter sample of `filter`.
    AttributeValues { filter: String, path: String },
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleKey::Filter(filter) => write!(f, "filter({filter})"),
            SampleKey::Value(filter) => write!(f, "value({filter})"),
            SampleKey::Class(class) => write!(f, "class({class})"),
            SampleKey::Path { filter, path } => write!(f, "path({filter} ; {path})"),
            SampleKey::AttributeValues { filter, path } => {
                write!(f, "values({filter} ; {path})")
            }
        }
    }
}

/// Names discovered from a bounded set of entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    /// The inspected entities, in engine order.
    pub entities: Vec<EntityId>,
    /// Attribute, relationship and set names (or property names, when a path
    /// reaches a property set).
    pub names: BTreeSet<String>,
    /// Set name to its property names.
    pub property_sets: BTreeMap<String, BTreeSet<String>>,
    /// Classes of the inspected entities.
    pub classes: BTreeSet<String>,
    /// Quoted scalar values seen at a path.
    pub values: BTreeSet<String>,
    pub has_booleans: bool,
    /// Largest collection length seen at a path; `None` when no collection was seen.
    pub collection_len: Option<usize>,
    /// Whether a path reached at least one entity.
    pub reaches_entities: bool,
}

impl Sample {
    /// Inspect entities directly: their classes, attributes and sets.
    pub(crate) fn of_entities<E: QueryEngine + ?Sized>(engine: &E, entities: Vec<EntityId>) -> Self {
        let mut sample = Sample::default();
        for &entity in &entities {
            sample.absorb_entity(engine, entity);
        }
        sample.entities = entities;
        sample
    }

    /// Inspect what `path` resolves to on each entity. Entities where the path
    /// does not resolve are skipped.
    pub(crate) fn of_path<E: QueryEngine + ?Sized>(engine: &E, entities: &[EntityId], path: &str) -> Self {
        let mut sample = Sample::default();
        for &entity in entities {
            match engine.lookup(entity, path) {
                Ok(value) => sample.absorb_value(engine, &value),
                Err(err) => debug!(%entity, path, error = %err, "path skipped while sampling"),
            }
        }
        sample.entities = entities.to_vec();
        sample
    }

    fn absorb_entity<E: QueryEngine + ?Sized>(&mut self, engine: &E, entity: EntityId) {
        if let Some(class) = engine.class_of(entity) {
            self.classes.insert(class);
        }
        self.names.extend(engine.attribute_names(entity));
        for (set, props) in engine.property_sets(entity) {
            self.names.insert(set.clone());
            self.property_sets.entry(set).or_default().extend(props);
        }
    }

    fn absorb_value<E: QueryEngine + ?Sized>(&mut self, engine: &E, value: &RawValue) {
        match value {
            RawValue::Null => {}
            RawValue::Bool(_) => self.has_booleans = true,
            RawValue::Integer(_) | RawValue::Real(_) | RawValue::Text(_) => {
                if let Some(text) = value.scalar_text() {
                    if !text.contains('"') {
                        self.values.insert(format!("\"{text}\""));
                    }
                }
            }
            RawValue::Entity(id) => {
                self.reaches_entities = true;
                self.absorb_entity(engine, *id);
            }
            RawValue::List(items) => {
                self.collection_len = Some(self.collection_len.unwrap_or(0).max(items.len()));
            }
            RawValue::Group(props) => self.names.extend(props.keys().cloned()),
        }
    }

    /// Every discovered name, sets included.
    pub fn discovered_names(&self) -> &BTreeSet<String> {
        &self.names
    }
}

/// Hit/miss counters for the `\cache` report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} hits, {} misses",
            self.entries, self.hits, self.misses
        )
    }
}

/// Session-lifetime map from sample key to sample. Entries are never invalidated.
#[derive(Debug, Default)]
pub struct SampleCache {
    entries: RefCell<HashMap<SampleKey, Rc<Sample>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl SampleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached sample for `key`, building it on a miss.
    ///
    /// The build runs without a borrow held, so it may itself consult the
    /// cache for other keys. A failed build stores nothing.
    pub fn get_or_try_insert_with<F>(&self, key: &SampleKey, build: F) -> Result<Rc<Sample>, EngineError>
    where
        F: FnOnce() -> Result<Sample, EngineError>,
    {
        if let Some(hit) = self.entries.borrow().get(key) {
            self.hits.set(self.hits.get() + 1);
            return Ok(Rc::clone(hit));
        }

        self.misses.set(self.misses.get() + 1);
        let sample = Rc::new(build()?);
        debug!(
            key = %key,
            entities = sample.entities.len(),
            names = sample.names.len(),
            "sample cached"
        );
        let mut entries = self.entries.borrow_mut();
        Ok(Rc::clone(entries.entry(key.clone()).or_insert(sample)))
    }

    pub fn contains(&self, key: &SampleKey) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }
}
