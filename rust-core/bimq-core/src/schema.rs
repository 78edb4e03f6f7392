// SPDX-License-Identifier: PMPL-1.0-or-later
//! Schema index: cached supertype chains over a [`SchemaLookup`].
//!
//! The schema is immutable once a model is loaded, so every chain is computed
//! once per class and reused for the lifetime of the owning session.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use crate::engine::SchemaLookup;

#[derive(Debug, Clone)]
struct Lineage {
    known: bool,
    chain: Rc<[String]>,
}

/// Per-session cache of class ancestry.
#[derive(Debug, Default)]
pub struct SchemaIndex {
    lineages: RefCell<HashMap<String, Lineage>>,
}

impl SchemaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The class itself followed by each supertype up to the root.
    ///
    /// Unknown classes yield a single-element chain. A cyclic declaration
    /// table is cut at the first repeated name.
    pub fn ancestors<S: SchemaLookup + ?Sized>(&self, schema: &S, class: &str) -> Rc<[String]> {
        self.lineage(schema, class).chain
    }

    /// Whether the schema declares the class.
    pub fn exists<S: SchemaLookup + ?Sized>(&self, schema: &S, class: &str) -> bool {
        self.lineage(schema, class).known
    }

    /// Number of classes with a cached chain.
    pub fn len(&self) -> usize {
        self.lineages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lineages.borrow().is_empty()
    }

    fn lineage<S: SchemaLookup + ?Sized>(&self, schema: &S, class: &str) -> Lineage {
        if let Some(hit) = self.lineages.borrow().get(class) {
            return hit.clone();
        }

        let mut chain = vec![class.to_string()];
        let mut seen: HashSet<String> = HashSet::from([class.to_string()]);
        let declaration = schema.declaration_for(class);
        let known = declaration.is_some();

        let mut next = declaration.and_then(|d| d.supertype);
        while let Some(parent) = next {
            if !seen.insert(parent.clone()) {
                debug!(class, parent = %parent, "supertype cycle in schema, chain truncated");
                break;
            }
            next = schema.declaration_for(&parent).and_then(|d| d.supertype);
            chain.push(parent);
        }

        let lineage = Lineage {
            known,
            chain: chain.into(),
        };
        self.lineages
            .borrow_mut()
            .insert(class.to_string(), lineage.clone());
        lineage
    }
}
