// SPDX-License-Identifier: PMPL-1.0-or-later
//! JSON building model and its [`QueryEngine`] implementation.
//!
//! Document shape:
//!
//! ```json
//! {
//!   "schema": "IFC4",
//!   "classes": { "IfcAcousticPanel": { "supertype": "IfcCovering" } },
//!   "georeference": { "eastings": 500000.0, "northings": 4000000.0, "orthogonal_height": 12.0 },
//!   "entities": [
//!     {
//!       "id": 1,
//!       "class": "IfcWall",
//!       "attributes": { "GlobalId": "2O2Fr$t4X7Zf8NOew3FLOH", "Name": "W-01", "OwnerHistory": { "ref": 5 } },
//!       "relations": { "type": 10, "container": 40, "ConnectedTo": [2, 3] },
//!       "psets": { "Pset_WallCommon": { "FireRating": "60", "IsExternal": true } },
//!       "location": [0.0, 4.5, 0.0]
//!     }
//!   ]
//! }
//! ```
//!
//! The model is immutable once loaded.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use bimq_core::{Declaration, EngineError, EntityId, QueryEngine, RawValue, SchemaLookup};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::ModelError;
use crate::schema::{ClassSpec, Schema};
use crate::{format, path, selector, step};

fn default_schema() -> String {
    "IFC4".to_string()
}

/// Top-level model document.
#[derive(Debug, Deserialize)]
pub struct ModelDocument {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default)]
    pub classes: BTreeMap<String, ClassSpec>,
    #[serde(default)]
    pub georeference: Georeference,
    pub entities: Vec<EntityRecord>,
}

/// Map conversion offsets applied to `easting`/`northing`/`elevation`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Georeference {
    pub eastings: f64,
    pub northings: f64,
    pub orthogonal_height: f64,
}

/// One entity as written in the document.
#[derive(Debug, Deserialize)]
pub struct EntityRecord {
    pub id: u64,
    pub class: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationTarget>,
    #[serde(default)]
    pub psets: BTreeMap<String, Map<String, Value>>,
    #[serde(default)]
    pub location: Option<[f64; 3]>,
}

/// A relation to one or several entities.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RelationTarget {
    One(u64),
    Many(Vec<u64>),
}

impl RelationTarget {
    fn into_raw(self) -> RawValue {
        match self {
            RelationTarget::One(id) => RawValue::Entity(EntityId(id)),
            RelationTarget::Many(ids) => {
                RawValue::List(ids.into_iter().map(|id| RawValue::Entity(EntityId(id))).collect())
            }
        }
    }
}

/// A loaded entity.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub class: String,
    /// Direct attributes in declaration order.
    pub attributes: Vec<(String, RawValue)>,
    pub relations: BTreeMap<String, RawValue>,
    pub property_sets: BTreeMap<String, BTreeMap<String, RawValue>>,
    pub location: Option<[f64; 3]>,
}

impl Entity {
    pub fn attribute(&self, name: &str) -> Option<&RawValue> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn relation(&self, name: &str) -> Option<&RawValue> {
        self.relations.get(name)
    }
}

/// An in-memory building model.
#[derive(Debug, Clone)]
pub struct JsonModel {
    schema_name: String,
    schema: Schema,
    georeference: Georeference,
    entities: BTreeMap<u64, Entity>,
}

impl JsonModel {
    /// Load a model document from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let model = Self::from_json(&text)?;
        info!(
            path = %path.as_ref().display(),
            entities = model.len(),
            schema = %model.schema_name,
            "model loaded"
        );
        Ok(model)
    }

    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let document: ModelDocument = serde_json::from_str(text)?;
        Self::from_document(document)
    }

    /// Build a model, validating classes, ids and references.
    pub fn from_document(document: ModelDocument) -> Result<Self, ModelError> {
        let mut schema = Schema::ifc4();
        schema.extend(document.classes);

        let mut entities = BTreeMap::new();
        for record in document.entities {
            if !schema.contains(&record.class) {
                return Err(ModelError::UndeclaredClass {
                    id: record.id,
                    class: record.class,
                });
            }
            let id = record.id;
            let entity = Entity {
                id: EntityId(id),
                class: record.class,
                attributes: record
                    .attributes
                    .into_iter()
                    .map(|(key, value)| (key, json_to_raw(value)))
                    .collect(),
                relations: record
                    .relations
                    .into_iter()
                    .map(|(key, target)| (key, target.into_raw()))
                    .collect(),
                property_sets: record
                    .psets
                    .into_iter()
                    .map(|(set, props)| {
                        let props = props.into_iter().map(|(k, v)| (k, json_to_raw(v))).collect();
                        (set, props)
                    })
                    .collect(),
                location: record.location,
            };
            if entities.insert(id, entity).is_some() {
                return Err(ModelError::DuplicateEntity(id));
            }
        }

        for entity in entities.values() {
            let mut targets = Vec::new();
            let values = entity
                .attributes
                .iter()
                .map(|(_, v)| v)
                .chain(entity.relations.values());
            for value in values {
                collect_references(value, &mut targets);
            }
            if let Some(missing) = targets.into_iter().find(|to| !entities.contains_key(&to.0)) {
                return Err(ModelError::DanglingReference {
                    from: entity.id.0,
                    to: missing.0,
                });
            }
        }

        debug!(entities = entities.len(), classes = schema.len(), "model built");
        Ok(Self {
            schema_name: document.schema,
            schema,
            georeference: document.georeference,
            entities,
        })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn georeference(&self) -> Georeference {
        self.georeference
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity, EngineError> {
        self.entities.get(&id.0).ok_or(EngineError::UnknownEntity(id))
    }
}

/// Convert a JSON attribute value; `{"ref": n}` is an entity reference.
fn json_to_raw(value: Value) -> RawValue {
    match value {
        Value::Null => RawValue::Null,
        Value::Bool(b) => RawValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => RawValue::Integer(i),
            None => RawValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => RawValue::Text(s),
        Value::Array(items) => RawValue::List(items.into_iter().map(json_to_raw).collect()),
        Value::Object(obj) => match (obj.len(), obj.get("ref").and_then(Value::as_u64)) {
            (1, Some(id)) => RawValue::Entity(EntityId(id)),
            _ => RawValue::Group(obj.into_iter().map(|(k, v)| (k, json_to_raw(v))).collect()),
        },
    }
}

fn collect_references(value: &RawValue, out: &mut Vec<EntityId>) {
    match value {
        RawValue::Entity(id) => out.push(*id),
        RawValue::List(items) => items.iter().for_each(|item| collect_references(item, out)),
        RawValue::Group(props) => props.values().for_each(|item| collect_references(item, out)),
        _ => {}
    }
}

impl SchemaLookup for JsonModel {
    fn declaration_for(&self, class: &str) -> Option<Declaration> {
        self.schema.get(class).cloned()
    }
}

impl QueryEngine for JsonModel {
    fn schema_name(&self) -> &str {
        &self.schema_name
    }

    fn classes(&self) -> Vec<String> {
        let classes: BTreeSet<&str> = self.entities.values().map(|e| e.class.as_str()).collect();
        classes.into_iter().map(str::to_string).collect()
    }

    fn evaluate(&self, filter: &str) -> Result<Vec<EntityId>, EngineError> {
        selector::evaluate(self, filter)
    }

    fn lookup(&self, entity: EntityId, path: &str) -> Result<RawValue, EngineError> {
        path::lookup(self, entity, path)
    }

    fn apply_format(&self, function: &str, args: &[String]) -> Result<String, EngineError> {
        format::apply(function, args)
    }

    fn render(&self, entity: EntityId) -> String {
        match self.entities.get(&entity.0) {
            Some(e) => step::render(e),
            None => entity.to_string(),
        }
    }

    fn class_of(&self, entity: EntityId) -> Option<String> {
        self.entities.get(&entity.0).map(|e| e.class.clone())
    }

    fn attribute_names(&self, entity: EntityId) -> Vec<String> {
        self.entities
            .get(&entity.0)
            .map(|e| {
                e.attributes
                    .iter()
                    .map(|(name, _)| name.clone())
                    .chain(e.relations.keys().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn property_sets(&self, entity: EntityId) -> BTreeMap<String, Vec<String>> {
        self.entities
            .get(&entity.0)
            .map(|e| {
                e.property_sets
                    .iter()
                    .map(|(set, props)| (set.clone(), props.keys().cloned().collect()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
