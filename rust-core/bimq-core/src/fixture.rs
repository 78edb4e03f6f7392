// SPDX-License-Identifier: PMPL-1.0-or-later
//! Small in-memory engine for unit tests.

use std::cell::Cell;
use std::collections::BTreeMap;

use crate::engine::{Declaration, EntityId, QueryEngine, RawValue, SchemaLookup};
use crate::error::EngineError;

const SCHEMA: &[(&str, Option<&str>, bool)] = &[
    ("IfcRoot", None, true),
    ("IfcObjectDefinition", Some("IfcRoot"), true),
    ("IfcObject", Some("IfcObjectDefinition"), true),
    ("IfcProduct", Some("IfcObject"), true),
    ("IfcElement", Some("IfcProduct"), true),
    ("IfcBuiltElement", Some("IfcElement"), false),
    ("IfcWall", Some("IfcBuiltElement"), false),
    ("IfcWallStandardCase", Some("IfcWall"), false),
    ("IfcSlab", Some("IfcBuiltElement"), false),
    ("IfcDoor", Some("IfcBuiltElement"), false),
    ("IfcTypeObject", Some("IfcObjectDefinition"), false),
    ("IfcWallType", Some("IfcTypeObject"), false),
];

#[derive(Debug, Default)]
struct Entity {
    class: &'static str,
    attributes: BTreeMap<String, RawValue>,
    property_sets: BTreeMap<String, BTreeMap<String, RawValue>>,
}

/// Three walls (one a standard-case subtype), one wall type and one slab.
#[derive(Debug)]
pub(crate) struct FixtureEngine {
    entities: BTreeMap<u64, Entity>,
    evaluations: Cell<usize>,
}

fn text(s: &str) -> RawValue {
    RawValue::Text(s.to_string())
}

fn refs(ids: &[u64]) -> RawValue {
    RawValue::List(ids.iter().map(|&id| RawValue::Entity(EntityId(id))).collect())
}

fn wall_common(rating: &str, external: bool) -> BTreeMap<String, BTreeMap<String, RawValue>> {
    BTreeMap::from([(
        "Pset_WallCommon".to_string(),
        BTreeMap::from([
            ("FireRating".to_string(), text(rating)),
            ("IsExternal".to_string(), RawValue::Bool(external)),
        ]),
    )])
}

impl FixtureEngine {
    pub(crate) fn walls() -> Self {
        let mut entities = BTreeMap::new();
        entities.insert(
            1,
            Entity {
                class: "IfcWall",
                attributes: BTreeMap::from([
                    ("Name".to_string(), text("W-01")),
                    ("Tag".to_string(), text("T1")),
                    ("type".to_string(), RawValue::Entity(EntityId(10))),
                    ("ConnectedTo".to_string(), refs(&[2, 3, 20])),
                ]),
                property_sets: wall_common("60", true),
            },
        );
        entities.insert(
            2,
            Entity {
                class: "IfcWall",
                attributes: BTreeMap::from([
                    ("Name".to_string(), text("W-02")),
                    ("Tag".to_string(), RawValue::Null),
                    ("type".to_string(), RawValue::Entity(EntityId(10))),
                    ("ConnectedTo".to_string(), refs(&[1])),
                ]),
                property_sets: wall_common("90", false),
            },
        );
        entities.insert(
            3,
            Entity {
                class: "IfcWallStandardCase",
                attributes: BTreeMap::from([
                    ("Name".to_string(), text("W-03")),
                    ("Width".to_string(), RawValue::Real(0.25)),
                    ("ConnectedTo".to_string(), refs(&[])),
                ]),
                property_sets: BTreeMap::new(),
            },
        );
        entities.insert(
            10,
            Entity {
                class: "IfcWallType",
                attributes: BTreeMap::from([("Name".to_string(), text("WT-Concrete"))]),
                property_sets: BTreeMap::new(),
            },
        );
        entities.insert(
            20,
            Entity {
                class: "IfcSlab",
                attributes: BTreeMap::from([("Name".to_string(), text("S-01"))]),
                property_sets: BTreeMap::new(),
            },
        );
        Self {
            entities,
            evaluations: Cell::new(0),
        }
    }

    /// Number of `evaluate` calls so far.
    pub(crate) fn evaluations(&self) -> usize {
        self.evaluations.get()
    }

    fn is_a(&self, class: &str, target: &str) -> bool {
        let mut current = Some(class);
        while let Some(name) = current {
            if name == target {
                return true;
            }
            current = SCHEMA
                .iter()
                .find(|(n, _, _)| *n == name)
                .and_then(|(_, parent, _)| *parent);
        }
        false
    }

    fn entity(&self, id: EntityId) -> Result<&Entity, EngineError> {
        self.entities.get(&id.0).ok_or(EngineError::UnknownEntity(id))
    }
}

impl SchemaLookup for FixtureEngine {
    fn declaration_for(&self, class: &str) -> Option<Declaration> {
        SCHEMA
            .iter()
            .find(|(name, _, _)| *name == class)
            .map(|(name, parent, is_abstract)| Declaration {
                name: name.to_string(),
                supertype: parent.map(str::to_string),
                is_abstract: *is_abstract,
            })
    }
}

impl QueryEngine for FixtureEngine {
    fn schema_name(&self) -> &str {
        "IFC4"
    }

    fn classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self.entities.values().map(|e| e.class.to_string()).collect();
        classes.sort();
        classes.dedup();
        classes
    }

    /// Supports a leading class name plus `Attr=value` parts.
    fn evaluate(&self, filter: &str) -> Result<Vec<EntityId>, EngineError> {
        self.evaluations.set(self.evaluations.get() + 1);
        let mut parts = filter.split(',').map(str::trim).filter(|p| !p.is_empty());
        let Some(class) = parts.next() else {
            return Ok(Vec::new());
        };
        if self.declaration_for(class).is_none() {
            return Err(EngineError::Filter(format!("unknown class {class}")));
        }
        let predicates: Vec<(&str, &str)> = parts.filter_map(|p| p.split_once('=')).collect();

        Ok(self
            .entities
            .iter()
            .filter(|(_, e)| self.is_a(e.class, class))
            .filter(|(_, e)| {
                predicates.iter().all(|(attr, value)| {
                    e.attributes.get(attr.trim()).and_then(RawValue::scalar_text).as_deref()
                        == Some(value.trim().trim_matches('"'))
                })
            })
            .map(|(id, _)| EntityId(*id))
            .collect())
    }

    fn lookup(&self, entity: EntityId, path: &str) -> Result<RawValue, EngineError> {
        let not_found = || EngineError::NotFound {
            path: path.to_string(),
        };
        let mut current = RawValue::Entity(entity);
        for segment in path.split('.') {
            current = match current {
                RawValue::Entity(id) => {
                    let e = self.entity(id)?;
                    if let Some(value) = e.attributes.get(segment) {
                        value.clone()
                    } else if let Some(set) = e.property_sets.get(segment) {
                        RawValue::Group(set.clone())
                    } else {
                        return Err(not_found());
                    }
                }
                RawValue::List(items) if segment == "count" => RawValue::Integer(items.len() as i64),
                RawValue::List(items) => {
                    let index: usize = segment.parse().map_err(|_| not_found())?;
                    items.get(index).cloned().ok_or_else(not_found)?
                }
                RawValue::Group(props) => props.get(segment).cloned().ok_or_else(not_found)?,
                _ => return Err(not_found()),
            };
        }
        Ok(current)
    }

    fn apply_format(&self, function: &str, args: &[String]) -> Result<String, EngineError> {
        match function {
            "upper" => Ok(args.concat().to_uppercase()),
            "concat" => Ok(args.concat()),
            "int" => {
                let text = args.concat();
                text.parse::<f64>()
                    .map(|v| (v.trunc() as i64).to_string())
                    .map_err(|_| EngineError::Format {
                        function: "int".to_string(),
                        reason: format!("expected a number, got '{text}'"),
                    })
            }
            other => Err(EngineError::Format {
                function: other.to_string(),
                reason: "unknown function".to_string(),
            }),
        }
    }

    fn render(&self, entity: EntityId) -> String {
        match self.entities.get(&entity.0) {
            Some(e) => {
                let name = e
                    .attributes
                    .get("Name")
                    .and_then(RawValue::scalar_text)
                    .unwrap_or_default();
                format!("{entity}={}('{name}')", e.class.to_uppercase())
            }
            None => entity.to_string(),
        }
    }

    fn class_of(&self, entity: EntityId) -> Option<String> {
        self.entities.get(&entity.0).map(|e| e.class.to_string())
    }

    fn attribute_names(&self, entity: EntityId) -> Vec<String> {
        self.entities
            .get(&entity.0)
            .map(|e| e.attributes.keys().cloned().collect())
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
