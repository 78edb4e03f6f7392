// SPDX-License-Identifier: PMPL-1.0-or-later
//! Value path lookup.
//!
//! A path is a dot-separated walk starting at one entity. Each segment is
//! read from the value reached so far:
//!
//! - on an entity: a selector keyword, an attribute, a relation or a
//!   property set (in that order);
//! - on a collection: `count` or a non-negative index;
//! - on a property set: a property name.
//!
//! Keywords exist on every entity and yield null when the entity has nothing
//! to offer; null propagates through the rest of the path.

use bimq_core::{EngineError, EntityId, RawValue};

use crate::model::{Entity, JsonModel};

/// Maximum containment hops when walking up the spatial structure.
const MAX_SPATIAL_DEPTH: usize = 64;

/// Resolve `path` starting at `entity`.
pub(crate) fn lookup(model: &JsonModel, entity: EntityId, path: &str) -> Result<RawValue, EngineError> {
    let mut current = RawValue::Entity(entity);
    for segment in path.split('.').map(str::trim) {
        if segment.is_empty() {
            return Err(EngineError::InvalidPath {
                path: path.to_string(),
                reason: "empty segment".to_string(),
            });
        }
        current = step(model, current, segment, path)?;
    }
    Ok(current)
}

fn step(model: &JsonModel, current: RawValue, segment: &str, path: &str) -> Result<RawValue, EngineError> {
    let not_found = || EngineError::NotFound {
        path: path.to_string(),
    };
    let invalid = |reason: String| EngineError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    match current {
        RawValue::Null => Ok(RawValue::Null),
        RawValue::Entity(id) => entity_segment(model, model.entity(id)?, segment).ok_or_else(not_found),
        RawValue::List(items) => {
            if segment == "count" {
                return Ok(RawValue::Integer(items.len() as i64));
            }
            let index: usize = segment
                .parse()
                .map_err(|_| invalid(format!("'{segment}' applied to a collection; use an index or count")))?;
            items.get(index).cloned().ok_or_else(not_found)
        }
        RawValue::Group(mut props) => props.remove(segment).ok_or_else(not_found),
        _ => Err(invalid(format!("'{segment}' applied to a scalar value"))),
    }
}

/// Read one segment from an entity. `None` means the name does not exist.
fn entity_segment(model: &JsonModel, entity: &Entity, segment: &str) -> Option<RawValue> {
    let relation = |name: &str| entity.relation(name).cloned().unwrap_or(RawValue::Null);

    let value = match segment {
        "id" => RawValue::Integer(entity.id.0 as i64),
        "class" => RawValue::Text(entity.class.clone()),
        "predefined_type" => entity.attribute("PredefinedType").cloned().unwrap_or(RawValue::Null),
        "mat" | "material" => relation("material"),
        "mats" | "materials" => match (entity.relation("materials"), entity.relation("material")) {
            (Some(list), _) => list.clone(),
            (None, Some(single)) => RawValue::List(vec![single.clone()]),
            (None, None) => RawValue::Null,
        },
        "i" | "item" => relation("item"),
        "type" | "types" | "occurrences" | "container" | "classification" | "group" | "system"
        | "zone" | "profiles" => relation(segment),
        "parent" => entity
            .relation("parent")
            .or_else(|| entity.relation("container"))
            .cloned()
            .unwrap_or(RawValue::Null),
        "space" => spatial_ancestor(model, entity, "IfcSpace"),
        "storey" => spatial_ancestor(model, entity, "IfcBuildingStorey"),
        "building" => spatial_ancestor(model, entity, "IfcBuilding"),
        "site" => spatial_ancestor(model, entity, "IfcSite"),
        "x" => coordinate(entity, 0, 0.0),
        "y" => coordinate(entity, 1, 0.0),
        "z" => coordinate(entity, 2, 0.0),
        "easting" => coordinate(entity, 0, model.georeference().eastings),
        "northing" => coordinate(entity, 1, model.georeference().northings),
        "elevation" => coordinate(entity, 2, model.georeference().orthogonal_height),
        name => {
            return entity
                .attribute(name)
                .or_else(|| entity.relation(name))
                .cloned()
                .or_else(|| entity.property_sets.get(name).cloned().map(RawValue::Group));
        }
    };
    Some(value)
}

fn coordinate(entity: &Entity, axis: usize, offset: f64) -> RawValue {
    entity
        .location
        .map_or(RawValue::Null, |xyz| RawValue::Real(xyz[axis] + offset))
}

/// Walk up `container` (or `parent`) links to the nearest entity of `target` class.
fn spatial_ancestor(model: &JsonModel, entity: &Entity, target: &str) -> RawValue {
    let mut current = entity;
    for _ in 0..MAX_SPATIAL_DEPTH {
        let next = match current.relation("container").or_else(|| current.relation("parent")) {
            Some(RawValue::Entity(id)) => *id,
            _ => return RawValue::Null,
        };
        let Ok(parent) = model.entity(next) else {
            return RawValue::Null;
        };
        if model.schema().is_a(&parent.class, target) {
            return RawValue::Entity(parent.id);
        }
        current = parent;
    }
    RawValue::Null
}
