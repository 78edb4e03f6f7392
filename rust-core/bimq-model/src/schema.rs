// SPDX-License-Identifier: PMPL-1.0-or-later
//! Built-in IFC4 class hierarchy.
//!
//! Covers the rooted product, spatial, type, group and material branches a
//! building model typically instantiates. Documents extend or override it
//! through their `classes` table.

use std::collections::HashMap;

use bimq_core::Declaration;
use serde::Deserialize;

/// `(class, supertype, abstract)`
const IFC4: &[(&str, Option<&str>, bool)] = &[
    ("IfcRoot", None, true),
    ("IfcObjectDefinition", Some("IfcRoot"), true),
    ("IfcObject", Some("IfcObjectDefinition"), true),
    ("IfcContext", Some("IfcObjectDefinition"), true),
    ("IfcProject", Some("IfcContext"), false),
    ("IfcProduct", Some("IfcObject"), true),
    ("IfcElement", Some("IfcProduct"), true),
    ("IfcBuildingElement", Some("IfcElement"), true),
    ("IfcBeam", Some("IfcBuildingElement"), false),
    ("IfcColumn", Some("IfcBuildingElement"), false),
    ("IfcCovering", Some("IfcBuildingElement"), false),
    ("IfcCurtainWall", Some("IfcBuildingElement"), false),
    ("IfcDoor", Some("IfcBuildingElement"), false),
    ("IfcFooting", Some("IfcBuildingElement"), false),
    ("IfcMember", Some("IfcBuildingElement"), false),
    ("IfcPile", Some("IfcBuildingElement"), false),
    ("IfcPlate", Some("IfcBuildingElement"), false),
    ("IfcRailing", Some("IfcBuildingElement"), false),
    ("IfcRamp", Some("IfcBuildingElement"), false),
    ("IfcRoof", Some("IfcBuildingElement"), false),
    ("IfcSlab", Some("IfcBuildingElement"), false),
    ("IfcStair", Some("IfcBuildingElement"), false),
    ("IfcWall", Some("IfcBuildingElement"), false),
    ("IfcWallStandardCase", Some("IfcWall"), false),
    ("IfcWindow", Some("IfcBuildingElement"), false),
    ("IfcBuildingElementProxy", Some("IfcBuildingElement"), false),
    ("IfcFurnishingElement", Some("IfcElement"), false),
    ("IfcDistributionElement", Some("IfcElement"), false),
    ("IfcDistributionFlowElement", Some("IfcDistributionElement"), false),
    ("IfcFlowSegment", Some("IfcDistributionFlowElement"), false),
    ("IfcFlowTerminal", Some("IfcDistributionFlowElement"), false),
    ("IfcFeatureElement", Some("IfcElement"), true),
    ("IfcFeatureElementSubtraction", Some("IfcFeatureElement"), true),
    ("IfcOpeningElement", Some("IfcFeatureElementSubtraction"), false),
    ("IfcSpatialElement", Some("IfcProduct"), true),
    ("IfcSpatialStructureElement", Some("IfcSpatialElement"), true),
    ("IfcSite", Some("IfcSpatialStructureElement"), false),
    ("IfcBuilding", Some("IfcSpatialStructureElement"), false),
    ("IfcBuildingStorey", Some("IfcSpatialStructureElement"), false),
    ("IfcSpace", Some("IfcSpatialStructureElement"), false),
    ("IfcSpatialZone", Some("IfcSpatialElement"), false),
    ("IfcGroup", Some("IfcObject"), false),
    ("IfcSystem", Some("IfcGroup"), false),
    ("IfcZone", Some("IfcSystem"), false),
    ("IfcTypeObject", Some("IfcObjectDefinition"), false),
    ("IfcTypeProduct", Some("IfcTypeObject"), false),
    ("IfcElementType", Some("IfcTypeProduct"), true),
    ("IfcBuildingElementType", Some("IfcElementType"), true),
    ("IfcBeamType", Some("IfcBuildingElementType"), false),
    ("IfcColumnType", Some("IfcBuildingElementType"), false),
    ("IfcDoorType", Some("IfcBuildingElementType"), false),
    ("IfcSlabType", Some("IfcBuildingElementType"), false),
    ("IfcWallType", Some("IfcBuildingElementType"), false),
    ("IfcWindowType", Some("IfcBuildingElementType"), false),
    ("IfcMaterialDefinition", None, true),
    ("IfcMaterial", Some("IfcMaterialDefinition"), false),
    ("IfcMaterialLayer", Some("IfcMaterialDefinition"), false),
    ("IfcMaterialLayerSet", Some("IfcMaterialDefinition"), false),
    ("IfcMaterialConstituentSet", Some("IfcMaterialDefinition"), false),
    ("IfcExternalInformation", None, true),
    ("IfcClassification", Some("IfcExternalInformation"), false),
    ("IfcExternalReference", None, true),
    ("IfcClassificationReference", Some("IfcExternalReference"), false),
];

/// Class declaration as written in a document's `classes` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassSpec {
    #[serde(default)]
    pub supertype: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

/// Class declarations keyed by name.
#[derive(Debug, Clone)]
pub struct Schema {
    declarations: HashMap<String, Declaration>,
}

impl Schema {
    /// The built-in IFC4 hierarchy.
    pub fn ifc4() -> Self {
        let declarations = IFC4
            .iter()
            .map(|(name, supertype, is_abstract)| {
                (
                    name.to_string(),
                    Declaration {
                        name: name.to_string(),
                        supertype: supertype.map(str::to_string),
                        is_abstract: *is_abstract,
                    },
                )
            })
            .collect();
        Self { declarations }
    }

    /// Add or replace declarations.
    pub fn extend<I>(&mut self, classes: I)
    where
        I: IntoIterator<Item = (String, ClassSpec)>,
    {
        for (name, spec) in classes {
            self.declarations.insert(
                name.clone(),
                Declaration {
                    name,
                    supertype: spec.supertype,
                    is_abstract: spec.is_abstract,
                },
            );
        }
    }

    pub fn get(&self, class: &str) -> Option<&Declaration> {
        self.declarations.get(class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.declarations.contains_key(class)
    }

    /// Whether `class` is `target` or one of its subtypes.
    ///
    /// The walk is bounded by the number of declarations, so a cyclic
    /// override table terminates.
    pub fn is_a(&self, class: &str, target: &str) -> bool {
        let mut current = Some(class);
        for _ in 0..=self.declarations.len() {
            match current {
                Some(name) if name == target => return true,
                Some(name) => {
                    current = self.get(name).and_then(|d| d.supertype.as_deref());
                }
                None => return false,
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::ifc4()
    }
}
