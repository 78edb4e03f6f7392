// SPDX-License-Identifier: PMPL-1.0-or-later
//! Candidate generation, one generator per completion context.
//!
//! Generators consult the schema index and the sampling cache. An engine
//! failure while sampling yields an empty candidate set for that context; it
//! never reaches the keystroke handler.

use tracing::debug;

use crate::candidates::{
    CandidateBuilder, CandidateSet, FILTER_KEYWORDS, SELECTOR_KEYWORDS, SET_PREFIXES,
};
use crate::context::{classify_syntax, CompletionContext, COMPARISON_OPERATORS};
use crate::engine::{QueryEngine, SchemaLookup};
use crate::error::EngineError;
use crate::sampling::SampleKey;
use crate::segment::clamp_cursor;
use crate::session::ModelSession;

/// Result of one completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Byte offset where the replaced partial token starts.
    pub start: usize,
    pub context: CompletionContext,
    pub candidates: CandidateSet,
}

/// Value path a filter keyword compares against.
pub fn keyword_value_path(keyword: &str) -> Option<&'static str> {
    match keyword {
        "material" => Some("material.Name"),
        "type" => Some("type.Name"),
        "location" => Some("storey.Name"),
        "parent" => Some("container.Name"),
        "classification" => Some("classification.Identification"),
        _ => None,
    }
}

impl<E: QueryEngine + SchemaLookup> ModelSession<E> {
    /// Classify the cursor position, refining a dotted value path into a
    /// tuple-index context when its sampled prefix is a collection.
    pub fn classify(&self, raw: &str, cursor: usize) -> CompletionContext {
        let context = classify_syntax(raw, cursor);
        let CompletionContext::ValuePathDot {
            filter,
            prefix,
            partial,
        } = context
        else {
            return context;
        };

        let key = SampleKey::Path {
            filter: filter.clone(),
            path: prefix.clone(),
        };
        match self.sample(&key) {
            Ok(sample) => match sample.collection_len {
                Some(len) => CompletionContext::TupleIndex {
                    filter,
                    prefix,
                    partial,
                    len,
                },
                None => CompletionContext::ValuePathDot {
                    filter,
                    prefix,
                    partial,
                },
            },
            Err(err) => {
                debug!(key = %key, error = %err, "prefix sampling failed");
                CompletionContext::ValuePathDot {
                    filter,
                    prefix,
                    partial,
                }
            }
        }
    }

    /// Classify and generate candidates for the cursor position.
    pub fn complete(&self, raw: &str, cursor: usize) -> Completion {
        let cursor = clamp_cursor(raw, cursor);
        let context = self.classify(raw, cursor);
        let candidates = self.candidates(&context);
        debug!(context = %context, candidates = candidates.len(), "completion");
        Completion {
            start: cursor - context.partial().len(),
            context,
            candidates,
        }
    }

    /// Candidates for an already classified context.
    pub fn candidates(&self, context: &CompletionContext) -> CandidateSet {
        let mut builder = CandidateBuilder::new(context.partial());
        let generated = match context {
            CompletionContext::ClassList { partial } => {
                self.class_list(&mut builder, partial);
                Ok(())
            }
            CompletionContext::AfterComma { filter, partial } => {
                self.after_comma(&mut builder, filter, partial)
            }
            CompletionContext::PropertySetPath {
                filter,
                property_set,
                ..
            } => self.property_set_path(&mut builder, filter, property_set),
            CompletionContext::AttributeValue {
                filter, attribute, ..
            } => self.attribute_value(&mut builder, filter, attribute),
            CompletionContext::ValuePath { filter, .. } => self.value_path(&mut builder, filter),
            CompletionContext::ValuePathDot { filter, prefix, .. } => {
                self.value_path_dot(&mut builder, filter, prefix)
            }
            CompletionContext::TupleIndex { len, .. } => {
                builder.offer("count");
                let shown = (*len).min(self.config().max_index_candidates);
                builder.offer_all((0..shown).map(|i| i.to_string()));
                Ok(())
            }
        };

        match generated {
            Ok(()) => builder.build(),
            Err(err) => {
                debug!(context = %context, error = %err, "candidate sampling failed");
                CandidateSet::default()
            }
        }
    }

    fn class_list(&self, builder: &mut CandidateBuilder<'_>, partial: &str) {
        let universe = self.class_universe();
        builder.offer_all(universe.iter().cloned());

        if !self.class_exists(partial) {
            return;
        }
        for ancestor in self.ancestors(partial).iter().skip(1) {
            if universe.contains(ancestor) {
                builder.offer_extra(ancestor.clone());
            }
        }
        match self.sample(&SampleKey::Class(partial.to_string())) {
            Ok(sample) => {
                for class in &sample.classes {
                    builder.offer_extra(class.clone());
                }
            }
            Err(err) => debug!(class = partial, error = %err, "class sampling failed"),
        }
    }

    fn after_comma(
        &self,
        builder: &mut CandidateBuilder<'_>,
        filter: &str,
        partial: &str,
    ) -> Result<(), EngineError> {
        builder.offer_all(self.class_universe().iter().cloned());
        builder.offer_all(FILTER_KEYWORDS.iter().copied());
        builder.offer_all(SET_PREFIXES.iter().copied());

        let sample = self.sample(&SampleKey::Filter(filter.to_string()))?;
        builder.offer_all(sample.names.iter().cloned());

        let names_attribute =
            FILTER_KEYWORDS.contains(&partial) || sample.names.contains(partial);
        if names_attribute && !sample.property_sets.contains_key(partial) {
            for op in COMPARISON_OPERATORS {
                builder.offer(format!("{partial}{op}"));
            }
        }
        Ok(())
    }

    fn property_set_path(
        &self,
        builder: &mut CandidateBuilder<'_>,
        filter: &str,
        property_set: &str,
    ) -> Result<(), EngineError> {
        let sample = self.sample(&SampleKey::Filter(filter.to_string()))?;
        if let Some(props) = sample.property_sets.get(property_set) {
            builder.offer_all(props.iter().cloned());
        }
        Ok(())
    }

    fn attribute_value(
        &self,
        builder: &mut CandidateBuilder<'_>,
        filter: &str,
        attribute: &str,
    ) -> Result<(), EngineError> {
        let path = match attribute.strip_prefix("query:") {
            Some(path) => path.trim(),
            None => keyword_value_path(attribute).unwrap_or(attribute),
        };
        let sample = self.sample(&SampleKey::AttributeValues {
            filter: filter.to_string(),
            path: path.to_string(),
        })?;
        if sample.has_booleans {
            builder.offer_all(["TRUE", "FALSE"]);
        } else {
            builder.offer_all(sample.values.iter().cloned());
        }
        Ok(())
    }

    fn value_path(&self, builder: &mut CandidateBuilder<'_>, filter: &str) -> Result<(), EngineError> {
        builder.offer_all(SELECTOR_KEYWORDS.iter().copied());
        let sample = self.sample(&SampleKey::Value(filter.to_string()))?;
        builder.offer_all(sample.names.iter().cloned());
        Ok(())
    }

    fn value_path_dot(
        &self,
        builder: &mut CandidateBuilder<'_>,
        filter: &str,
        prefix: &str,
    ) -> Result<(), EngineError> {
        let sample = self.sample(&SampleKey::Path {
            filter: filter.to_string(),
            path: prefix.to_string(),
        })?;
        builder.offer_all(sample.names.iter().cloned());
        if sample.reaches_entities {
            builder.offer_all(SELECTOR_KEYWORDS.iter().copied());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureEngine;

    fn session() -> ModelSession<FixtureEngine> {
        ModelSession::new(FixtureEngine::walls())
    }

    fn complete(session: &ModelSession<FixtureEngine>, raw: &str) -> Completion {
        session.complete(raw, raw.len())
    }

    #[test]
    fn test_class_list_prefix_and_ancestors() {
        let s = session();
        let done = complete(&s, "IfcWall");
        assert_eq!(done.context.name(), "class-list");
        assert_eq!(done.start, 0);
        let c = &done.candidates;
        assert_eq!(c.as_slice()[0], "IfcWall");
        assert!(c.contains("IfcWallStandardCase"));
        assert!(c.contains("IfcWallType"));
        assert!(c.contains("IfcBuiltElement"));
        assert!(c.contains("IfcElement"));
        assert!(c.contains("IfcProduct"));
        assert!(!c.contains("IfcSlab"));
    }

    #[test]
    fn test_abstract_class_expands_to_concrete_usages() {
        let s = session();
        let c = complete(&s, "IfcBuiltElement").candidates;
        assert!(c.contains("IfcWall"));
        assert!(c.contains("IfcWallStandardCase"));
        assert!(c.contains("IfcSlab"));
    }

    #[test]
    fn test_class_list_excludes_classes_absent_from_model() {
        let s = session();
        let c = complete(&s, "IfcD").candidates;
        assert!(c.is_empty());
    }

    #[test]
    fn test_after_comma_offers_keywords_attributes_and_sets() {
        let s = session();
        let done = complete(&s, "IfcWall, ");
        let c = &done.candidates;
        assert!(c.contains("material"));
        assert!(c.contains("Name"));
        assert!(c.contains("Tag"));
        assert!(c.contains("Pset_WallCommon"));
        assert!(c.contains("Pset_"));
        assert!(c.contains("Qto_"));
        assert!(c.contains("IfcSlab"));
    }

    #[test]
    fn test_after_comma_exact_attribute_offers_operators() {
        let s = session();
        let c = complete(&s, "IfcWall, Name").candidates;
        assert_eq!(c.as_slice()[0], "Name");
        assert!(c.contains("Name="));
        assert!(c.contains("Name!="));
        assert!(c.contains("Name*="));
        assert!(!c.contains("Tag"));
    }

    #[test]
    fn test_property_set_path() {
        let s = session();
        let done = complete(&s, "IfcWall, Pset_WallCommon.");
        assert_eq!(
            done.candidates.as_slice(),
            ["FireRating".to_string(), "IsExternal".to_string()]
        );
        assert_eq!(done.start, "IfcWall, Pset_WallCommon.".len());
    }

    #[test]
    fn test_attribute_values_are_quoted() {
        let s = session();
        let done = complete(&s, "IfcWall, Name=\"W-0");
        assert_eq!(done.context.name(), "attribute-value");
        let c = &done.candidates;
        assert!(c.contains("\"W-01\""));
        assert!(c.contains("\"W-02\""));
        assert!(c.contains("\"W-03\""));
        assert_eq!(done.start, "IfcWall, Name=".len());
    }

    #[test]
    fn test_query_path_attribute_values() {
        let s = session();
        let done = complete(&s, "IfcWall, query:type.Name=");
        assert_eq!(done.context.name(), "attribute-value");
        assert_eq!(done.candidates.as_slice(), ["\"WT-Concrete\"".to_string()]);
    }

    #[test]
    fn test_boolean_attribute_values() {
        let s = session();
        let c = complete(&s, "IfcWall, Pset_WallCommon.IsExternal=").candidates;
        assert_eq!(c.as_slice(), ["FALSE".to_string(), "TRUE".to_string()]);
    }

    #[test]
    fn test_value_path_offers_keywords_and_attributes() {
        let s = session();
        let c = complete(&s, "IfcWall ; ").candidates;
        assert!(c.contains("Name"));
        assert!(c.contains("ConnectedTo"));
        assert!(c.contains("Pset_WallCommon"));
        assert!(c.contains("storey"));
        assert!(c.contains("count"));
    }

    #[test]
    fn test_value_path_dot_through_entity() {
        let s = session();
        let done = complete(&s, "IfcWall ; type.");
        assert_eq!(done.context.name(), "value-path-dot");
        assert!(done.candidates.contains("Name"));
        assert!(done.candidates.contains("class"));
    }

    #[test]
    fn test_value_path_dot_into_property_set() {
        let s = session();
        let done = complete(&s, "IfcWall ; Pset_WallCommon.");
        assert!(done.candidates.contains("FireRating"));
        assert!(!done.candidates.contains("class"));
    }

    #[test]
    fn test_collection_prefix_gives_tuple_index() {
        let s = session();
        let done = complete(&s, "IfcWall ; ConnectedTo.");
        assert!(matches!(
            done.context,
            CompletionContext::TupleIndex { len: 3, .. }
        ));
        assert_eq!(
            done.candidates.as_slice(),
            ["count", "0", "1", "2"].map(String::from)
        );
    }

    #[test]
    fn test_tuple_index_respects_cap() {
        let config = crate::SessionConfig {
            max_index_candidates: 2,
            ..Default::default()
        };
        let s = ModelSession::with_config(FixtureEngine::walls(), config);
        let c = complete(&s, "IfcWall ; ConnectedTo.").candidates;
        assert_eq!(c.as_slice(), ["count", "0", "1"].map(String::from));
    }

    #[test]
    fn test_engine_failure_yields_empty_set() {
        let s = session();
        let done = complete(&s, "IfcWal, Na");
        assert_eq!(done.context.name(), "after-comma");
        assert!(done.candidates.is_empty());
    }

    #[test]
    fn test_function_argument_completion() {
        let s = session();
        let done = complete(&s, "IfcWall ; upper(Na");
        assert_eq!(done.candidates.as_slice()[0], "Name");
        assert_eq!(done.start, "IfcWall ; upper(".len());
    }

    #[test]
    fn test_keyword_value_paths() {
        assert_eq!(keyword_value_path("location"), Some("storey.Name"));
        assert_eq!(keyword_value_path("Name"), None);
    }
}
