// SPDX-License-Identifier: PMPL-1.0-or-later
//! Per-model session state.
//!
//! A [`ModelSession`] owns one loaded model's engine together with every
//! cache derived from it. Caches live exactly as long as the session; a new
//! model means a new session.

use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::debug;

use crate::config::SessionConfig;
use crate::engine::{QueryEngine, SchemaLookup};
use crate::error::EngineError;
use crate::sampling::{CacheStats, Sample, SampleCache, SampleKey};
use crate::schema::SchemaIndex;

/// Completion and query state for one loaded model.
pub struct ModelSession<E> {
    engine: E,
    config: SessionConfig,
    schema: SchemaIndex,
    samples: SampleCache,
    class_universe: OnceCell<BTreeSet<String>>,
}

impl<E: QueryEngine + SchemaLookup> ModelSession<E> {
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, SessionConfig::default())
    }

    pub fn with_config(engine: E, config: SessionConfig) -> Self {
        Self {
            engine,
            config,
            schema: SchemaIndex::new(),
            samples: SampleCache::new(),
            class_universe: OnceCell::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// See [`SchemaIndex::ancestors`].
    pub fn ancestors(&self, class: &str) -> Rc<[String]> {
        self.schema.ancestors(&self.engine, class)
    }

    pub fn class_exists(&self, class: &str) -> bool {
        self.schema.exists(&self.engine, class)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.samples.stats()
    }

    /// Classes present in the model plus all of their ancestors.
    pub fn class_universe(&self) -> &BTreeSet<String> {
        self.class_universe.get_or_init(|| {
            let mut universe = BTreeSet::new();
            for class in self.engine.classes() {
                universe.extend(self.ancestors(&class).iter().cloned());
            }
            debug!(classes = universe.len(), "class universe built");
            universe
        })
    }

    /// Cached sample for `key`, drawn from the engine on first request.
    pub fn sample(&self, key: &SampleKey) -> Result<Rc<Sample>, EngineError> {
        self.samples
            .get_or_try_insert_with(key, || self.build_sample(key))
    }

    fn build_sample(&self, key: &SampleKey) -> Result<Sample, EngineError> {
        match key {
            SampleKey::Filter(filter) => {
                let matched = self.evaluate_nonempty(filter)?;
                let bound = self.config.filter_bound(matched.len());
                Ok(Sample::of_entities(&self.engine, truncate(matched, bound)))
            }
            SampleKey::Value(filter) => {
                let matched = self.evaluate_nonempty(filter)?;
                let bound = self.config.value_sample_limit;
                Ok(Sample::of_entities(&self.engine, truncate(matched, bound)))
            }
            SampleKey::Class(class) => {
                let matched = self.engine.evaluate(class)?;
                let bound = self.config.class_sample_limit;
                Ok(Sample::of_entities(&self.engine, truncate(matched, bound)))
            }
            SampleKey::Path { filter, path } => {
                let base = self.sample(&SampleKey::Value(filter.clone()))?;
                Ok(Sample::of_path(&self.engine, &base.entities, path))
            }
            SampleKey::AttributeValues { filter, path } => {
                let base = self.sample(&SampleKey::Filter(filter.clone()))?;
                Ok(Sample::of_path(&self.engine, &base.entities, path))
            }
        }
    }

    fn evaluate_nonempty(&self, filter: &str) -> Result<Vec<crate::EntityId>, EngineError> {
        if filter.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.engine.evaluate(filter)
    }
}

fn truncate<T>(mut items: Vec<T>, bound: usize) -> Vec<T> {
    items.truncate(bound);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureEngine;

    #[test]
    fn test_class_universe_includes_ancestors() {
        let session = ModelSession::new(FixtureEngine::walls());
        let universe = session.class_universe();
        assert!(universe.contains("IfcWall"));
        assert!(universe.contains("IfcBuiltElement"));
        assert!(universe.contains("IfcRoot"));
        assert!(!universe.contains("IfcDoor"));
    }

    #[test]
    fn test_value_sample_bounded() {
        let config = SessionConfig {
            value_sample_limit: 1,
            ..Default::default()
        };
        let session = ModelSession::with_config(FixtureEngine::walls(), config);
        let sample = session.sample(&SampleKey::Value("IfcWall".into())).unwrap();
        assert_eq!(sample.entities.len(), 1);
    }

    #[test]
    fn test_filter_sample_full_set_by_default() {
        let session = ModelSession::new(FixtureEngine::walls());
        let sample = session.sample(&SampleKey::Filter("IfcWall".into())).unwrap();
        assert_eq!(sample.entities.len(), 3);
        assert!(sample.names.contains("Name"));
        assert!(sample.names.contains("Pset_WallCommon"));
        assert!(sample.property_sets["Pset_WallCommon"].contains("FireRating"));
    }

    #[test]
    fn test_sample_idempotent_no_refetch() {
        let engine = FixtureEngine::walls();
        let session = ModelSession::new(&engine);
        let key = SampleKey::Filter("IfcWall".into());
        let first = session.sample(&key).unwrap();
        let evaluations = engine.evaluations();
        let second = session.sample(&key).unwrap();
        assert_eq!(first.names, second.names);
        assert_eq!(engine.evaluations(), evaluations);
        assert_eq!(session.cache_stats().hits, 1);
    }

    #[test]
    fn test_empty_filter_samples_nothing() {
        let engine = FixtureEngine::walls();
        let session = ModelSession::new(&engine);
        let sample = session.sample(&SampleKey::Filter(String::new())).unwrap();
        assert!(sample.entities.is_empty());
        assert_eq!(engine.evaluations(), 0);
    }

    #[test]
    fn test_failed_sample_propagates_and_is_not_cached() {
        let session = ModelSession::new(FixtureEngine::walls());
        let key = SampleKey::Filter("IfcWal".into());
        assert!(session.sample(&key).is_err());
        assert_eq!(session.cache_stats().entries, 0);
    }

    #[test]
    fn test_path_sample_detects_collection() {
        let session = ModelSession::new(FixtureEngine::walls());
        let sample = session
            .sample(&SampleKey::Path {
                filter: "IfcWall".into(),
                path: "ConnectedTo".into(),
            })
            .unwrap();
        assert_eq!(sample.collection_len, Some(3));
    }

    #[test]
    fn test_path_sample_reaches_entities() {
        let session = ModelSession::new(FixtureEngine::walls());
        let sample = session
            .sample(&SampleKey::Path {
                filter: "IfcWall".into(),
                path: "type".into(),
            })
            .unwrap();
        assert!(sample.reaches_entities);
        assert!(sample.classes.contains("IfcWallType"));
        assert!(sample.names.contains("Name"));
        assert_eq!(sample.collection_len, None);
    }
}
