// SPDX-License-Identifier: PMPL-1.0-or-later
//! Session configuration.
//!
//! Defaults:
//! - value_sample_limit: 50 (value-side completion samples at most 50 entities)
//! - filter_sample_limit: none (filter-side discovery inspects the full matched set)
//! - class_sample_limit: 50
//! - max_index_candidates: 100

use serde::{Deserialize, Serialize};

/// Sampling bounds used by the completion engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum entities sampled for value-clause completion.
    pub value_sample_limit: usize,
    /// Maximum entities inspected for filter-side discovery; `None` inspects
    /// every matched entity.
    pub filter_sample_limit: Option<usize>,
    /// Maximum entities sampled when expanding a class name into the concrete
    /// classes present in the model.
    pub class_sample_limit: usize,
    /// Upper bound on integer-index candidates offered for a collection.
    pub max_index_candidates: usize,
}

impl SessionConfig {
    /// Apply the filter-side bound to a matched entity count.
    pub fn filter_bound(&self, matched: usize) -> usize {
        self.filter_sample_limit.map_or(matched, |limit| limit.min(matched))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            value_sample_limit: 50,
            filter_sample_limit: None,
            class_sample_limit: 50,
            max_index_candidates: 100,
        }
    }
}
