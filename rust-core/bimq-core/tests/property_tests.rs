// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for segmentation, classification, ancestry and sampling

use std::cell::Cell;
use std::collections::BTreeSet;

use bimq_core::{
    classify_syntax, extract_partial_filter, segment, Declaration, Sample, SampleCache, SampleKey,
    SchemaIndex, SchemaLookup,
};
use proptest::prelude::*;

/// Query text without the delimiter
fn arb_filter_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ ,.=!*<>+\"'()-]{0,40}"
}

/// Query text with delimiters but no quotes or escapes
fn arb_unquoted_query() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ ,.=;()]{0,60}"
}

/// Linear-ish class hierarchy: each class's parent has a lower index
fn arb_hierarchy() -> impl Strategy<Value = Vec<Option<usize>>> {
    prop::collection::vec(any::<prop::sample::Index>(), 1..20).prop_map(|picks| {
        picks
            .iter()
            .enumerate()
            .map(|(i, pick)| if i == 0 { None } else { Some(pick.index(i)) })
            .collect()
    })
}

struct Hierarchy(Vec<Option<usize>>);

impl SchemaLookup for Hierarchy {
    fn declaration_for(&self, class: &str) -> Option<Declaration> {
        let index: usize = class.strip_prefix('C')?.parse().ok()?;
        let parent = self.0.get(index)?;
        Some(Declaration {
            name: class.to_string(),
            supertype: parent.map(|p| format!("C{p}")),
            is_abstract: false,
        })
    }
}

proptest! {
    #[test]
    fn test_no_delimiter_means_filter_only(raw in arb_filter_text()) {
        let s = segment(&raw);
        prop_assert!(s.values.is_empty());
        prop_assert_eq!(s.filter, raw.trim());
    }

    #[test]
    fn test_k_delimiters_give_k_value_clauses(raw in arb_unquoted_query()) {
        let k = raw.matches(';').count();
        let s = segment(&raw);
        prop_assert_eq!(s.values.len(), k);
        for clause in s.values.iter().chain(std::iter::once(&s.filter)) {
            prop_assert_eq!(clause.as_str(), clause.trim());
        }
    }

    #[test]
    fn test_classifier_is_total(raw in any::<String>(), cursor in 0usize..200) {
        let ctx = classify_syntax(&raw, cursor);
        let mut end = cursor.min(raw.len());
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        prop_assert!(raw[..end].ends_with(ctx.partial()));
    }

    #[test]
    fn test_partial_filter_is_prefix_of_filter_text(raw in arb_unquoted_query(), cursor in 0usize..80) {
        let partial = extract_partial_filter(&raw, cursor);
        let end = cursor.min(raw.len());
        prop_assert!(raw[..end].contains(partial.as_str()));
        prop_assert!(!partial.contains(';'));
    }

    #[test]
    fn test_ancestors_start_with_self_and_follow_supertypes(parents in arb_hierarchy()) {
        let schema = Hierarchy(parents);
        let index = SchemaIndex::new();
        for i in 0..schema.0.len() {
            let class = format!("C{i}");
            let chain = index.ancestors(&schema, &class);
            prop_assert_eq!(&chain[0], &class);
            for pair in chain.windows(2) {
                let declared = schema.declaration_for(&pair[0]).and_then(|d| d.supertype);
                prop_assert_eq!(declared.as_deref(), Some(pair[1].as_str()));
            }
            let unique: BTreeSet<&String> = chain.iter().collect();
            prop_assert_eq!(unique.len(), chain.len());
            prop_assert_eq!(chain.last().map(String::as_str), Some("C0"));
        }
    }

    #[test]
    fn test_sample_cache_idempotent(filter in "[A-Za-z]{1,12}", names in prop::collection::btree_set("[a-z]{1,6}", 0..8)) {
        let cache = SampleCache::new();
        let key = SampleKey::Filter(filter);
        let builds = Cell::new(0);
        let build = || {
            builds.set(builds.get() + 1);
            Ok(Sample { names: names.clone(), ..Default::default() })
        };
        let first = cache.get_or_try_insert_with(&key, build).unwrap();
        let second = cache.get_or_try_insert_with(&key, build).unwrap();
        prop_assert_eq!(&first.names, &second.names);
        prop_assert_eq!(builds.get(), 1);
    }
}
