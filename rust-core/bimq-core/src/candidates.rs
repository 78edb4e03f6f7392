// SPDX-License-Identifier: PMPL-1.0-or-later
//! Ranked, deduplicated completion candidates.
//!
//! Ranking tiers, best first:
//! 1. exact match of the partial token
//! 2. case-sensitive prefix match
//! 3. case-insensitive prefix match
//! 4. context extras offered regardless of the partial (ancestors, concrete
//!    subclasses)
//!
//! Within a tier, integer candidates sort numerically after words, and words
//! sort case-insensitively. The order depends only on the set of offered
//! strings, never on the order they were offered in.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Keywords accepted as the left-hand side of a filter comparison.
pub const FILTER_KEYWORDS: &[&str] = &[
    "material",
    "type",
    "location",
    "parent",
    "classification",
    "query",
];

/// Prefixes for property and quantity set names.
pub const SET_PREFIXES: &[&str] = &["Pset_", "Qto_"];

/// Path keywords understood by the value selector.
pub const SELECTOR_KEYWORDS: &[&str] = &[
    "id",
    "class",
    "predefined_type",
    "type",
    "types",
    "occurrences",
    "container",
    "space",
    "storey",
    "building",
    "site",
    "parent",
    "classification",
    "group",
    "system",
    "zone",
    "material",
    "mat",
    "item",
    "i",
    "materials",
    "mats",
    "profiles",
    "x",
    "y",
    "z",
    "easting",
    "northing",
    "elevation",
    "count",
];

/// Ordered-unique candidate strings for one completion request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    items: Vec<String>,
}

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.items.iter().any(|c| c == candidate)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

impl IntoIterator for CandidateSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Exact,
    Prefix,
    PrefixIgnoreCase,
    Extra,
}

/// Collects candidates against one partial token.
#[derive(Debug)]
pub(crate) struct CandidateBuilder<'p> {
    partial: &'p str,
    ranked: HashMap<String, Tier>,
}

impl<'p> CandidateBuilder<'p> {
    pub(crate) fn new(partial: &'p str) -> Self {
        Self {
            partial,
            ranked: HashMap::new(),
        }
    }

    /// Offer a candidate; kept only if it matches the partial token.
    pub(crate) fn offer(&mut self, candidate: impl Into<String>) {
        let candidate = candidate.into();
        if let Some(tier) = self.tier_of(&candidate) {
            self.insert(candidate, tier);
        }
    }

    pub(crate) fn offer_all<I, S>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for candidate in candidates {
            self.offer(candidate);
        }
    }

    /// Offer a candidate that is kept even when it does not match.
    pub(crate) fn offer_extra(&mut self, candidate: impl Into<String>) {
        let candidate = candidate.into();
        let tier = self.tier_of(&candidate).unwrap_or(Tier::Extra);
        self.insert(candidate, tier);
    }

    pub(crate) fn build(self) -> CandidateSet {
        let mut ranked: Vec<(String, Tier)> = self.ranked.into_iter().collect();
        ranked.sort_by(|(a, ta), (b, tb)| ta.cmp(tb).then_with(|| compare_text(a, b)));
        CandidateSet {
            items: ranked.into_iter().map(|(candidate, _)| candidate).collect(),
        }
    }

    fn insert(&mut self, candidate: String, tier: Tier) {
        if candidate.is_empty() {
            return;
        }
        self.ranked
            .entry(candidate)
            .and_modify(|existing| *existing = (*existing).min(tier))
            .or_insert(tier);
    }

    fn tier_of(&self, candidate: &str) -> Option<Tier> {
        let (text, partial) = match unquote(candidate) {
            Some(inner) => (inner, self.partial.trim_start_matches('"')),
            None => (candidate, self.partial),
        };
        if text == partial {
            Some(Tier::Exact)
        } else if text.starts_with(partial) {
            Some(Tier::Prefix)
        } else if starts_with_ignore_case(text, partial) {
            Some(Tier::PrefixIgnoreCase)
        } else {
            None
        }
    }
}

/// Inner text of a double-quoted candidate.
fn unquote(candidate: &str) -> Option<&str> {
    candidate
        .strip_prefix('"')
        .map(|rest| rest.strip_suffix('"').unwrap_or(rest))
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    let mut text = text.chars().flat_map(char::to_lowercase);
    prefix
        .chars()
        .flat_map(char::to_lowercase)
        .all(|p| text.next() == Some(p))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(partial: &str, offered: &[&str]) -> Vec<String> {
        let mut builder = CandidateBuilder::new(partial);
        builder.offer_all(offered.iter().copied());
        builder.build().into_vec()
    }

    #[test]
    fn test_prefix_filtering() {
        let out = build("IfcW", &["IfcWall", "IfcWindow", "IfcDoor"]);
        assert_eq!(out, vec!["IfcWall", "IfcWindow"]);
    }

    #[test]
    fn test_exact_before_prefix_before_case_insensitive() {
        let out = build("IfcWall", &["ifcwallstandardcase", "IfcWallType", "IfcWall"]);
        assert_eq!(out, vec!["IfcWall", "IfcWallType", "ifcwallstandardcase"]);
    }

    #[test]
    fn test_deduplicated() {
        let out = build("", &["Name", "Name", "Tag"]);
        assert_eq!(out, vec!["Name", "Tag"]);
    }

    #[test]
    fn test_numbers_sort_numerically_after_words() {
        let out = build("", &["10", "2", "count", "0", "1"]);
        assert_eq!(out, vec!["count", "0", "1", "2", "10"]);
    }

    #[test]
    fn test_order_independent_of_offer_order() {
        let a = build("", &["b", "A", "c", "10", "9"]);
        let b = build("", &["9", "c", "10", "A", "b"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_quoted_candidates_match_unquoted_text() {
        let out = build("\"Con", &["\"Concrete\"", "\"Brick\""]);
        assert_eq!(out, vec!["\"Concrete\""]);
        let out = build("con", &["\"Concrete\""]);
        assert_eq!(out, vec!["\"Concrete\""]);
    }

    #[test]
    fn test_quote_partial_does_not_match_plain_names() {
        assert!(build("\"", &["Name", "Tag"]).is_empty());
    }

    #[test]
    fn test_extras_rank_last() {
        let mut builder = CandidateBuilder::new("IfcWall");
        builder.offer_all(["IfcWall", "IfcWallType"]);
        builder.offer_extra("IfcElement");
        builder.offer_extra("IfcBuiltElement");
        assert_eq!(
            builder.build().into_vec(),
            vec!["IfcWall", "IfcWallType", "IfcBuiltElement", "IfcElement"]
        );
    }

    #[test]
    fn test_extra_that_matches_keeps_better_tier() {
        let mut builder = CandidateBuilder::new("Ifc");
        builder.offer_extra("IfcWall");
        builder.offer_extra("Other");
        assert_eq!(builder.build().into_vec(), vec!["IfcWall", "Other"]);
    }

    #[test]
    fn test_empty_candidates_ignored() {
        let mut builder = CandidateBuilder::new("");
        builder.offer("");
        builder.offer_extra("");
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_selector_keywords_unique() {
        let mut seen = std::collections::HashSet::new();
        assert!(SELECTOR_KEYWORDS.iter().all(|k| seen.insert(*k)));
    }
}
