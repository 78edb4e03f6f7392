// SPDX-License-Identifier: PMPL-1.0-or-later
//! Completion context classification.
//!
//! Classification looks only at the text before the cursor, back to the
//! nearest clause boundary. It is total: malformed or half-typed input always
//! maps to some context, falling back to the least specific one.
//!
//! The syntactic pass here cannot tell whether a value path prefix reaches a
//! collection; [`ModelSession::classify`](crate::ModelSession::classify)
//! refines [`CompletionContext::ValuePathDot`] into
//! [`CompletionContext::TupleIndex`] by sampling.

use std::fmt;

use crate::segment::{clamp_cursor, extract_partial_filter, separator_positions, DELIMITER};

/// Filter comparison operators, longest first so prefixes never shadow them.
pub const COMPARISON_OPERATORS: &[&str] = &["!*=", "*=", "!=", ">=", "<=", "=", ">", "<"];

/// Grammatical position of the cursor.
///
/// `filter` fields hold the evaluable filter text the generators sample
/// from; `partial` is always a suffix of the text before the cursor and is
/// what a chosen candidate replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// First token of a filter clause or union group: a class name.
    ClassList { partial: String },
    /// A token after a comma in the filter: keyword, class, attribute or set name.
    AfterComma { filter: String, partial: String },
    /// After `SetName.` in the filter: a property of that set.
    PropertySetPath {
        filter: String,
        property_set: String,
        partial: String,
    },
    /// After `Attribute<op>` in the filter: a known value of that attribute.
    AttributeValue {
        filter: String,
        attribute: String,
        operator: String,
        partial: String,
    },
    /// First segment of a value path.
    ValuePath { filter: String, partial: String },
    /// A segment after `prefix.` in a value path.
    ValuePathDot {
        filter: String,
        prefix: String,
        partial: String,
    },
    /// After `prefix.` where `prefix` resolves to a collection: `count` or an index.
    TupleIndex {
        filter: String,
        prefix: String,
        partial: String,
        len: usize,
    },
}

impl CompletionContext {
    /// The text a candidate replaces.
    pub fn partial(&self) -> &str {
        match self {
            CompletionContext::ClassList { partial }
            | CompletionContext::AfterComma { partial, .. }
            | CompletionContext::PropertySetPath { partial, .. }
            | CompletionContext::AttributeValue { partial, .. }
            | CompletionContext::ValuePath { partial, .. }
            | CompletionContext::ValuePathDot { partial, .. }
            | CompletionContext::TupleIndex { partial, .. } => partial,
        }
    }

    /// Short label used in logs and tests.
    pub fn name(&self) -> &'static str {
        match self {
            CompletionContext::ClassList { .. } => "class-list",
            CompletionContext::AfterComma { .. } => "after-comma",
            CompletionContext::PropertySetPath { .. } => "property-set-path",
            CompletionContext::AttributeValue { .. } => "attribute-value",
            CompletionContext::ValuePath { .. } => "value-path",
            CompletionContext::ValuePathDot { .. } => "value-path-dot",
            CompletionContext::TupleIndex { .. } => "tuple-index",
        }
    }
}

impl fmt::Display for CompletionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.name(), self.partial())
    }
}

/// Classify the cursor position from text alone.
pub fn classify_syntax(raw: &str, cursor: usize) -> CompletionContext {
    let cursor = clamp_cursor(raw, cursor);
    let before = &raw[..cursor];

    let delimiters = separator_positions(before, &[DELIMITER]);
    match (delimiters.first(), delimiters.last()) {
        (Some(&(first, _)), Some(&(last, ch))) => {
            let filter = raw[..first].replace("\\;", ";").trim().to_string();
            classify_value(filter, &before[last + ch.len_utf8()..])
        }
        _ => classify_filter(raw, cursor),
    }
}

fn classify_filter(raw: &str, cursor: usize) -> CompletionContext {
    let before = &raw[..cursor];
    let boundary = separator_positions(before, &[',', '+']).last().copied();
    let token = match boundary {
        Some((pos, ch)) => &before[pos + ch.len_utf8()..],
        None => before,
    };
    let after_comma = matches!(boundary, Some((_, ',')));

    if let Some((attribute, operator, partial)) = split_comparison(token) {
        return CompletionContext::AttributeValue {
            filter: extract_partial_filter(raw, cursor),
            attribute: attribute.to_string(),
            operator: operator.to_string(),
            partial: partial.to_string(),
        };
    }

    if let Some((property_set, partial)) = split_set_path(token) {
        return CompletionContext::PropertySetPath {
            filter: extract_partial_filter(raw, cursor),
            property_set: property_set.to_string(),
            partial: partial.to_string(),
        };
    }

    let partial = trailing_word(token).to_string();
    if after_comma {
        CompletionContext::AfterComma {
            filter: extract_partial_filter(raw, cursor),
            partial,
        }
    } else {
        CompletionContext::ClassList { partial }
    }
}

fn classify_value(filter: String, clause: &str) -> CompletionContext {
    let (argument, in_literal) = current_argument(clause);

    if in_literal {
        // Inside a string literal: keep the quote in the partial so nothing matches.
        return CompletionContext::ValuePath {
            filter,
            partial: argument.trim_start().to_string(),
        };
    }

    let path = argument
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default();
    match path.rfind('.') {
        Some(dot) => CompletionContext::ValuePathDot {
            filter,
            prefix: path[..dot].to_string(),
            partial: path[dot + 1..].to_string(),
        },
        None => CompletionContext::ValuePath {
            filter,
            partial: path.to_string(),
        },
    }
}

/// Split `Attr <op> value` into its parts. The value part has leading
/// whitespace removed and may start with an opening quote.
fn split_comparison(token: &str) -> Option<(&str, &'static str, &str)> {
    let lead = token.len() - token.trim_start().len();
    let mut in_quotes = false;

    for (i, ch) in token.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes || !matches!(ch, '!' | '*' | '=' | '>' | '<') {
            continue;
        }
        // A leading '!' negates the whole part rather than starting an operator.
        if ch == '!' && i == lead {
            continue;
        }
        let Some(operator) = COMPARISON_OPERATORS
            .iter()
            .find(|op| token[i..].starts_with(**op))
        else {
            continue;
        };
        let attribute = token[..i].trim().trim_start_matches('!').trim();
        if attribute.is_empty() {
            return None;
        }
        let value = token[i + operator.len()..].trim_start();
        return Some((attribute, operator, value));
    }

    None
}

/// Split `SetName.partial` where both sides are plain identifiers.
fn split_set_path(token: &str) -> Option<(&str, &str)> {
    let text = token.trim_start().trim_start_matches('!');
    let (set, partial) = text.split_once('.')?;
    let is_ident = |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if set.is_empty() || !is_ident(set) || !is_ident(partial) {
        return None;
    }
    Some((set, partial))
}

/// Suffix of `token` after its last whitespace or negation mark.
fn trailing_word(token: &str) -> &str {
    match token.rfind(|c: char| c.is_whitespace() || c == '!') {
        Some(pos) => {
            let skip = token[pos..].chars().next().map_or(0, char::len_utf8);
            &token[pos + skip..]
        }
        None => token,
    }
}

/// The formatting-function argument (or whole clause) the cursor sits in,
/// and whether it ends inside a string literal.
fn current_argument(clause: &str) -> (&str, bool) {
    let mut open_calls: Vec<usize> = Vec::new();
    let mut arg_start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, ch) in clause.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '(' => {
                open_calls.push(arg_start);
                arg_start = i + 1;
            }
            ')' => arg_start = open_calls.pop().unwrap_or(0),
            ',' if !open_calls.is_empty() => arg_start = i + 1,
            _ => {}
        }
    }

    (&clause[arg_start..], in_quotes)
}
