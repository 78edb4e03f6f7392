// SPDX-License-Identifier: PMPL-1.0-or-later
//! Filter evaluation.
//!
//! ```text
//! filter     := group ( '+' group )*
//! group      := part ( ',' part )*
//! part       := '!'? Class
//!             | lhs op value
//!             | lhs                      (existence)
//! lhs        := Attr | Pset.Prop | keyword | 'query:' path
//! op         := '=' | '!=' | '*=' | '!*=' | '>' | '>=' | '<' | '<='
//! value      := "quoted" | /regex/ | TRUE | FALSE | NULL | bare text
//! ```
//!
//! Groups are unioned. Within a group, class parts pick the base set
//! (subtypes included, `!` excludes) and every predicate must hold.

use std::collections::BTreeSet;

use bimq_core::{keyword_value_path, EngineError, EntityId, RawValue, COMPARISON_OPERATORS};
use regex::Regex;
use tracing::trace;

use crate::model::JsonModel;
use crate::path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Contains,
    NotContains,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Op {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "=" => Op::Eq,
            "!=" => Op::Ne,
            "*=" => Op::Contains,
            "!*=" => Op::NotContains,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            "<" => Op::Lt,
            "<=" => Op::Le,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
enum Operand {
    Text(String),
    Bool(bool),
    Null,
    Pattern(Regex),
}

#[derive(Debug, Clone)]
struct Predicate {
    path: String,
    test: Option<(Op, Operand)>,
}

#[derive(Debug, Default)]
struct Group {
    include: Vec<String>,
    exclude: Vec<String>,
    predicates: Vec<Predicate>,
}

/// Evaluate a filter against the model. Entities come back in id order.
pub(crate) fn evaluate(model: &JsonModel, filter: &str) -> Result<Vec<EntityId>, EngineError> {
    let mut selected = BTreeSet::new();
    for group_text in split_outside_quotes(filter, '+')? {
        let group = parse_group(model, group_text)?;
        if group.include.is_empty() && group.exclude.is_empty() && group.predicates.is_empty() {
            continue;
        }
        for entity in model.entities() {
            if group_matches(model, &group, entity.id, &entity.class) {
                selected.insert(entity.id);
            }
        }
    }
    trace!(filter, matched = selected.len(), "filter evaluated");
    Ok(selected.into_iter().collect())
}

fn group_matches(model: &JsonModel, group: &Group, id: EntityId, class: &str) -> bool {
    let schema = model.schema();
    let included = group.include.is_empty() || group.include.iter().any(|c| schema.is_a(class, c));
    let excluded = group.exclude.iter().any(|c| schema.is_a(class, c));
    included && !excluded && group.predicates.iter().all(|p| predicate_holds(model, p, id))
}

fn parse_group(model: &JsonModel, text: &str) -> Result<Group, EngineError> {
    let mut group = Group::default();
    for part in split_outside_quotes(text, ',')? {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((lhs, op, rhs)) = split_predicate(part) {
            if lhs.is_empty() {
                return Err(EngineError::Filter(format!("missing attribute before '{op}' in '{part}'")));
            }
            let op = Op::parse(op).ok_or_else(|| EngineError::Filter(format!("unknown operator '{op}'")))?;
            group.predicates.push(Predicate {
                path: predicate_path(lhs),
                test: Some((op, parse_operand(rhs)?)),
            });
            continue;
        }

        let (negated, name) = match part.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, part),
        };
        if is_class_name(model, name)? {
            if negated {
                group.exclude.push(name.to_string());
            } else {
                group.include.push(name.to_string());
            }
        } else if negated {
            return Err(EngineError::Filter(format!("'!' applies to classes only, got '{part}'")));
        } else {
            group.predicates.push(Predicate {
                path: predicate_path(name),
                test: None,
            });
        }
    }
    Ok(group)
}

fn is_class_name(model: &JsonModel, name: &str) -> Result<bool, EngineError> {
    if model.schema().contains(name) {
        return Ok(true);
    }
    let looks_like_class = name.len() > 3
        && name.starts_with("Ifc")
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if looks_like_class {
        return Err(EngineError::Filter(format!("unknown class {name}")));
    }
    Ok(false)
}

fn predicate_path(lhs: &str) -> String {
    let lhs = lhs.trim();
    if let Some(path) = lhs.strip_prefix("query:") {
        return path.trim().to_string();
    }
    keyword_value_path(lhs).unwrap_or(lhs).to_string()
}

fn parse_operand(rhs: &str) -> Result<Operand, EngineError> {
    let rhs = rhs.trim();
    if rhs.is_empty() {
        return Err(EngineError::Filter("missing value after operator".to_string()));
    }
    if let Some(inner) = rhs.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return Ok(Operand::Text(inner.replace("\\\"", "\"")));
    }
    if rhs.len() >= 2 && rhs.starts_with('/') && rhs.ends_with('/') {
        let pattern = &rhs[1..rhs.len() - 1];
        return Regex::new(pattern)
            .map(Operand::Pattern)
            .map_err(|e| EngineError::Filter(format!("invalid pattern /{pattern}/: {e}")));
    }
    Ok(match rhs.to_ascii_uppercase().as_str() {
        "TRUE" => Operand::Bool(true),
        "FALSE" => Operand::Bool(false),
        "NULL" => Operand::Null,
        _ => Operand::Text(rhs.to_string()),
    })
}

fn predicate_holds(model: &JsonModel, predicate: &Predicate, id: EntityId) -> bool {
    let value = match path::lookup(model, id, &predicate.path) {
        Ok(RawValue::Null) | Err(_) => None,
        Ok(value) => Some(value),
    };
    match &predicate.test {
        None => value.is_some(),
        Some((op, operand)) => compare(model, value.as_ref(), *op, operand),
    }
}

fn compare(model: &JsonModel, value: Option<&RawValue>, op: Op, operand: &Operand) -> bool {
    match op {
        Op::Ne => !compare(model, value, Op::Eq, operand),
        Op::NotContains => !compare(model, value, Op::Contains, operand),
        _ => match value {
            None => matches!((op, operand), (Op::Eq, Operand::Null)),
            Some(RawValue::List(items)) => items.iter().any(|item| compare(model, Some(item), op, operand)),
            Some(value) => compare_scalar(model, value, op, operand),
        },
    }
}

fn compare_scalar(model: &JsonModel, value: &RawValue, op: Op, operand: &Operand) -> bool {
    let text = match value {
        RawValue::Entity(id) => model
            .entity(*id)
            .ok()
            .and_then(|e| e.attribute("Name"))
            .and_then(RawValue::scalar_text),
        other => other.scalar_text(),
    };
    let Some(text) = text else {
        return false;
    };

    match (op, operand) {
        (_, Operand::Null) => false,
        (Op::Eq, Operand::Bool(b)) => matches!(value, RawValue::Bool(v) if v == b),
        (Op::Eq | Op::Contains, Operand::Pattern(re)) => re.is_match(&text),
        (Op::Eq, Operand::Text(expected)) => match (text.parse::<f64>(), expected.parse::<f64>()) {
            (Ok(a), Ok(b)) => (a - b).abs() < 1e-9,
            _ => text == *expected,
        },
        (Op::Contains, Operand::Text(needle)) => text.contains(needle.as_str()),
        (Op::Gt | Op::Ge | Op::Lt | Op::Le, Operand::Text(bound)) => {
            match (text.parse::<f64>(), bound.parse::<f64>()) {
                (Ok(a), Ok(b)) => match op {
                    Op::Gt => a > b,
                    Op::Ge => a >= b,
                    Op::Lt => a < b,
                    _ => a <= b,
                },
                _ => false,
            }
        }
        _ => false,
    }
}

/// Split on `separator` outside double quotes. Fails on an unterminated quote.
fn split_outside_quotes(text: &str, separator: char) -> Result<Vec<&str>, EngineError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(EngineError::Filter(format!("unterminated string in '{}'", text.trim())));
    }
    parts.push(&text[start..]);
    Ok(parts)
}

/// Split `lhs op rhs` at the first operator outside quotes.
fn split_predicate(part: &str) -> Option<(&str, &'static str, &str)> {
    let mut in_quotes = false;
    for (i, ch) in part.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes || !matches!(ch, '!' | '*' | '=' | '>' | '<') || (ch == '!' && i == 0) {
            continue;
        }
        if let Some(op) = COMPARISON_OPERATORS.iter().find(|op| part[i..].starts_with(**op)) {
            return Some((part[..i].trim(), op, &part[i + op.len()..]));
        }
    }
    None
}
