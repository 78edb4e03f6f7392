// SPDX-License-Identifier: PMPL-1.0-or-later
//! Value clause parsing and per-entity resolution.
//!
//! A value clause is either a path (`type.Name`) or a formatting call
//! wrapping paths and literals (`concat(Name, " - ", upper(type.Name))`).
//! Function names are never interpreted here; the engine applies them.

use tracing::trace;

use crate::engine::{EntityId, QueryEngine, RawValue};
use crate::error::EngineError;

/// Reason attached to a collection that was not reduced by an index or `count`.
pub const AMBIGUOUS_COLLECTION: &str = "ambiguous collection value";

/// Parsed value clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExpr {
    /// An empty clause; always resolves to missing.
    Empty,
    /// A quoted string or a number inside a call's argument list.
    Literal(String),
    Path(String),
    Call {
        function: String,
        args: Vec<ValueExpr>,
    },
}

/// Outcome of resolving one value clause against one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedValue {
    Scalar(String),
    Collection(Vec<String>),
    Missing,
    Error(ValueFailure),
}

/// Stable category of a value failure. Failures of one clause that share a
/// kind are reported together, whatever per-entity detail their text carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotFound,
    InvalidPath,
    /// A formatting function rejected its arguments.
    Format(String),
    UnknownEntity,
    PropertySet,
    AmbiguousCollection,
    Engine,
}

impl From<&EngineError> for FailureKind {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::NotFound { .. } => FailureKind::NotFound,
            EngineError::InvalidPath { .. } => FailureKind::InvalidPath,
            EngineError::Format { function, .. } => FailureKind::Format(function.clone()),
            EngineError::UnknownEntity(_) => FailureKind::UnknownEntity,
            EngineError::Filter(_) => FailureKind::Engine,
        }
    }
}

/// Why one value could not be produced for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueFailure {
    pub kind: FailureKind,
    /// Human-readable detail for this entity.
    pub reason: String,
}

impl ValueFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    pub fn ambiguous_collection() -> Self {
        Self::new(FailureKind::AmbiguousCollection, AMBIGUOUS_COLLECTION)
    }
}

impl From<EngineError> for ValueFailure {
    fn from(err: EngineError) -> Self {
        Self::new(FailureKind::from(&err), err.to_string())
    }
}

impl ValueExpr {
    /// Parse a trimmed value clause. Never fails: anything that is not a
    /// well-formed call is treated as a path and left to the engine.
    pub fn parse(clause: &str) -> Self {
        let clause = clause.trim();
        if clause.is_empty() {
            return ValueExpr::Empty;
        }
        if let Some(literal) = parse_quoted(clause) {
            return ValueExpr::Literal(literal);
        }
        match parse_call(clause) {
            Some((function, args)) => ValueExpr::Call {
                function: function.to_string(),
                args: args.into_iter().map(Self::parse_argument).collect(),
            },
            None => ValueExpr::Path(clause.to_string()),
        }
    }

    fn parse_argument(arg: &str) -> Self {
        let arg = arg.trim();
        if arg.parse::<f64>().is_ok() {
            ValueExpr::Literal(arg.to_string())
        } else {
            Self::parse(arg)
        }
    }

    /// Whether the clause explicitly reduces a collection: its final path
    /// segment is `count` or an integer index.
    pub fn explicit_selection(&self) -> bool {
        match self {
            ValueExpr::Path(path) => path.rsplit('.').next().is_some_and(|last| {
                last == "count" || (!last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()))
            }),
            _ => false,
        }
    }
}

/// Resolve a parsed clause for one entity.
///
/// Formatting calls resolve their arguments first, then hand the resulting
/// text to the engine. Any missing or failed argument short-circuits the call.
pub fn resolve<E: QueryEngine + ?Sized>(engine: &E, entity: EntityId, expr: &ValueExpr) -> ResolvedValue {
    match expr {
        ValueExpr::Empty => ResolvedValue::Missing,
        ValueExpr::Literal(text) => ResolvedValue::Scalar(text.clone()),
        ValueExpr::Path(path) => match engine.lookup(entity, path) {
            Ok(raw) => from_raw(engine, path, raw),
            Err(err) => ResolvedValue::Error(err.into()),
        },
        ValueExpr::Call { function, args } => {
            let mut texts = Vec::with_capacity(args.len());
            for arg in args {
                match resolve(engine, entity, arg) {
                    ResolvedValue::Scalar(text) => texts.push(text),
                    ResolvedValue::Collection(_) => {
                        return ResolvedValue::Error(ValueFailure::ambiguous_collection())
                    }
                    other => return other,
                }
            }
            trace!(%entity, function, "applying format");
            match engine.apply_format(function, &texts) {
                Ok(text) => ResolvedValue::Scalar(text),
                Err(err) => ResolvedValue::Error(err.into()),
            }
        }
    }
}

fn from_raw<E: QueryEngine + ?Sized>(engine: &E, path: &str, raw: RawValue) -> ResolvedValue {
    match raw {
        RawValue::Null => ResolvedValue::Missing,
        RawValue::List(items) => {
            ResolvedValue::Collection(items.iter().filter_map(|item| element_text(engine, item)).collect())
        }
        RawValue::Group(_) => ResolvedValue::Error(ValueFailure::new(
            FailureKind::PropertySet,
            format!("'{path}' is a property set, name one of its properties"),
        )),
        RawValue::Entity(id) => ResolvedValue::Scalar(engine.render(id)),
        scalar => scalar
            .scalar_text()
            .map_or(ResolvedValue::Missing, ResolvedValue::Scalar),
    }
}

fn element_text<E: QueryEngine + ?Sized>(engine: &E, item: &RawValue) -> Option<String> {
    match item {
        RawValue::Entity(id) => Some(engine.render(*id)),
        RawValue::List(inner) => Some(format!("({})", inner.len())),
        other => other.scalar_text(),
    }
}

/// Contents of a fully quoted literal with `\"` unescaped.
fn parse_quoted(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut escaped = false;
    for ch in inner.chars() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return None,
            _ => {}
        }
    }
    Some(inner.replace("\\\"", "\""))
}

/// Split `name(arg, ...)` where the closing paren ends the clause.
fn parse_call(clause: &str) -> Option<(&str, Vec<&str>)> {
    let open = clause.find('(')?;
    let function = clause[..open].trim();
    let valid_name = function
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && function.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_name {
        return None;
    }

    let body = clause[open + 1..].strip_suffix(')')?;
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                args.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || in_quotes {
        return None;
    }
    let last = &body[start..];
    if !(args.is_empty() && last.trim().is_empty()) {
        args.push(last);
    }
    Some((function, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureEngine;

    #[test]
    fn test_parse_path_and_empty() {
        assert_eq!(ValueExpr::parse("  type.Name "), ValueExpr::Path("type.Name".into()));
        assert_eq!(ValueExpr::parse("   "), ValueExpr::Empty);
    }

    #[test]
    fn test_parse_nested_call() {
        let expr = ValueExpr::parse(r#"concat(upper(Name), " - ", round(Width, 2))"#);
        assert_eq!(
            expr,
            ValueExpr::Call {
                function: "concat".into(),
                args: vec![
                    ValueExpr::Call {
                        function: "upper".into(),
                        args: vec![ValueExpr::Path("Name".into())],
                    },
                    ValueExpr::Literal(" - ".into()),
                    ValueExpr::Call {
                        function: "round".into(),
                        args: vec![ValueExpr::Path("Width".into()), ValueExpr::Literal("2".into())],
                    },
                ],
            }
        );
    }

    #[test]
    fn test_parse_quoted_comma_and_paren_in_argument() {
        let expr = ValueExpr::parse(r#"concat(Name, "a, (b")"#);
        match expr {
            ValueExpr::Call { args, .. } => {
                assert_eq!(args[1], ValueExpr::Literal("a, (b".into()))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unbalanced_call_is_a_path() {
        assert_eq!(ValueExpr::parse("upper(Name"), ValueExpr::Path("upper(Name".into()));
        assert_eq!(ValueExpr::parse("upper(Name))"), ValueExpr::Path("upper(Name))".into()));
    }

    #[test]
    fn test_call_without_arguments() {
        assert_eq!(
            ValueExpr::parse("now()"),
            ValueExpr::Call {
                function: "now".into(),
                args: vec![]
            }
        );
    }

    #[test]
    fn test_explicit_selection() {
        assert!(ValueExpr::parse("ConnectedTo.count").explicit_selection());
        assert!(ValueExpr::parse("ConnectedTo.0").explicit_selection());
        assert!(!ValueExpr::parse("ConnectedTo").explicit_selection());
        assert!(!ValueExpr::parse("upper(ConnectedTo.0)").explicit_selection());
    }

    #[test]
    fn test_resolve_scalar_and_entity() {
        let engine = FixtureEngine::walls();
        assert_eq!(
            resolve(&engine, EntityId(1), &ValueExpr::parse("Name")),
            ResolvedValue::Scalar("W-01".into())
        );
        assert_eq!(
            resolve(&engine, EntityId(1), &ValueExpr::parse("type")),
            ResolvedValue::Scalar("#10=IFCWALLTYPE('WT-Concrete')".into())
        );
    }

    #[test]
    fn test_resolve_null_is_missing_not_found_is_error() {
        let engine = FixtureEngine::walls();
        assert_eq!(
            resolve(&engine, EntityId(2), &ValueExpr::parse("Tag")),
            ResolvedValue::Missing
        );
        assert_eq!(
            resolve(&engine, EntityId(3), &ValueExpr::parse("Tag")),
            ResolvedValue::Error(ValueFailure::new(FailureKind::NotFound, "'Tag' not found"))
        );
    }

    #[test]
    fn test_resolve_collection() {
        let engine = FixtureEngine::walls();
        match resolve(&engine, EntityId(1), &ValueExpr::parse("ConnectedTo")) {
            ResolvedValue::Collection(items) => assert_eq!(items.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_resolve_group_is_error() {
        let engine = FixtureEngine::walls();
        assert!(matches!(
            resolve(&engine, EntityId(1), &ValueExpr::parse("Pset_WallCommon")),
            ResolvedValue::Error(ValueFailure {
                kind: FailureKind::PropertySet,
                ..
            })
        ));
    }

    #[test]
    fn test_resolve_call_delegates_to_engine() {
        let engine = FixtureEngine::walls();
        let expr = ValueExpr::parse(r#"concat(upper(Name), "/", type.Name)"#);
        assert_eq!(
            resolve(&engine, EntityId(1), &expr),
            ResolvedValue::Scalar("W-01/WT-Concrete".into())
        );
    }

    #[test]
    fn test_resolve_call_with_missing_argument() {
        let engine = FixtureEngine::walls();
        assert_eq!(
            resolve(&engine, EntityId(2), &ValueExpr::parse("upper(Tag)")),
            ResolvedValue::Missing
        );
    }

    #[test]
    fn test_resolve_unknown_function_is_error() {
        let engine = FixtureEngine::walls();
        assert_eq!(
            resolve(&engine, EntityId(1), &ValueExpr::parse("shout(Name)")),
            ResolvedValue::Error(ValueFailure::new(
                FailureKind::Format("shout".into()),
                "shout(): unknown function"
            ))
        );
    }

    #[test]
    fn test_resolve_collection_argument_is_ambiguous() {
        let engine = FixtureEngine::walls();
        assert_eq!(
            resolve(&engine, EntityId(1), &ValueExpr::parse("upper(ConnectedTo)")),
            ResolvedValue::Error(ValueFailure::ambiguous_collection())
        );
    }
}
