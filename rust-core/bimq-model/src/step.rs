// SPDX-License-Identifier: PMPL-1.0-or-later
//! Canonical STEP physical file (SPF) text for entities.

use bimq_core::RawValue;

use crate::model::Entity;

/// `#<id>=<CLASS>(<attributes>);` with attributes in declaration order.
pub fn render(entity: &Entity) -> String {
    let params: Vec<String> = entity.attributes.iter().map(|(_, v)| literal(v)).collect();
    format!(
        "{}={}({});",
        entity.id,
        entity.class.to_uppercase(),
        params.join(",")
    )
}

/// SPF literal for one attribute value.
pub fn literal(value: &RawValue) -> String {
    match value {
        RawValue::Null => "$".to_string(),
        RawValue::Bool(true) => ".T.".to_string(),
        RawValue::Bool(false) => ".F.".to_string(),
        RawValue::Integer(i) => i.to_string(),
        RawValue::Real(r) => real(*r),
        RawValue::Text(s) if is_enumeration(s) => s.clone(),
        RawValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        RawValue::Entity(id) => id.to_string(),
        RawValue::List(items) => {
            let inner: Vec<String> = items.iter().map(literal).collect();
            format!("({})", inner.join(","))
        }
        RawValue::Group(_) => "*".to_string(),
    }
}

/// Reals always carry a decimal point; integral values end with it.
fn real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.0}.")
    } else {
        value.to_string()
    }
}

/// `.UPPER_CASE.` enumeration literals pass through unquoted.
fn is_enumeration(text: &str) -> bool {
    text.len() > 2
        && text.starts_with('.')
        && text.ends_with('.')
        && text[1..text.len() - 1]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
