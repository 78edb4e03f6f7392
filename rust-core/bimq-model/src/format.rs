// SPDX-License-Identifier: PMPL-1.0-or-later
//! Formatting functions applied to resolved value text.
//!
//! | function | arguments | result |
//! |---|---|---|
//! | `upper(v)` / `lower(v)` | 1 | case-mapped text |
//! | `title(v)` | 1 | each word capitalised |
//! | `concat(v, ...)` | 1+ | arguments joined without separator |
//! | `round(v, step)` | 1-2 | `v` rounded to a multiple of `step` (default 1) |
//! | `int(v)` | 1 | `v` truncated towards zero |
//! | `number(v, decimal, thousands)` | 1-3 | `v` with custom separators |

use bimq_core::EngineError;

/// Apply `function` to already-resolved argument text.
pub fn apply(function: &str, args: &[String]) -> Result<String, EngineError> {
    match function {
        "upper" => single(function, args).map(str::to_uppercase),
        "lower" => single(function, args).map(str::to_lowercase),
        "title" => single(function, args).map(title_case),
        "concat" => {
            if args.is_empty() {
                return Err(arity(function, "at least 1"));
            }
            Ok(args.concat())
        }
        "round" => {
            let (value, step) = match args {
                [value] => (number(function, value)?, 1.0),
                [value, step] => (number(function, value)?, number(function, step)?),
                _ => return Err(arity(function, "1 or 2")),
            };
            if step <= 0.0 {
                return Err(failure(function, format!("step must be positive, got {step}")));
            }
            let decimals = args.get(1).map_or(0, |s| decimals_of(s));
            Ok(format!("{:.*}", decimals, (value / step).round() * step))
        }
        "int" => {
            let value = number(function, single(function, args)?)?;
            Ok(format!("{}", value.trunc() as i64))
        }
        "number" => {
            let (value, decimal, thousands) = match args {
                [v] => (v, ".", ""),
                [v, d] => (v, d.as_str(), ""),
                [v, d, t] => (v, d.as_str(), t.as_str()),
                _ => return Err(arity(function, "1 to 3")),
            };
            number(function, value)?;
            Ok(with_separators(value.trim(), decimal, thousands))
        }
        other => Err(failure(other, "unknown formatting function".to_string())),
    }
}

fn single<'a>(function: &str, args: &'a [String]) -> Result<&'a str, EngineError> {
    match args {
        [value] => Ok(value.as_str()),
        _ => Err(arity(function, "1")),
    }
}

fn number(function: &str, text: &str) -> Result<f64, EngineError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| failure(function, format!("expected a number, got '{text}'")))
}

fn arity(function: &str, expected: &str) -> EngineError {
    failure(function, format!("expected {expected} argument(s)"))
}

fn failure(function: &str, reason: String) -> EngineError {
    EngineError::Format {
        function: function.to_string(),
        reason,
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(ch);
            word_start = true;
        }
    }
    out
}

fn decimals_of(step: &str) -> usize {
    step.trim()
        .split_once('.')
        .map_or(0, |(_, frac)| frac.trim_end_matches('0').len())
}

/// Regroup a plain decimal literal with the given separators.
fn with_separators(value: &str, decimal: &str, thousands: &str) -> String {
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", value),
    };
    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push_str(thousands);
        }
        grouped.push(ch);
    }

    match frac {
        Some(f) => format!("{sign}{grouped}{decimal}{f}"),
        None => format!("{sign}{grouped}"),
    }
}
