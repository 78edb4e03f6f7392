// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! Syntax highlighting for the bimq shell.
//!
//! Two highlighters live here: [`BimqHighlighter`] colours query input as the
//! user types, and [`highlight_step`] colours STEP entity text on output.

use bimq_core::{COMPARISON_OPERATORS, DELIMITER, FILTER_KEYWORDS};
use colored::Colorize;
use rustyline::highlight::{CmdKind, Highlighter};
use std::borrow::Cow;

/// Length of a compressed IFC GlobalId.
const GUID_LEN: usize = 22;

/// Input highlighter for query lines.
pub struct BimqHighlighter;

impl Highlighter for BimqHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned(highlight_line(line))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: CmdKind) -> bool {
        true
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        Cow::Borrowed(prompt)
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.dimmed().to_string())
    }

    fn highlight_candidate<'c>(
        &self,
        candidate: &'c str,
        _completion: rustyline::CompletionType,
    ) -> Cow<'c, str> {
        Cow::Borrowed(candidate)
    }
}

/// Colour one line of query input.
///
/// Class names are blue, filter keywords green, quoted strings yellow,
/// numbers cyan and clause delimiters magenta. Meta-command lines are
/// coloured as a whole.
fn highlight_line(line: &str) -> String {
    if line.starts_with('\\') {
        return line.bright_magenta().to_string();
    }

    let mut result = String::with_capacity(line.len() * 2);
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        let ch = chars[i];

        if ch == '"' || ch == '\'' {
            let end = closing_quote(&chars, i);
            let text: String = chars[i..end].iter().collect();
            result.push_str(&text.yellow().to_string());
            i = end;
            continue;
        }

        if ch == DELIMITER {
            result.push_str(&ch.to_string().magenta().bold().to_string());
            i += 1;
            continue;
        }

        if ch.is_alphabetic() || ch == '_' {
            let start = i;
            while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if is_class_name(&word) {
                result.push_str(&word.blue().bold().to_string());
            } else if FILTER_KEYWORDS.contains(&word.as_str()) {
                result.push_str(&word.green().to_string());
            } else {
                result.push_str(&word);
            }
            continue;
        }

        if ch.is_ascii_digit() {
            let start = i;
            while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let num: String = chars[start..i].iter().collect();
            result.push_str(&num.cyan().to_string());
            continue;
        }

        if let Some(op) = operator_at(&chars, i) {
            result.push_str(&op.bright_white().to_string());
            i += op.chars().count();
            continue;
        }

        result.push(ch);
        i += 1;
    }

    result
}

fn is_class_name(word: &str) -> bool {
    word.len() > 3 && word.starts_with("Ifc") && word[3..].starts_with(|c: char| c.is_ascii_uppercase())
}

/// Index one past the quote closing the literal opened at `start`.
fn closing_quote(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            // '' inside a STEP string is an escaped quote
            if quote == '\'' && chars.get(i + 1) == Some(&'\'') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn operator_at(chars: &[char], i: usize) -> Option<&'static str> {
    COMPARISON_OPERATORS.iter().copied().find(|op| {
        op.chars()
            .enumerate()
            .all(|(k, c)| chars.get(i + k) == Some(&c))
    })
}

/// Colour a STEP entity line such as `#12=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',#5,'W-01',$,.STANDARD.);`.
///
/// Entity ids are yellow, the class bold blue, GlobalIds magenta, other
/// strings green, numbers cyan and enumerations dimmed.
pub fn highlight_step(line: &str) -> String {
    let mut result = String::with_capacity(line.len() * 2);
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        let ch = chars[i];

        if ch == '#' && chars.get(i + 1).is_some_and(char::is_ascii_digit) {
            let start = i;
            i += 1;
            while i < len && chars[i].is_ascii_digit() {
                i += 1;
            }
            let id: String = chars[start..i].iter().collect();
            result.push_str(&id.yellow().to_string());
            continue;
        }

        if ch == '=' {
            result.push(ch);
            i += 1;
            let start = i;
            while i < len && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let class: String = chars[start..i].iter().collect();
            result.push_str(&class.blue().bold().to_string());
            continue;
        }

        if ch == '\'' {
            let end = closing_quote(&chars, i);
            let text: String = chars[i..end].iter().collect();
            if is_guid_literal(&text) {
                result.push_str(&text.magenta().to_string());
            } else {
                result.push_str(&text.green().to_string());
            }
            i = end;
            continue;
        }

        if ch == '.' && i + 1 < len && chars[i + 1].is_ascii_uppercase() {
            if let Some(offset) = chars[i + 1..].iter().position(|&c| c == '.') {
                let end = i + offset + 2;
                let text: String = chars[i..end].iter().collect();
                result.push_str(&text.dimmed().to_string());
                i = end;
                continue;
            }
        }

        if ch.is_ascii_digit() || (ch == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let start = i;
            i += 1;
            while i < len && (chars[i].is_ascii_digit() || matches!(chars[i], '.' | 'E' | 'e' | '-')) {
                i += 1;
            }
            let num: String = chars[start..i].iter().collect();
            result.push_str(&num.cyan().to_string());
            continue;
        }

        result.push(ch);
        i += 1;
    }

    result
}

/// `'...'` holding exactly 22 characters of the IFC base-64 alphabet.
fn is_guid_literal(text: &str) -> bool {
    let inner = text.trim_matches('\'');
    inner.len() == GUID_LEN
        && text.len() == GUID_LEN + 2
        && inner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
