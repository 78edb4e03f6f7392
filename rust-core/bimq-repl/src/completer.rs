// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! Tab-completion for the bimq shell.
//!
//! Query input is completed by the session's context-aware completion
//! engine; lines starting with a backslash complete meta-commands and the
//! `\format` argument.

use std::rc::Rc;

use bimq_core::ModelSession;
use bimq_model::JsonModel;
use rustyline::completion::{Completer, Pair};
use rustyline::Context;

/// Meta-commands starting with backslash.
pub const META_COMMANDS: &[&str] = &[
    "\\cache", "\\debug", "\\format", "\\headers", "\\help", "\\quit", "\\q", "\\timing",
];

const FORMATS: &[&str] = &["tsv", "csv", "table", "json"];

/// Tab-completer backed by a shared model session.
pub struct BimqCompleter {
    session: Rc<ModelSession<JsonModel>>,
}

impl BimqCompleter {
    pub fn new(session: Rc<ModelSession<JsonModel>>) -> Self {
        Self { session }
    }

    /// Replacement start and candidates for `line` with the cursor at `pos`.
    pub fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        if line.starts_with('\\') {
            return complete_meta(line, pos);
        }

        let done = self.session.complete(line, pos);
        let pairs = done
            .candidates
            .into_iter()
            .map(|c| Pair {
                display: c.clone(),
                replacement: c,
            })
            .collect();
        (done.start, pairs)
    }
}

impl Completer for BimqCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.candidates(line, pos))
    }
}

/// Complete a meta-command name, or the argument of `\format`.
fn complete_meta(line: &str, pos: usize) -> (usize, Vec<Pair>) {
    let head = &line[..pos.min(line.len())];

    let (start, prefix, options): (usize, &str, &[&str]) = match head.split_once(char::is_whitespace)
    {
        Some(("\\format", arg)) => {
            let arg = arg.trim_start();
            (head.len() - arg.len(), arg, FORMATS)
        }
        Some(_) => return (pos, Vec::new()),
        None => (0, head, META_COMMANDS),
    };

    let lower = prefix.to_lowercase();
    let pairs = options
        .iter()
        .filter(|option| option.starts_with(&lower))
        .map(|option| Pair {
            display: option.to_string(),
            replacement: option.to_string(),
        })
        .collect();
    (start, pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"{
        "entities": [
            {"id": 1, "class": "IfcWall", "attributes": {"Name": "W-01", "Tag": "A"}},
            {"id": 2, "class": "IfcSlab", "attributes": {"Name": "S-01"}}
        ]
    }"#;

    fn completer() -> BimqCompleter {
        let model = JsonModel::from_json(MODEL).unwrap();
        BimqCompleter::new(Rc::new(ModelSession::new(model)))
    }

    fn replacements(pairs: &[Pair]) -> Vec<&str> {
        pairs.iter().map(|p| p.replacement.as_str()).collect()
    }

    #[test]
    fn test_meta_command_prefix() {
        let (start, pairs) = complete_meta("\\h", 2);
        assert_eq!(start, 0);
        assert_eq!(replacements(&pairs), ["\\headers", "\\help"]);
    }

    #[test]
    fn test_format_argument() {
        let (start, pairs) = complete_meta("\\format t", 9);
        assert_eq!(start, 8);
        assert_eq!(replacements(&pairs), ["tsv", "table"]);
    }

    #[test]
    fn test_other_meta_arguments_have_no_candidates() {
        let (_, pairs) = complete_meta("\\timing o", 9);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_query_completion_uses_session() {
        let c = completer();
        let (start, pairs) = c.candidates("IfcW", 4);
        assert_eq!(start, 0);
        assert_eq!(replacements(&pairs)[0], "IfcWall");
    }

    #[test]
    fn test_value_clause_completion() {
        let c = completer();
        let line = "IfcWall ; Ta";
        let (start, pairs) = c.candidates(line, line.len());
        assert_eq!(start, 10);
        assert!(replacements(&pairs).contains(&"Tag"));
    }
}
