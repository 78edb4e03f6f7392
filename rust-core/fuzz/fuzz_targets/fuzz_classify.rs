// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for the completion classifier and query segmenter.
// Run with: cargo +nightly fuzz run fuzz_classify
//
// Completion runs on every keystroke, so neither function may panic on any
// input or cursor offset, including offsets past the end or inside a
// multi-byte character.

#![no_main]

use bimq_core::{classify_syntax, extract_partial_filter, segment};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&cursor_byte, rest)) = data.split_first() else {
        return;
    };
    let Ok(input) = std::str::from_utf8(rest) else {
        return;
    };
    if input.len() > 4096 {
        return;
    }

    let segments = segment(input);
    assert!(segments.values.len() <= input.matches(';').count());

    // Offsets past the end are clamped by the classifier.
    let cursor = cursor_byte as usize % (input.len() + 2);
    let context = classify_syntax(input, cursor);
    let _ = extract_partial_filter(input, cursor);
    assert!(context.partial().len() <= input.len());
});
