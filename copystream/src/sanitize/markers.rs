// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Marker stripping
//
// Last line of defence against marker syntax in persisted content. The
// deliverable is re-demultiplexed as a finished stream, then any bracket
// that still opens a marker keyword is swept out.

use crate::demux::demultiplex;
use crate::marker::{tokenize, ScanMode, MARKER_KEYWORDS};

/// Remove every marker and all thinking text from `input`.
pub fn strip_markers(input: &str) -> String {
    let segments = tokenize(input, ScanMode::Complete);
    let channels = demultiplex(input, &segments);
    sweep_residual_markers(&channels.deliverable)
}

/// Remove leftover `[KEYWORD...` fragments that never formed a marker.
///
/// Each fragment runs to the next `]` on the same line, or up to the line
/// end or the next `<` when there is none. Repeats until no fragment is left,
/// since a removal can bring a new `[` next to a keyword.
pub fn sweep_residual_markers(input: &str) -> String {
    let mut text = input.to_string();
    while let Some(start) = find_marker_opening(&text) {
        let rest = &text[start..];
        let end = match rest.find(|c| matches!(c, '\n' | '<' | ']')) {
            Some(idx) if rest[idx..].starts_with(']') => start + idx + 1,
            Some(idx) => start + idx,
            None => text.len(),
        };
        tracing::debug!(offset = start, bytes = end - start, "sweeping residual marker text");
        text.replace_range(start..end, "");
    }
    text
}

/// True if `text` contains a `[` directly followed by a marker keyword.
pub fn contains_marker_syntax(text: &str) -> bool {
    find_marker_opening(text).is_some()
}

fn find_marker_opening(text: &str) -> Option<usize> {
    text.match_indices('[')
        .map(|(idx, _)| idx)
        .find(|&idx| {
            let after = &text[idx + 1..];
            MARKER_KEYWORDS.iter().any(|k| after.starts_with(k))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_markers_removed() {
        assert_eq!(
            strip_markers("[STATUS:writing]Hello[PRODUCTS:[]] world[REMEMBER:x]"),
            "Hello world"
        );
    }

    #[test]
    fn thinking_text_removed_with_its_markers() {
        assert_eq!(
            strip_markers("Hi [THINKING:START]secret[THINKING:END]there[THINKING:CHUNK]more"),
            "Hi there"
        );
        assert_eq!(strip_markers("Body[TOOL:search:START]narration"), "Body");
    }

    #[test]
    fn cut_off_marker_is_swept() {
        assert_eq!(strip_markers("Hello [STATUS:wri"), "Hello ");
        assert_eq!(strip_markers("Hello [THINKING:STA\nNext line"), "Hello \nNext line");
    }

    #[test]
    fn malformed_marker_swept_to_closing_bracket() {
        assert_eq!(strip_markers("A[STATUS:two words]B"), "AB");
        assert_eq!(strip_markers("A[TOOL:x:RUN]B"), "AB");
    }

    #[test]
    fn sweep_stops_before_tags() {
        assert_eq!(sweep_residual_markers("a[STATUS x<b>bold</b>"), "a<b>bold</b>");
    }

    #[test]
    fn sweep_repeats_until_clean() {
        assert_eq!(sweep_residual_markers("[[STATUS x]STATUS y]z"), "z");
    }

    #[test]
    fn ordinary_brackets_kept() {
        let text = "Use code [SAVE20] at checkout [1]";
        assert_eq!(strip_markers(text), text);
        assert!(!contains_marker_syntax(text));
    }

    #[test]
    fn detects_marker_syntax() {
        assert!(contains_marker_syntax("x [THINKING"));
        assert!(!contains_marker_syntax("x [thinking"));
    }
}
