// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Deliverable sanitizer
//
// Applied once, to the winning deliverable channel, before it is persisted.
// Pure string transformation; idempotent: sanitizing already-sanitized
// content returns the same result.

mod html;
mod markers;

pub use html::{is_safe_uri, sanitize_html};
pub use markers::{contains_marker_syntax, strip_markers, sweep_residual_markers};

use crate::config::SanitizerConfig;

// ---------------------------------------------------------------------------
// Trait: Sanitizer
// ---------------------------------------------------------------------------

/// Pure string sanitizer. Implementations must be Send + Sync so they can be
/// shared across async tasks.
pub trait Sanitizer: Send + Sync {
    /// Sanitize a deliverable. Must be idempotent:
    /// `sanitize(sanitize(x)) == sanitize(x)` for all `x`.
    fn sanitize(&self, input: &str) -> String;
}

// ---------------------------------------------------------------------------
// Implementation: DeliverableSanitizer
// ---------------------------------------------------------------------------

/// Sanitizer that applies, in order:
///
/// 1. Zero-width / invisible character removal
/// 2. Marker strip (markers, thinking text, residual marker fragments)
/// 3. HTML allow-list filter with href scheme check
/// 4. A final residual-marker sweep over the filtered text
pub struct DeliverableSanitizer {
    allowed_uri_schemes: Vec<String>,
}

impl DeliverableSanitizer {
    pub fn new(config: &SanitizerConfig) -> Self {
        Self {
            allowed_uri_schemes: config.allowed_uri_schemes.clone(),
        }
    }
}

impl Default for DeliverableSanitizer {
    fn default() -> Self {
        Self::new(&SanitizerConfig::default())
    }
}

impl Sanitizer for DeliverableSanitizer {
    fn sanitize(&self, input: &str) -> String {
        let visible = remove_invisible_chars(input);
        let unmarked = strip_markers(&visible);

        let schemes: Vec<&str> = self.allowed_uri_schemes.iter().map(String::as_str).collect();
        let filtered = sanitize_html(&unmarked, &schemes);

        // Removing a tag can join a bracket to a keyword.
        sweep_residual_markers(&filtered).trim().to_string()
    }
}

// ---------------------------------------------------------------------------
// Invisible character removal
// ---------------------------------------------------------------------------

/// Returns true for zero-width and bidi-control characters that can hide
/// text (or split a marker keyword) without rendering.
///
/// Variation selectors are not included: emoji in email copy rely on them.
pub(crate) fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' // Zero-width space
        | '\u{200C}' // Zero-width non-joiner
        | '\u{200D}' // Zero-width joiner
        | '\u{FEFF}' // BOM / zero-width no-break space
        | '\u{00AD}' // Soft hyphen
        | '\u{200E}' // Left-to-right mark
        | '\u{200F}' // Right-to-left mark
        | '\u{202A}'..='\u{202E}' // Bidi embeddings and overrides
        | '\u{2060}'..='\u{2064}' // Word joiner, invisible operators
        | '\u{2066}'..='\u{2069}' // Bidi isolates
        | '\u{180E}' // Mongolian vowel separator
    )
}

/// Remove all invisible / zero-width characters from a string.
pub fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !is_invisible(*c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> DeliverableSanitizer {
        DeliverableSanitizer::default()
    }

    // ---------------------------------------------------------------
    // 1. Pipeline
    // ---------------------------------------------------------------

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(sanitizer().sanitize("Hello there 👋\nSee you."), "Hello there 👋\nSee you.");
    }

    #[test]
    fn markers_hidden_by_invisible_chars_are_stripped() {
        let out = sanitizer().sanitize("Hi [\u{200B}STATUS:x] [THINK\u{200D}ING:START]secret");
        assert_eq!(out, "Hi");
        assert!(!out.contains("secret"));
    }

    #[test]
    fn markup_filtered_after_marker_strip() {
        let out = sanitizer().sanitize(
            "<p>Shop <a href=\"javascript:x\" onclick=\"y\">now</a></p>[STATUS:done]<script>z</script>",
        );
        assert_eq!(out, "<p>Shop <a>now</a></p>");
    }

    #[test]
    fn tag_removal_cannot_assemble_a_marker() {
        let out = sanitizer().sanitize("a [<span>STATUS:x</span>] b");
        assert!(!contains_marker_syntax(&out), "got {out:?}");
    }

    #[test]
    fn configured_schemes_are_honoured() {
        let config = SanitizerConfig {
            allowed_uri_schemes: vec!["https".to_string()],
        };
        let out = DeliverableSanitizer::new(&config)
            .sanitize("<a href=\"http://a.example\">a</a><a href=\"https://b.example\">b</a>");
        assert_eq!(out, "<a>a</a><a href=\"https://b.example\">b</a>");
    }

    // ---------------------------------------------------------------
    // 2. Idempotence
    // ---------------------------------------------------------------

    #[test]
    fn sanitize_is_idempotent() {
        let s = sanitizer();
        for input in [
            "SUBJECT LINE: Hi\n<b>HERO:</b> Welcome & enjoy",
            "a [<span>STATUS:x</span>] b",
            "[THINKING:START]x[THINKING:END]<P>ok</P>[STATUS:wri",
            "<a title=\"[STATUS:x]\" href=\"&#104;ttps://a.example\">x</a>",
            "  x < y > z  ",
            "[[STATUS x]STATUS y]z<!-- c -->",
        ] {
            let once = s.sanitize(input);
            assert_eq!(s.sanitize(&once), once, "input {input:?}");
        }
    }

    // ---------------------------------------------------------------
    // 3. Invisible characters
    // ---------------------------------------------------------------

    #[test]
    fn invisible_chars_removed_emoji_kept() {
        assert_eq!(remove_invisible_chars("a\u{200B}b\u{FEFF}c\u{202E}d"), "abcd");
        assert_eq!(remove_invisible_chars("❤\u{FE0F}"), "❤\u{FE0F}");
    }
}
