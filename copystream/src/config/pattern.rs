// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use regex::Regex;

use super::error::ConfigError;

/// A pre-compiled regex pattern. Wraps `regex::Regex` with the original
/// pattern string preserved for debugging/display.
#[derive(Clone)]
pub struct CompiledPattern {
    pub pattern: String,
    pub regex: Regex,
}

impl CompiledPattern {
    /// Compile a regex pattern, returning `ConfigError::InvalidRegex` on failure.
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Build the line-start matcher for a set of section labels.
    ///
    /// A line matches when it opens with one of the labels followed by a
    /// colon. Leading `#` headings, `**`/`__` emphasis around the label and a
    /// short parenthetical (`SUBJECT LINE (A):`) are tolerated.
    pub fn section_header(labels: &[String], case_insensitive: bool) -> Result<Self, ConfigError> {
        if labels.is_empty() {
            return Err(ConfigError::Classifier(
                "section label list must not be empty".to_string(),
            ));
        }
        for label in labels {
            if label.trim().is_empty() {
                return Err(ConfigError::Classifier(
                    "section labels must not be empty".to_string(),
                ));
            }
            // Compile each fragment alone so the error names the bad label.
            Self::compile(label)?;
        }

        let alternation = labels.join("|");
        let flags = if case_insensitive { "(?i:" } else { "(?:" };
        let pattern = format!(
            r"^[ \t]*(?:#{{1,6}}[ \t]*)?(?:\*\*|__)?[ \t]*{flags}{alternation})(?:[ \t]*\([^)\n]{{0,40}}\))?[ \t]*(?:(?:\*\*|__)[ \t]*)?:"
        );
        Self::compile(&pattern)
    }

    /// Test whether the pattern matches the given text.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// The literal start of a section label fragment, upper-cased, used to
/// recognize a header line that is still being streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelHead {
    pub head: String,
    /// The fragment continues with regex syntax after `head`.
    pub open_ended: bool,
}

impl LabelHead {
    pub fn from_fragment(fragment: &str) -> Self {
        let fragment = fragment.trim();
        let end = fragment
            .find(|c: char| "\\.+*?()|[]{}^$".contains(c))
            .unwrap_or(fragment.len());
        Self {
            head: fragment[..end].trim_end().to_uppercase(),
            open_ended: end < fragment.len(),
        }
    }

    /// True if `partial` (upper-cased, markdown stripped, no colon yet) can
    /// still grow into this label's header.
    pub fn admits(&self, partial: &str) -> bool {
        if self.head.starts_with(partial) {
            return true;
        }
        match partial.strip_prefix(self.head.as_str()) {
            Some(_) if self.open_ended => true,
            Some(rest) => {
                let rest = rest.trim_start();
                rest.is_empty() || rest.starts_with(|c: char| c == '(' || c == '*' || c == '_')
            }
            None => false,
        }
    }
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPattern")
            .field("pattern", &self.pattern)
            .finish()
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}
