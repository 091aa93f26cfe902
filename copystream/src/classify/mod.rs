// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Response classifier
//
// Decides what the deliverable channel of a turn is: an email draft, a
// clarifying question, or anything else. Heuristics are checked in priority
// order over the deliverable text; the section label patterns come from
// config.

use crate::config::{ClarificationWrapper, ClassifierConfig, CompiledPattern, LabelHead};
use crate::metadata::ResponseType;

/// Longest line accepted as a lead-in before the first email header
/// ("Here's your email:").
const MAX_LEAD_IN_CHARS: usize = 80;

/// Outcome of classifying one deliverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub response_type: ResponseType,
    /// Set for `EmailCopy`: the email from its first section header on.
    pub email_copy: Option<String>,
    /// Set for `Clarification`: the question without its wrapper.
    pub clarification: Option<String>,
}

impl Classification {
    fn other() -> Self {
        Self {
            response_type: ResponseType::Other,
            email_copy: None,
            clarification: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

pub struct ResponseClassifier {
    email_section: CompiledPattern,
    thinking_section: CompiledPattern,
    thinking_block: CompiledPattern,
    thinking_heads: Vec<LabelHead>,
    wrappers: Vec<ClarificationWrapper>,
}

impl ResponseClassifier {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            email_section: config.email_section.clone(),
            thinking_section: config.thinking_section.clone(),
            thinking_block: config.thinking_block.clone(),
            thinking_heads: config.thinking_heads.clone(),
            wrappers: config.clarification_wrappers.clone(),
        }
    }

    /// Classify a deliverable.
    ///
    /// Priority:
    /// 1. email_copy: an email section header opens the deliverable, after
    ///    leading thinking-header blocks and at most one short lead-in line
    /// 2. clarification: the deliverable opens with a clarification wrapper
    /// 3. other
    pub fn classify(&self, deliverable: &str) -> Classification {
        if let Some(email) = self.extract_email(deliverable) {
            return Classification {
                response_type: ResponseType::EmailCopy,
                email_copy: Some(email),
                clarification: None,
            };
        }
        if let Some(question) = self.extract_clarification(deliverable) {
            return Classification {
                response_type: ResponseType::Clarification,
                email_copy: None,
                clarification: Some(question),
            };
        }
        Classification::other()
    }

    /// Classify a deliverable whose type is already locked for the turn.
    ///
    /// When the locked type's shape is no longer detected, the whole
    /// deliverable (minus thinking-header blocks for email) is taken as that
    /// type instead of falling back to `other`.
    pub fn classify_as(&self, deliverable: &str, locked: ResponseType) -> Classification {
        match locked {
            ResponseType::EmailCopy => {
                let email = self.extract_email(deliverable).unwrap_or_else(|| {
                    let lines = split_lines(deliverable);
                    self.email_body(&lines, 0)
                });
                Classification {
                    response_type: ResponseType::EmailCopy,
                    email_copy: Some(email),
                    clarification: None,
                }
            }
            ResponseType::Clarification => {
                let question = self
                    .extract_clarification(deliverable)
                    .unwrap_or_else(|| deliverable.trim().to_string());
                Classification {
                    response_type: ResponseType::Clarification,
                    email_copy: None,
                    clarification: Some(question),
                }
            }
            ResponseType::Other => self.classify(deliverable),
        }
    }

    /// True if `line` opens a thinking-only header block (`STRATEGY:` ...).
    pub fn is_thinking_header(&self, line: &str) -> bool {
        self.thinking_section.is_match(line)
    }

    /// True if `line` opens an analysis block inside an email. Matches the
    /// thinking labels in any case.
    pub fn starts_thinking_block(&self, line: &str) -> bool {
        self.thinking_block.is_match(line)
    }

    /// The part of a streaming deliverable that is safe to classify.
    ///
    /// A trailing line without its newline that could still become an
    /// analysis header (`STRAT`, `**Strategy`) is held back until it is
    /// decided, so it never shows in a preview and then disappears.
    pub fn streaming_view<'a>(&self, deliverable: &'a str) -> &'a str {
        let line_start = deliverable.rfind('\n').map_or(0, |i| i + 1);
        let last = &deliverable[line_start..];
        if self.may_become_thinking_header(last) {
            &deliverable[..line_start]
        } else {
            deliverable
        }
    }

    fn may_become_thinking_header(&self, partial: &str) -> bool {
        if partial.trim().is_empty() || partial.contains(':') {
            return false;
        }
        let label = partial
            .trim_start()
            .trim_start_matches('#')
            .trim_start()
            .trim_start_matches(|c: char| c == '*' || c == '_')
            .trim_start()
            .to_uppercase();
        // Only markdown so far ("## ", "**"): anything may follow.
        label.is_empty() || self.thinking_heads.iter().any(|h| h.admits(&label))
    }

    /// True if `line` opens an email section (`SUBJECT LINE:` ...).
    pub fn is_email_header(&self, line: &str) -> bool {
        self.email_section.is_match(line)
    }

    /// The email copy of `deliverable`, if it opens with an email header.
    pub fn extract_email(&self, deliverable: &str) -> Option<String> {
        let lines = split_lines(deliverable);
        let mut idx = self.skip_thinking_preamble(&lines, 0);

        if !self.is_email_header(lines.get(idx)?) {
            let line = lines[idx].trim();
            if !(line.ends_with(':') && line.chars().count() <= MAX_LEAD_IN_CHARS) {
                return None;
            }
            idx = skip_blank(&lines, idx + 1);
            // A second preamble after the lead-in is not an email.
            if !self.is_email_header(lines.get(idx)?) {
                return None;
            }
        }

        Some(self.email_body(&lines, idx))
    }

    /// The question inside a clarification wrapper, if the deliverable opens
    /// with one. A missing closing tag is tolerated, and a closing tag cut
    /// off at the end of a streaming buffer is not shown.
    pub fn extract_clarification(&self, deliverable: &str) -> Option<String> {
        let text = deliverable.trim_start();
        self.wrappers.iter().find_map(|wrapper| {
            let inner = text.strip_prefix(wrapper.open.as_str())?;
            let close_at = if wrapper.close.is_empty() {
                None
            } else {
                inner.find(wrapper.close.as_str())
            };
            let question = match close_at {
                Some(end) => &inner[..end],
                None => trim_partial_suffix(inner, &wrapper.close),
            };
            Some(question.trim().to_string())
        })
    }

    /// Skip blank lines and thinking-header blocks starting at `idx`. A block
    /// ends at a blank line or at the next email section header.
    fn skip_thinking_preamble(&self, lines: &[&str], mut idx: usize) -> usize {
        loop {
            idx = skip_blank(lines, idx);
            match lines.get(idx) {
                Some(line) if self.is_thinking_header(line) && !self.is_email_header(line) => {
                    idx += 1;
                    while idx < lines.len()
                        && !lines[idx].trim().is_empty()
                        && !self.is_email_header(lines[idx])
                    {
                        idx += 1;
                    }
                }
                _ => return idx,
            }
        }
    }

    /// Join the lines from `start`, dropping each thinking-header block up to
    /// the next email section header.
    fn email_body(&self, lines: &[&str], start: usize) -> String {
        let mut kept: Vec<&str> = Vec::new();
        let mut in_thinking_block = false;

        for line in lines.iter().skip(start) {
            if self.is_email_header(line) {
                in_thinking_block = false;
            } else if self.starts_thinking_block(line) {
                in_thinking_block = true;
            }
            if !in_thinking_block {
                kept.push(line);
            }
        }

        kept.join("\n").trim().to_string()
    }
}

// ---------------------------------------------------------------------------
// Classification lock
// ---------------------------------------------------------------------------

/// One-way lock on a turn's response type.
///
/// The first non-`other` type observed is held for the rest of the turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationLock {
    locked: Option<ResponseType>,
}

impl ClassificationLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locked(&self) -> Option<ResponseType> {
        self.locked
    }

    /// Record a detected type and return the effective type for this parse.
    pub fn observe(&mut self, detected: ResponseType) -> ResponseType {
        match self.locked {
            Some(locked) => locked,
            None if detected != ResponseType::Other => {
                tracing::debug!(response_type = %detected, "response type locked");
                self.locked = Some(detected);
                detected
            }
            None => ResponseType::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

fn skip_blank(lines: &[&str], mut idx: usize) -> usize {
    while idx < lines.len() && lines[idx].trim().is_empty() {
        idx += 1;
    }
    idx
}

/// Drop the longest suffix of `text` that is a proper prefix of `close`.
fn trim_partial_suffix<'a>(text: &'a str, close: &str) -> &'a str {
    (1..close.len())
        .rev()
        .filter_map(|k| close.get(..k))
        .find(|prefix| text.ends_with(prefix))
        .map_or(text, |prefix| &text[..text.len() - prefix.len()])
}
