// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Marker tokenizer
//
// Single forward pass over the buffer. Every `[` is tried as a marker
// opener; anything that does not form a marker stays in the surrounding
// free-text run. All delimiters are ASCII, so byte offsets taken at them are
// valid UTF-8 boundaries.

use super::types::{MarkerKind, MarkerToken, ScanMode, Segment, Span, MARKER_KEYWORDS};

/// Outcome of reading a marker that opens at a `[`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerMatch {
    /// A full marker. `end` is the offset just past its closing `]`.
    Complete {
        kind: MarkerKind,
        payload: Span,
        end: usize,
    },
    /// The buffer ended while the text was still a viable marker prefix.
    Incomplete,
    /// Not a marker. The `[` is literal text.
    NoMatch,
}

/// Split `buffer` into ordered text runs, marker tokens and (in streaming
/// mode) a trailing incomplete span.
///
/// Never fails: malformed markers are left in the text runs.
pub fn tokenize(buffer: &str, mode: ScanMode) -> Vec<Segment> {
    let bytes = buffer.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(open) = find_open(bytes, pos) {
        match match_marker_at(bytes, open) {
            MarkerMatch::Complete { kind, payload, end } => {
                push_text(&mut segments, text_start, open);

                let (payload, end) = if kind == MarkerKind::ThinkingChunk {
                    let chunk_end = chunk_payload_end(bytes, end, mode);
                    (Span::new(end, chunk_end), chunk_end)
                } else {
                    (payload, end)
                };

                segments.push(Segment::Marker(MarkerToken {
                    kind,
                    payload: payload.slice(buffer).to_string(),
                    span: Span::new(open, end),
                }));
                pos = end;
                text_start = end;
            }
            MarkerMatch::Incomplete if mode == ScanMode::Streaming => {
                push_text(&mut segments, text_start, open);
                segments.push(Segment::Incomplete(Span::new(open, bytes.len())));
                return segments;
            }
            MarkerMatch::Incomplete | MarkerMatch::NoMatch => pos = open + 1,
        }
    }

    push_text(&mut segments, text_start, bytes.len());
    segments
}

/// Only the recognized markers of `buffer`, in order.
pub fn marker_tokens(buffer: &str, mode: ScanMode) -> Vec<MarkerToken> {
    tokenize(buffer, mode)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Marker(token) => Some(token),
            _ => None,
        })
        .collect()
}

fn push_text(segments: &mut Vec<Segment>, start: usize, end: usize) {
    if start < end {
        segments.push(Segment::Text(Span::new(start, end)));
    }
}

fn find_open(bytes: &[u8], from: usize) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&b| b == b'[')
        .map(|offset| from + offset)
}

/// A chunk payload runs until the next `[` that opens a marker. In streaming
/// mode an incomplete marker also ends it, so the cut-off text is not glued
/// onto the payload and later pulled back out.
fn chunk_payload_end(bytes: &[u8], from: usize, mode: ScanMode) -> usize {
    let mut pos = from;
    while let Some(open) = find_open(bytes, pos) {
        match match_marker_at(bytes, open) {
            MarkerMatch::Complete { .. } => return open,
            MarkerMatch::Incomplete if mode == ScanMode::Streaming => return open,
            MarkerMatch::Incomplete | MarkerMatch::NoMatch => pos = open + 1,
        }
    }
    bytes.len()
}

// ---------------------------------------------------------------------------
// Marker grammar
// ---------------------------------------------------------------------------

const TOOL_PHASES: &[&str] = &["START", "END"];
const THINKING_PHASES: &[&str] = &["START", "END", "CHUNK"];

fn match_marker_at(bytes: &[u8], open: usize) -> MarkerMatch {
    let mut cursor = Cursor::new(bytes, open + 1);

    let keyword = cursor.take_while(|b| b.is_ascii_uppercase());
    if cursor.at_end() {
        return viable_prefix(span_bytes(bytes, keyword), MARKER_KEYWORDS);
    }
    let Some(keyword) = MARKER_KEYWORDS
        .iter()
        .find(|k| k.as_bytes() == span_bytes(bytes, keyword))
    else {
        return MarkerMatch::NoMatch;
    };
    if let Err(outcome) = cursor.eat(b':') {
        return outcome;
    }

    match *keyword {
        "STATUS" => {
            let word = cursor.take_while(is_word_byte);
            if cursor.at_end() {
                return MarkerMatch::Incomplete;
            }
            if word.is_empty() {
                return MarkerMatch::NoMatch;
            }
            cursor.close(MarkerKind::Status, word)
        }
        "TOOL" => {
            let name = cursor.take_while(is_word_byte);
            if cursor.at_end() {
                return MarkerMatch::Incomplete;
            }
            if name.is_empty() {
                return MarkerMatch::NoMatch;
            }
            if let Err(outcome) = cursor.eat(b':') {
                return outcome;
            }
            let phase = cursor.take_while(|b| b.is_ascii_uppercase());
            if cursor.at_end() {
                return viable_prefix(span_bytes(bytes, phase), TOOL_PHASES);
            }
            let kind = match span_bytes(bytes, phase) {
                b"START" => MarkerKind::ToolStart,
                b"END" => MarkerKind::ToolEnd,
                _ => return MarkerMatch::NoMatch,
            };
            cursor.close(kind, name)
        }
        "THINKING" => {
            let phase = cursor.take_while(|b| b.is_ascii_uppercase());
            if cursor.at_end() {
                return viable_prefix(span_bytes(bytes, phase), THINKING_PHASES);
            }
            let kind = match span_bytes(bytes, phase) {
                b"START" => MarkerKind::ThinkingStart,
                b"END" => MarkerKind::ThinkingEnd,
                b"CHUNK" => MarkerKind::ThinkingChunk,
                _ => return MarkerMatch::NoMatch,
            };
            let empty = Span::new(cursor.pos, cursor.pos);
            cursor.close(kind, empty)
        }
        "PRODUCTS" => balanced_payload(bytes, cursor.pos, MarkerKind::Products, true),
        "REMEMBER" => balanced_payload(bytes, cursor.pos, MarkerKind::Remember, false),
        _ => MarkerMatch::NoMatch,
    }
}

fn viable_prefix(text: &[u8], candidates: &[&str]) -> MarkerMatch {
    if candidates.iter().any(|c| c.as_bytes().starts_with(text)) {
        MarkerMatch::Incomplete
    } else {
        MarkerMatch::NoMatch
    }
}

fn span_bytes(bytes: &[u8], span: Span) -> &[u8] {
    &bytes[span.start..span.end]
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')
}

/// Longest PRODUCTS / REMEMBER payload. Past this the opener is literal text,
/// so one unclosed marker cannot hold back the rest of a streaming turn.
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024;

/// Scan to the `]` that brings bracket depth back to zero, counting the
/// marker's own `[` as depth one. With `json_strings`, brackets inside
/// double-quoted strings are ignored.
///
/// The payload is not a marker when it outgrows `MAX_PAYLOAD_BYTES`, when
/// another marker opens inside it, or (without `json_strings`) when it
/// reaches a newline. Each byte is then scanned by at most one opener.
fn balanced_payload(bytes: &[u8], start: usize, kind: MarkerKind, json_strings: bool) -> MarkerMatch {
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if i - start > MAX_PAYLOAD_BYTES {
            return MarkerMatch::NoMatch;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if json_strings => in_string = true,
            b'\n' if !json_strings => return MarkerMatch::NoMatch,
            b'[' if opens_marker(bytes, i) => return MarkerMatch::NoMatch,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return MarkerMatch::Complete {
                        kind,
                        payload: Span::new(start, i),
                        end: i + 1,
                    };
                }
            }
            _ => {}
        }
    }

    MarkerMatch::Incomplete
}

/// True if the `[` at `open` is followed by a marker keyword and its colon.
fn opens_marker(bytes: &[u8], open: usize) -> bool {
    let rest = &bytes[open + 1..];
    MARKER_KEYWORDS.iter().any(|k| {
        rest.strip_prefix(k.as_bytes())
            .is_some_and(|after| after.first() == Some(&b':'))
    })
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> Span {
        let start = self.pos;
        while self.pos < self.bytes.len() && pred(self.bytes[self.pos]) {
            self.pos += 1;
        }
        Span::new(start, self.pos)
    }

    /// Consume `expected`, or report how the marker fails at this point.
    fn eat(&mut self, expected: u8) -> Result<(), MarkerMatch> {
        match self.bytes.get(self.pos) {
            None => Err(MarkerMatch::Incomplete),
            Some(&b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(MarkerMatch::NoMatch),
        }
    }

    fn close(mut self, kind: MarkerKind, payload: Span) -> MarkerMatch {
        match self.eat(b']') {
            Ok(()) => MarkerMatch::Complete {
                kind,
                payload,
                end: self.pos,
            },
            Err(outcome) => outcome,
        }
    }
}
