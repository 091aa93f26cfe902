// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Marker types
//
// Spans, tokens and segments produced by the marker tokenizer. Tokens are
// recomputed on every parse pass and never persisted.

/// Keywords that may follow `[` to open a marker.
pub const MARKER_KEYWORDS: &[&str] = &["STATUS", "TOOL", "THINKING", "PRODUCTS", "REMEMBER"];

// ---------------------------------------------------------------------------
// Scan mode
// ---------------------------------------------------------------------------

/// Whether more buffer may still arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanMode {
    /// The generation is still streaming. A marker cut off by the end of the
    /// buffer is reported as an incomplete segment.
    Streaming,
    /// The generation has finished. A marker that never completed degrades to
    /// literal text.
    Complete,
}

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// Byte range into the raw buffer. Both ends fall on UTF-8 boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Borrow the spanned text out of `buffer`.
    pub fn slice<'a>(&self, buffer: &'a str) -> &'a str {
        &buffer[self.start..self.end]
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// `[STATUS:<word>]`
    Status,
    /// `[TOOL:<word>:START]`
    ToolStart,
    /// `[TOOL:<word>:END]`
    ToolEnd,
    /// `[THINKING:START]`
    ThinkingStart,
    /// `[THINKING:END]`
    ThinkingEnd,
    /// `[THINKING:CHUNK]` followed by its payload text.
    ThinkingChunk,
    /// `[PRODUCTS:<payload>]`, payload balanced to the matching `]`.
    Products,
    /// `[REMEMBER:<payload>]`, payload balanced to the matching `]`.
    Remember,
}

impl MarkerKind {
    /// Side-channel markers never switch the active channel.
    pub fn is_zero_width(&self) -> bool {
        matches!(
            self,
            MarkerKind::Status | MarkerKind::Products | MarkerKind::Remember
        )
    }
}

/// A recognized marker.
///
/// `span` covers the whole marker. For `ThinkingChunk` it also covers the
/// payload text that follows the closing `]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerToken {
    pub kind: MarkerKind,
    /// Status word, tool name, chunk text or raw products/remember payload.
    /// Empty for `ThinkingStart` / `ThinkingEnd`.
    pub payload: String,
    pub span: Span,
}

/// One piece of the tokenized buffer. Segments are ordered, non-overlapping
/// and together cover the whole buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Free text routed to whichever channel is active.
    Text(Span),
    Marker(MarkerToken),
    /// A marker cut off by the end of a streaming buffer. Always last.
    Incomplete(Span),
}

impl Segment {
    pub fn span(&self) -> Span {
        match self {
            Segment::Text(span) | Segment::Incomplete(span) => *span,
            Segment::Marker(token) => token.span,
        }
    }
}
