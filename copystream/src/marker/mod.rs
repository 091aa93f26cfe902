// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Marker tokenizer
//
// Responsibilities:
// - Find bracketed markers in the raw generation buffer
// - Report the free-text runs between them
// - Leave a marker cut off by a chunk boundary unresolved (streaming mode)
//   so the next parse can pick it up once more buffer has arrived
// - Degrade malformed markers to literal text, never fail

mod tokenizer;
mod types;

pub use tokenizer::{marker_tokens, tokenize, MAX_PAYLOAD_BYTES};
pub use types::{MarkerKind, MarkerToken, ScanMode, Segment, Span, MARKER_KEYWORDS};
