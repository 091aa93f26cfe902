// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Channel demultiplexer
//
// Walks the tokenizer's segments once, in order, and routes every free-text
// run to the active channel. Side-channel markers (STATUS, PRODUCTS,
// REMEMBER) are extracted in place and never switch the channel. The result
// is a pure function of the segments: no state survives between calls.

use serde::Serialize;

use crate::marker::{MarkerKind, MarkerToken, Segment};
use crate::metadata::{merge_product_links, parse_products, ProductLink};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Content channel a free-text run is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Deliverable,
    Thinking,
}

/// A `[STATUS:<word>]` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    pub status: String,
    /// Byte offset of the marker in the raw buffer.
    pub offset: usize,
}

/// A tool invocation bracketed by `[TOOL:x:START]` / `[TOOL:x:END]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolEvent {
    pub tool: String,
    pub start_offset: usize,
    /// `None` while the tool is still running.
    pub end_offset: Option<usize>,
}

/// Trailing text whose marker status is not yet known, attributed to the
/// channel that was open when the buffer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provisional {
    pub channel: Channel,
    /// Bytes at the end of that channel's buffer that are provisional.
    pub len: usize,
}

/// Everything the demultiplexer extracted from one buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Demultiplexed {
    pub thinking: String,
    pub deliverable: String,
    pub status: Vec<StatusEvent>,
    pub tools: Vec<ToolEvent>,
    pub products: Vec<ProductLink>,
    pub memories: Vec<String>,
    pub provisional: Option<Provisional>,
}

impl Demultiplexed {
    /// Thinking text with any provisional tail removed.
    pub fn resolved_thinking(&self) -> &str {
        self.resolved(Channel::Thinking, &self.thinking)
    }

    /// Deliverable text with any provisional tail removed.
    pub fn resolved_deliverable(&self) -> &str {
        self.resolved(Channel::Deliverable, &self.deliverable)
    }

    fn resolved<'a>(&self, channel: Channel, text: &'a str) -> &'a str {
        match self.provisional {
            Some(p) if p.channel == channel => &text[..text.len() - p.len],
            _ => text,
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Where the last piece of thinking text came from. Chunk deltas join
/// verbatim; a new region or tool narration starts on its own line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThinkingSource {
    Region,
    Chunk,
}

#[derive(Default)]
struct Router {
    out: Demultiplexed,
    in_thinking: bool,
    /// Index into `out.tools` of the tool currently running.
    open_tool: Option<usize>,
    /// Set right after a chunk payload, until the next marker.
    after_chunk: bool,
    /// A region or tool started and has not received text yet.
    pending_run: bool,
    last_source: Option<ThinkingSource>,
}

impl Router {
    fn active_channel(&self) -> Channel {
        if self.in_thinking || self.open_tool.is_some() || self.after_chunk {
            Channel::Thinking
        } else {
            Channel::Deliverable
        }
    }

    fn route_text(&mut self, text: &str) {
        match self.active_channel() {
            Channel::Deliverable => self.out.deliverable.push_str(text),
            Channel::Thinking => {
                if std::mem::take(&mut self.pending_run) {
                    self.separate_thinking();
                }
                self.out.thinking.push_str(text);
                self.last_source = Some(ThinkingSource::Region);
            }
        }
    }

    /// Route the cut-off tail without consuming a pending separator: if the
    /// tail turns out to be a marker, the separator must not have been
    /// emitted.
    fn route_provisional(&mut self, text: &str) {
        let channel = self.active_channel();
        match channel {
            Channel::Deliverable => self.out.deliverable.push_str(text),
            Channel::Thinking => self.out.thinking.push_str(text),
        }
        self.out.provisional = Some(Provisional {
            channel,
            len: text.len(),
        });
    }

    fn separate_thinking(&mut self) {
        if !self.out.thinking.is_empty() && !self.out.thinking.ends_with('\n') {
            self.out.thinking.push('\n');
        }
    }

    fn apply_marker(&mut self, token: &MarkerToken) {
        self.after_chunk = false;

        match token.kind {
            MarkerKind::Status => self.out.status.push(StatusEvent {
                status: token.payload.clone(),
                offset: token.span.start,
            }),
            MarkerKind::Products => {
                let incoming = parse_products(&token.payload);
                merge_product_links(&mut self.out.products, incoming);
            }
            MarkerKind::Remember => {
                let note = token.payload.trim();
                if !note.is_empty() {
                    self.out.memories.push(note.to_string());
                }
            }
            MarkerKind::ThinkingStart => {
                self.in_thinking = true;
                self.pending_run = true;
            }
            MarkerKind::ThinkingEnd => {
                if !self.in_thinking {
                    tracing::debug!(offset = token.span.start, "dropping unmatched THINKING:END");
                }
                self.in_thinking = false;
                self.pending_run = false;
            }
            MarkerKind::ThinkingChunk => {
                if !token.payload.is_empty() {
                    if self.last_source == Some(ThinkingSource::Region) {
                        self.separate_thinking();
                    }
                    self.out.thinking.push_str(&token.payload);
                    self.last_source = Some(ThinkingSource::Chunk);
                }
                self.after_chunk = true;
            }
            MarkerKind::ToolStart => {
                self.close_tool(token.span.start);
                self.out.tools.push(ToolEvent {
                    tool: token.payload.clone(),
                    start_offset: token.span.start,
                    end_offset: None,
                });
                self.open_tool = Some(self.out.tools.len() - 1);
                self.pending_run = true;
            }
            MarkerKind::ToolEnd => match self.open_tool {
                Some(index) => {
                    if self.out.tools[index].tool != token.payload {
                        tracing::debug!(
                            open = %self.out.tools[index].tool,
                            closing = %token.payload,
                            "TOOL:END name mismatch, closing open tool"
                        );
                    }
                    self.close_tool(token.span.end);
                    self.pending_run = self.in_thinking;
                }
                None => {
                    tracing::debug!(tool = %token.payload, "dropping unmatched TOOL:END");
                }
            },
        }
    }

    fn close_tool(&mut self, end_offset: usize) {
        if let Some(index) = self.open_tool.take() {
            self.out.tools[index].end_offset = Some(end_offset);
        }
    }
}

/// Route the segments of `buffer` into channels.
pub fn demultiplex(buffer: &str, segments: &[Segment]) -> Demultiplexed {
    let mut router = Router::default();

    for segment in segments {
        match segment {
            Segment::Text(span) => router.route_text(span.slice(buffer)),
            Segment::Marker(token) => router.apply_marker(token),
            Segment::Incomplete(span) => router.route_provisional(span.slice(buffer)),
        }
    }

    router.out
}
