// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Streaming preview adapter
//
// Responsibilities:
// - Decode an upstream byte stream into text, carrying split UTF-8 sequences
// - Accumulate the turn and emit throttled live previews
// - Finalize once on stream end
// - On an upstream error, finalize the last parsed snapshot as aborted

mod decoder;
mod processor;
mod types;

pub use decoder::Utf8Carry;
pub use processor::PreviewProcessor;
pub use types::{PreviewEvent, UpstreamAbort};
