// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

use crate::engine::{FinalizedMessage, ParsedChannels};

/// Error item of an upstream chunk stream: generation stopped before the
/// model finished.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream aborted: {0}")]
pub struct UpstreamAbort(pub String);

/// Output of the preview processor. Zero or more previews, then exactly one
/// `Finished`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PreviewEvent {
    Preview(ParsedChannels),
    Finished(FinalizedMessage),
}
