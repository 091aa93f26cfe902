// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Content engine
//
// Wires the parse pipeline together for one buffer:
// - Tokenize markers (streaming or complete scan)
// - Demultiplex into channels (through the parse cache when configured)
// - Classify the deliverable, honouring the turn's classification lock
// - Finalize: sanitize the winning channel and build metadata

use std::sync::Arc;

use serde::Serialize;

use crate::cache::{ParseCache, ParseKey};
use crate::classify::{ClassificationLock, ResponseClassifier};
use crate::config::Config;
use crate::demux::{demultiplex, Demultiplexed, Provisional, ToolEvent};
use crate::marker::{tokenize, ScanMode};
use crate::metadata::{build_metadata, MessageMetadata, ProductLink, ResponseType};
use crate::sanitize::{DeliverableSanitizer, Sanitizer};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Live view of a turn's channels after one parse pass.
///
/// Only resolved text is included: a marker cut off at the end of a
/// streaming buffer is held back until it resolves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedChannels {
    pub email_copy: Option<String>,
    pub clarification: Option<String>,
    /// The trimmed deliverable, whatever its type.
    pub other: String,
    pub thinking: String,
    pub response_type: ResponseType,
    pub product_links: Vec<ProductLink>,
    pub status: Vec<String>,
    pub tools: Vec<ToolEvent>,
    pub memories: Vec<String>,
    /// Which channel the held-back tail belongs to, and its size.
    #[serde(skip)]
    pub provisional: Option<Provisional>,
}

impl ParsedChannels {
    /// The caller-visible deliverable: the channel of `response_type`,
    /// falling back through email copy, clarification and the raw text when
    /// that channel is empty.
    pub fn deliverable(&self) -> &str {
        let preferred = match self.response_type {
            ResponseType::EmailCopy => self.email_copy.as_deref(),
            ResponseType::Clarification => self.clarification.as_deref(),
            ResponseType::Other => Some(self.other.as_str()),
        };
        [
            preferred,
            self.email_copy.as_deref(),
            self.clarification.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|text| !text.is_empty())
        .unwrap_or(self.other.as_str())
    }
}

/// Result of finalizing a turn: the only content that is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedMessage {
    pub sanitized_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    /// Nothing survived sanitization; the caller should use its own fallback.
    pub missing_deliverable: bool,
    /// The stream ended early and this is the last parsed snapshot.
    pub aborted: bool,
}

// ---------------------------------------------------------------------------
// Engine dependencies
// ---------------------------------------------------------------------------

pub struct EngineDeps {
    pub config: Arc<Config>,
    pub sanitizer: Arc<dyn Sanitizer>,
    pub cache: Option<Arc<ParseCache>>,
}

impl EngineDeps {
    /// Default collaborators built from `config`.
    pub fn from_config(config: Arc<Config>) -> Self {
        let sanitizer: Arc<dyn Sanitizer> = Arc::new(DeliverableSanitizer::new(&config.sanitizer));
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(ParseCache::from_config(&config.cache)));
        Self {
            config,
            sanitizer,
            cache,
        }
    }
}

// ---------------------------------------------------------------------------
// ContentEngine
// ---------------------------------------------------------------------------

pub struct ContentEngine {
    deps: EngineDeps,
    classifier: ResponseClassifier,
}

impl ContentEngine {
    pub fn new(config: Arc<Config>) -> Self {
        Self::new_with(EngineDeps::from_config(config))
    }

    pub fn new_with(deps: EngineDeps) -> Self {
        let classifier = ResponseClassifier::from_config(&deps.config.classifier);
        Self { deps, classifier }
    }

    pub fn config(&self) -> &Config {
        &self.deps.config
    }

    pub fn classifier(&self) -> &ResponseClassifier {
        &self.classifier
    }

    /// Tokenize and demultiplex `buffer`, using the parse cache if present.
    pub fn demultiplex(&self, buffer: &str, mode: ScanMode) -> Demultiplexed {
        let Some(cache) = &self.deps.cache else {
            return demultiplex(buffer, &tokenize(buffer, mode));
        };

        let key = ParseKey::new(buffer, mode);
        if let Some(hit) = cache.get(&key) {
            tracing::debug!(bytes = buffer.len(), mode = ?mode, "parse cache hit");
            return hit;
        }
        let channels = demultiplex(buffer, &tokenize(buffer, mode));
        cache.insert(key, channels.clone());
        channels
    }

    /// Parse a buffer with no classification lock.
    pub fn parse(&self, buffer: &str, mode: ScanMode) -> ParsedChannels {
        self.parse_locked(buffer, mode, &mut ClassificationLock::new())
    }

    /// Parse a buffer, recording and honouring the turn's classification lock.
    pub fn parse_locked(
        &self,
        buffer: &str,
        mode: ScanMode,
        lock: &mut ClassificationLock,
    ) -> ParsedChannels {
        let channels = self.demultiplex(buffer, mode);
        let deliverable = channels.resolved_deliverable();
        let classified = match mode {
            ScanMode::Streaming => self.classifier.streaming_view(deliverable),
            ScanMode::Complete => deliverable,
        };

        let mut classification = self.classifier.classify(classified);
        let effective = lock.observe(classification.response_type);
        if effective != classification.response_type {
            classification = self.classifier.classify_as(classified, effective);
        }

        ParsedChannels {
            email_copy: classification.email_copy,
            clarification: classification.clarification,
            other: deliverable.trim().to_string(),
            thinking: channels.resolved_thinking().trim().to_string(),
            response_type: classification.response_type,
            status: channels.status.iter().map(|s| s.status.clone()).collect(),
            product_links: channels.products,
            tools: channels.tools,
            memories: channels.memories,
            provisional: channels.provisional,
        }
    }

    /// Finalize a completed turn.
    pub fn finalize(&self, buffer: &str, lock: &mut ClassificationLock) -> FinalizedMessage {
        self.finalize_with(buffer, lock, false)
    }

    /// Finalize the last parsed snapshot of a turn whose stream was cut off.
    pub fn finalize_aborted(&self, buffer: &str, lock: &mut ClassificationLock) -> FinalizedMessage {
        self.finalize_with(buffer, lock, true)
    }

    fn finalize_with(
        &self,
        buffer: &str,
        lock: &mut ClassificationLock,
        aborted: bool,
    ) -> FinalizedMessage {
        let parsed = self.parse_locked(buffer, ScanMode::Complete, lock);
        let sanitizer = &self.deps.sanitizer;

        let sanitized_content = sanitizer.sanitize(parsed.deliverable());
        let clarification = parsed
            .clarification
            .as_deref()
            .map(|question| sanitizer.sanitize(question));
        let metadata = build_metadata(
            parsed.response_type,
            &parsed.product_links,
            clarification.as_deref(),
        );
        let missing_deliverable = sanitized_content.is_empty();

        tracing::info!(
            response_type = %parsed.response_type,
            buffer_bytes = buffer.len(),
            content_bytes = sanitized_content.len(),
            thinking_bytes = parsed.thinking.len(),
            product_count = parsed.product_links.len(),
            missing_deliverable,
            aborted,
            "turn finalized"
        );

        FinalizedMessage {
            sanitized_content,
            metadata,
            missing_deliverable,
            aborted,
        }
    }
}

#[cfg(test)]
mod tests;
