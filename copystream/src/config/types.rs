// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use super::defaults::{
    default_allowed_uri_schemes, default_classifier_config, DEFAULT_CACHE_CAPACITY,
    DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_BUFFER_BYTES, DEFAULT_REPARSE_INTERVAL_MS,
};
use super::loader::compute_hash;
use super::pattern::{CompiledPattern, LabelHead};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level parsed and validated copystream config.
#[derive(Debug, Clone)]
pub struct Config {
    /// Config version. Always "v1".
    pub version: String,
    pub stream: StreamConfig,
    pub cache: CacheConfig,
    pub classifier: ClassifierConfig,
    pub sanitizer: SanitizerConfig,
    /// SHA256 hash of the source YAML: "sha256:{hex}".
    pub config_hash: String,
}

/// Built-in defaults, identical to loading a file that only sets the version.
impl Default for Config {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            stream: StreamConfig::default(),
            cache: CacheConfig::default(),
            classifier: ClassifierConfig::default(),
            sanitizer: SanitizerConfig::default(),
            config_hash: compute_hash(""),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Buffer accumulation settings for a streaming turn.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Minimum time between preview re-parses. Zero re-parses on every chunk.
    pub reparse_interval: Duration,
    /// Upper bound on a single turn's raw buffer.
    pub max_buffer_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reparse_interval: Duration::from_millis(DEFAULT_REPARSE_INTERVAL_MS),
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
        }
    }
}

/// Parse result cache: count-bounded LRU with a TTL.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

/// Response classifier heuristics.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Line-start matcher for email section headers (`SUBJECT LINE:` ...).
    pub email_section: CompiledPattern,
    /// Line-start matcher for analysis headers that open a deliverable
    /// (`STRATEGY:` ...). Case-sensitive so prose like "Plan: ..." is not
    /// taken for analysis.
    pub thinking_section: CompiledPattern,
    /// The same labels matched case-insensitively. Used inside an email,
    /// where any analysis block is removed.
    pub thinking_block: CompiledPattern,
    /// Literal heads of the thinking labels, for holding back a header that
    /// is still arriving.
    pub thinking_heads: Vec<LabelHead>,
    pub clarification_wrappers: Vec<ClarificationWrapper>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        default_classifier_config()
    }
}

/// Opening/closing pair that wraps a clarifying question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClarificationWrapper {
    pub open: String,
    pub close: String,
}

/// Deliverable sanitizer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizerConfig {
    /// Lower-case URI schemes allowed in anchor `href`s.
    pub allowed_uri_schemes: Vec<String>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            allowed_uri_schemes: default_allowed_uri_schemes(),
        }
    }
}
