// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal)
// ---------------------------------------------------------------------------
// These are separate from the public Config structs because:
// 1. serde_yaml needs Deserialize, but our public types contain Regex (not Deserialize)
// 2. Labels are validated and compiled between raw and public
// 3. Keeps the public API clean

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub copystream: String,
    pub stream: Option<RawStreamConfig>,
    pub cache: Option<RawCacheConfig>,
    pub classifier: Option<RawClassifierConfig>,
    pub sanitizer: Option<RawSanitizerConfig>,
}

#[derive(Debug, Deserialize)]
pub struct RawStreamConfig {
    pub reparse_interval_ms: Option<u64>,
    pub max_buffer_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RawCacheConfig {
    pub enabled: Option<bool>,
    pub capacity: Option<usize>,
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RawClassifierConfig {
    pub use_default_labels: Option<bool>,
    #[serde(default)]
    pub email_section_labels: Vec<String>,
    #[serde(default)]
    pub thinking_section_labels: Vec<String>,
    pub clarification_wrappers: Option<Vec<RawClarificationWrapper>>,
}

#[derive(Debug, Deserialize)]
pub struct RawClarificationWrapper {
    pub open: String,
    pub close: String,
}

#[derive(Debug, Deserialize)]
pub struct RawSanitizerConfig {
    pub allowed_uri_schemes: Option<Vec<String>>,
}
