// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

use super::loader::compile_classifier;
use super::types::{ClarificationWrapper, ClassifierConfig};

/// The default section labels YAML, embedded at compile time.
const DEFAULT_SECTION_LABELS_YAML: &str = include_str!("../../defaults/section_labels.yaml");

pub const DEFAULT_REPARSE_INTERVAL_MS: u64 = 50;

/// 1 MB; a generation turn is tens of kilobytes at most.
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 1_048_576;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

pub const DEFAULT_ALLOWED_URI_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "cid"];

#[derive(serde::Deserialize)]
struct DefaultSectionLabelsYaml {
    email_section_labels: Vec<String>,
    thinking_section_labels: Vec<String>,
}

/// The embedded email and thinking section labels.
/// Panics on invalid YAML (this is our own file).
pub fn default_section_labels() -> (Vec<String>, Vec<String>) {
    let raw: DefaultSectionLabelsYaml = serde_yaml::from_str(DEFAULT_SECTION_LABELS_YAML)
        .expect("default section labels YAML is invalid");
    (raw.email_section_labels, raw.thinking_section_labels)
}

pub fn default_clarification_wrappers() -> Vec<ClarificationWrapper> {
    vec![ClarificationWrapper {
        open: "<clarification>".to_string(),
        close: "</clarification>".to_string(),
    }]
}

pub fn default_allowed_uri_schemes() -> Vec<String> {
    DEFAULT_ALLOWED_URI_SCHEMES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Classifier config built from the embedded labels.
/// Panics on invalid regex (these are our own patterns).
pub fn default_classifier_config() -> ClassifierConfig {
    let (email, thinking) = default_section_labels();
    compile_classifier(&email, &thinking, default_clarification_wrappers())
        .unwrap_or_else(|e| panic!("default section labels failed to compile: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_labels_compile() {
        let config = default_classifier_config();
        assert!(config.email_section.is_match("SUBJECT LINE: Hello"));
        assert!(config.thinking_section.is_match("STRATEGY: lead with value"));
    }

    #[test]
    fn email_headers_tolerate_markdown() {
        let config = default_classifier_config();
        for line in [
            "**SUBJECT LINE:** Spring is here",
            "**Subject Line**: Spring is here",
            "## HERO: Welcome",
            "  CTA: Shop now",
            "SUBJECT LINE (Option A): Hi",
            "Section 2: Details",
            "P.S.: one more thing",
        ] {
            assert!(config.email_section.is_match(line), "line {line:?}");
        }
    }

    #[test]
    fn email_headers_require_colon_at_line_start() {
        let config = default_classifier_config();
        for line in [
            "The subject line: is important",
            "SUBJECT LINE Hello",
            "HEROIC: tales",
            "Let's talk about the CTA: later",
        ] {
            assert!(!config.email_section.is_match(line), "line {line:?}");
        }
    }

    #[test]
    fn thinking_headers_are_case_sensitive() {
        let config = default_classifier_config();
        assert!(config.thinking_section.is_match("**ANALYSIS:** audience is young"));
        assert!(!config.thinking_section.is_match("Analysis: audience is young"));
        assert!(config.thinking_block.is_match("Analysis: audience is young"));
        assert!(config.thinking_block.is_match("**Strategy:** target lapsed buyers"));
    }

    #[test]
    fn thinking_heads_admit_partial_headers() {
        let config = default_classifier_config();
        let admits = |partial: &str| config.thinking_heads.iter().any(|h| h.admits(partial));
        assert!(admits("STRAT"));
        assert!(admits("STRATEGY"));
        assert!(admits("THOUGHT PRO"));
        assert!(admits("STRATEGY (V2"));
        assert!(!admits("STRATEGIC"));
        assert!(!admits("PLANNING A TRIP"));
        assert!(!admits("HELLO"));
    }
}
