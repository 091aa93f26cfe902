// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use sha2::{Digest, Sha256};

use super::defaults::{default_clarification_wrappers, default_section_labels};
use super::error::ConfigError;
use super::pattern::{CompiledPattern, LabelHead};
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a copystream config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Compute SHA256 config hash
/// 3. Parse YAML into raw deserialization types
/// 4. Validate version and numeric bounds
/// 5. Compile section label patterns (defaults first, then user labels)
/// 6. Build typed Config struct
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let config_hash = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    // Validate version
    if raw.copystream != "v1" {
        return Err(ConfigError::UnsupportedVersion(raw.copystream));
    }

    let stream = build_stream_config(raw.stream)?;
    let cache = build_cache_config(raw.cache)?;
    let classifier = build_classifier_config(raw.classifier)?;
    let sanitizer = build_sanitizer_config(raw.sanitizer)?;

    Ok(Config {
        version: raw.copystream,
        stream,
        cache,
        classifier,
        sanitizer,
        config_hash,
    })
}

/// Compute SHA256 hash of the raw YAML content.
pub fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    let hash = hasher.finalize();
    format!("sha256:{:x}", hash)
}

fn build_stream_config(raw: Option<raw::RawStreamConfig>) -> Result<StreamConfig, ConfigError> {
    let defaults = StreamConfig::default();
    let Some(raw) = raw else {
        return Ok(defaults);
    };

    let max_buffer_bytes = raw.max_buffer_bytes.unwrap_or(defaults.max_buffer_bytes);
    if max_buffer_bytes == 0 {
        return Err(ConfigError::ZeroLimit {
            field: "stream.max_buffer_bytes",
        });
    }

    Ok(StreamConfig {
        reparse_interval: raw
            .reparse_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.reparse_interval),
        max_buffer_bytes,
    })
}

fn build_cache_config(raw: Option<raw::RawCacheConfig>) -> Result<CacheConfig, ConfigError> {
    let defaults = CacheConfig::default();
    let Some(raw) = raw else {
        return Ok(defaults);
    };

    let capacity = raw.capacity.unwrap_or(defaults.capacity);
    if capacity == 0 {
        return Err(ConfigError::ZeroLimit {
            field: "cache.capacity",
        });
    }

    Ok(CacheConfig {
        enabled: raw.enabled.unwrap_or(defaults.enabled),
        capacity,
        ttl: raw
            .ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.ttl),
    })
}

fn build_classifier_config(
    raw: Option<raw::RawClassifierConfig>,
) -> Result<ClassifierConfig, ConfigError> {
    let Some(raw) = raw else {
        return Ok(ClassifierConfig::default());
    };

    let (mut email_labels, mut thinking_labels) = if raw.use_default_labels != Some(false) {
        default_section_labels()
    } else {
        (Vec::new(), Vec::new())
    };
    email_labels.extend(raw.email_section_labels);
    thinking_labels.extend(raw.thinking_section_labels);

    let clarification_wrappers = match raw.clarification_wrappers {
        Some(wrappers) => wrappers
            .into_iter()
            .map(|w| {
                if w.open.trim().is_empty() {
                    return Err(ConfigError::Classifier(
                        "clarification wrapper \"open\" must not be empty".to_string(),
                    ));
                }
                Ok(ClarificationWrapper {
                    open: w.open,
                    close: w.close,
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => default_clarification_wrappers(),
    };

    compile_classifier(&email_labels, &thinking_labels, clarification_wrappers)
}

/// Compile the classifier matchers for a set of email and thinking labels.
pub(super) fn compile_classifier(
    email_labels: &[String],
    thinking_labels: &[String],
    clarification_wrappers: Vec<ClarificationWrapper>,
) -> Result<ClassifierConfig, ConfigError> {
    Ok(ClassifierConfig {
        email_section: CompiledPattern::section_header(email_labels, true)?,
        thinking_section: CompiledPattern::section_header(thinking_labels, false)?,
        thinking_block: CompiledPattern::section_header(thinking_labels, true)?,
        thinking_heads: thinking_labels
            .iter()
            .map(|label| LabelHead::from_fragment(label))
            .collect(),
        clarification_wrappers,
    })
}

fn build_sanitizer_config(
    raw: Option<raw::RawSanitizerConfig>,
) -> Result<SanitizerConfig, ConfigError> {
    let Some(schemes) = raw.and_then(|r| r.allowed_uri_schemes) else {
        return Ok(SanitizerConfig::default());
    };

    let allowed_uri_schemes = schemes
        .into_iter()
        .map(|scheme| {
            let scheme = scheme.trim().to_ascii_lowercase();
            if is_valid_scheme(&scheme) {
                Ok(scheme)
            } else {
                Err(ConfigError::InvalidScheme(scheme))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SanitizerConfig {
        allowed_uri_schemes,
    })
}

/// RFC 3986: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
