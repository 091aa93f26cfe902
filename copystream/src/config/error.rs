// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Errors from loading a copystream config.
///
/// Any of these stops startup: there is no partial config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("unsupported config version \"{0}\", expected \"v1\"")]
    UnsupportedVersion(String),

    #[error("{field} must be greater than 0")]
    ZeroLimit { field: &'static str },

    #[error("invalid URI scheme \"{0}\" in sanitizer.allowed_uri_schemes")]
    InvalidScheme(String),

    /// Section labels and clarification wrappers that cannot work as written.
    #[error("invalid classifier config: {0}")]
    Classifier(String),

    #[error("invalid section label \"{pattern}\": {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}
