// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads copystream.yaml, validates structure, compiles the classifier's
// section label patterns, and computes a deterministic config hash.

mod defaults;
mod error;
mod loader;
mod pattern;
mod raw;
mod source;
mod types;

pub use defaults::{default_section_labels, DEFAULT_ALLOWED_URI_SCHEMES};
pub use error::ConfigError;
pub use loader::{compute_hash, load_config};
pub use pattern::{CompiledPattern, LabelHead};
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{
    CacheConfig, ClarificationWrapper, ClassifierConfig, Config, SanitizerConfig, StreamConfig,
};
