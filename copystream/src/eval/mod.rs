// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Check harness: runs recorded generation buffers through the pipeline and
// verifies the properties the persisted output must always have.
//
// Per case:
// - expected response type and content assertions
// - marker-free output
// - no thinking text in the output
// - classification lock and monotonic previews over every prefix
// - identical final output for every two-chunk split of the buffer

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::classify::ClassificationLock;
use crate::config::Config;
use crate::engine::{ContentEngine, EngineDeps, FinalizedMessage};
use crate::marker::ScanMode;
use crate::metadata::ResponseType;
use crate::sanitize::{contains_marker_syntax, DeliverableSanitizer};
use crate::turn::TurnAccumulator;

/// Thinking lines shorter than this are not checked for leakage: short
/// phrases ("Hi there") legitimately appear in both channels.
const MIN_LEAK_CHECK_CHARS: usize = 16;

// ---------------------------------------------------------------------------
// Dataset types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CheckCase {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub buffer: String,
    pub expected_type: ResponseType,
    #[serde(default)]
    pub must_contain: Vec<String>,
    #[serde(default)]
    pub must_not_contain: Vec<String>,
}

// ---------------------------------------------------------------------------
// Results and report
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub case_id: String,
    pub expected_type: ResponseType,
    pub actual_type: ResponseType,
    pub passed: bool,
    pub failures: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub results: Vec<CheckResult>,
    pub total_cases: usize,
    pub total_passed: usize,
}

impl CheckReport {
    pub fn all_passed(&self) -> bool {
        self.total_passed == self.total_cases
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load cases from a YAML file, or from every `.yaml`/`.yml` file in a
/// directory. Cases are sorted by id.
pub fn load_cases(path: &Path) -> Result<Vec<CheckCase>, String> {
    let mut files = Vec::new();
    if path.is_dir() {
        let entries = std::fs::read_dir(path)
            .map_err(|e| format!("failed to read case directory {}: {e}", path.display()))?;
        for entry in entries {
            let entry = entry.map_err(|e| format!("failed to read directory entry: {e}"))?;
            let file = entry.path();
            let ext = file.extension().and_then(|e| e.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                files.push(file);
            }
        }
    } else {
        files.push(path.to_path_buf());
    }

    let mut cases = Vec::new();
    for file in files {
        let content = std::fs::read_to_string(&file)
            .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
        let file_cases: Vec<CheckCase> = serde_yaml::from_str(&content)
            .map_err(|e| format!("failed to parse {}: {e}", file.display()))?;
        cases.extend(file_cases);
    }

    cases.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(cases)
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

/// Engine for checks: no parse cache, since every prefix of every case is
/// parsed once and would only churn it.
pub fn build_check_engine(config: Arc<Config>) -> ContentEngine {
    let sanitizer = Arc::new(DeliverableSanitizer::new(&config.sanitizer));
    ContentEngine::new_with(EngineDeps {
        config,
        sanitizer,
        cache: None,
    })
}

pub fn run_checks(engine: &Arc<ContentEngine>, cases: &[CheckCase]) -> CheckReport {
    let results: Vec<CheckResult> = cases.iter().map(|case| run_case(engine, case)).collect();
    let total_passed = results.iter().filter(|r| r.passed).count();
    CheckReport {
        total_cases: results.len(),
        total_passed,
        results,
    }
}

pub fn run_case(engine: &Arc<ContentEngine>, case: &CheckCase) -> CheckResult {
    let mut failures = Vec::new();

    let message = engine.finalize(&case.buffer, &mut ClassificationLock::new());
    let actual_type = response_type_of(&message);
    let content = &message.sanitized_content;

    if actual_type != case.expected_type {
        failures.push(format!(
            "expected type {}, got {}",
            case.expected_type, actual_type
        ));
    }
    for needle in &case.must_contain {
        if !content.contains(needle.as_str()) {
            failures.push(format!("output is missing {needle:?}"));
        }
    }
    for needle in &case.must_not_contain {
        if content.contains(needle.as_str()) {
            failures.push(format!("output contains {needle:?}"));
        }
    }
    if contains_marker_syntax(content) {
        failures.push("output contains marker syntax".to_string());
    }

    check_no_leakage(engine, case, &message, &mut failures);
    check_prefixes(engine, case, actual_type, &mut failures);
    check_splits(engine, case, &message, &mut failures);

    let passed = failures.is_empty();
    tracing::debug!(case_id = %case.id, passed, failures = failures.len(), "check case done");

    CheckResult {
        case_id: case.id.clone(),
        expected_type: case.expected_type,
        actual_type,
        passed,
        failures,
    }
}

fn response_type_of(message: &FinalizedMessage) -> ResponseType {
    message
        .metadata
        .as_ref()
        .map_or(ResponseType::Other, |m| m.response_type)
}

/// Thinking text must not reach the output; an email must not carry an
/// analysis header.
fn check_no_leakage(
    engine: &ContentEngine,
    case: &CheckCase,
    message: &FinalizedMessage,
    failures: &mut Vec<String>,
) {
    let parsed = engine.parse(&case.buffer, ScanMode::Complete);
    let content = &message.sanitized_content;

    for line in parsed.thinking.lines().map(str::trim) {
        if line.chars().count() >= MIN_LEAK_CHECK_CHARS && content.contains(line) {
            failures.push(format!("thinking text leaked into output: {line:?}"));
        }
    }

    if response_type_of(message) == ResponseType::EmailCopy {
        for line in content.lines() {
            if engine.classifier().starts_thinking_block(line) {
                failures.push(format!("email copy contains analysis header: {line:?}"));
            }
        }
    }
}

/// Parse every prefix as a growing stream would: once a type is locked it
/// must hold to the end, and resolved text must only ever grow.
fn check_prefixes(
    engine: &ContentEngine,
    case: &CheckCase,
    final_type: ResponseType,
    failures: &mut Vec<String>,
) {
    let buffer = &case.buffer;
    let mut lock = ClassificationLock::new();
    let mut previous: Option<(String, String)> = None;

    for end in (1..=buffer.len()).filter(|&i| buffer.is_char_boundary(i)) {
        let parsed = engine.parse_locked(&buffer[..end], ScanMode::Streaming, &mut lock);

        if let Some((thinking, other)) = &previous {
            if !parsed.thinking.starts_with(thinking.as_str()) {
                failures.push(format!("thinking regressed at byte {end}"));
                return;
            }
            if !parsed.other.starts_with(other.as_str()) {
                failures.push(format!("deliverable regressed at byte {end}"));
                return;
            }
        }
        previous = Some((parsed.thinking, parsed.other));
    }

    if let Some(locked) = lock.locked() {
        if locked != final_type {
            failures.push(format!(
                "streaming locked {locked} but the finished turn is {final_type}"
            ));
        }
    }
}

/// Feeding the buffer in two chunks, split anywhere, must finalize to the
/// same message.
fn check_splits(
    engine: &Arc<ContentEngine>,
    case: &CheckCase,
    expected: &FinalizedMessage,
    failures: &mut Vec<String>,
) {
    let buffer = &case.buffer;
    for split in (1..buffer.len()).filter(|&i| buffer.is_char_boundary(i)) {
        let mut turn = TurnAccumulator::new(engine.clone());
        let finished = turn
            .append(&buffer[..split])
            .and_then(|_| turn.append(&buffer[split..]))
            .and_then(|_| turn.finish());
        match finished {
            Ok(message) if &message == expected => {}
            Ok(_) => {
                failures.push(format!("split at byte {split} changes the output"));
                return;
            }
            Err(e) => {
                failures.push(format!("split at byte {split} failed: {e}"));
                return;
            }
        }
    }
}
