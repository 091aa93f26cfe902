// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Engine tests

use super::*;
use crate::config::{load_config, StringSource};
use crate::sanitize::contains_marker_syntax;
use serde_json::json;

const EXAMPLE: &str = "[STATUS:thinking][THINKING:START]Let's consider tone.[THINKING:END]SUBJECT LINE: Hello\nHERO: Welcome!";

fn engine() -> ContentEngine {
    ContentEngine::new(Arc::new(Config::default()))
}

/// Returns its input unchanged, to observe what the engine hands over.
struct PassThrough;

impl Sanitizer for PassThrough {
    fn sanitize(&self, input: &str) -> String {
        input.to_string()
    }
}

// ---------------------------------------------------------------
// 1. Parse
// ---------------------------------------------------------------

#[test]
fn example_buffer_parses_into_channels() {
    let parsed = engine().parse(EXAMPLE, ScanMode::Complete);
    assert_eq!(parsed.status, vec!["thinking".to_string()]);
    assert_eq!(parsed.thinking, "Let's consider tone.");
    assert_eq!(
        parsed.email_copy.as_deref(),
        Some("SUBJECT LINE: Hello\nHERO: Welcome!")
    );
    assert_eq!(parsed.response_type, ResponseType::EmailCopy);
    assert!(parsed.product_links.is_empty());
    assert_eq!(parsed.deliverable(), "SUBJECT LINE: Hello\nHERO: Welcome!");
}

#[test]
fn parsed_channels_serialize_camel_case() {
    let parsed = engine().parse(EXAMPLE, ScanMode::Complete);
    let value = serde_json::to_value(&parsed).unwrap();
    assert_eq!(value["responseType"], json!("email_copy"));
    assert_eq!(value["emailCopy"], json!("SUBJECT LINE: Hello\nHERO: Welcome!"));
    assert_eq!(value["productLinks"], json!([]));
    assert_eq!(value["status"], json!(["thinking"]));
    assert!(value.get("provisional").is_none());
}

#[test]
fn streaming_parse_holds_back_cut_off_marker() {
    let parsed = engine().parse("Hi there [STATUS:wri", ScanMode::Streaming);
    assert_eq!(parsed.other, "Hi there");
    assert!(parsed.provisional.is_some());
    assert!(parsed.status.is_empty());
}

#[test]
fn unclosed_remember_does_not_freeze_preview() {
    let parsed = engine().parse(
        "Hi [REMEMBER:user prefers short copy\nSUBJECT LINE: Save 20%\nHERO: Welcome back",
        ScanMode::Streaming,
    );
    assert!(parsed.provisional.is_none());
    assert!(parsed.other.ends_with("HERO: Welcome back"));
}

#[test]
fn streaming_email_preview_holds_back_partial_analysis_header() {
    let engine = engine();
    let mut lock = ClassificationLock::new();
    let buffer = "SUBJECT: Hi\nSTRATEGY: go big\nHERO: Welcome";
    let mut previous = String::new();
    for end in 1..=buffer.len() {
        let parsed = engine.parse_locked(&buffer[..end], ScanMode::Streaming, &mut lock);
        let email = parsed.email_copy.unwrap_or_default();
        assert!(email.starts_with(&previous), "at byte {end}: {email:?}");
        previous = email;
    }
    assert_eq!(previous, "SUBJECT: Hi\nHERO: Welcome");
}

#[test]
fn clarification_turn() {
    let parsed = engine().parse(
        "[THINKING:CHUNK]Need the audience.<clarification>Who is this for?</clarification>",
        ScanMode::Complete,
    );
    // The chunk payload runs to the end: there is no later marker.
    assert_eq!(parsed.response_type, ResponseType::Other);

    let parsed = engine().parse(
        "[THINKING:START]Need the audience.[THINKING:END]<clarification>Who is this for?</clarification>",
        ScanMode::Complete,
    );
    assert_eq!(parsed.response_type, ResponseType::Clarification);
    assert_eq!(parsed.deliverable(), "Who is this for?");
}

#[test]
fn deliverable_falls_back_to_raw_text() {
    let parsed = engine().parse("Happy to help with that.", ScanMode::Complete);
    assert_eq!(parsed.response_type, ResponseType::Other);
    assert_eq!(parsed.deliverable(), "Happy to help with that.");
}

// ---------------------------------------------------------------
// 2. Lock
// ---------------------------------------------------------------

#[test]
fn locked_type_survives_later_parses() {
    let engine = engine();
    let mut lock = ClassificationLock::new();

    let first = engine.parse_locked("SUBJECT: Hi", ScanMode::Streaming, &mut lock);
    assert_eq!(first.response_type, ResponseType::EmailCopy);

    // Same turn, a later buffer that no longer looks like an email.
    let later = engine.parse_locked("Sure thing, here you go", ScanMode::Streaming, &mut lock);
    assert_eq!(later.response_type, ResponseType::EmailCopy);
    assert_eq!(later.email_copy.as_deref(), Some("Sure thing, here you go"));
}

// ---------------------------------------------------------------
// 3. Finalize
// ---------------------------------------------------------------

#[test]
fn finalize_example() {
    let message = engine().finalize(EXAMPLE, &mut ClassificationLock::new());
    assert_eq!(message.sanitized_content, "SUBJECT LINE: Hello\nHERO: Welcome!");
    assert_eq!(
        message.metadata,
        Some(MessageMetadata {
            response_type: ResponseType::EmailCopy,
            product_links: None,
            clarification: None,
        })
    );
    assert!(!message.missing_deliverable);
    assert!(!message.aborted);
}

#[test]
fn finalize_serializes_camel_case() {
    let message = engine().finalize("Just text", &mut ClassificationLock::new());
    let value = serde_json::to_value(&message).unwrap();
    assert_eq!(
        value,
        json!({
            "sanitizedContent": "Just text",
            "missingDeliverable": false,
            "aborted": false
        })
    );
}

#[test]
fn finalize_with_products_and_clarification() {
    let buffer = "<clarification>Which of these?[PRODUCTS:[{\"name\":\"Tee\",\"url\":\"https://s.example/tee\"}]]</clarification>";
    let message = engine().finalize(buffer, &mut ClassificationLock::new());
    assert_eq!(message.sanitized_content, "Which of these?");
    let metadata = message.metadata.unwrap();
    assert_eq!(metadata.response_type, ResponseType::Clarification);
    assert_eq!(metadata.clarification.as_deref(), Some("Which of these?"));
    assert_eq!(metadata.product_links.unwrap()[0].name, "Tee");
}

#[test]
fn finalize_with_only_thinking_is_missing_deliverable() {
    let message = engine().finalize(
        "[THINKING:START]still planning the email",
        &mut ClassificationLock::new(),
    );
    assert!(message.missing_deliverable);
    assert_eq!(message.sanitized_content, "");
    assert!(message.metadata.is_none());
}

#[test]
fn finalize_degrades_cut_off_marker_and_strips_it() {
    let message = engine().finalize("Hello there [THINKING:STA", &mut ClassificationLock::new());
    assert_eq!(message.sanitized_content, "Hello there");
    assert!(!contains_marker_syntax(&message.sanitized_content));
}

#[test]
fn finalize_aborted_marks_message() {
    let message = engine().finalize_aborted("SUBJECT: Hi\nBODY: Half a sent", &mut ClassificationLock::new());
    assert!(message.aborted);
    assert_eq!(message.sanitized_content, "SUBJECT: Hi\nBODY: Half a sent");
}

#[test]
fn finalize_drops_analysis_block_directly_above_email() {
    let message = engine().finalize(
        "STRATEGY: Lead with the sale.\nSUBJECT LINE: Save 20%\nHERO: Welcome back",
        &mut ClassificationLock::new(),
    );
    assert_eq!(message.sanitized_content, "SUBJECT LINE: Save 20%\nHERO: Welcome back");
    assert_eq!(message.metadata.unwrap().response_type, ResponseType::EmailCopy);
}

#[test]
fn finalize_drops_mixed_case_analysis_inside_email() {
    let message = engine().finalize(
        "SUBJECT LINE: Save 20%\n**Strategy:** target lapsed buyers with urgency\nHERO: Welcome back",
        &mut ClassificationLock::new(),
    );
    assert_eq!(message.sanitized_content, "SUBJECT LINE: Save 20%\nHERO: Welcome back");
}

#[test]
fn injected_sanitizer_receives_winning_channel() {
    let engine = ContentEngine::new_with(EngineDeps {
        config: Arc::new(Config::default()),
        sanitizer: Arc::new(PassThrough),
        cache: None,
    });
    let message = engine.finalize("Intro:\nSUBJECT: <b>Hi</b>", &mut ClassificationLock::new());
    assert_eq!(message.sanitized_content, "SUBJECT: <b>Hi</b>");
}

// ---------------------------------------------------------------
// 4. Cache and config
// ---------------------------------------------------------------

#[test]
fn repeated_parse_uses_cache() {
    let cache = Arc::new(ParseCache::new(8, std::time::Duration::from_secs(60)));
    let engine = ContentEngine::new_with(EngineDeps {
        config: Arc::new(Config::default()),
        sanitizer: Arc::new(DeliverableSanitizer::default()),
        cache: Some(cache.clone()),
    });

    let first = engine.parse(EXAMPLE, ScanMode::Streaming);
    assert_eq!(cache.len(), 1);
    let second = engine.parse(EXAMPLE, ScanMode::Streaming);
    assert_eq!(cache.len(), 1);
    assert_eq!(first, second);

    engine.parse(EXAMPLE, ScanMode::Complete);
    assert_eq!(cache.len(), 2);
}

#[test]
fn disabled_cache_is_not_built() {
    let config = load_config(&StringSource {
        content: "copystream: v1\ncache:\n  enabled: false\n".to_string(),
    })
    .unwrap();
    let deps = EngineDeps::from_config(Arc::new(config));
    assert!(deps.cache.is_none());
}

#[test]
fn configured_labels_drive_classification() {
    let config = load_config(&StringSource {
        content: "copystream: v1\nclassifier:\n  email_section_labels: ['OFFER']\n".to_string(),
    })
    .unwrap();
    let engine = ContentEngine::new(Arc::new(config));
    let parsed = engine.parse("OFFER: 20% off everything", ScanMode::Complete);
    assert_eq!(parsed.response_type, ResponseType::EmailCopy);
}
