// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

//! Re-parse latency benchmarks.
//!
//! Every preview re-parses the whole turn buffer, so parse cost on a buffer
//! of tens of kilobytes bounds how short the reparse interval can be.
//!
//! Measures:
//! - Marker tokenization
//! - Streaming parse (tokenize, demux, classify) without the cache
//! - Deliverable sanitization
//! - Finalization of a complete turn
//!
//! Run: cargo bench --bench parse_latency

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use copystream::classify::ClassificationLock;
use copystream::config::Config;
use copystream::engine::{ContentEngine, EngineDeps};
use copystream::marker::{tokenize, ScanMode};
use copystream::sanitize::{DeliverableSanitizer, Sanitizer};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const THINKING_PARAGRAPH: &str = "The audience is lapsed subscribers, so the copy should \
    acknowledge the gap without guilt and lead with what is new since they left. ";

const EMAIL_SECTION: &str = "BODY: Our spring collection just landed. <b>Linen</b>, \
    <i>cotton</i> and a few <a href=\"https://shop.example.com/new\">surprises</a>.\n";

/// A turn of roughly `target` bytes: status and thinking up front, then an
/// email with a products marker every few sections.
fn turn_buffer(target: usize) -> String {
    let mut buffer = String::from("[STATUS:thinking][THINKING:START]");
    while buffer.len() < target / 3 {
        buffer.push_str(THINKING_PARAGRAPH);
    }
    buffer.push_str("[THINKING:END][STATUS:writing]SUBJECT LINE: Welcome back\n");
    let mut section = 0;
    while buffer.len() < target {
        buffer.push_str(EMAIL_SECTION);
        section += 1;
        if section % 8 == 0 {
            buffer.push_str(
                "[PRODUCTS:[{\"name\":\"Linen Shirt\",\"url\":\"https://shop.example.com/linen\"}]]",
            );
        }
    }
    buffer
}

fn uncached_engine() -> ContentEngine {
    let config = Arc::new(Config::default());
    let sanitizer = Arc::new(DeliverableSanitizer::new(&config.sanitizer));
    ContentEngine::new_with(EngineDeps {
        config,
        sanitizer,
        cache: None,
    })
}

const SIZES: [usize; 4] = [1_024, 8_192, 32_768, 65_536];

// ---------------------------------------------------------------------------
// Benchmark: tokenize
// ---------------------------------------------------------------------------

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");

    for size in SIZES {
        let buffer = turn_buffer(size);
        group.bench_with_input(BenchmarkId::new("streaming", size), &buffer, |b, buf| {
            b.iter(|| tokenize(black_box(buf), ScanMode::Streaming));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: streaming parse
// ---------------------------------------------------------------------------

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let engine = uncached_engine();

    for size in SIZES {
        let buffer = turn_buffer(size);
        group.bench_with_input(BenchmarkId::new("streaming", size), &buffer, |b, buf| {
            b.iter(|| engine.parse(black_box(buf), ScanMode::Streaming));
        });
    }

    // Mid-marker hold-back at the end of the buffer
    let mut cut = turn_buffer(32_768);
    cut.push_str("[PRODUCTS:[{\"name\":\"Cut");
    group.bench_function("incomplete_tail_32k", |b| {
        b.iter(|| engine.parse(black_box(&cut), ScanMode::Streaming));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: sanitize
// ---------------------------------------------------------------------------

fn bench_sanitize(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize");
    let sanitizer = DeliverableSanitizer::default();

    for size in SIZES {
        let mut content = String::new();
        while content.len() < size {
            content.push_str(EMAIL_SECTION);
        }
        group.bench_with_input(BenchmarkId::new("email_html", size), &content, |b, text| {
            b.iter(|| sanitizer.sanitize(black_box(text)));
        });
    }

    let hostile = "<script>alert(1)</script><a href=\"jav&#x09;ascript:alert(1)\">x</a>\
        <!-- [STATUS:x] --><img src=x onerror=alert(1)>"
        .repeat(200);
    group.bench_function("hostile_markup", |b| {
        b.iter(|| sanitizer.sanitize(black_box(&hostile)));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: finalize
// ---------------------------------------------------------------------------

fn bench_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize");
    let engine = uncached_engine();

    for size in [8_192, 65_536] {
        let buffer = turn_buffer(size);
        group.bench_with_input(BenchmarkId::new("email_turn", size), &buffer, |b, buf| {
            b.iter(|| engine.finalize(black_box(buf), &mut ClassificationLock::new()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_parse,
    bench_sanitize,
    bench_finalize,
);
criterion_main!(benches);
