// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// copystream: replay a raw generation buffer through the streaming
// pipeline and print the finalized message as JSON.
//
// Usage:
//   copystream --input turn.txt
//   cat turn.txt | copystream --input - --previews --chunk-size 16

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use copystream::config::{self, Config, FileSource};
use copystream::engine::ContentEngine;
use copystream::stream::{PreviewEvent, PreviewProcessor, UpstreamAbort};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "copystream", about = "Demultiplex and sanitize an LLM generation stream")]
struct Cli {
    /// Path to the copystream config YAML (built-in defaults if omitted)
    #[arg(long, env = "COPYSTREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Raw generation buffer to replay, or '-' for stdin
    #[arg(long, default_value = "-")]
    input: String,

    /// Bytes per simulated upstream chunk
    #[arg(long, default_value_t = 64)]
    chunk_size: usize,

    /// Print each preview as a JSON line before the finalized message
    #[arg(long, default_value_t = false)]
    previews: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match config::load_config(&FileSource { path: path.clone() }) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::error!("failed to load config: {e}");
                std::process::exit(1);
            }
        },
        None => Arc::new(Config::default()),
    };

    tracing::info!(
        version = %config.version,
        reparse_interval_ms = config.stream.reparse_interval.as_millis() as u64,
        cache_enabled = config.cache.enabled,
        config_hash = %config.config_hash,
        "config loaded"
    );

    let raw = match read_input(&cli.input) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(input = %cli.input, "failed to read input: {e}");
            std::process::exit(1);
        }
    };

    let chunks: Vec<Result<Bytes, UpstreamAbort>> = raw
        .chunks(cli.chunk_size.max(1))
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    tracing::debug!(bytes = raw.len(), chunks = chunks.len(), "replaying input");

    let engine = Arc::new(ContentEngine::new(config));
    let processor = PreviewProcessor::new(engine);
    let events = processor.process(tokio_stream::iter(chunks));
    tokio::pin!(events);

    while let Some(event) = events.next().await {
        match &event {
            PreviewEvent::Preview(_) if !cli.previews => continue,
            PreviewEvent::Preview(_) => print_json(&event),
            PreviewEvent::Finished(message) => print_json(message),
        }
    }
}

fn read_input(input: &str) -> std::io::Result<Vec<u8>> {
    if input == "-" {
        let mut raw = Vec::new();
        std::io::stdin().read_to_end(&mut raw)?;
        Ok(raw)
    } else {
        std::fs::read(input)
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!("failed to serialize output: {e}"),
    }
}
