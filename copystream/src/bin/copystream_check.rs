// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// copystream-check: run recorded generation buffers through the pipeline
// and verify classification, sanitization and streaming invariants.
//
// Usage:
//   cargo run --bin copystream-check -- --cases checks/
//   cargo run --bin copystream-check -- --config copystream.yaml --cases checks/ --json

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use copystream::config::{self, Config, FileSource};
use copystream::eval;

#[derive(Parser)]
#[command(name = "copystream-check", about = "Copystream check harness")]
struct Cli {
    /// Path to the copystream config YAML (built-in defaults if omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Case file or directory of case files
    #[arg(long)]
    cases: PathBuf,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match config::load_config(&FileSource { path: path.clone() }) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                eprintln!("failed to load config {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => Arc::new(Config::default()),
    };

    let cases = match eval::load_cases(&cli.cases) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load cases: {e}");
            std::process::exit(1);
        }
    };

    if cases.is_empty() {
        eprintln!("no check cases found");
        std::process::exit(1);
    }

    eprintln!("running {} check cases...", cases.len());

    let engine = Arc::new(eval::build_check_engine(config));
    let report = eval::run_checks(&engine, &cases);

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("failed to serialize report: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!();
        println!("Copystream Check Report");
        println!("=======================");
        println!();

        for result in &report.results {
            let verdict = if result.passed { "ok  " } else { "FAIL" };
            println!("  {verdict} {} ({})", result.case_id, result.actual_type);
            for failure in &result.failures {
                println!("         {failure}");
            }
        }
        println!();

        if report.all_passed() {
            println!("All {} cases passed.", report.total_cases);
        } else {
            println!(
                "{}/{} cases passed.",
                report.total_passed, report.total_cases
            );
        }
        println!();
    }

    if !report.all_passed() {
        std::process::exit(1);
    }
}
