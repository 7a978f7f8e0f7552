//! Command-line proof verifier.
//!
//! ```text
//! verify <path.mm> [--upto LABEL] [--theorem LABEL] [--jobs N] [--quiet|--verbose]
//! ```
//!
//! No configuration file, no required environment variables: every knob is a
//! CLI flag. `RUST_LOG` is honored by `tracing-subscriber` as an ambient
//! convention, not a requirement — without it the default filter below
//! applies.

use std::{env, fs};

use anyhow::Context;
use mm_verify::driver::{run, RunConfig};
use mm_verify::scope::parse;
use tracing::error;

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn parse_switch(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

/// The first argument that isn't itself a flag or a flag's value, so
/// `--upto <label> <path>` and `<path> --upto <label>` both work.
fn parse_path(args: &[String]) -> Option<&str> {
    let value_flags = ["--upto", "--theorem", "--jobs"];
    let mut skip_next = false;
    for a in &args[1..] {
        if skip_next {
            skip_next = false;
            continue;
        }
        if value_flags.contains(&a.as_str()) {
            skip_next = true;
            continue;
        }
        if a.starts_with("--") {
            continue;
        }
        return Some(a);
    }
    None
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let quiet = parse_switch(&args, "--quiet");
    let verbose = parse_switch(&args, "--verbose");
    let default_filter = if verbose { "debug" } else if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()))
        .with_target(false)
        .compact()
        .init();

    let path = parse_path(&args)
        .ok_or_else(|| anyhow::anyhow!("usage: verify <path.mm> [--upto LABEL] [--theorem LABEL] [--jobs N] [--quiet|--verbose]"))?;

    let source = fs::read_to_string(path).inspect_err(|e| error!(path, "failed to read input file: {e}"))
        .with_context(|| format!("reading {path}"))?;
    let db = parse(&source).inspect_err(|e| error!(path, "failed to parse input file: {e}"))
        .with_context(|| format!("parsing {path}"))?;

    let jobs: usize = parse_flag(&args, "--jobs").and_then(|s| s.parse().ok()).unwrap_or(1);
    let config = RunConfig {
        upto: parse_flag(&args, "--upto"),
        theorem: parse_flag(&args, "--theorem"),
        jobs,
        strict: parse_switch(&args, "--strict"),
    };

    let outcomes = run(&db, &config)?;

    let mut failures = 0usize;
    for outcome in &outcomes {
        let label = db.text(outcome.label);
        match &outcome.result {
            Ok(()) => {
                if !quiet {
                    println!("PASS {label}");
                }
            }
            Err(err) => {
                failures += 1;
                eprintln!("FAIL {label}: {err}");
            }
        }
    }

    println!("{} verified, {} failed, {} total", outcomes.len() - failures, failures, outcomes.len());

    if failures > 0 {
        anyhow::bail!("{failures} proof(s) failed verification");
    }
    Ok(())
}
