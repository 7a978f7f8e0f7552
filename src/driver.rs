//! Whole-database verification driver.
//!
//! Iterates a [`Database`]'s propositions in declaration order, verifies
//! each one's proof, and reports pass/fail per theorem. With `--jobs > 1`
//! the propositions are partitioned across worker threads that share
//! read-only access to the database; a shared cancellation flag lets the
//! first thread to hit a `--strict` failure stop the others early.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use crate::database::Database;
use crate::token::Symbol;
use crate::verify::{verify, verify_cancellable, VerifyError};

/// One theorem's verification outcome.
pub struct Outcome {
    pub label: Symbol,
    pub result: Result<(), VerifyError>,
}

/// Driver configuration, built from CLI flags in `src/bin/verify.rs`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Only verify propositions up to and including this label.
    pub upto: Option<String>,
    /// Only verify this single proposition.
    pub theorem: Option<String>,
    /// Worker thread count (1 = sequential, no pool spun up at all).
    pub jobs: usize,
    /// Stop the whole run at the first failure instead of accumulating all.
    pub strict: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig { upto: None, theorem: None, jobs: 1, strict: false }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no proposition is labeled {label:?}")]
    UnknownTheorem { label: String },
}

/// Selects the slice of propositions to verify per `config.upto`/`theorem`,
/// then verifies them (sequentially, or across `config.jobs` threads),
/// returning one [`Outcome`] per proposition in declaration order.
pub fn run(db: &Database, config: &RunConfig) -> Result<Vec<Outcome>, DriverError> {
    let all: Vec<(Symbol, bool)> = db.propositions().map(|(label, _)| (label, true)).collect();

    let selected: Vec<Symbol> = if let Some(theorem) = &config.theorem {
        let label = db.symbol(theorem).ok_or_else(|| DriverError::UnknownTheorem { label: theorem.clone() })?;
        vec![label]
    } else if let Some(upto) = &config.upto {
        let upto_label = db.symbol(upto).ok_or_else(|| DriverError::UnknownTheorem { label: upto.clone() })?;
        let mut out = Vec::new();
        for (label, _) in &all {
            out.push(*label);
            if *label == upto_label {
                break;
            }
        }
        out
    } else {
        all.into_iter().map(|(label, _)| label).collect()
    };

    if config.jobs <= 1 {
        Ok(run_sequential(db, &selected, config.strict))
    } else {
        Ok(run_parallel(db, &selected, config.jobs, config.strict))
    }
}

fn run_sequential(db: &Database, labels: &[Symbol], strict: bool) -> Vec<Outcome> {
    let mut outcomes = Vec::with_capacity(labels.len());
    for &label in labels {
        let result = verify(db, label).map(|_| ());
        if result.is_err() {
            warn!(label = db.text(label), "proof failed");
        } else {
            info!(label = db.text(label), "proof verified");
        }
        let failed = result.is_err();
        outcomes.push(Outcome { label, result });
        if strict && failed {
            break;
        }
    }
    outcomes
}

/// Verifies `labels` across a `jobs`-sized rayon thread pool, each worker
/// borrowing `db` directly (no cloning or reference counting needed since
/// the pool is scoped to this call and `db` outlives it). A shared
/// `AtomicBool` lets a `--strict` failure on one worker cancel the others,
/// checked both before a theorem starts and between its proof steps.
fn run_parallel(db: &Database, labels: &[Symbol], jobs: usize, strict: bool) -> Vec<Outcome> {
    let cancelled = AtomicBool::new(false);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .expect("a positive thread count always builds a pool");

    pool.install(|| {
        labels
            .par_iter()
            .map(|&label| {
                if cancelled.load(Ordering::Relaxed) {
                    return Outcome { label, result: Err(VerifyError::Cancelled) };
                }
                let result = verify_cancellable(db, label, &cancelled).map(|_| ());
                if result.is_err() {
                    warn!(label = db.text(label), "proof failed");
                    if strict {
                        cancelled.store(true, Ordering::Relaxed);
                    }
                } else {
                    info!(label = db.text(label), "proof verified");
                }
                Outcome { label, result }
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::parse;

    const TINY_DB: &str = r#"
        $c wff |- -> $.
        $v ph ps $.
        wph $f wff ph $.
        wps $f wff ps $.
        wi $a wff -> ph ps $.
        ${
            min $e |- ph $.
            maj $e |- -> ph ps $.
            ax-mp $a |- ps $.
        $}
        ${
            mp2.1 $e |- ph $.
            mp2.2 $e |- -> ph ps $.
            mp2 $p |- ps $= wph wps mp2.1 mp2.2 ax-mp $.
        $}
        bad $p |- ph $= wps $.
    "#;

    #[test]
    fn run_reports_one_outcome_per_proposition() {
        let db = parse(TINY_DB).unwrap();
        let outcomes = run(&db, &RunConfig::default()).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
    }

    #[test]
    fn theorem_filter_selects_a_single_proposition() {
        let db = parse(TINY_DB).unwrap();
        let config = RunConfig { theorem: Some("mp2".to_string()), ..RunConfig::default() };
        let outcomes = run(&db, &config).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_ok());
    }

    #[test]
    fn unknown_theorem_filter_is_reported() {
        let db = parse(TINY_DB).unwrap();
        let config = RunConfig { theorem: Some("nope".to_string()), ..RunConfig::default() };
        let err = run(&db, &config).unwrap_err();
        assert!(matches!(err, DriverError::UnknownTheorem { .. }));
    }

    #[test]
    fn parallel_run_matches_sequential_run() {
        let db = parse(TINY_DB).unwrap();
        let sequential = run(&db, &RunConfig::default()).unwrap();
        let parallel = run(&db, &RunConfig { jobs: 4, ..RunConfig::default() }).unwrap();
        assert_eq!(sequential.len(), parallel.len());
        for (s, p) in sequential.iter().zip(&parallel) {
            assert_eq!(s.label, p.label);
            assert_eq!(s.result.is_ok(), p.result.is_ok());
        }
    }
}
