//! Proof normalization: turning a proof-step DAG back into the flat label
//! sequence a normal (uncompressed) proof would have used.
//!
//! A compressed proof's `Z`-tagged reuse collapses what would otherwise be
//! repeated sub-proofs into a DAG. `normal_form` replays that DAG
//! depth-first, memoized on step identity, to recover the equivalent
//! (typically longer) label sequence — the inverse direction of what §4.7's
//! compressor does.

use std::collections::HashMap;
use std::rc::Rc;

use crate::perform::ProofStep;
use crate::token::Symbol;

/// Reconstructs the normal-proof label sequence for `step`.
///
/// Memoized on `Rc` pointer identity: two references to the same shared
/// step (the whole point of `Z`-tag reuse) are expanded once and their
/// label sequence is cloned for each later occurrence, not recomputed.
pub fn normal_form(step: &Rc<ProofStep>) -> Vec<Symbol> {
    let mut memo: HashMap<*const ProofStep, Vec<Symbol>> = HashMap::new();
    expand(step, &mut memo)
}

fn expand(step: &Rc<ProofStep>, memo: &mut HashMap<*const ProofStep, Vec<Symbol>>) -> Vec<Symbol> {
    let key = Rc::as_ptr(step);
    if let Some(cached) = memo.get(&key) {
        return cached.clone();
    }
    let mut sequence = Vec::new();
    for dep in &step.dependencies {
        sequence.extend(expand(dep, memo));
    }
    sequence.push(step.rule_label);
    memo.insert(key, sequence.clone());
    sequence
}
