//! Substitution and rule application (`perform`).
//!
//! This is the one arithmetic-free core the two proof verifiers (`verify`)
//! both drive: given a rule and its hypotheses' already-proved steps, either
//! produce the next proof step or explain precisely why the rule doesn't
//! apply.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::database::Database;
use crate::rule::{canon_pair, variables_in, DisjointPair, Rule};
use crate::statement::StatementKind;
use crate::token::{Symbol, SymbolString};

/// A substitution: variable → its replacement token string.
pub type Substitution = FxHashMap<Symbol, SymbolString>;

/// One node of the proof-step DAG: the result of applying a rule to its
/// already-proved dependencies.
///
/// Steps are shared via `Rc` rather than cloned, both because conclusions
/// can be long and because [`crate::normalize`] needs pointer identity to
/// detect when the same step is reused from two different places in a
/// compressed proof.
#[derive(Debug)]
pub struct ProofStep {
    pub conclusion: SymbolString,
    pub rule_label: Symbol,
    pub dependencies: Vec<Rc<ProofStep>>,
    pub substitution: Substitution,
    pub inherited_disjoint: FxHashSet<DisjointPair>,
}

/// Failures `perform` can raise while applying a rule to a candidate set of
/// dependency steps.
#[derive(Debug, Error, Clone)]
pub enum PerformError {
    #[error("rule {rule:?} expects {expected} hypotheses, got {got}")]
    ArityMismatch { rule: String, expected: usize, got: usize },
    #[error("floating hypothesis {label:?} expects typecode {expected:?}, got {got:?}")]
    TypeMismatch { label: String, expected: String, got: String },
    #[error("essential hypothesis {label:?} does not match its substituted form")]
    EssentialMismatch { label: String },
    #[error("disjoint-variable violation between substitutions for {a:?} and {b:?}")]
    DisjointViolation { a: String, b: String },
}

/// Replaces every variable token with its binding in `sigma`, left to right,
/// non-recursively. Constants, unbound variables, and unknown tokens pass
/// through verbatim.
pub fn substitute(tokens: &[Symbol], sigma: &Substitution) -> SymbolString {
    let mut out = Vec::with_capacity(tokens.len());
    for &tok in tokens {
        match sigma.get(&tok) {
            Some(replacement) => out.extend_from_slice(replacement),
            None => out.push(tok),
        }
    }
    out.into_boxed_slice()
}

/// Applies `rule` to `deps` (in hypothesis order: mandatory floatings then
/// essentials), producing a new proof step or the failure that blocked it.
pub fn perform(db: &Database, rule: &Rule, deps: &[Rc<ProofStep>]) -> Result<Rc<ProofStep>, PerformError> {
    if deps.len() != rule.hypotheses.len() {
        return Err(PerformError::ArityMismatch {
            rule: db.text(rule.consequent_label).to_string(),
            expected: rule.hypotheses.len(),
            got: deps.len(),
        });
    }

    let mut sigma = Substitution::default();

    for (&h_label, dep) in rule.hypotheses.iter().zip(deps) {
        let h_stmt = db.statement(h_label).expect("hypothesis label resolves");
        match h_stmt.kind {
            StatementKind::Floating => {
                let typecode = h_stmt.floating_typecode();
                let variable = h_stmt.floating_variable();
                if dep.conclusion.first().copied() != Some(typecode) {
                    return Err(PerformError::TypeMismatch {
                        label: db.text(h_label).to_string(),
                        expected: db.text(typecode).to_string(),
                        got: dep.conclusion.first().map(|&t| db.text(t).to_string()).unwrap_or_default(),
                    });
                }
                sigma.insert(variable, dep.conclusion[1..].to_vec().into_boxed_slice());
            }
            StatementKind::Essential => {
                let expected = substitute(&h_stmt.tokens, &sigma);
                if expected.as_ref() != dep.conclusion.as_ref() {
                    return Err(PerformError::EssentialMismatch { label: db.text(h_label).to_string() });
                }
            }
            _ => unreachable!("only floating/essential statements appear in rule.hypotheses"),
        }
    }

    let mut inherited_disjoint = FxHashSet::default();
    for &(u, w) in &rule.disjoint_pairs {
        let (Some(su), Some(sw)) = (sigma.get(&u), sigma.get(&w)) else { continue };
        let vars_u = variables_in(&rule.variables, su);
        let vars_w = variables_in(&rule.variables, sw);
        if vars_u.intersection(&vars_w).next().is_some() {
            return Err(PerformError::DisjointViolation { a: db.text(u).to_string(), b: db.text(w).to_string() });
        }
        for &x in &vars_u {
            for &y in &vars_w {
                inherited_disjoint.insert(canon_pair(x, y));
            }
        }
    }

    let conclusion = substitute(&db.statement(rule.consequent_label).expect("rule's own consequent resolves").tokens, &sigma);

    Ok(Rc::new(ProofStep {
        conclusion,
        rule_label: rule.consequent_label,
        dependencies: deps.to_vec(),
        substitution: sigma,
        inherited_disjoint,
    }))
}

/// Builds the degenerate zero-hypothesis step for a `$f`/`$e` leaf: its
/// conclusion is just its own tokens.
pub fn leaf_step(db: &Database, label: Symbol) -> Rc<ProofStep> {
    let stmt = db.statement(label).expect("leaf label resolves");
    Rc::new(ProofStep {
        conclusion: stmt.tokens.clone(),
        rule_label: label,
        dependencies: Vec::new(),
        substitution: Substitution::default(),
        inherited_disjoint: FxHashSet::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::parse;

    #[test]
    fn modus_ponens_applies() {
        let db = parse(
            r#"
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
        "#,
        )
        .unwrap();

        let wph = leaf_step(&db, db.symbol("wph").unwrap());
        let wps = leaf_step(&db, db.symbol("wps").unwrap());
        let wi = db.rule(db.symbol("wi").unwrap()).unwrap();
        let wi_applied = perform(&db, wi, &[wph.clone(), wps.clone()]).unwrap();
        assert_eq!(db.render(&wi_applied.conclusion), "wff -> ph ps");

        // ax-mp's hypotheses are [wph, wps] ++ [min, maj]: both floatings
        // are mandatory (ph, ps occur in min/maj), so applying it needs all
        // four, in that order.
        let mp_rule = db.rule(db.symbol("ax-mp").unwrap()).unwrap();
        assert_eq!(mp_rule.hypotheses.len(), 4);

        let tokens = |parts: &[&str]| -> SymbolString {
            parts.iter().map(|p| db.symbol(p).expect("already interned")).collect::<Vec<_>>().into_boxed_slice()
        };
        let min_step = Rc::new(ProofStep {
            conclusion: tokens(&["|-", "ph"]),
            rule_label: db.symbol("wph").unwrap(),
            dependencies: vec![],
            substitution: Substitution::default(),
            inherited_disjoint: FxHashSet::default(),
        });
        let maj_step = Rc::new(ProofStep {
            conclusion: tokens(&["|-", "->", "ph", "ps"]),
            rule_label: db.symbol("wps").unwrap(),
            dependencies: vec![],
            substitution: Substitution::default(),
            inherited_disjoint: FxHashSet::default(),
        });
        let result = perform(&db, mp_rule, &[wph, wps, min_step, maj_step]).unwrap();
        assert_eq!(db.render(&result.conclusion), "|- ps");
    }

    #[test]
    fn type_mismatch_is_reported() {
        // wi's first hypothesis (wph) expects a "wff"-typed dependency; feed
        // it an essential-shaped ("|-") conclusion instead.
        let db = parse(
            r#"
            $c wff |- -> $.
            $v ph ps $.
            wph $f wff ph $.
            wps $f wff ps $.
            wi $a wff -> ph ps $.
        "#,
        )
        .unwrap();
        let wi = db.rule(db.symbol("wi").unwrap()).unwrap();
        let wps = leaf_step(&db, db.symbol("wps").unwrap());
        let tokens = |parts: &[&str]| -> SymbolString {
            parts.iter().map(|p| db.symbol(p).expect("already interned")).collect::<Vec<_>>().into_boxed_slice()
        };
        let not_a_wff = Rc::new(ProofStep {
            conclusion: tokens(&["|-", "ph"]),
            rule_label: db.symbol("wph").unwrap(),
            dependencies: vec![],
            substitution: Substitution::default(),
            inherited_disjoint: FxHashSet::default(),
        });
        let err = perform(&db, wi, &[not_a_wff, wps]).unwrap_err();
        assert!(matches!(err, PerformError::TypeMismatch { .. }));
    }

    #[test]
    fn disjoint_violation_is_reported() {
        // `$d x y $.` forbids substituting x and y so their variables
        // overlap; binding both to the same variable z violates it.
        let db = parse(
            r#"
            $c wff -> $.
            $v x y z $.
            wx $f wff x $.
            wy $f wff y $.
            wz $f wff z $.
            ${
                $d x y $.
                wxy $a wff -> x y $.
            $}
        "#,
        )
        .unwrap();
        let wxy = db.rule(db.symbol("wxy").unwrap()).unwrap();
        assert_eq!(wxy.hypotheses.len(), 2);
        let wz1 = leaf_step(&db, db.symbol("wz").unwrap());
        let wz2 = leaf_step(&db, db.symbol("wz").unwrap());
        let err = perform(&db, wxy, &[wz1, wz2]).unwrap_err();
        assert!(matches!(err, PerformError::DisjointViolation { .. }));
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let db = parse(
            r#"
            $c wff -> $.
            $v ph ps $.
            wph $f wff ph $.
            wps $f wff ps $.
            wi $a wff -> ph ps $.
        "#,
        )
        .unwrap();
        let wi = db.rule(db.symbol("wi").unwrap()).unwrap();
        let wph = leaf_step(&db, db.symbol("wph").unwrap());
        let err = perform(&db, wi, &[wph]).unwrap_err();
        assert!(matches!(err, PerformError::ArityMismatch { .. }));
    }
}
