//! Incremental proof sessions.
//!
//! Where [`crate::verify`] replays an already-written proof end to end, a
//! [`Session`] lets a caller drive the same stack machine one step at a
//! time — the shape an interactive prover or a proof-search tool needs.

use std::rc::Rc;

use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::perform::{leaf_step, perform, PerformError, ProofStep};
use crate::token::Symbol;

/// One step of an incremental proof: either apply a rule by label, or
/// replay an earlier step already produced in this session.
#[derive(Debug, Clone, Copy)]
pub enum Action {
    Apply(Symbol),
    Replay(usize),
}

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error(transparent)]
    Perform(#[from] PerformError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("replay index {index} out of bounds for {len} steps taken so far")]
    ReplayOutOfBounds { index: usize, len: usize },
    #[error("inherited disjoint constraint not declared on the claim being proved")]
    MissingDisjoint,
}

/// Drives a proof one action at a time against a fixed [`Database`].
///
/// `claim` is the theorem the session is working towards, if any — when set,
/// every applied step's inherited disjoint constraints are checked against
/// it; an open-ended session (`claim = None`) accepts any disjoint set.
pub struct Session<'db> {
    db: &'db Database,
    claim: Option<Symbol>,
    stack: Vec<Rc<ProofStep>>,
    steps: Vec<Rc<ProofStep>>,
    proof: Vec<Action>,
}

impl<'db> Session<'db> {
    pub fn new(db: &'db Database) -> Self {
        Session { db, claim: None, stack: Vec::new(), steps: Vec::new(), proof: Vec::new() }
    }

    /// Resets the session to prove `claim` (or to an open-ended session if
    /// `None`), discarding any prior stack/step history.
    pub fn reset(&mut self, claim: Option<Symbol>) {
        self.claim = claim;
        self.stack.clear();
        self.steps.clear();
        self.proof.clear();
    }

    pub fn stack(&self) -> &[Rc<ProofStep>] {
        &self.stack
    }

    pub fn proof_so_far(&self) -> &[Action] {
        &self.proof
    }

    /// Whether the stack currently holds exactly one step whose conclusion
    /// matches the claim being proved.
    pub fn is_complete(&self) -> bool {
        let (Some(claim), [only]) = (self.claim, self.stack.as_slice()) else { return false };
        self.db.statement(claim).map(|s| s.tokens.as_ref() == only.conclusion.as_ref()).unwrap_or(false)
    }

    /// Applies one action, pushing its resulting step onto the stack.
    pub fn step(&mut self, action: Action) -> Result<Rc<ProofStep>, SessionError> {
        let step = match action {
            Action::Apply(label) => {
                let rule = self.db.rule(label)?;
                if rule.hypotheses.is_empty() {
                    leaf_step(self.db, label)
                } else {
                    let n = rule.hypotheses.len();
                    if self.stack.len() < n {
                        return Err(SessionError::Perform(PerformError::ArityMismatch {
                            rule: self.db.text(label).to_string(),
                            expected: n,
                            got: self.stack.len(),
                        }));
                    }
                    let deps: Vec<Rc<ProofStep>> = self.stack.split_off(self.stack.len() - n);
                    let step = perform(self.db, rule, &deps)?;
                    if let Some(claim_label) = self.claim {
                        let claim_rule = self.db.rule(claim_label).expect("claim label resolves");
                        if !step.inherited_disjoint.iter().all(|p| claim_rule.disjoint_pairs.contains(p)) {
                            return Err(SessionError::MissingDisjoint);
                        }
                    }
                    step
                }
            }
            Action::Replay(index) => {
                self.steps.get(index).cloned().ok_or(SessionError::ReplayOutOfBounds { index, len: self.steps.len() })?
            }
        };

        self.stack.push(step.clone());
        self.steps.push(step.clone());
        self.proof.push(action);
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::parse;

    #[test]
    fn session_replays_modus_ponens_restatement_step_by_step() {
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
            ${
                mp2.1 $e |- ph $.
                mp2.2 $e |- -> ph ps $.
                mp2 $p |- ps $= wph wps mp2.1 mp2.2 ax-mp $.
            $}
        "#,
        )
        .unwrap();
        let mut session = Session::new(&db);
        session.reset(Some(db.symbol("mp2").unwrap()));

        for label in ["wph", "wps", "mp2.1", "mp2.2", "ax-mp"] {
            session.step(Action::Apply(db.symbol(label).unwrap())).unwrap();
        }
        assert!(session.is_complete());
        assert_eq!(session.stack().len(), 1);
        assert_eq!(db.render(&session.stack()[0].conclusion), "|- ps");
    }

    #[test]
    fn session_replay_reuses_an_earlier_step() {
        let db = parse(
            r#"
            $c wff $.
            $v ph $.
            wph $f wff ph $.
        "#,
        )
        .unwrap();
        let mut session = Session::new(&db);
        session.reset(None);
        session.step(Action::Apply(db.symbol("wph").unwrap())).unwrap();
        let replayed = session.step(Action::Replay(0)).unwrap();
        assert_eq!(db.render(&replayed.conclusion), "wff ph");
        assert_eq!(session.stack().len(), 2);
    }

    #[test]
    fn session_replay_out_of_bounds_is_reported() {
        let db = parse("$c wff $.\n$v ph $.\nwph $f wff ph $.\n").unwrap();
        let mut session = Session::new(&db);
        session.reset(None);
        let err = session.step(Action::Replay(0)).unwrap_err();
        assert!(matches!(err, SessionError::ReplayOutOfBounds { .. }));
    }
}
