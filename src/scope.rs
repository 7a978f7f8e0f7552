//! Scoper / rule builder
//!
//! Consumes the tokenizer's output and drives the nested-frame state machine
//! described in the spec's §4.2 transition table, producing one
//! [`Statement`]+[`Rule`] pair per `$f`/`$e`/`$a`/`$p` in declaration order.
//! `$c`/`$v`/`$d` never get a label and are folded straight into the
//! innermost [`Frame`] instead of becoming a retained `Statement`.

use thiserror::Error;
use tracing::{debug, trace};

use crate::database::{Database, DatabaseError};
use crate::rule::{expand_disjoint_group, Rule};
use crate::statement::{Statement, StatementKind};
use crate::token::{Interner, Symbol, SymbolString};
use crate::tokenizer::{tokenize, Token, TokenizeError};
use rustc_hash::FxHashSet;

/// Errors raised while building frames, statements, and rules from the
/// token stream.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ScopeError {
    #[error("line {line}: {keyword} not preceded by a label")]
    UnlabeledKeyword { line: usize, keyword: &'static str },
    #[error("line {line}: '$}}' with no matching '${{'")]
    UnmatchedFrameClose { line: usize },
    #[error("line {line}: '$=' on a non-proposition statement")]
    ProofOnNonProposition { line: usize },
    #[error("line {line}: floating hypothesis {label:?} must have exactly 2 tokens, got {count}")]
    BadFloatingArity { line: usize, label: String, count: usize },
    #[error("line {line}: $d requires at least 2 tokens")]
    DisjointArity { line: usize },
    #[error("line {line}: $d token {token:?} is not a declared variable, or repeats another token in the same group")]
    DisjointNotDistinctVariables { line: usize, token: String },
    #[error("unexpected end of input: statement starting at line {line} was never closed with '$.'")]
    UnterminatedStatement { line: usize },
    #[error("unexpected end of input: {open} open scope(s) were never closed with '$}}'")]
    UnclosedScope { open: usize },
}

/// Aggregate parse error: tokenizing, scoping, or final database insertion.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    C,
    V,
    D,
    F,
    E,
    A,
    P,
}

impl Keyword {
    fn from_token(text: &str) -> Option<Self> {
        Some(match text {
            "$c" => Keyword::C,
            "$v" => Keyword::V,
            "$d" => Keyword::D,
            "$f" => Keyword::F,
            "$e" => Keyword::E,
            "$a" => Keyword::A,
            "$p" => Keyword::P,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Keyword::C => "$c",
            Keyword::V => "$v",
            Keyword::D => "$d",
            Keyword::F => "$f",
            Keyword::E => "$e",
            Keyword::A => "$a",
            Keyword::P => "$p",
        }
    }

    fn is_labeled(self) -> bool {
        matches!(self, Keyword::F | Keyword::E | Keyword::A | Keyword::P)
    }

    fn statement_kind(self) -> StatementKind {
        match self {
            Keyword::C => StatementKind::Constant,
            Keyword::V => StatementKind::Variable,
            Keyword::D => StatementKind::Disjoint,
            Keyword::F => StatementKind::Floating,
            Keyword::E => StatementKind::Essential,
            Keyword::A => StatementKind::Axiom,
            Keyword::P => StatementKind::Proposition,
        }
    }
}

/// A floating hypothesis as recorded in its declaring [`Frame`]: its label
/// plus the `(typecode, variable)` pair, so later rule-building doesn't need
/// to look anything up in the database (which doesn't exist yet).
struct FrameFloating {
    label: Symbol,
    variable: Symbol,
}

struct FrameEssential {
    label: Symbol,
    tokens: SymbolString,
}

#[derive(Default)]
struct Frame {
    variables: Vec<Symbol>,
    disjoint_groups: Vec<Vec<Symbol>>,
    floatings: Vec<FrameFloating>,
    essentials: Vec<FrameEssential>,
}

struct Building {
    keyword: Keyword,
    label: Option<Symbol>,
    tokens: Vec<Symbol>,
    proof: Vec<Symbol>,
    in_proof: bool,
    start_line: usize,
}

/// Parses a whole Metamath source string into a [`Database`].
pub fn parse(source: &str) -> Result<Database, ParseError> {
    let tokens = tokenize(source)?;
    let mut interner = Interner::new();
    let mut frames: Vec<Frame> = vec![Frame::default()];
    let mut pending_label: Option<Symbol> = None;
    let mut building: Option<Building> = None;
    let mut entries: Vec<(Statement, Rule)> = Vec::new();

    for Token { text, line } in &tokens {
        let text = text.as_str();
        let line = *line;

        if text == "${" {
            frames.push(Frame::default());
            trace!(depth = frames.len(), line, "frame opened");
            continue;
        }
        if text == "$}" {
            if frames.len() <= 1 {
                return Err(ScopeError::UnmatchedFrameClose { line }.into());
            }
            frames.pop();
            trace!(depth = frames.len(), line, "frame closed");
            continue;
        }
        if let Some(kw) = Keyword::from_token(text) {
            let label = if kw.is_labeled() {
                Some(pending_label.take().ok_or(ScopeError::UnlabeledKeyword { line, keyword: kw.as_str() })?)
            } else {
                None
            };
            building =
                Some(Building { keyword: kw, label, tokens: Vec::new(), proof: Vec::new(), in_proof: false, start_line: line });
            continue;
        }
        if text == "$=" {
            match &mut building {
                Some(b) if b.keyword == Keyword::P => b.in_proof = true,
                _ => return Err(ScopeError::ProofOnNonProposition { line }.into()),
            }
            continue;
        }
        if text == "$." {
            let b = building.take().ok_or(ScopeError::UnlabeledKeyword { line, keyword: "$." })?;
            finalize(b, &mut frames, &mut interner, &mut entries, line)?;
            continue;
        }

        // Plain content token.
        match &mut building {
            None => pending_label = Some(interner.intern(text)),
            Some(b) if b.in_proof => b.proof.push(interner.intern(text)),
            Some(b) => b.tokens.push(interner.intern(text)),
        }
    }

    if let Some(b) = building {
        return Err(ScopeError::UnterminatedStatement { line: b.start_line }.into());
    }
    if frames.len() > 1 {
        return Err(ScopeError::UnclosedScope { open: frames.len() - 1 }.into());
    }

    let mut db = Database::new(interner);
    for (statement, rule) in entries {
        db.insert(statement, rule)?;
    }
    Ok(db)
}

fn finalize(
    b: Building,
    frames: &mut [Frame],
    interner: &mut Interner,
    entries: &mut Vec<(Statement, Rule)>,
    line: usize,
) -> Result<(), ScopeError> {
    match b.keyword {
        Keyword::C => {
            // Constants are never consulted again (variable-ness is all the
            // rest of the engine cares about), so they're not even tracked
            // past this point.
        }
        Keyword::V => {
            frames.last_mut().expect("always at least one frame").variables.extend(b.tokens);
        }
        Keyword::D => {
            if b.tokens.len() < 2 {
                return Err(ScopeError::DisjointArity { line });
            }
            let all_vars: FxHashSet<Symbol> = frames.iter().flat_map(|f| f.variables.iter().copied()).collect();
            let mut seen = FxHashSet::default();
            for &tok in &b.tokens {
                if !all_vars.contains(&tok) || !seen.insert(tok) {
                    return Err(ScopeError::DisjointNotDistinctVariables {
                        line,
                        token: interner.resolve(tok).to_string(),
                    });
                }
            }
            let mut group = b.tokens;
            group.sort_unstable();
            frames.last_mut().expect("always at least one frame").disjoint_groups.push(group);
        }
        Keyword::F => {
            let label = b.label.expect("labeled keyword");
            if b.tokens.len() != 2 {
                return Err(ScopeError::BadFloatingArity {
                    line,
                    label: interner.resolve(label).to_string(),
                    count: b.tokens.len(),
                });
            }
            let variable = b.tokens[1];
            let statement = Statement {
                label: Some(label),
                kind: StatementKind::Floating,
                tokens: b.tokens.into_boxed_slice(),
                proof: None,
            };
            frames.last_mut().expect("always at least one frame").floatings.push(FrameFloating { label, variable });
            entries.push((statement, Rule::leaf(label)));
        }
        Keyword::E => {
            let label = b.label.expect("labeled keyword");
            let tokens: SymbolString = b.tokens.into_boxed_slice();
            let statement =
                Statement { label: Some(label), kind: StatementKind::Essential, tokens: tokens.clone(), proof: None };
            frames
                .last_mut()
                .expect("always at least one frame")
                .essentials
                .push(FrameEssential { label, tokens });
            entries.push((statement, Rule::leaf(label)));
        }
        Keyword::A | Keyword::P => {
            let label = b.label.expect("labeled keyword");
            let kind = b.keyword.statement_kind();
            let proof = if b.keyword == Keyword::P { Some(b.proof.into_boxed_slice()) } else { None };
            let rule = build_rule(label, &b.tokens, frames);
            debug!(
                label = interner.resolve(label),
                hypotheses = rule.hypotheses.len(),
                disjoint_pairs = rule.disjoint_pairs.len(),
                "rule built"
            );
            let statement =
                Statement { label: Some(label), kind, tokens: b.tokens.into_boxed_slice(), proof };
            entries.push((statement, rule));
        }
    }

    Ok(())
}

/// Builds the mandatory-hypothesis frame for an `$a`/`$p` per §4.2 step 5.
fn build_rule(label: Symbol, consequent_tokens: &[Symbol], frames: &[Frame]) -> Rule {
    let mut variables = FxHashSet::default();
    let mut essentials = Vec::new();
    let mut mandatory_tokens: FxHashSet<Symbol> = consequent_tokens.iter().copied().collect();

    for frame in frames {
        variables.extend(frame.variables.iter().copied());
        for e in &frame.essentials {
            essentials.push(e.label);
            mandatory_tokens.extend(e.tokens.iter().copied());
        }
    }
    let mandatory_variables: FxHashSet<Symbol> =
        variables.iter().copied().filter(|v| mandatory_tokens.contains(v)).collect();

    let mut mandatory_floatings = Vec::new();
    for frame in frames {
        for f in &frame.floatings {
            if mandatory_variables.contains(&f.variable) {
                mandatory_floatings.push(f.label);
            }
        }
    }

    let mut disjoint_pairs = FxHashSet::default();
    for frame in frames {
        for group in &frame.disjoint_groups {
            expand_disjoint_group(group, &mut disjoint_pairs);
        }
    }

    let hypotheses = mandatory_floatings.iter().copied().chain(essentials.iter().copied()).collect();

    Rule { consequent_label: label, mandatory_floatings, essentials, hypotheses, disjoint_pairs, variables }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(src: &str) -> Database {
        parse(src).expect("should parse")
    }

    #[test]
    fn p2_style_database_parses() {
        let src = r#"
            $c wff |- -> $.
            $v ph ps ch $.
            wph $f wff ph $.
            wps $f wff ps $.
            wch $f wff ch $.
            wi $a wff -> ph ps $.
            ${
                min $e |- ph $.
                maj $e |- -> ph ps $.
                ax-mp $a |- ps $.
            $}
        "#;
        let database = db(src);
        assert_eq!(database.statement_count(), 7);
        let mp = database.rule(database.symbol("ax-mp").unwrap()).unwrap();
        // ax-mp's mandatory floatings are wph, wps (ch never occurs).
        assert_eq!(mp.mandatory_floatings.len(), 2);
        assert_eq!(mp.essentials.len(), 2);
        assert_eq!(mp.hypotheses.len(), 4);
    }

    #[test]
    fn mandatory_floatings_exclude_unused_variables() {
        let src = r#"
            $c wff $.
            $v ph ps $.
            wph $f wff ph $.
            wps $f wff ps $.
            id $a wff ph $.
        "#;
        let database = db(src);
        let id = database.rule(database.symbol("id").unwrap()).unwrap();
        assert_eq!(id.mandatory_floatings.len(), 1);
    }

    #[test]
    fn disjoint_pair_requires_declared_variables() {
        let src = r#"
            $c wff $.
            $v ph ps $.
            $d ph qu $.
        "#;
        let err = parse(src).unwrap_err();
        assert!(matches!(err, ParseError::Scope(ScopeError::DisjointNotDistinctVariables { .. })));
    }

    #[test]
    fn unlabeled_keyword_is_fatal() {
        let err = parse("$a wff ph $.").unwrap_err();
        assert!(matches!(err, ParseError::Scope(ScopeError::UnlabeledKeyword { .. })));
    }

    #[test]
    fn unmatched_frame_close_is_fatal() {
        let err = parse("$}").unwrap_err();
        assert!(matches!(err, ParseError::Scope(ScopeError::UnmatchedFrameClose { .. })));
    }

    #[test]
    fn duplicate_label_is_fatal() {
        let src = r#"
            $c wff $.
            $v ph $.
            wph $f wff ph $.
            wph $f wff ph $.
        "#;
        let err = parse(src).unwrap_err();
        assert!(matches!(err, ParseError::Database(DatabaseError::DuplicateLabel { .. })));
    }
}
