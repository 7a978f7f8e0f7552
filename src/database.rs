//! The parsed, read-only database: label-indexed statements and rules.

use indexmap::IndexMap;
use thiserror::Error;

use crate::rule::Rule;
use crate::statement::Statement;
use crate::token::{Interner, Symbol};

/// Errors raised while registering statements and rules into a [`Database`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DatabaseError {
    #[error("label {label:?} declared more than once")]
    DuplicateLabel { label: String },
    #[error("proof cites unknown label {label:?}")]
    UnknownLabel { label: String },
}

/// Insertion-ordered registry of statements and rules, read-only once
/// parsing has finished.
///
/// Iteration order matches declaration order in the source, so a theorem
/// may only ever cite a label that appears earlier in iteration — that
/// invariant is upheld by construction (the scoper only inserts a label
/// after fully parsing it), not re-checked here.
pub struct Database {
    interner: Interner,
    statements: IndexMap<Symbol, Statement>,
    rules: IndexMap<Symbol, Rule>,
}

impl Database {
    pub(crate) fn new(interner: Interner) -> Self {
        Database { interner, statements: IndexMap::new(), rules: IndexMap::new() }
    }

    pub(crate) fn insert(&mut self, statement: Statement, rule: Rule) -> Result<(), DatabaseError> {
        let label = statement.label.expect("only labeled statements are inserted");
        if self.statements.contains_key(&label) {
            return Err(DatabaseError::DuplicateLabel { label: self.interner.resolve(label).to_string() });
        }
        self.statements.insert(label, statement);
        self.rules.insert(label, rule);
        Ok(())
    }

    /// Resolves a symbol to its surface text, for diagnostics.
    pub fn text(&self, symbol: Symbol) -> &str {
        self.interner.resolve(symbol)
    }

    /// Renders a symbol string back to whitespace-joined surface text.
    pub fn render(&self, symbols: &[Symbol]) -> String {
        self.interner.render(symbols)
    }

    /// Looks up an already-interned label or symbol by its surface text.
    pub fn symbol(&self, text: &str) -> Option<Symbol> {
        self.interner.get(text)
    }

    pub fn statement(&self, label: Symbol) -> Result<&Statement, DatabaseError> {
        self.statements
            .get(&label)
            .ok_or_else(|| DatabaseError::UnknownLabel { label: self.interner.resolve(label).to_string() })
    }

    pub fn rule(&self, label: Symbol) -> Result<&Rule, DatabaseError> {
        self.rules
            .get(&label)
            .ok_or_else(|| DatabaseError::UnknownLabel { label: self.interner.resolve(label).to_string() })
    }

    /// Propositions only, in declaration order — the sequence [`crate::driver`]
    /// iterates over.
    pub fn propositions(&self) -> impl Iterator<Item = (Symbol, &Statement)> {
        self.statements
            .iter()
            .filter(|(_, stmt)| stmt.kind == crate::statement::StatementKind::Proposition)
            .map(|(&label, stmt)| (label, stmt))
    }

    /// Total number of labeled statements (`$f`/`$e`/`$a`/`$p`).
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}
