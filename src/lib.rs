//! Crate root: public surface and module map for the Metamath proof verifier.
//!
//! ## Invariants
//!
//! - **Write-once database.** [`Database`] is built once by [`scope::parse`]
//!   and never mutated afterwards; verification only ever reads it, which is
//!   what lets [`driver::run`] share one `&Database` across worker threads.
//! - **Token interning.** Every symbol (math token or label) is interned
//!   once by [`token::Interner`] during parsing; downstream code compares
//!   `Symbol` handles, never strings.
//! - **Rule hypothesis order.** A [`rule::Rule`]'s `hypotheses` field is
//!   always `mandatory_floatings ++ essentials`; this fixed order is what a
//!   proof's stack discipline depends on.
//! - **No panics on malformed input.** Parsing and verification surface
//!   structured errors (`thiserror`); `unwrap`/`expect` are reserved for
//!   invariants the database's own construction already guarantees.

#![forbid(unsafe_code)]

/// Symbol interning.
pub mod token;
/// Streaming tokenizer (whitespace splitting, comment stripping).
pub mod tokenizer;
/// Statement model (`$c`/`$v`/`$d`/`$f`/`$e`/`$a`/`$p`).
pub mod statement;
/// Rules: the canonical inference objects the proof engine consumes.
pub mod rule;
/// The parsed, read-only database.
pub mod database;
/// Scoper / rule builder: token stream → `Database`.
pub mod scope;
/// Substitution and rule application (`perform`).
pub mod perform;
/// Proof normalization (DAG → flat label sequence).
pub mod normalize;
/// Normal and compressed proof verification.
pub mod verify;
/// Incremental, step-at-a-time proof sessions.
pub mod session;
/// Whole-database verification driver (sequential or threaded).
pub mod driver;

pub use database::{Database, DatabaseError};
pub use perform::{perform, substitute, PerformError, ProofStep};
pub use rule::Rule;
pub use scope::{parse, ParseError, ScopeError};
pub use statement::{Statement, StatementKind};
pub use token::{Symbol, SymbolString};
pub use tokenizer::TokenizeError;
pub use verify::{verify, VerifyError};
