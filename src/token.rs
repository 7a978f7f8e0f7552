//! Symbol interning
//!
//! Metamath databases repeat the same math-symbol and label tokens
//! enormously (`set.mm` cites `wph` tens of thousands of times). Interning
//! gives every recurring token a single, copyable, pointer-sized handle with
//! `O(1)` equality, instead of re-hashing or re-comparing byte strings on
//! every substitution and every stack push.
//!
//! The interner is built once during parsing and then treated as immutable
//! for the remainder of the process (see §5 of the spec: "the only shared
//! mutable resource during parse").

#![allow(missing_docs)]

use lasso::{Rodeo, Spur};

/// A single interned token (math symbol, label, or typecode).
pub type Symbol = Spur;

/// An ordered symbol string, e.g. the tokens of a statement or a
/// substitution's image.
pub type SymbolString = Box<[Symbol]>;

/// Owns the canonical mapping between surface text and [`Symbol`] handles.
///
/// `Interner` is append-only: once a token has been interned its `Symbol`
/// never changes, so handles minted early in parsing remain valid for the
/// lifetime of the `Interner`.
#[derive(Debug, Default)]
pub struct Interner {
    rodeo: Rodeo,
}

impl Interner {
    pub fn new() -> Self {
        Self { rodeo: Rodeo::new() }
    }

    /// Interns `text`, returning its (possibly newly minted) [`Symbol`].
    pub fn intern(&mut self, text: &str) -> Symbol {
        self.rodeo.get_or_intern(text)
    }

    /// Interns a whole whitespace-free token slice in order.
    pub fn intern_all<'a>(&mut self, tokens: impl IntoIterator<Item = &'a str>) -> SymbolString {
        tokens.into_iter().map(|t| self.intern(t)).collect()
    }

    /// Resolves a symbol back to its surface text.
    ///
    /// Panics if `symbol` was not minted by this interner, mirroring
    /// `lasso`'s own resolution contract.
    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.rodeo.resolve(&symbol)
    }

    /// Renders a symbol string back to whitespace-joined surface text, for
    /// diagnostics.
    pub fn render(&self, symbols: &[Symbol]) -> String {
        symbols
            .iter()
            .map(|s| self.resolve(*s))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Looks up an already-interned token without minting a new one.
    pub fn get(&self, text: &str) -> Option<Symbol> {
        self.rodeo.get(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_interns_to_same_symbol() {
        let mut i = Interner::new();
        let a = i.intern("wph");
        let b = i.intern("wph");
        assert_eq!(a, b);
    }

    #[test]
    fn resolve_round_trips() {
        let mut i = Interner::new();
        let s = i.intern("|-");
        assert_eq!(i.resolve(s), "|-");
    }

    #[test]
    fn render_joins_with_spaces() {
        let mut i = Interner::new();
        let syms = i.intern_all(["|-", "(", "ph", "->", "ph", ")"]);
        assert_eq!(i.render(&syms), "|- ( ph -> ph )");
    }
}
