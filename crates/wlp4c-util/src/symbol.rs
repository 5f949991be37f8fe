//! String interning.
//!
//! Symbol names (DFA states, grammar terminals and non-terminals) are
//! interned to small integers when the tables that mention them are loaded.
//! Hot lookups downstream then index dense arrays instead of hashing
//! strings. The interner is owned by whichever table it serves; the
//! toolchain is single-threaded batch, so no global state is involved.

use indexmap::IndexSet;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

/// An interned string, represented as an index into its [`Interner`].
///
/// Symbols from different interners must not be mixed; each loader owns one
/// interner for the lifetime of its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub u32);

impl Symbol {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Order-preserving string interner.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    strings: IndexSet<String, BuildHasherDefault<FxHasher>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning its symbol. Idempotent.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(idx) = self.strings.get_index_of(name) {
            return Symbol(idx as u32);
        }
        let (idx, _) = self.strings.insert_full(name.to_owned());
        Symbol(idx as u32)
    }

    /// Looks up an already-interned name.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.strings.get_index_of(name).map(|i| Symbol(i as u32))
    }

    /// Resolves a symbol back to its name.
    ///
    /// Panics only if `sym` came from a different interner, which is a
    /// programming error.
    pub fn name(&self, sym: Symbol) -> &str {
        self.strings
            .get_index(sym.index())
            .map(String::as_str)
            .unwrap_or_else(|| panic!("symbol {} not in interner", sym.0))
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
