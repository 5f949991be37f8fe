//! Context-free grammar loader.
//!
//! `.CFG` body: one rule per line, `lhs sym sym ...` or `lhs .EMPTY`.
//! Rules are stored in file order; rule 0 is the augmented start rule.
//! Symbols are interned to small integers here; non-terminals are exactly
//! the symbols that appear as some rule's left-hand side.

use thiserror::Error;
use wlp4c_util::{Interner, Symbol};

/// Marks an empty right-hand side in the `.CFG` text.
pub const EMPTY_MARKER: &str = ".EMPTY";

/// The end-of-parse pseudo-terminal appended to the token stream.
pub const ACCEPT_MARKER: &str = ".ACCEPT";

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("grammar has no rules")]
    Empty,
}

/// A production rule `lhs -> rhs[0..k)`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
}

/// An indexed grammar with interned symbols.
#[derive(Debug)]
pub struct Grammar {
    rules: Vec<Rule>,
    syms: Interner,
    nonterminal: Vec<bool>,
    accept: Symbol,
}

impl Grammar {
    /// Parses a `.CFG` resource. The header line is skipped; blank lines
    /// are ignored.
    pub fn parse(text: &str) -> Result<Self, GrammarError> {
        let mut syms = Interner::new();
        let mut rules = Vec::new();

        for line in text.lines().skip(1) {
            let mut words = line.split_whitespace();
            let Some(lhs) = words.next() else {
                continue;
            };
            let lhs = syms.intern(lhs);
            let rhs: Vec<Symbol> = words
                .take_while(|w| *w != EMPTY_MARKER)
                .map(|w| syms.intern(w))
                .collect();
            rules.push(Rule { lhs, rhs });
        }
        if rules.is_empty() {
            return Err(GrammarError::Empty);
        }

        let accept = syms.intern(ACCEPT_MARKER);
        let mut nonterminal = vec![false; syms.len()];
        for rule in &rules {
            nonterminal[rule.lhs.index()] = true;
        }

        Ok(Grammar {
            rules,
            syms,
            nonterminal,
            accept,
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: usize) -> &Rule {
        &self.rules[id]
    }

    /// The augmented start symbol (rule 0's left-hand side).
    pub fn start_symbol(&self) -> Symbol {
        self.rules[0].lhs
    }

    pub fn accept_symbol(&self) -> Symbol {
        self.accept
    }

    pub fn n_symbols(&self) -> usize {
        self.syms.len()
    }

    pub fn sym_name(&self, sym: Symbol) -> &str {
        self.syms.name(sym)
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.syms.get(name)
    }

    pub fn is_nonterminal(&self, sym: Symbol) -> bool {
        self.nonterminal[sym.index()]
    }

    pub fn is_terminal(&self, sym: Symbol) -> bool {
        !self.is_nonterminal(sym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rules_in_file_order() {
        let g = Grammar::parse(".CFG\nS BOF a EOF\na x\na .EMPTY\n").unwrap();
        assert_eq!(g.rules().len(), 3);
        assert_eq!(g.sym_name(g.rule(0).lhs), "S");
        assert_eq!(g.rule(1).rhs.len(), 1);
        assert!(g.rule(2).rhs.is_empty());
    }

    #[test]
    fn terminals_are_non_lhs_symbols() {
        let g = Grammar::parse(".CFG\nS BOF a EOF\na x\n").unwrap();
        assert!(g.is_nonterminal(g.lookup("S").unwrap()));
        assert!(g.is_nonterminal(g.lookup("a").unwrap()));
        assert!(g.is_terminal(g.lookup("x").unwrap()));
        assert!(g.is_terminal(g.lookup("BOF").unwrap()));
    }

    #[test]
    fn empty_grammar_fails() {
        assert!(matches!(Grammar::parse(".CFG\n"), Err(GrammarError::Empty)));
    }

    #[test]
    fn bundled_wlp4_grammar_loads() {
        let g = Grammar::parse(crate::WLP4_CFG).unwrap();
        assert_eq!(g.sym_name(g.start_symbol()), "start");
        let rule0 = g.rule(0);
        let rhs: Vec<_> = rule0.rhs.iter().map(|s| g.sym_name(*s)).collect();
        assert_eq!(rhs, ["BOF", "procedures", "EOF"]);
        // Spot-check a dcls rule shape the later phases rely on.
        let dcls = g.lookup("dcls").unwrap();
        let with_init: Vec<_> = g
            .rules()
            .iter()
            .filter(|r| r.lhs == dcls && !r.rhs.is_empty())
            .collect();
        assert_eq!(with_init.len(), 2);
        for rule in with_init {
            assert_eq!(rule.rhs.len(), 5);
            let init = g.sym_name(rule.rhs[3]);
            assert!(init == "NUM" || init == "NULL");
        }
    }
}
