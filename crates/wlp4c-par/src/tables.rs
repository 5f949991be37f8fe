//! SLR(1) action tables.
//!
//! Tables come from one of two places: parsed from `.TRANSITIONS` /
//! `.REDUCTIONS` text resources, or computed from the grammar by the
//! standard SLR(1) construction (nullable/FIRST/FOLLOW fixed points over a
//! canonical LR(0) collection). Either way the result is the same pair of
//! dense lookup tables indexed by `(state, symbol)`, with a sentinel for
//! "no action".
//!
//! The construction reduces rule 0 on the `.ACCEPT` pseudo-terminal and
//! routes its goto to a synthetic accept state, so the drive loop treats
//! the final reduction like any other.

use crate::grammar::Grammar;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use wlp4c_util::Symbol;

const NO_ACTION: u32 = u32::MAX;

/// Error loading or constructing SLR tables. Fatal at startup.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("malformed table line: {0}")]
    BadLine(String),

    #[error("table line mentions unknown symbol {0}")]
    UnknownSymbol(String),

    #[error("reduction mentions rule {0}, but the grammar has {1} rules")]
    BadRule(usize, usize),

    #[error("grammar is not SLR(1): conflict in state {state} on {lookahead}")]
    Conflict { state: u32, lookahead: String },
}

/// Dense `(state, symbol)` action tables.
#[derive(Debug)]
pub struct SlrTables {
    n_states: usize,
    n_syms: usize,
    transitions: Vec<u32>,
    reductions: Vec<u32>,
}

/// An LR(0) item: a rule plus a dot position in its right-hand side.
type Item = (u32, u32);

impl SlrTables {
    /// Next state for a shift or goto, if any.
    #[inline]
    pub fn transition(&self, state: u32, sym: Symbol) -> Option<u32> {
        match self.transitions[self.cell(state, sym)] {
            NO_ACTION => None,
            s => Some(s),
        }
    }

    /// Rule to reduce by under the given lookahead, if any.
    #[inline]
    pub fn reduction(&self, state: u32, sym: Symbol) -> Option<usize> {
        match self.reductions[self.cell(state, sym)] {
            NO_ACTION => None,
            r => Some(r as usize),
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    #[inline]
    fn cell(&self, state: u32, sym: Symbol) -> usize {
        state as usize * self.n_syms + sym.index()
    }

    /// Loads tables from `.TRANSITIONS` and `.REDUCTIONS` text. Header
    /// lines are skipped and blank lines ignored.
    pub fn from_text(g: &Grammar, trans: &str, reds: &str) -> Result<Self, TableError> {
        let mut transitions = FxHashMap::default();
        let mut reductions = FxHashMap::default();
        let mut n_states = 0u32;

        for line in trans.lines().skip(1) {
            let Some([a, b, c]) = three_fields(line)? else {
                continue;
            };
            let from = parse_state(a, line)?;
            let sym = g
                .lookup(b)
                .ok_or_else(|| TableError::UnknownSymbol(b.to_owned()))?;
            let to = parse_state(c, line)?;
            n_states = n_states.max(from + 1).max(to + 1);
            transitions.insert((from, sym), to);
        }

        for line in reds.lines().skip(1) {
            let Some([a, b, c]) = three_fields(line)? else {
                continue;
            };
            let state = parse_state(a, line)?;
            let rule: usize = b
                .parse()
                .map_err(|_| TableError::BadLine(line.to_owned()))?;
            if rule >= g.rules().len() {
                return Err(TableError::BadRule(rule, g.rules().len()));
            }
            let sym = g
                .lookup(c)
                .ok_or_else(|| TableError::UnknownSymbol(c.to_owned()))?;
            n_states = n_states.max(state + 1);
            reductions.insert((state, sym), rule as u32);
        }

        Ok(Self::from_maps(
            n_states as usize,
            g.n_symbols(),
            &transitions,
            &reductions,
        ))
    }

    /// Computes the tables from the grammar by SLR(1) construction.
    pub fn generate(g: &Grammar) -> Result<Self, TableError> {
        let n_syms = g.n_symbols();
        let (nullable, first) = first_sets(g);
        let follow = follow_sets(g, &nullable, &first);

        let mut states: Vec<Vec<Item>> = vec![closure(g, vec![(0, 0)])];
        let mut index: FxHashMap<Vec<Item>, u32> = FxHashMap::default();
        index.insert(states[0].clone(), 0);

        let mut transitions: FxHashMap<(u32, Symbol), u32> = FxHashMap::default();
        let mut reductions: FxHashMap<(u32, Symbol), u32> = FxHashMap::default();

        let mut i = 0;
        while i < states.len() {
            let state = i as u32;
            let items = states[i].clone();

            // Kernels of successor states, grouped by the symbol after the
            // dot. BTreeMap keeps state numbering deterministic.
            let mut by_sym: BTreeMap<Symbol, Vec<Item>> = BTreeMap::new();
            for &(r, d) in &items {
                let rule = g.rule(r as usize);
                match rule.rhs.get(d as usize) {
                    Some(&sym) => by_sym.entry(sym).or_default().push((r, d + 1)),
                    None if r == 0 => {
                        put_reduction(g, &mut reductions, state, g.accept_symbol(), 0)?;
                    }
                    None => {
                        for &a in &follow[rule.lhs.index()] {
                            put_reduction(g, &mut reductions, state, a, r)?;
                        }
                    }
                }
            }

            for (sym, kernel) in by_sym {
                let next = closure(g, kernel);
                let id = match index.get(&next) {
                    Some(&id) => id,
                    None => {
                        let id = states.len() as u32;
                        index.insert(next.clone(), id);
                        states.push(next);
                        id
                    }
                };
                transitions.insert((state, sym), id);
            }
            i += 1;
        }

        // A shift and a reduction in the same cell means the grammar is not
        // SLR(1).
        for (&(state, sym), _) in &reductions {
            if transitions.contains_key(&(state, sym)) {
                return Err(TableError::Conflict {
                    state,
                    lookahead: g.sym_name(sym).to_owned(),
                });
            }
        }

        // Synthetic accept state: gives the rule-0 reduction a goto target.
        let accept_state = states.len() as u32;
        transitions.insert((0, g.start_symbol()), accept_state);

        Ok(Self::from_maps(
            states.len() + 1,
            n_syms,
            &transitions,
            &reductions,
        ))
    }

    fn from_maps(
        n_states: usize,
        n_syms: usize,
        transitions: &FxHashMap<(u32, Symbol), u32>,
        reductions: &FxHashMap<(u32, Symbol), u32>,
    ) -> Self {
        let mut tables = SlrTables {
            n_states,
            n_syms,
            transitions: vec![NO_ACTION; n_states * n_syms],
            reductions: vec![NO_ACTION; n_states * n_syms],
        };
        for (&(state, sym), &to) in transitions {
            let cell = tables.cell(state, sym);
            tables.transitions[cell] = to;
        }
        for (&(state, sym), &rule) in reductions {
            let cell = tables.cell(state, sym);
            tables.reductions[cell] = rule;
        }
        tables
    }

    /// Serializes back to the `.TRANSITIONS` / `.REDUCTIONS` text format.
    pub fn to_text(&self, g: &Grammar) -> (String, String) {
        let mut trans = String::from(".TRANSITIONS\n");
        let mut reds = String::from(".REDUCTIONS\n");
        for state in 0..self.n_states as u32 {
            for s in 0..self.n_syms as u32 {
                let sym = Symbol(s);
                if let Some(to) = self.transition(state, sym) {
                    trans.push_str(&format!("{} {} {}\n", state, g.sym_name(sym), to));
                }
                if let Some(rule) = self.reduction(state, sym) {
                    reds.push_str(&format!("{} {} {}\n", state, rule, g.sym_name(sym)));
                }
            }
        }
        (trans, reds)
    }
}

fn three_fields(line: &str) -> Result<Option<[&str; 3]>, TableError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.len() {
        0 => Ok(None),
        3 => Ok(Some([words[0], words[1], words[2]])),
        _ => Err(TableError::BadLine(line.to_owned())),
    }
}

fn parse_state(word: &str, line: &str) -> Result<u32, TableError> {
    word.parse()
        .map_err(|_| TableError::BadLine(line.to_owned()))
}

fn put_reduction(
    g: &Grammar,
    reductions: &mut FxHashMap<(u32, Symbol), u32>,
    state: u32,
    sym: Symbol,
    rule: u32,
) -> Result<(), TableError> {
    if let Some(&prev) = reductions.get(&(state, sym)) {
        if prev != rule {
            return Err(TableError::Conflict {
                state,
                lookahead: g.sym_name(sym).to_owned(),
            });
        }
        return Ok(());
    }
    reductions.insert((state, sym), rule);
    Ok(())
}

/// Nullable flags and FIRST sets for every symbol, by fixed point.
fn first_sets(g: &Grammar) -> (Vec<bool>, Vec<FxHashSet<Symbol>>) {
    let n = g.n_symbols();
    let mut nullable = vec![false; n];
    let mut first: Vec<FxHashSet<Symbol>> = vec![FxHashSet::default(); n];
    for s in 0..n {
        let sym = Symbol(s as u32);
        if g.is_terminal(sym) {
            first[s].insert(sym);
        }
    }
    let mut changed = true;
    while changed {
        changed = false;
        for rule in g.rules() {
            let lhs = rule.lhs.index();
            if !nullable[lhs] && rule.rhs.iter().all(|s| nullable[s.index()]) {
                nullable[lhs] = true;
                changed = true;
            }
            for &sym in &rule.rhs {
                let add: Vec<Symbol> = first[sym.index()].iter().copied().collect();
                for a in add {
                    changed |= first[lhs].insert(a);
                }
                if !nullable[sym.index()] {
                    break;
                }
            }
        }
    }
    (nullable, first)
}

/// FOLLOW sets for every symbol, by fixed point over the rules.
fn follow_sets(
    g: &Grammar,
    nullable: &[bool],
    first: &[FxHashSet<Symbol>],
) -> Vec<FxHashSet<Symbol>> {
    let n = g.n_symbols();
    let mut follow: Vec<FxHashSet<Symbol>> = vec![FxHashSet::default(); n];
    let mut changed = true;
    while changed {
        changed = false;
        for rule in g.rules() {
            for (i, &sym) in rule.rhs.iter().enumerate() {
                if g.is_terminal(sym) {
                    continue;
                }
                let target = sym.index();
                let mut tail_nullable = true;
                for &after in &rule.rhs[i + 1..] {
                    let add: Vec<Symbol> = first[after.index()].iter().copied().collect();
                    for a in add {
                        changed |= follow[target].insert(a);
                    }
                    if !nullable[after.index()] {
                        tail_nullable = false;
                        break;
                    }
                }
                if tail_nullable {
                    let add: Vec<Symbol> = follow[rule.lhs.index()].iter().copied().collect();
                    for a in add {
                        changed |= follow[target].insert(a);
                    }
                }
            }
        }
    }
    follow
}

/// Closure of a kernel item set under the grammar.
fn closure(g: &Grammar, kernel: Vec<Item>) -> Vec<Item> {
    let mut set: BTreeSet<Item> = kernel.into_iter().collect();
    let mut queue: Vec<Item> = set.iter().copied().collect();
    while let Some((r, d)) = queue.pop() {
        let rule = g.rule(r as usize);
        let Some(&next) = rule.rhs.get(d as usize) else {
            continue;
        };
        if !g.is_nonterminal(next) {
            continue;
        }
        for (id, candidate) in g.rules().iter().enumerate() {
            if candidate.lhs == next {
                let item = (id as u32, 0);
                if set.insert(item) {
                    queue.push(item);
                }
            }
        }
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A three-rule grammar small enough to enumerate by hand:
    ///
    /// ```text
    /// 0: S -> BOF expr EOF
    /// 1: expr -> id
    /// 2: expr -> expr - id
    /// ```
    const TOY: &str = ".CFG\nS BOF expr EOF\nexpr id\nexpr expr - id\n";

    fn toy() -> Grammar {
        Grammar::parse(TOY).unwrap()
    }

    #[test]
    fn generate_builds_the_expected_automaton() {
        let g = toy();
        let t = SlrTables::generate(&g).unwrap();
        // Seven LR(0) states plus the synthetic accept state.
        assert_eq!(t.n_states(), 8);

        let bof = g.lookup("BOF").unwrap();
        let eof = g.lookup("EOF").unwrap();
        let id = g.lookup("id").unwrap();
        let minus = g.lookup("-").unwrap();
        let expr = g.lookup("expr").unwrap();

        assert_eq!(t.transition(0, bof), Some(1));
        assert_eq!(t.transition(1, expr), Some(2));
        assert_eq!(t.transition(1, id), Some(3));
        assert_eq!(t.transition(2, eof), Some(4));
        assert_eq!(t.transition(2, minus), Some(5));
        assert_eq!(t.transition(5, id), Some(6));

        // FOLLOW(expr) = { EOF, - }
        assert_eq!(t.reduction(3, eof), Some(1));
        assert_eq!(t.reduction(3, minus), Some(1));
        assert_eq!(t.reduction(6, eof), Some(2));
        assert_eq!(t.reduction(6, minus), Some(2));
        assert_eq!(t.reduction(3, id), None);

        // Rule 0 reduces on .ACCEPT, and its goto is the synthetic state.
        assert_eq!(t.reduction(4, g.accept_symbol()), Some(0));
        assert_eq!(t.transition(0, g.start_symbol()), Some(7));
    }

    #[test]
    fn text_round_trip_preserves_every_action() {
        let g = toy();
        let generated = SlrTables::generate(&g).unwrap();
        let (trans, reds) = generated.to_text(&g);
        let loaded = SlrTables::from_text(&g, &trans, &reds).unwrap();

        assert_eq!(loaded.n_states(), generated.n_states());
        for state in 0..generated.n_states() as u32 {
            for s in 0..g.n_symbols() as u32 {
                let sym = Symbol(s);
                assert_eq!(loaded.transition(state, sym), generated.transition(state, sym));
                assert_eq!(loaded.reduction(state, sym), generated.reduction(state, sym));
            }
        }
    }

    #[test]
    fn from_text_rejects_junk() {
        let g = toy();
        assert!(matches!(
            SlrTables::from_text(&g, ".TRANSITIONS\n0 id\n", ".REDUCTIONS\n"),
            Err(TableError::BadLine(_))
        ));
        assert!(matches!(
            SlrTables::from_text(&g, ".TRANSITIONS\n0 nope 1\n", ".REDUCTIONS\n"),
            Err(TableError::UnknownSymbol(_))
        ));
        assert!(matches!(
            SlrTables::from_text(&g, ".TRANSITIONS\n", ".REDUCTIONS\n0 99 id\n"),
            Err(TableError::BadRule(99, 3))
        ));
    }

    #[test]
    fn non_slr_grammar_is_rejected() {
        // S -> BOF a EOF; a -> x | y; with both x and y deriving `t`, the
        // state after shifting `t` has a reduce-reduce conflict on EOF.
        let text = ".CFG\nS BOF a EOF\na x\na y\nx t\ny t\n";
        let g = Grammar::parse(text).unwrap();
        assert!(matches!(
            SlrTables::generate(&g),
            Err(TableError::Conflict { .. })
        ));
    }

    #[test]
    fn wlp4_grammar_is_slr1() {
        let g = Grammar::parse(crate::WLP4_CFG).unwrap();
        let t = SlrTables::generate(&g).unwrap();
        assert!(t.n_states() > 50);
    }
}
