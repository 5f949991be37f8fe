//! Lexical analysis for the WLP4 toolchain.
//!
//! Both tools (`wlp4gen` and `asm`) share one scanning framework: a DFA
//! description is loaded from a text resource ([`dfa`]), the scanner drives
//! it over the input with simplified maximal munch ([`scan`]), and a
//! per-tool rule set refines the raw tokens with keyword reclassification
//! and numeric range checks ([`rules`]).
//!
//! The pipeline for either tool is:
//!
//! ```text
//! text ──▶ Dfa::parse ──▶ tokenize(dfa, input, rules) ──▶ Vec<Token>
//! ```

pub mod dfa;
pub mod rules;
pub mod scan;
pub mod token;

pub use dfa::{Dfa, DfaError};
pub use rules::{LexRules, MipsRules, Wlp4Rules};
pub use scan::{tokenize, ScanError};
pub use token::Token;

/// DFA description for WLP4 source text.
pub const WLP4_DFA: &str = include_str!("../data/wlp4.dfa");

/// DFA description for MIPS assembly text.
pub const MIPS_DFA: &str = include_str!("../data/mips.dfa");
