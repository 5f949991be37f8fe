//! Syntactic analysis for the WLP4 compiler.
//!
//! The grammar is loaded from a `.CFG` text resource ([`grammar`]); SLR(1)
//! action tables are either loaded from `.TRANSITIONS`/`.REDUCTIONS` text or
//! computed from the grammar ([`tables`]); the shift-reduce parser drives
//! them over the token stream and materializes one parse tree ([`parser`],
//! [`tree`]).

pub mod grammar;
pub mod parser;
pub mod tables;
pub mod tree;

pub use grammar::{Grammar, GrammarError, Rule};
pub use parser::{parse, ParseError};
pub use tables::{SlrTables, TableError};
pub use tree::{InnerNode, ParseNode};

/// The WLP4 context-free grammar. Rule 0 is the augmented start rule
/// `start BOF procedures EOF`.
pub const WLP4_CFG: &str = include_str!("../data/wlp4.cfg");
