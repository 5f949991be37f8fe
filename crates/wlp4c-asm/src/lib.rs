//! Two-pass MIPS assembler.
//!
//! The token stream is cut into lines at `NEWLINE` markers. Pass one parses
//! each line with a small hand recognizer ([`instr`]) and builds the label
//! symbol table; a line advances the instruction counter iff it carries a
//! non-label token. Pass two resolves labels and composes one big-endian
//! 32-bit word per instruction ([`pass`]).

pub mod instr;
pub mod pass;

use thiserror::Error;

pub use instr::{Instr, Opcode, Target, WordArg};
pub use pass::{assemble, SymbolTable};

/// Assembler error: a syntax violation, an out-of-range immediate or
/// branch offset, or a duplicate/undefined label.
#[derive(Debug, Error)]
pub enum AsmError {
    #[error("invalid instruction: {0}")]
    UnknownMnemonic(String),

    #[error("unknown directive: {0}")]
    UnknownDirective(String),

    #[error("invalid syntax in {0} line")]
    Syntax(String),

    #[error("instruction expected, found {0}")]
    BadLineStart(String),

    #[error("duplicate label {0}")]
    DuplicateLabel(String),

    #[error("undefined label {0}")]
    UndefinedLabel(String),

    #[error("immediate out of range: {0}")]
    ImmediateRange(String),

    #[error("branch to {0} is out of range")]
    BranchRange(String),

    #[error("invalid numeric constant: {0}")]
    BadNumber(String),
}
