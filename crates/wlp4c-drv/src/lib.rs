//! Pipeline orchestration for the two tools.
//!
//! Both entry points read a complete source text and run the phases in
//! order, surfacing the first error:
//!
//! ```text
//! compile:  text -> DFA scan -> SLR parse -> symbols + types -> MIPS text
//! assemble: text -> DFA scan -> pass 1 (labels) -> pass 2 (words)
//! ```
//!
//! The embedded DFA, grammar, and generated SLR tables are rebuilt per
//! call; each tool performs exactly one compilation per process.

use thiserror::Error;
use wlp4c_asm::AsmError;
use wlp4c_gen::CodeGenError;
use wlp4c_lex::{DfaError, ScanError};
use wlp4c_par::{GrammarError, ParseError, TableError};
use wlp4c_sem::SemError;

/// Any phase failure, in pipeline order.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dfa(#[from] DfaError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Sem(#[from] SemError),

    #[error(transparent)]
    Gen(#[from] CodeGenError),

    #[error(transparent)]
    Asm(#[from] AsmError),
}

/// Compiles WLP4 source to MIPS assembly text.
pub fn compile(source: &str) -> Result<String, PipelineError> {
    let dfa = wlp4c_lex::Dfa::parse(wlp4c_lex::WLP4_DFA)?;
    let tokens = wlp4c_lex::tokenize(&dfa, source, &wlp4c_lex::Wlp4Rules)?;

    let grammar = wlp4c_par::Grammar::parse(wlp4c_par::WLP4_CFG)?;
    let tables = wlp4c_par::SlrTables::generate(&grammar)?;
    let mut tree = wlp4c_par::parse(tokens, &grammar, &tables)?;

    let procedures = wlp4c_sem::analyze(&mut tree, &grammar)?;
    Ok(wlp4c_gen::generate(&tree, &grammar, &procedures)?)
}

/// Assembles MIPS assembly text to big-endian machine words.
pub fn assemble(source: &str) -> Result<Vec<u8>, PipelineError> {
    let dfa = wlp4c_lex::Dfa::parse(wlp4c_lex::MIPS_DFA)?;
    let tokens = wlp4c_lex::tokenize(&dfa, source, &wlp4c_lex::MipsRules)?;
    Ok(wlp4c_asm::assemble(&tokens)?)
}
