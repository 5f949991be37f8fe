//! The two passes.
//!
//! Pass one walks the token lines, parses every instruction, and assigns
//! label addresses: a line advances the instruction counter iff it carries
//! a non-label token. Pass two composes one 32-bit word per instruction
//! and emits it as four big-endian bytes.
//!
//! `.import name` lines declare an external symbol and emit nothing; with
//! linking out of scope, imported symbols resolve to address 0.

use crate::instr::{parse_instr, Instr, Target, WordArg};
use crate::AsmError;
use rustc_hash::FxHashMap;
use wlp4c_lex::Token;

/// Label name to instruction line index.
pub type SymbolTable = FxHashMap<String, i64>;

/// Assembles a refined token stream into big-endian machine words.
pub fn assemble(tokens: &[Token]) -> Result<Vec<u8>, AsmError> {
    let (program, symbols) = first_pass(tokens)?;
    second_pass(&program, &symbols)
}

/// Parses every line, collecting the instruction list and the symbol
/// table.
pub fn first_pass(tokens: &[Token]) -> Result<(Vec<Instr>, SymbolTable), AsmError> {
    let mut program: Vec<Instr> = Vec::new();
    let mut symbols = SymbolTable::default();

    for line in tokens.split(|t| t.kind == "NEWLINE") {
        let mut rest = line;
        while let Some(head) = rest.first() {
            if head.kind != "LABELDEF" {
                break;
            }
            let name = head.lexeme.trim_end_matches(':');
            define(&mut symbols, name, program.len() as i64)?;
            rest = &rest[1..];
        }
        if rest.is_empty() {
            continue;
        }
        if rest[0].kind == "DOTID" && rest[0].lexeme == ".import" {
            if rest.len() != 2 || rest[1].kind != "ID" {
                return Err(AsmError::Syntax(".import".to_owned()));
            }
            define(&mut symbols, &rest[1].lexeme, 0)?;
            continue;
        }
        program.push(parse_instr(rest)?);
    }
    Ok((program, symbols))
}

fn define(symbols: &mut SymbolTable, name: &str, line: i64) -> Result<(), AsmError> {
    if symbols.contains_key(name) {
        return Err(AsmError::DuplicateLabel(name.to_owned()));
    }
    symbols.insert(name.to_owned(), line);
    Ok(())
}

/// Encodes every instruction against the symbol table.
pub fn second_pass(program: &[Instr], symbols: &SymbolTable) -> Result<Vec<u8>, AsmError> {
    let mut out = Vec::with_capacity(program.len() * 4);
    for (line, instr) in program.iter().enumerate() {
        let word = encode(instr, line as i64, symbols)?;
        out.extend_from_slice(&word.to_be_bytes());
    }
    Ok(out)
}

/// Composes the 32-bit word for one instruction.
pub fn encode(instr: &Instr, line: i64, symbols: &SymbolTable) -> Result<u32, AsmError> {
    let word = match instr {
        Instr::Register { op, d, s, t } => {
            ((*s as u32) << 21) | ((*t as u32) << 16) | ((*d as u32) << 11) | op.bits()
        }
        Instr::MultDiv { op, s, t } => ((*s as u32) << 21) | ((*t as u32) << 16) | op.bits(),
        Instr::MoveFrom { op, d } => ((*d as u32) << 11) | op.bits(),
        Instr::Jump { op, s } => ((*s as u32) << 21) | op.bits(),
        Instr::Branch { op, s, t, target } => {
            let offset = match target {
                Target::Immediate(value) => *value,
                Target::Label(name) => {
                    let dest = lookup(symbols, name)?;
                    let offset = dest - (line + 1);
                    if !(-32768..=32767).contains(&offset) {
                        return Err(AsmError::BranchRange(name.clone()));
                    }
                    offset
                }
            };
            (op.bits() << 24)
                | ((*s as u32) << 21)
                | ((*t as u32) << 16)
                | (offset as u32 & 0xFFFF)
        }
        Instr::Mem { op, t, offset, s } => {
            (op.bits() << 24)
                | ((*s as u32) << 21)
                | ((*t as u32) << 16)
                | (*offset as u32 & 0xFFFF)
        }
        Instr::Word(arg) => match arg {
            WordArg::Value(value) => *value as u32,
            WordArg::Label(name) => (lookup(symbols, name)? * 4) as u32,
        },
    };
    Ok(word)
}

fn lookup(symbols: &SymbolTable, name: &str) -> Result<i64, AsmError> {
    symbols
        .get(name)
        .copied()
        .ok_or_else(|| AsmError::UndefinedLabel(name.to_owned()))
}
