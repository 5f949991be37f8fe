//! The instruction recognizer.
//!
//! One parse function per opcode family, dispatched from the mnemonic.
//! Immediate operands are range-checked here, during the first pass:
//! branch and load/store immediates must fit in 16 bits (`DECINT` in
//! `[-32768, 32767]`, `HEXINT` at most `0xFFFF`).

use crate::AsmError;
use wlp4c_lex::Token;

/// Every mnemonic the assembler accepts, with its encoding bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Sub,
    Slt,
    Sltu,
    Mult,
    Multu,
    Div,
    Divu,
    Mfhi,
    Mflo,
    Lis,
    Jr,
    Jalr,
    Beq,
    Bne,
    Lw,
    Sw,
}

impl Opcode {
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Some(match name {
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "slt" => Opcode::Slt,
            "sltu" => Opcode::Sltu,
            "mult" => Opcode::Mult,
            "multu" => Opcode::Multu,
            "div" => Opcode::Div,
            "divu" => Opcode::Divu,
            "mfhi" => Opcode::Mfhi,
            "mflo" => Opcode::Mflo,
            "lis" => Opcode::Lis,
            "jr" => Opcode::Jr,
            "jalr" => Opcode::Jalr,
            "beq" => Opcode::Beq,
            "bne" => Opcode::Bne,
            "lw" => Opcode::Lw,
            "sw" => Opcode::Sw,
            _ => return None,
        })
    }

    /// The function field (R-type) or opcode byte (branch/memory).
    pub fn bits(self) -> u32 {
        match self {
            Opcode::Add => 0x20,
            Opcode::Sub => 0x22,
            Opcode::Slt => 0x2a,
            Opcode::Sltu => 0x2b,
            Opcode::Mult => 0x18,
            Opcode::Multu => 0x19,
            Opcode::Div => 0x1a,
            Opcode::Divu => 0x1b,
            Opcode::Mfhi => 0x10,
            Opcode::Mflo => 0x12,
            Opcode::Lis => 0x14,
            Opcode::Jr => 0x08,
            Opcode::Jalr => 0x09,
            Opcode::Beq => 0x10,
            Opcode::Bne => 0x14,
            Opcode::Lw => 0x8c,
            Opcode::Sw => 0xac,
        }
    }
}

/// A branch target: a raw offset or a label resolved in pass two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Immediate(i64),
    Label(String),
}

/// A `.word` operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordArg {
    Value(i64),
    Label(String),
}

/// One code-emitting line, parsed and range-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    /// `add/sub/slt/sltu $d, $s, $t`
    Register { op: Opcode, d: u8, s: u8, t: u8 },
    /// `mult/multu/div/divu $s, $t`
    MultDiv { op: Opcode, s: u8, t: u8 },
    /// `mfhi/mflo/lis $d`
    MoveFrom { op: Opcode, d: u8 },
    /// `jr/jalr $s`
    Jump { op: Opcode, s: u8 },
    /// `beq/bne $s, $t, target`
    Branch {
        op: Opcode,
        s: u8,
        t: u8,
        target: Target,
    },
    /// `lw/sw $t, offset($s)`
    Mem {
        op: Opcode,
        t: u8,
        offset: i64,
        s: u8,
    },
    /// `.word value-or-label`
    Word(WordArg),
}

/// Parses the non-label tokens of one line.
pub fn parse_instr(tokens: &[Token]) -> Result<Instr, AsmError> {
    let head = &tokens[0];
    match head.kind.as_str() {
        "DOTID" => parse_word(head, &tokens[1..]),
        "ID" => {
            let op = Opcode::from_mnemonic(&head.lexeme)
                .ok_or_else(|| AsmError::UnknownMnemonic(head.lexeme.clone()))?;
            let rest = &tokens[1..];
            match op {
                Opcode::Add | Opcode::Sub | Opcode::Slt | Opcode::Sltu => {
                    let [d, s, t] = three_registers(op, rest)?;
                    Ok(Instr::Register { op, d, s, t })
                }
                Opcode::Mult | Opcode::Multu | Opcode::Div | Opcode::Divu => {
                    expect_shape(op, rest, &["REGISTER", "COMMA", "REGISTER"])?;
                    Ok(Instr::MultDiv {
                        op,
                        s: register(&rest[0])?,
                        t: register(&rest[2])?,
                    })
                }
                Opcode::Mfhi | Opcode::Mflo | Opcode::Lis => {
                    expect_shape(op, rest, &["REGISTER"])?;
                    Ok(Instr::MoveFrom {
                        op,
                        d: register(&rest[0])?,
                    })
                }
                Opcode::Jr | Opcode::Jalr => {
                    expect_shape(op, rest, &["REGISTER"])?;
                    Ok(Instr::Jump {
                        op,
                        s: register(&rest[0])?,
                    })
                }
                Opcode::Beq | Opcode::Bne => parse_branch(op, rest),
                Opcode::Lw | Opcode::Sw => parse_mem(op, rest),
            }
        }
        other => Err(AsmError::BadLineStart(format!(
            "{} '{}'",
            other, head.lexeme
        ))),
    }
}

fn parse_word(head: &Token, rest: &[Token]) -> Result<Instr, AsmError> {
    if head.lexeme != ".word" {
        return Err(AsmError::UnknownDirective(head.lexeme.clone()));
    }
    let [operand] = rest else {
        return Err(AsmError::Syntax(".word".to_owned()));
    };
    let arg = match operand.kind.as_str() {
        "DECINT" | "HEXINT" => WordArg::Value(numeric_value(operand)?),
        "ID" => WordArg::Label(operand.lexeme.clone()),
        _ => return Err(AsmError::Syntax(".word".to_owned())),
    };
    Ok(Instr::Word(arg))
}

fn parse_branch(op: Opcode, rest: &[Token]) -> Result<Instr, AsmError> {
    if rest.len() != 5
        || rest[0].kind != "REGISTER"
        || rest[1].kind != "COMMA"
        || rest[2].kind != "REGISTER"
        || rest[3].kind != "COMMA"
    {
        return Err(AsmError::Syntax(mnemonic(op)));
    }
    let target = match rest[4].kind.as_str() {
        "ID" => Target::Label(rest[4].lexeme.clone()),
        "DECINT" | "HEXINT" => Target::Immediate(sixteen_bit(&rest[4])?),
        _ => return Err(AsmError::Syntax(mnemonic(op))),
    };
    Ok(Instr::Branch {
        op,
        s: register(&rest[0])?,
        t: register(&rest[2])?,
        target,
    })
}

fn parse_mem(op: Opcode, rest: &[Token]) -> Result<Instr, AsmError> {
    if rest.len() != 6
        || rest[0].kind != "REGISTER"
        || rest[1].kind != "COMMA"
        || rest[3].kind != "LPAREN"
        || rest[4].kind != "REGISTER"
        || rest[5].kind != "RPAREN"
    {
        return Err(AsmError::Syntax(mnemonic(op)));
    }
    if rest[2].kind != "DECINT" && rest[2].kind != "HEXINT" {
        return Err(AsmError::Syntax(mnemonic(op)));
    }
    Ok(Instr::Mem {
        op,
        t: register(&rest[0])?,
        offset: sixteen_bit(&rest[2])?,
        s: register(&rest[4])?,
    })
}

fn three_registers(op: Opcode, rest: &[Token]) -> Result<[u8; 3], AsmError> {
    expect_shape(
        op,
        rest,
        &["REGISTER", "COMMA", "REGISTER", "COMMA", "REGISTER"],
    )?;
    Ok([
        register(&rest[0])?,
        register(&rest[2])?,
        register(&rest[4])?,
    ])
}

fn expect_shape(op: Opcode, rest: &[Token], shape: &[&str]) -> Result<(), AsmError> {
    if rest.len() != shape.len() || rest.iter().zip(shape).any(|(tok, kind)| tok.kind != *kind) {
        return Err(AsmError::Syntax(mnemonic(op)));
    }
    Ok(())
}

fn mnemonic(op: Opcode) -> String {
    format!("{:?}", op).to_lowercase()
}

fn register(token: &Token) -> Result<u8, AsmError> {
    token
        .lexeme
        .get(1..)
        .and_then(|digits| digits.parse().ok())
        .filter(|n| *n <= 31)
        .ok_or_else(|| AsmError::BadNumber(token.lexeme.clone()))
}

/// Numeric value of a `DECINT`/`HEXINT` token. Parse failures are hard
/// errors.
fn numeric_value(token: &Token) -> Result<i64, AsmError> {
    let err = || AsmError::BadNumber(token.lexeme.clone());
    if token.kind == "HEXINT" {
        let digits = token.lexeme.get(2..).ok_or_else(err)?;
        let value = u64::from_str_radix(digits, 16).map_err(|_| err())?;
        i64::try_from(value).map_err(|_| err())
    } else {
        token.lexeme.parse().map_err(|_| err())
    }
}

/// A 16-bit immediate: `DECINT` in `[-32768, 32767]`, `HEXINT` at most
/// `0xFFFF`.
fn sixteen_bit(token: &Token) -> Result<i64, AsmError> {
    let value = numeric_value(token)?;
    let in_range = if token.kind == "HEXINT" {
        value <= 0xFFFF
    } else {
        (-32768..=32767).contains(&value)
    };
    if !in_range {
        return Err(AsmError::ImmediateRange(token.lexeme.clone()));
    }
    Ok(value)
}
