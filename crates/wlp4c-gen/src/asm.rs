//! MIPS assembly text emission.
//!
//! A thin buffer with one method per instruction form, plus the two-line
//! stack helpers. The output is accepted verbatim by the bundled
//! assembler.

use std::fmt::Write;

/// Accumulates emitted assembly text.
#[derive(Debug, Default)]
pub struct Asm {
    out: String,
}

impl Asm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn import(&mut self, name: &str) {
        let _ = writeln!(self.out, ".import {}", name);
    }

    pub fn label(&mut self, name: &str) {
        let _ = writeln!(self.out, "{}:", name);
    }

    pub fn word(&mut self, value: i64) {
        let _ = writeln!(self.out, ".word {}", value);
    }

    pub fn word_label(&mut self, name: &str) {
        let _ = writeln!(self.out, ".word {}", name);
    }

    pub fn add(&mut self, d: u32, s: u32, t: u32) {
        let _ = writeln!(self.out, "add ${}, ${}, ${}", d, s, t);
    }

    pub fn sub(&mut self, d: u32, s: u32, t: u32) {
        let _ = writeln!(self.out, "sub ${}, ${}, ${}", d, s, t);
    }

    pub fn slt(&mut self, d: u32, s: u32, t: u32) {
        let _ = writeln!(self.out, "slt ${}, ${}, ${}", d, s, t);
    }

    pub fn sltu(&mut self, d: u32, s: u32, t: u32) {
        let _ = writeln!(self.out, "sltu ${}, ${}, ${}", d, s, t);
    }

    pub fn mult(&mut self, s: u32, t: u32) {
        let _ = writeln!(self.out, "mult ${}, ${}", s, t);
    }

    pub fn div(&mut self, s: u32, t: u32) {
        let _ = writeln!(self.out, "div ${}, ${}", s, t);
    }

    pub fn mfhi(&mut self, d: u32) {
        let _ = writeln!(self.out, "mfhi ${}", d);
    }

    pub fn mflo(&mut self, d: u32) {
        let _ = writeln!(self.out, "mflo ${}", d);
    }

    pub fn lis(&mut self, d: u32) {
        let _ = writeln!(self.out, "lis ${}", d);
    }

    pub fn jr(&mut self, s: u32) {
        let _ = writeln!(self.out, "jr ${}", s);
    }

    pub fn jalr(&mut self, s: u32) {
        let _ = writeln!(self.out, "jalr ${}", s);
    }

    pub fn beq(&mut self, s: u32, t: u32, target: &str) {
        let _ = writeln!(self.out, "beq ${}, ${}, {}", s, t, target);
    }

    pub fn bne(&mut self, s: u32, t: u32, target: &str) {
        let _ = writeln!(self.out, "bne ${}, ${}, {}", s, t, target);
    }

    pub fn lw(&mut self, t: u32, offset: i32, s: u32) {
        let _ = writeln!(self.out, "lw ${}, {}(${})", t, offset, s);
    }

    pub fn sw(&mut self, t: u32, offset: i32, s: u32) {
        let _ = writeln!(self.out, "sw ${}, {}(${})", t, offset, s);
    }

    /// `push(r)`: store `r` below the stack pointer and bump it down.
    pub fn push(&mut self, r: u32) {
        self.sw(r, -4, 30);
        let _ = writeln!(self.out, "sub $30, $30, $4");
    }

    /// `pop(r)`: bump the stack pointer up and load the freed word.
    pub fn pop(&mut self, r: u32) {
        let _ = writeln!(self.out, "add $30, $30, $4");
        self.lw(r, -4, 30);
    }

    /// Discards the top word.
    pub fn pop_discard(&mut self) {
        let _ = writeln!(self.out, "add $30, $30, $4");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_formats() {
        let mut asm = Asm::new();
        asm.add(3, 5, 3);
        asm.mult(3, 4);
        asm.lw(3, -8, 29);
        asm.beq(1, 11, "5");
        asm.label("wain");
        asm.word(-4);
        asm.word_label("print");
        assert_eq!(
            asm.finish(),
            "add $3, $5, $3\n\
             mult $3, $4\n\
             lw $3, -8($29)\n\
             beq $1, $11, 5\n\
             wain:\n\
             .word -4\n\
             .word print\n"
        );
    }

    #[test]
    fn stack_helpers_expand_to_two_instructions() {
        let mut asm = Asm::new();
        asm.push(31);
        asm.pop(5);
        asm.pop_discard();
        assert_eq!(
            asm.finish(),
            "sw $31, -4($30)\n\
             sub $30, $30, $4\n\
             add $30, $30, $4\n\
             lw $5, -4($30)\n\
             add $30, $30, $4\n"
        );
    }
}
