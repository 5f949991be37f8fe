//! MIPS code generation for WLP4.
//!
//! Walks the annotated parse tree and emits stack-discipline MIPS text.
//! The conventions are fixed ([`regs`]): `$3` carries every expression
//! result, binary operators evaluate left-push-right-pop through `$5`, and
//! procedure frames hang off `$29` with parameters at positive offsets and
//! locals at non-positive ones.
//!
//! Label counters for `if`/`while` live in the per-compilation [`CodeGen`]
//! context and increase monotonically across the whole program, keeping
//! `afterifN`/`afterelseN`/`whileN`/`afterwhileN` unique.

pub mod asm;
pub mod regs;

use asm::Asm;
use regs::{BOOT, CALLEE, DELETE, FOUR, FP, INIT, LHS, LINK, NEW, ONE, PRINT, RESULT, SP, TARGET};
use rustc_hash::FxHashMap;
use thiserror::Error;
use wlp4c_par::{Grammar, InnerNode, ParseNode};
use wlp4c_sem::symbols::{local_dcls, param_dcls};
use wlp4c_sem::ProcedureTable;
use wlp4c_util::DataType;

/// Code generation error. The tree is type-checked before it gets here, so
/// every failure is an internal invariant violation rather than a user
/// error.
#[derive(Debug, Error)]
pub enum CodeGenError {
    #[error("internal error: {0}")]
    Internal(String),
}

fn internal(what: impl Into<String>) -> CodeGenError {
    CodeGenError::Internal(what.into())
}

/// Frame-relative byte offsets for one procedure's variables.
type OffsetTable = FxHashMap<String, i32>;

/// Emits the whole program for an annotated parse tree.
pub fn generate(
    tree: &ParseNode,
    g: &Grammar,
    table: &ProcedureTable,
) -> Result<String, CodeGenError> {
    let mut gen = CodeGen {
        g,
        table,
        asm: Asm::new(),
        if_count: 0,
        while_count: 0,
    };
    gen.program(tree)?;
    Ok(gen.asm.finish())
}

struct CodeGen<'a> {
    g: &'a Grammar,
    table: &'a ProcedureTable,
    asm: Asm,
    if_count: u32,
    while_count: u32,
}

impl<'a> CodeGen<'a> {
    fn program(&mut self, tree: &ParseNode) -> Result<(), CodeGenError> {
        self.prelude();

        let root = self.inner(tree)?;
        let mut cur = self.child(root, "procedures", 1)?;
        loop {
            let inner = self.inner(cur)?;
            if inner.rhs_name(self.g, 0) == Some("procedure") {
                self.procedure(self.child(inner, "procedure", 1)?)?;
                cur = self.child(inner, "procedures", 1)?;
            } else {
                self.wain(self.child(inner, "main", 1)?)?;
                return Ok(());
            }
        }
    }

    /// Runtime imports, reserved constants, and the jump to `wain`.
    fn prelude(&mut self) {
        self.asm.import("print");
        self.asm.import("init");
        self.asm.import("new");
        self.asm.import("delete");
        self.asm.lis(PRINT);
        self.asm.word_label("print");
        self.asm.lis(INIT);
        self.asm.word_label("init");
        self.asm.lis(NEW);
        self.asm.word_label("new");
        self.asm.lis(DELETE);
        self.asm.word_label("delete");
        self.asm.lis(FOUR);
        self.asm.word(4);
        self.asm.lis(ONE);
        self.asm.word(1);
        self.asm.lis(BOOT);
        self.asm.word_label("wain");
        self.asm.jr(BOOT);
    }

    /// A non-main procedure: `Pname`, caller-pushed parameters at positive
    /// offsets, locals pushed here at non-positive ones.
    fn procedure(&mut self, node: &ParseNode) -> Result<(), CodeGenError> {
        let inner = self.inner(node)?;
        let name = self.leaf_lexeme(inner, "ID")?;
        self.asm.label(&format!("P{}", name));

        let params = param_dcls(node, self.g).map_err(|e| internal(e.to_string()))?;
        let mut offsets = OffsetTable::default();
        let arity = params.len() as i32;
        for (i, dcl) in params.into_iter().enumerate() {
            offsets.insert(self.dcl_name(dcl)?, 4 * (arity - i as i32));
        }

        self.asm.sub(FP, SP, FOUR);

        let locals = self.push_locals(self.child(inner, "dcls", 1)?, &mut offsets)?;
        self.statements(self.child(inner, "statements", 1)?, &offsets)?;
        self.expr(self.child(inner, "expr", 1)?, &offsets)?;
        for _ in 0..locals {
            self.asm.pop_discard();
        }
        self.asm.jr(LINK);
        Ok(())
    }

    /// `wain`: parameters arrive in `$1`/`$2` and are pushed as the first
    /// two frame slots; `init` runs before the frame is set up, with `$2`
    /// zeroed across the call when the first parameter is `int`.
    fn wain(&mut self, node: &ParseNode) -> Result<(), CodeGenError> {
        let inner = self.inner(node)?;
        self.asm.label("wain");

        let mut offsets = OffsetTable::default();
        offsets.insert(self.dcl_name(self.child(inner, "dcl", 1)?)?, 8);
        offsets.insert(self.dcl_name(self.child(inner, "dcl", 2)?)?, 4);
        self.asm.push(1);
        self.asm.push(2);

        let wain = self
            .table
            .find("wain")
            .ok_or_else(|| internal("wain missing from procedure table"))?;
        let first_is_int = wain.signature.first() == Some(&DataType::Int);
        self.asm.push(LINK);
        if first_is_int {
            self.asm.push(2);
            self.asm.add(2, 0, 0);
            self.asm.jalr(INIT);
            self.asm.pop(2);
        } else {
            self.asm.jalr(INIT);
        }
        self.asm.pop(LINK);

        self.asm.sub(FP, SP, FOUR);

        let locals = self.push_locals(self.child(inner, "dcls", 1)?, &mut offsets)?;
        self.statements(self.child(inner, "statements", 1)?, &offsets)?;
        self.expr(self.child(inner, "expr", 1)?, &offsets)?;
        for _ in 0..locals {
            self.asm.pop_discard();
        }
        self.asm.jr(LINK);
        Ok(())
    }

    /// Pushes the declared locals in source order, initializing each from
    /// its literal and recording offsets `0, -4, -8, ...`. Returns how many
    /// were pushed.
    fn push_locals(
        &mut self,
        dcls: &ParseNode,
        offsets: &mut OffsetTable,
    ) -> Result<u32, CodeGenError> {
        let locals = local_dcls(dcls, self.g).map_err(|e| internal(e.to_string()))?;
        let mut count = 0u32;
        for (dcl, init) in locals {
            offsets.insert(self.dcl_name(dcl)?, -4 * count as i32);
            self.asm.lis(LHS);
            match init.kind.as_str() {
                "NULL" => self.asm.word(1),
                _ => {
                    let value: i64 = init
                        .lexeme
                        .parse()
                        .map_err(|_| internal(format!("bad NUM literal {}", init.lexeme)))?;
                    self.asm.word(value);
                }
            }
            self.asm.push(LHS);
            count += 1;
        }
        Ok(count)
    }

    /// Emits a `statements` chain in source order.
    fn statements(&mut self, node: &ParseNode, offsets: &OffsetTable) -> Result<(), CodeGenError> {
        let mut chain = Vec::new();
        let mut cur = node;
        loop {
            let inner = self.inner(cur)?;
            if inner.children.is_empty() {
                break;
            }
            chain.push(self.child(inner, "statement", 1)?);
            cur = self.child(inner, "statements", 1)?;
        }
        for statement in chain.into_iter().rev() {
            self.statement(statement, offsets)?;
        }
        Ok(())
    }

    fn statement(&mut self, node: &ParseNode, offsets: &OffsetTable) -> Result<(), CodeGenError> {
        let inner = self.inner(node)?;
        match inner
            .rhs_name(self.g, 0)
            .ok_or_else(|| internal("statement with empty rule"))?
        {
            "lvalue" => {
                self.lvalue_addr(self.child(inner, "lvalue", 1)?, offsets)?;
                self.asm.push(RESULT);
                self.expr(self.child(inner, "expr", 1)?, offsets)?;
                self.asm.pop(LHS);
                self.asm.sw(RESULT, 0, LHS);
            }
            "PRINTLN" => {
                self.expr(self.child(inner, "expr", 1)?, offsets)?;
                self.asm.add(1, 0, RESULT);
                self.asm.push(LINK);
                self.asm.jalr(PRINT);
                self.asm.pop(LINK);
            }
            "IF" => {
                let idx = self.if_count;
                self.if_count += 1;
                self.test(self.child(inner, "test", 1)?, offsets, "if", idx)?;
                self.statements(self.child(inner, "statements", 1)?, offsets)?;
                self.asm.lis(TARGET);
                self.asm.word_label(&format!("afterelse{}", idx));
                self.asm.jr(TARGET);
                self.asm.label(&format!("afterif{}", idx));
                self.statements(self.child(inner, "statements", 2)?, offsets)?;
                self.asm.label(&format!("afterelse{}", idx));
            }
            "WHILE" => {
                let idx = self.while_count;
                self.while_count += 1;
                self.asm.label(&format!("while{}", idx));
                self.test(self.child(inner, "test", 1)?, offsets, "while", idx)?;
                self.statements(self.child(inner, "statements", 1)?, offsets)?;
                self.asm.lis(TARGET);
                self.asm.word_label(&format!("while{}", idx));
                self.asm.jr(TARGET);
                self.asm.label(&format!("afterwhile{}", idx));
            }
            "DELETE" => {
                self.expr(self.child(inner, "expr", 1)?, offsets)?;
                self.asm.add(1, 0, RESULT);
                // Deleting NULL is a no-op: skip the five-instruction call
                // sequence when $1 holds the sentinel.
                self.asm.beq(1, ONE, "5");
                self.asm.push(LINK);
                self.asm.jalr(DELETE);
                self.asm.pop(LINK);
            }
            other => return Err(internal(format!("unexpected statement head {other}"))),
        }
        Ok(())
    }

    /// Evaluates both sides of a `test` into `$5`/`$3` and branches to the
    /// caller's failure label (`after<kind><idx>`) when it does not hold.
    /// Pointer comparisons are unsigned.
    fn test(
        &mut self,
        node: &ParseNode,
        offsets: &OffsetTable,
        kind: &str,
        idx: u32,
    ) -> Result<(), CodeGenError> {
        let inner = self.inner(node)?;
        let first = self.child(inner, "expr", 1)?;
        self.expr(first, offsets)?;
        self.asm.push(RESULT);
        self.expr(self.child(inner, "expr", 2)?, offsets)?;
        self.asm.pop(LHS);

        let fail = format!("after{}{}", kind, idx);
        let pointer = self.node_ty(first)? == DataType::IntPtr;
        let op = inner
            .rhs_name(self.g, 1)
            .ok_or_else(|| internal("test without operator"))?;
        match op {
            "EQ" => self.asm.bne(RESULT, LHS, &fail),
            "NE" => self.asm.beq(RESULT, LHS, &fail),
            "LT" => {
                self.set_less(pointer, RESULT, LHS, RESULT);
                self.asm.beq(RESULT, 0, &fail);
            }
            "LE" => {
                self.set_less(pointer, RESULT, RESULT, LHS);
                self.asm.beq(RESULT, ONE, &fail);
            }
            "GT" => {
                self.set_less(pointer, RESULT, RESULT, LHS);
                self.asm.beq(RESULT, 0, &fail);
            }
            "GE" => {
                self.set_less(pointer, RESULT, LHS, RESULT);
                self.asm.beq(RESULT, ONE, &fail);
            }
            other => return Err(internal(format!("unexpected comparison {other}"))),
        }
        Ok(())
    }

    fn set_less(&mut self, pointer: bool, d: u32, s: u32, t: u32) {
        if pointer {
            self.asm.sltu(d, s, t);
        } else {
            self.asm.slt(d, s, t);
        }
    }

    /// Evaluates an `expr`, `term` or `factor` into `$3`.
    fn expr(&mut self, node: &ParseNode, offsets: &OffsetTable) -> Result<(), CodeGenError> {
        let inner = self.inner(node)?;
        match inner.lhs_name(self.g) {
            "expr" => self.binary_expr(inner, offsets),
            "term" => self.term(inner, offsets),
            "factor" => self.factor(inner, offsets),
            other => Err(internal(format!("cannot evaluate {other}"))),
        }
    }

    fn binary_expr(&mut self, inner: &InnerNode, offsets: &OffsetTable) -> Result<(), CodeGenError> {
        if inner.rhs_name(self.g, 0) == Some("term") {
            return self.expr(self.child(inner, "term", 1)?, offsets);
        }
        let left = self.child(inner, "expr", 1)?;
        let right = self.child(inner, "term", 1)?;
        self.expr(left, offsets)?;
        self.asm.push(RESULT);
        self.expr(right, offsets)?;
        self.asm.pop(LHS);

        let lhs_ptr = self.node_ty(left)? == DataType::IntPtr;
        let rhs_ptr = self.node_ty(right)? == DataType::IntPtr;
        match inner.rhs_name(self.g, 1) {
            Some("PLUS") => {
                if lhs_ptr {
                    // Pointer on the left: scale the int in $3 by 4.
                    self.asm.mult(RESULT, FOUR);
                    self.asm.mflo(RESULT);
                }
                if rhs_ptr {
                    self.asm.mult(LHS, FOUR);
                    self.asm.mflo(LHS);
                }
                self.asm.add(RESULT, LHS, RESULT);
            }
            Some("MINUS") => {
                if lhs_ptr && !rhs_ptr {
                    self.asm.mult(RESULT, FOUR);
                    self.asm.mflo(RESULT);
                    self.asm.sub(RESULT, LHS, RESULT);
                } else if lhs_ptr && rhs_ptr {
                    // Pointer difference is an element count.
                    self.asm.sub(RESULT, LHS, RESULT);
                    self.asm.div(RESULT, FOUR);
                    self.asm.mflo(RESULT);
                } else {
                    self.asm.sub(RESULT, LHS, RESULT);
                }
            }
            other => return Err(internal(format!("unexpected expr operator {other:?}"))),
        }
        Ok(())
    }

    fn term(&mut self, inner: &InnerNode, offsets: &OffsetTable) -> Result<(), CodeGenError> {
        if inner.rhs_name(self.g, 0) == Some("factor") {
            return self.expr(self.child(inner, "factor", 1)?, offsets);
        }
        self.expr(self.child(inner, "term", 1)?, offsets)?;
        self.asm.push(RESULT);
        self.expr(self.child(inner, "factor", 1)?, offsets)?;
        self.asm.pop(LHS);
        match inner.rhs_name(self.g, 1) {
            Some("STAR") => {
                self.asm.mult(RESULT, LHS);
                self.asm.mflo(RESULT);
            }
            Some("SLASH") => {
                self.asm.div(LHS, RESULT);
                self.asm.mflo(RESULT);
            }
            Some("PCT") => {
                self.asm.div(LHS, RESULT);
                self.asm.mfhi(RESULT);
            }
            other => return Err(internal(format!("unexpected term operator {other:?}"))),
        }
        Ok(())
    }

    fn factor(&mut self, inner: &InnerNode, offsets: &OffsetTable) -> Result<(), CodeGenError> {
        match inner
            .rhs_name(self.g, 0)
            .ok_or_else(|| internal("factor with empty rule"))?
        {
            "ID" if inner.children.len() == 1 => {
                let offset = self.offset_of(inner, offsets)?;
                self.asm.lw(RESULT, offset, FP);
            }
            "NUM" => {
                let lexeme = self.leaf_lexeme(inner, "NUM")?;
                let value: i64 = lexeme
                    .parse()
                    .map_err(|_| internal(format!("bad NUM literal {lexeme}")))?;
                self.asm.lis(RESULT);
                self.asm.word(value);
            }
            "NULL" => {
                self.asm.lis(RESULT);
                self.asm.word(1);
            }
            "LPAREN" => self.expr(self.child(inner, "expr", 1)?, offsets)?,
            "AMP" => self.lvalue_addr(self.child(inner, "lvalue", 1)?, offsets)?,
            "STAR" => {
                self.expr(self.child(inner, "factor", 1)?, offsets)?;
                self.asm.lw(RESULT, 0, RESULT);
            }
            "NEW" => {
                self.expr(self.child(inner, "expr", 1)?, offsets)?;
                self.asm.add(1, 0, RESULT);
                self.asm.push(LINK);
                self.asm.jalr(NEW);
                self.asm.pop(LINK);
                // Allocator returns 0 on failure; replace with NULL.
                self.asm.bne(RESULT, 0, "1");
                self.asm.add(RESULT, 0, ONE);
            }
            "ID" => self.call(inner, offsets)?,
            other => return Err(internal(format!("unexpected factor head {other}"))),
        }
        Ok(())
    }

    /// `factor -> ID LPAREN [arglist] RPAREN`: save `$7`/`$31`/`$29`, push
    /// the arguments in source order, `jalr` through `$7`, then unwind.
    fn call(&mut self, inner: &InnerNode, offsets: &OffsetTable) -> Result<(), CodeGenError> {
        let name = self.leaf_lexeme(inner, "ID")?;
        self.asm.push(CALLEE);
        self.asm.lis(CALLEE);
        self.asm.word_label(&format!("P{}", name));
        self.asm.push(LINK);
        self.asm.push(FP);

        let mut pushed = 0u32;
        if inner.children.len() == 4 {
            let mut cur = self.child(inner, "arglist", 1)?;
            loop {
                let list = self.inner(cur)?;
                self.expr(self.child(list, "expr", 1)?, offsets)?;
                self.asm.push(RESULT);
                pushed += 1;
                if list.children.len() == 1 {
                    break;
                }
                cur = self.child(list, "arglist", 1)?;
            }
        }

        self.asm.jalr(CALLEE);
        for _ in 0..pushed {
            self.asm.pop_discard();
        }
        self.asm.pop(FP);
        self.asm.pop(LINK);
        self.asm.pop(CALLEE);
        Ok(())
    }

    /// Evaluates an lvalue's address into `$3`.
    fn lvalue_addr(&mut self, node: &ParseNode, offsets: &OffsetTable) -> Result<(), CodeGenError> {
        let inner = self.inner(node)?;
        match inner
            .rhs_name(self.g, 0)
            .ok_or_else(|| internal("lvalue with empty rule"))?
        {
            "ID" => {
                let offset = self.offset_of(inner, offsets)?;
                self.asm.lis(RESULT);
                self.asm.word(offset as i64);
                self.asm.add(RESULT, RESULT, FP);
            }
            "STAR" => self.expr(self.child(inner, "factor", 1)?, offsets)?,
            "LPAREN" => self.lvalue_addr(self.child(inner, "lvalue", 1)?, offsets)?,
            other => return Err(internal(format!("unexpected lvalue head {other}"))),
        }
        Ok(())
    }

    fn offset_of(&self, inner: &InnerNode, offsets: &OffsetTable) -> Result<i32, CodeGenError> {
        let name = self.leaf_lexeme(inner, "ID")?;
        offsets
            .get(&name)
            .copied()
            .ok_or_else(|| internal(format!("no frame offset for {name}")))
    }

    fn inner<'t>(&self, node: &'t ParseNode) -> Result<&'t InnerNode, CodeGenError> {
        node.inner().ok_or_else(|| internal("expected inner node"))
    }

    fn child<'t>(
        &self,
        inner: &'t InnerNode,
        name: &str,
        nth: usize,
    ) -> Result<&'t ParseNode, CodeGenError> {
        inner
            .child(self.g, name, nth)
            .ok_or_else(|| internal(format!("missing {name} child")))
    }

    fn leaf_lexeme(&self, inner: &InnerNode, kind: &str) -> Result<String, CodeGenError> {
        Ok(self
            .child(inner, kind, 1)?
            .leaf()
            .ok_or_else(|| internal(format!("{kind} is not a leaf")))?
            .lexeme
            .clone())
    }

    fn node_ty(&self, node: &ParseNode) -> Result<DataType, CodeGenError> {
        node.ty()
            .ok_or_else(|| internal("expression node was not annotated"))
    }

    fn dcl_name(&self, dcl: &ParseNode) -> Result<String, CodeGenError> {
        let inner = self.inner(dcl)?;
        self.leaf_lexeme(inner, "ID")
    }
}
