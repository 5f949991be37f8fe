//! Semantic analysis for WLP4.
//!
//! Two coupled walks over the parse tree: [`symbols`] collects a variable
//! table per procedure and a global procedure table with signatures;
//! [`annotate`] decorates every `expr`/`term`/`factor`/`lvalue` node with
//! `int` or `int*` and enforces the WLP4 typing rules.
//!
//! Procedures are processed in source order, and each one is entered into
//! the global table before its own body is checked, so recursion is legal
//! and forward references are not.

pub mod annotate;
pub mod symbols;

use thiserror::Error;
use wlp4c_util::DataType;

pub use symbols::{analyze, Procedure, ProcedureTable, Variable, VariableTable};

/// Semantic error: duplicate or missing declarations, type mismatches,
/// arity mismatches, or a bad `wain` signature.
#[derive(Debug, Error)]
pub enum SemError {
    #[error("duplicate declaration of variable {0}")]
    DuplicateVariable(String),

    #[error("use of undeclared variable {0}")]
    UndeclaredVariable(String),

    #[error("duplicate declaration of procedure {0}")]
    DuplicateProcedure(String),

    #[error("call to undeclared procedure {0}")]
    UndeclaredProcedure(String),

    #[error("{0} names a local variable here, not a procedure")]
    CallShadowedByVariable(String),

    #[error("wrong number of arguments in call to {0}")]
    ArityMismatch(String),

    #[error("argument {index} of call to {name} has type {found}, expected {expected}")]
    ArgumentType {
        name: String,
        index: usize,
        expected: DataType,
        found: DataType,
    },

    #[error("second parameter of wain must be int")]
    BadWainSignature,

    #[error("initializer does not match declared type of {0}")]
    BadInitializer(String),

    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: DataType, found: DataType },

    #[error("operands of {op} have incompatible types {lhs} and {rhs}")]
    OperandTypes {
        op: String,
        lhs: DataType,
        rhs: DataType,
    },

    #[error("procedure must return int, found {0}")]
    ReturnType(DataType),

    #[error("malformed parse tree (this is a bug)")]
    MalformedTree,
}
