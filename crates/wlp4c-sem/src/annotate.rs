//! Type annotation.
//!
//! Decorates every `expr`, `term`, `factor` and `lvalue` node with `int` or
//! `int*` and enforces the WLP4 typing rules along the way. `test` nodes
//! are checked (both sides must agree) but store no type. Every
//! procedure's return expression must be `int`.

use crate::symbols::{Procedure, ProcedureTable};
use crate::SemError;
use wlp4c_par::{Grammar, InnerNode, ParseNode};
use wlp4c_util::DataType;

/// Type-checks one `procedure` or `main` node: its statement chain, then
/// its return expression.
pub fn annotate_procedure(
    node: &mut ParseNode,
    current: &Procedure,
    table: &ProcedureTable,
    g: &Grammar,
) -> Result<(), SemError> {
    let inner = node.inner_mut().ok_or(SemError::MalformedTree)?;

    let statements = inner
        .child_mut(g, "statements", 1)
        .ok_or(SemError::MalformedTree)?;
    annotate_statements(statements, current, table, g)?;

    let expr = inner
        .child_mut(g, "expr", 1)
        .ok_or(SemError::MalformedTree)?;
    let ty = annotate_expr(expr, current, table, g)?;
    if ty != DataType::Int {
        return Err(SemError::ReturnType(ty));
    }
    Ok(())
}

/// Walks a `statements` chain (left-recursive, possibly empty).
fn annotate_statements(
    node: &mut ParseNode,
    current: &Procedure,
    table: &ProcedureTable,
    g: &Grammar,
) -> Result<(), SemError> {
    let mut cur = node;
    loop {
        let inner = match cur {
            ParseNode::Inner(inner) => inner,
            ParseNode::Leaf(_) => return Err(SemError::MalformedTree),
        };
        if inner.children.is_empty() {
            return Ok(());
        }
        let statement = inner
            .child_mut(g, "statement", 1)
            .ok_or(SemError::MalformedTree)?;
        annotate_statement(statement, current, table, g)?;
        cur = inner
            .child_mut(g, "statements", 1)
            .ok_or(SemError::MalformedTree)?;
    }
}

fn annotate_statement(
    node: &mut ParseNode,
    current: &Procedure,
    table: &ProcedureTable,
    g: &Grammar,
) -> Result<(), SemError> {
    let inner = node.inner_mut().ok_or(SemError::MalformedTree)?;
    match inner.rhs_name(g, 0).ok_or(SemError::MalformedTree)? {
        "lvalue" => {
            let target = inner
                .child_mut(g, "lvalue", 1)
                .ok_or(SemError::MalformedTree)?;
            let lhs = annotate_expr(target, current, table, g)?;
            let value = inner
                .child_mut(g, "expr", 1)
                .ok_or(SemError::MalformedTree)?;
            let rhs = annotate_expr(value, current, table, g)?;
            if lhs != rhs {
                return Err(SemError::OperandTypes {
                    op: "BECOMES".to_owned(),
                    lhs,
                    rhs,
                });
            }
            Ok(())
        }
        "IF" => {
            annotate_test(
                inner.child_mut(g, "test", 1).ok_or(SemError::MalformedTree)?,
                current,
                table,
                g,
            )?;
            let then_branch = inner
                .child_mut(g, "statements", 1)
                .ok_or(SemError::MalformedTree)?;
            annotate_statements(then_branch, current, table, g)?;
            let else_branch = inner
                .child_mut(g, "statements", 2)
                .ok_or(SemError::MalformedTree)?;
            annotate_statements(else_branch, current, table, g)
        }
        "WHILE" => {
            annotate_test(
                inner.child_mut(g, "test", 1).ok_or(SemError::MalformedTree)?,
                current,
                table,
                g,
            )?;
            let body = inner
                .child_mut(g, "statements", 1)
                .ok_or(SemError::MalformedTree)?;
            annotate_statements(body, current, table, g)
        }
        "PRINTLN" => {
            let expr = inner
                .child_mut(g, "expr", 1)
                .ok_or(SemError::MalformedTree)?;
            let ty = annotate_expr(expr, current, table, g)?;
            if ty != DataType::Int {
                return Err(SemError::TypeMismatch {
                    expected: DataType::Int,
                    found: ty,
                });
            }
            Ok(())
        }
        "DELETE" => {
            let expr = inner
                .child_mut(g, "expr", 1)
                .ok_or(SemError::MalformedTree)?;
            let ty = annotate_expr(expr, current, table, g)?;
            if ty != DataType::IntPtr {
                return Err(SemError::TypeMismatch {
                    expected: DataType::IntPtr,
                    found: ty,
                });
            }
            Ok(())
        }
        _ => Err(SemError::MalformedTree),
    }
}

/// Checks a `test -> expr OP expr`: both sides must have the same type.
fn annotate_test(
    node: &mut ParseNode,
    current: &Procedure,
    table: &ProcedureTable,
    g: &Grammar,
) -> Result<(), SemError> {
    let inner = node.inner_mut().ok_or(SemError::MalformedTree)?;
    let first = inner
        .child_mut(g, "expr", 1)
        .ok_or(SemError::MalformedTree)?;
    let lhs = annotate_expr(first, current, table, g)?;
    let second = inner
        .child_mut(g, "expr", 2)
        .ok_or(SemError::MalformedTree)?;
    let rhs = annotate_expr(second, current, table, g)?;
    if lhs != rhs {
        let op = inner.rhs_name(g, 1).ok_or(SemError::MalformedTree)?;
        return Err(SemError::OperandTypes {
            op: op.to_owned(),
            lhs,
            rhs,
        });
    }
    Ok(())
}

/// Annotates an `expr`, `term`, `factor` or `lvalue` node and returns its
/// type.
pub fn annotate_expr(
    node: &mut ParseNode,
    current: &Procedure,
    table: &ProcedureTable,
    g: &Grammar,
) -> Result<DataType, SemError> {
    let inner = node.inner_mut().ok_or(SemError::MalformedTree)?;
    let ty = match inner.lhs_name(g) {
        "expr" => annotate_binary_expr(inner, current, table, g)?,
        "term" => annotate_term(inner, current, table, g)?,
        "factor" => annotate_factor(inner, current, table, g)?,
        "lvalue" => annotate_lvalue(inner, current, table, g)?,
        _ => return Err(SemError::MalformedTree),
    };
    inner.ty = Some(ty);
    Ok(ty)
}

fn annotate_binary_expr(
    inner: &mut InnerNode,
    current: &Procedure,
    table: &ProcedureTable,
    g: &Grammar,
) -> Result<DataType, SemError> {
    use DataType::{Int, IntPtr};

    if inner.rhs_name(g, 0) == Some("term") {
        let term = inner
            .child_mut(g, "term", 1)
            .ok_or(SemError::MalformedTree)?;
        return annotate_expr(term, current, table, g);
    }
    let left = inner
        .child_mut(g, "expr", 1)
        .ok_or(SemError::MalformedTree)?;
    let lhs = annotate_expr(left, current, table, g)?;
    let right = inner
        .child_mut(g, "term", 1)
        .ok_or(SemError::MalformedTree)?;
    let rhs = annotate_expr(right, current, table, g)?;
    let op = inner.rhs_name(g, 1).ok_or(SemError::MalformedTree)?;
    match (op, lhs, rhs) {
        ("PLUS", Int, Int) => Ok(Int),
        ("PLUS", IntPtr, Int) | ("PLUS", Int, IntPtr) => Ok(IntPtr),
        ("MINUS", Int, Int) | ("MINUS", IntPtr, IntPtr) => Ok(Int),
        ("MINUS", IntPtr, Int) => Ok(IntPtr),
        _ => Err(SemError::OperandTypes {
            op: op.to_owned(),
            lhs,
            rhs,
        }),
    }
}

fn annotate_term(
    inner: &mut InnerNode,
    current: &Procedure,
    table: &ProcedureTable,
    g: &Grammar,
) -> Result<DataType, SemError> {
    if inner.rhs_name(g, 0) == Some("factor") {
        let factor = inner
            .child_mut(g, "factor", 1)
            .ok_or(SemError::MalformedTree)?;
        return annotate_expr(factor, current, table, g);
    }
    let left = inner
        .child_mut(g, "term", 1)
        .ok_or(SemError::MalformedTree)?;
    let lhs = annotate_expr(left, current, table, g)?;
    let right = inner
        .child_mut(g, "factor", 1)
        .ok_or(SemError::MalformedTree)?;
    let rhs = annotate_expr(right, current, table, g)?;
    if lhs != DataType::Int || rhs != DataType::Int {
        let op = inner.rhs_name(g, 1).ok_or(SemError::MalformedTree)?;
        return Err(SemError::OperandTypes {
            op: op.to_owned(),
            lhs,
            rhs,
        });
    }
    Ok(DataType::Int)
}

fn annotate_factor(
    inner: &mut InnerNode,
    current: &Procedure,
    table: &ProcedureTable,
    g: &Grammar,
) -> Result<DataType, SemError> {
    use DataType::{Int, IntPtr};

    match inner.rhs_name(g, 0).ok_or(SemError::MalformedTree)? {
        "NUM" => Ok(Int),
        "NULL" => Ok(IntPtr),
        "ID" if inner.children.len() == 1 => {
            let name = leaf_lexeme(inner, g, "ID")?;
            current.locals.get(&name)
        }
        "ID" => annotate_call(inner, current, table, g),
        "LPAREN" => {
            let expr = inner
                .child_mut(g, "expr", 1)
                .ok_or(SemError::MalformedTree)?;
            annotate_expr(expr, current, table, g)
        }
        "AMP" => {
            let lvalue = inner
                .child_mut(g, "lvalue", 1)
                .ok_or(SemError::MalformedTree)?;
            let ty = annotate_expr(lvalue, current, table, g)?;
            if ty != Int {
                return Err(SemError::TypeMismatch {
                    expected: Int,
                    found: ty,
                });
            }
            Ok(IntPtr)
        }
        "STAR" => {
            let factor = inner
                .child_mut(g, "factor", 1)
                .ok_or(SemError::MalformedTree)?;
            let ty = annotate_expr(factor, current, table, g)?;
            if ty != IntPtr {
                return Err(SemError::TypeMismatch {
                    expected: IntPtr,
                    found: ty,
                });
            }
            Ok(Int)
        }
        "NEW" => {
            let expr = inner
                .child_mut(g, "expr", 1)
                .ok_or(SemError::MalformedTree)?;
            let ty = annotate_expr(expr, current, table, g)?;
            if ty != Int {
                return Err(SemError::TypeMismatch {
                    expected: Int,
                    found: ty,
                });
            }
            Ok(IntPtr)
        }
        _ => Err(SemError::MalformedTree),
    }
}

/// `factor -> ID LPAREN [arglist] RPAREN`: the callee must be a known
/// procedure not shadowed by a local, and the argument types must match
/// its signature pairwise.
fn annotate_call(
    inner: &mut InnerNode,
    current: &Procedure,
    table: &ProcedureTable,
    g: &Grammar,
) -> Result<DataType, SemError> {
    let name = leaf_lexeme(inner, g, "ID")?;
    let signature = table.get(&name)?.signature.clone();
    if current.locals.contains(&name) {
        return Err(SemError::CallShadowedByVariable(name));
    }

    let mut args = Vec::new();
    if inner.children.len() == 4 {
        let mut cur = inner
            .child_mut(g, "arglist", 1)
            .ok_or(SemError::MalformedTree)?;
        loop {
            let list = match cur {
                ParseNode::Inner(list) => list,
                ParseNode::Leaf(_) => return Err(SemError::MalformedTree),
            };
            let expr = list
                .child_mut(g, "expr", 1)
                .ok_or(SemError::MalformedTree)?;
            args.push(annotate_expr(expr, current, table, g)?);
            // arglist -> expr | expr COMMA arglist
            if list.children.len() == 1 {
                break;
            }
            cur = list
                .child_mut(g, "arglist", 1)
                .ok_or(SemError::MalformedTree)?;
        }
    }

    if args.len() != signature.len() {
        return Err(SemError::ArityMismatch(name));
    }
    for (index, (&found, &expected)) in args.iter().zip(signature.iter()).enumerate() {
        if found != expected {
            return Err(SemError::ArgumentType {
                name,
                index: index + 1,
                expected,
                found,
            });
        }
    }
    Ok(DataType::Int)
}

fn annotate_lvalue(
    inner: &mut InnerNode,
    current: &Procedure,
    table: &ProcedureTable,
    g: &Grammar,
) -> Result<DataType, SemError> {
    match inner.rhs_name(g, 0).ok_or(SemError::MalformedTree)? {
        "ID" => {
            let name = leaf_lexeme(inner, g, "ID")?;
            current.locals.get(&name)
        }
        "STAR" => {
            let factor = inner
                .child_mut(g, "factor", 1)
                .ok_or(SemError::MalformedTree)?;
            let ty = annotate_expr(factor, current, table, g)?;
            if ty != DataType::IntPtr {
                return Err(SemError::TypeMismatch {
                    expected: DataType::IntPtr,
                    found: ty,
                });
            }
            Ok(DataType::Int)
        }
        "LPAREN" => {
            let lvalue = inner
                .child_mut(g, "lvalue", 1)
                .ok_or(SemError::MalformedTree)?;
            annotate_expr(lvalue, current, table, g)
        }
        _ => Err(SemError::MalformedTree),
    }
}

fn leaf_lexeme(inner: &InnerNode, g: &Grammar, kind: &str) -> Result<String, SemError> {
    Ok(inner
        .child(g, kind, 1)
        .and_then(|n| n.leaf())
        .ok_or(SemError::MalformedTree)?
        .lexeme
        .clone())
}

#[cfg(test)]
mod tests {
    use crate::symbols::analyze;
    use crate::SemError;
    use wlp4c_lex::{tokenize, Dfa, Wlp4Rules};
    use wlp4c_par::{parse, Grammar, ParseNode, SlrTables};
    use wlp4c_util::DataType;

    fn check(source: &str) -> Result<(Grammar, ParseNode), SemError> {
        let dfa = Dfa::parse(wlp4c_lex::WLP4_DFA).unwrap();
        let tokens = tokenize(&dfa, source, &Wlp4Rules).unwrap();
        let g = Grammar::parse(wlp4c_par::WLP4_CFG).unwrap();
        let tables = SlrTables::generate(&g).unwrap();
        let mut tree = parse(tokens, &g, &tables).unwrap();
        analyze(&mut tree, &g)?;
        Ok((g, tree))
    }

    fn all_expression_nodes_typed(node: &ParseNode, g: &Grammar) -> bool {
        let Some(inner) = node.inner() else {
            return true;
        };
        let lhs = inner.lhs_name(g);
        let needs_type = matches!(lhs, "expr" | "term" | "factor" | "lvalue");
        if needs_type && inner.ty.is_none() {
            return false;
        }
        inner
            .children
            .iter()
            .all(|c| all_expression_nodes_typed(c, g))
    }

    #[test]
    fn simple_wain_checks() {
        let (g, tree) = check("int wain(int a, int b) { return a + b; }").unwrap();
        assert!(all_expression_nodes_typed(&tree, &g));
    }

    #[test]
    fn pointer_program_is_fully_annotated() {
        let src = "int wain(int* a, int b) { int x = 0; x = *(a + b); return x; }";
        let (g, tree) = check(src).unwrap();
        assert!(all_expression_nodes_typed(&tree, &g));
    }

    #[test]
    fn wain_second_param_must_be_int() {
        let err = check("int wain(int a, int* b) { return a; }").unwrap_err();
        assert!(matches!(err, SemError::BadWainSignature));
    }

    #[test]
    fn duplicate_variable_rejected() {
        let err = check("int wain(int a, int a) { return 0; }").unwrap_err();
        assert!(matches!(err, SemError::DuplicateVariable(_)));
    }

    #[test]
    fn undeclared_variable_rejected() {
        let err = check("int wain(int a, int b) { return c; }").unwrap_err();
        assert!(matches!(err, SemError::UndeclaredVariable(_)));
    }

    #[test]
    fn duplicate_procedure_rejected() {
        let src = "int f() { return 0; } int f() { return 0; } \
                   int wain(int a, int b) { return 0; }";
        let err = check(src).unwrap_err();
        assert!(matches!(err, SemError::DuplicateProcedure(_)));
    }

    #[test]
    fn forward_reference_rejected_but_recursion_allowed() {
        let forward = "int f() { return g(); } int g() { return 0; } \
                       int wain(int a, int b) { return 0; }";
        assert!(matches!(
            check(forward).unwrap_err(),
            SemError::UndeclaredProcedure(_)
        ));

        let recursive = "int f(int n) { int r = 0; \
                         if (n < 1) { r = 0; } else { r = f(n - 1); } \
                         return r; } \
                         int wain(int a, int b) { return f(a); }";
        assert!(check(recursive).is_ok());
    }

    #[test]
    fn local_shadowing_a_procedure_blocks_the_call() {
        let src = "int f() { return 0; } \
                   int wain(int f, int b) { return f(); }";
        let err = check(src).unwrap_err();
        assert!(matches!(err, SemError::CallShadowedByVariable(_)));
    }

    #[test]
    fn call_arity_and_argument_types_checked() {
        let base = "int f(int x, int* y) { return x; } int wain(int* a, int b) ";
        let err = check(&format!("{base}{{ return f(b); }}")).unwrap_err();
        assert!(matches!(err, SemError::ArityMismatch(_)));
        let err = check(&format!("{base}{{ return f(a, a); }}")).unwrap_err();
        assert!(matches!(err, SemError::ArgumentType { index: 1, .. }));
        assert!(check(&format!("{base}{{ return f(b, a); }}")).is_ok());
    }

    #[test]
    fn initializer_must_match_declared_type() {
        let err = check("int wain(int a, int b) { int* p = 0; return a; }").unwrap_err();
        assert!(matches!(err, SemError::BadInitializer(_)));
        let err = check("int wain(int a, int b) { int x = NULL; return a; }").unwrap_err();
        assert!(matches!(err, SemError::BadInitializer(_)));
        assert!(check("int wain(int a, int b) { int* p = NULL; int x = 7; return x; }").is_ok());
    }

    #[test]
    fn pointer_arithmetic_rules() {
        let base = "int wain(int* a, int b) ";
        // int* + int* is never legal.
        let err = check(&format!("{base}{{ return *(a + a); }}")).unwrap_err();
        assert!(matches!(err, SemError::OperandTypes { .. }));
        // int - int* is never legal.
        let err = check(&format!("{base}{{ int* p = NULL; p = b - a; return 0; }}")).unwrap_err();
        assert!(matches!(err, SemError::OperandTypes { .. }));
        // int* - int* is int; int* + int and int + int* are int*.
        assert!(check(&format!("{base}{{ return a - a; }}")).is_ok());
        assert!(check(&format!("{base}{{ return *(a + b) + *(b + a); }}")).is_ok());
    }

    #[test]
    fn multiplication_requires_ints() {
        let err = check("int wain(int* a, int b) { return *(a * b); }").unwrap_err();
        assert!(matches!(err, SemError::OperandTypes { .. }));
    }

    #[test]
    fn statement_type_rules() {
        let base = "int wain(int* a, int b) ";
        let err = check(&format!("{base}{{ println(a); return 0; }}")).unwrap_err();
        assert!(matches!(err, SemError::TypeMismatch { .. }));
        let err = check(&format!("{base}{{ delete [] b; return 0; }}")).unwrap_err();
        assert!(matches!(err, SemError::TypeMismatch { .. }));
        let err = check(&format!("{base}{{ b = a; return 0; }}")).unwrap_err();
        assert!(matches!(err, SemError::OperandTypes { .. }));
        let err = check(&format!("{base}{{ while (a < b) {{ b = 0; }} return 0; }}")).unwrap_err();
        assert!(matches!(err, SemError::OperandTypes { .. }));
    }

    #[test]
    fn return_expression_must_be_int() {
        let err = check("int wain(int* a, int b) { return a; }").unwrap_err();
        assert!(matches!(err, SemError::ReturnType(DataType::IntPtr)));
        let err = check("int f() { return NULL; } int wain(int a, int b) { return 0; }")
            .unwrap_err();
        assert!(matches!(err, SemError::ReturnType(_)));
    }

    #[test]
    fn address_of_and_dereference() {
        let base = "int wain(int a, int b) ";
        assert!(check(&format!("{base}{{ int* p = NULL; p = &a; return *p; }}")).is_ok());
        // &(pointer) is ill-typed.
        let err = check("int wain(int* a, int b) { int* p = NULL; p = &a; return 0; }")
            .unwrap_err();
        assert!(matches!(
            err,
            SemError::TypeMismatch {
                expected: DataType::Int,
                ..
            }
        ));
    }
}
