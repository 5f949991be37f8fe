//! Symbol collection.
//!
//! Walks the `procedures` chain from the start symbol and builds, for each
//! procedure (including `main`, whose runtime name is hard-wired to
//! `wain`), its signature and local variable table; the procedures
//! themselves go into a global table keyed by name.

use crate::annotate::annotate_procedure;
use crate::SemError;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use wlp4c_par::{Grammar, ParseNode};
use wlp4c_util::DataType;

/// A declared variable.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: DataType,
}

impl Variable {
    /// Reads a `dcl -> type ID` node. A one-child `type` is `int`, a
    /// two-child `type` is `int*`.
    pub fn from_dcl(node: &ParseNode, g: &Grammar) -> Result<Self, SemError> {
        let inner = node.inner().ok_or(SemError::MalformedTree)?;
        let ty_node = inner
            .child(g, "type", 1)
            .and_then(|n| n.inner())
            .ok_or(SemError::MalformedTree)?;
        let ty = match ty_node.children.len() {
            1 => DataType::Int,
            _ => DataType::IntPtr,
        };
        let name = inner
            .child(g, "ID", 1)
            .and_then(|n| n.leaf())
            .ok_or(SemError::MalformedTree)?
            .lexeme
            .clone();
        Ok(Variable { name, ty })
    }
}

/// Variables of one procedure. Names are unique within the table.
#[derive(Debug, Default, Clone)]
pub struct VariableTable {
    vars: FxHashMap<String, DataType>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, var: Variable) -> Result<(), SemError> {
        if self.vars.contains_key(&var.name) {
            return Err(SemError::DuplicateVariable(var.name));
        }
        self.vars.insert(var.name, var.ty);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<DataType, SemError> {
        self.vars
            .get(name)
            .copied()
            .ok_or_else(|| SemError::UndeclaredVariable(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }
}

/// A procedure: its name, parameter types in source order, and locals
/// (parameters included).
#[derive(Debug, Clone)]
pub struct Procedure {
    pub name: String,
    pub signature: Vec<DataType>,
    pub locals: VariableTable,
}

impl Procedure {
    /// Reads a `procedure` node.
    pub fn from_procedure(node: &ParseNode, g: &Grammar) -> Result<Self, SemError> {
        let inner = node.inner().ok_or(SemError::MalformedTree)?;
        let name = inner
            .child(g, "ID", 1)
            .and_then(|n| n.leaf())
            .ok_or(SemError::MalformedTree)?
            .lexeme
            .clone();

        let mut signature = Vec::new();
        let mut locals = VariableTable::new();
        for dcl in param_dcls(node, g)? {
            let var = Variable::from_dcl(dcl, g)?;
            signature.push(var.ty);
            locals.add(var)?;
        }

        let dcls = inner.child(g, "dcls", 1).ok_or(SemError::MalformedTree)?;
        collect_locals(dcls, g, &mut locals)?;

        Ok(Procedure {
            name,
            signature,
            locals,
        })
    }

    /// Reads a `main` node. The runtime name is `wain`, and the second
    /// parameter must be `int`.
    pub fn from_main(node: &ParseNode, g: &Grammar) -> Result<Self, SemError> {
        let inner = node.inner().ok_or(SemError::MalformedTree)?;
        let first = Variable::from_dcl(
            inner.child(g, "dcl", 1).ok_or(SemError::MalformedTree)?,
            g,
        )?;
        let second = Variable::from_dcl(
            inner.child(g, "dcl", 2).ok_or(SemError::MalformedTree)?,
            g,
        )?;
        if second.ty != DataType::Int {
            return Err(SemError::BadWainSignature);
        }

        let mut locals = VariableTable::new();
        let signature = vec![first.ty, second.ty];
        locals.add(first)?;
        locals.add(second)?;

        let dcls = inner.child(g, "dcls", 1).ok_or(SemError::MalformedTree)?;
        collect_locals(dcls, g, &mut locals)?;

        Ok(Procedure {
            name: "wain".to_owned(),
            signature,
            locals,
        })
    }
}

/// The parameter `dcl` nodes of a `procedure`, in source order.
pub fn param_dcls<'t>(node: &'t ParseNode, g: &Grammar) -> Result<Vec<&'t ParseNode>, SemError> {
    let inner = node.inner().ok_or(SemError::MalformedTree)?;
    let params = inner
        .child(g, "params", 1)
        .and_then(|n| n.inner())
        .ok_or(SemError::MalformedTree)?;
    let mut dcls = Vec::new();
    if params.children.is_empty() {
        return Ok(dcls);
    }
    let mut list = params
        .child(g, "paramlist", 1)
        .and_then(|n| n.inner())
        .ok_or(SemError::MalformedTree)?;
    loop {
        dcls.push(list.child(g, "dcl", 1).ok_or(SemError::MalformedTree)?);
        // paramlist -> dcl | dcl COMMA paramlist
        if list.children.len() == 1 {
            return Ok(dcls);
        }
        list = list
            .child(g, "paramlist", 1)
            .and_then(|n| n.inner())
            .ok_or(SemError::MalformedTree)?;
    }
}

/// The local `dcl` nodes of a `dcls` chain, with their initializer tokens,
/// in source order. The chain is left-recursive, so the walk collects
/// outside-in and reverses.
pub fn local_dcls<'t>(
    dcls: &'t ParseNode,
    g: &Grammar,
) -> Result<Vec<(&'t ParseNode, &'t wlp4c_lex::Token)>, SemError> {
    let mut out = Vec::new();
    let mut node = dcls;
    loop {
        let inner = node.inner().ok_or(SemError::MalformedTree)?;
        if inner.children.is_empty() {
            break;
        }
        // dcls -> dcls dcl BECOMES (NUM|NULL) SEMI
        let dcl = inner.child(g, "dcl", 1).ok_or(SemError::MalformedTree)?;
        let init = inner
            .children
            .get(3)
            .and_then(|n| n.leaf())
            .ok_or(SemError::MalformedTree)?;
        out.push((dcl, init));
        node = inner.child(g, "dcls", 1).ok_or(SemError::MalformedTree)?;
    }
    out.reverse();
    Ok(out)
}

fn collect_locals(
    dcls: &ParseNode,
    g: &Grammar,
    locals: &mut VariableTable,
) -> Result<(), SemError> {
    for (dcl, init) in local_dcls(dcls, g)? {
        let var = Variable::from_dcl(dcl, g)?;
        let matches = match init.kind.as_str() {
            "NUM" => var.ty == DataType::Int,
            "NULL" => var.ty == DataType::IntPtr,
            _ => false,
        };
        if !matches {
            return Err(SemError::BadInitializer(var.name));
        }
        locals.add(var)?;
    }
    Ok(())
}

/// All procedures, keyed by name, in declaration order.
#[derive(Debug, Default)]
pub struct ProcedureTable {
    procs: IndexMap<String, Procedure>,
}

impl ProcedureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, proc: Procedure) -> Result<(), SemError> {
        if self.procs.contains_key(&proc.name) {
            return Err(SemError::DuplicateProcedure(proc.name));
        }
        self.procs.insert(proc.name.clone(), proc);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Procedure, SemError> {
        self.procs
            .get(name)
            .ok_or_else(|| SemError::UndeclaredProcedure(name.to_owned()))
    }

    pub fn find(&self, name: &str) -> Option<&Procedure> {
        self.procs.get(name)
    }
}

/// Collects every procedure and type-checks its body, in source order.
/// On success the tree is fully annotated and the table covers every
/// procedure, `wain` included.
pub fn analyze(tree: &mut ParseNode, g: &Grammar) -> Result<ProcedureTable, SemError> {
    let mut table = ProcedureTable::new();

    let root = tree.inner_mut().ok_or(SemError::MalformedTree)?;
    let mut cur = root
        .child_mut(g, "procedures", 1)
        .ok_or(SemError::MalformedTree)?;

    loop {
        let inner = match cur {
            ParseNode::Inner(inner) => inner,
            ParseNode::Leaf(_) => return Err(SemError::MalformedTree),
        };
        let is_main = inner.rhs_name(g, 0) == Some("main");
        let kind = if is_main { "main" } else { "procedure" };

        let proc_node = inner
            .child_mut(g, kind, 1)
            .ok_or(SemError::MalformedTree)?;
        let proc = if is_main {
            Procedure::from_main(proc_node, g)?
        } else {
            Procedure::from_procedure(proc_node, g)?
        };
        let name = proc.name.clone();
        table.add(proc)?;
        annotate_procedure(proc_node, table.get(&name)?, &table, g)?;

        if is_main {
            return Ok(table);
        }
        cur = inner
            .child_mut(g, "procedures", 1)
            .ok_or(SemError::MalformedTree)?;
    }
}
