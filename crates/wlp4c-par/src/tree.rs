//! The parse tree.
//!
//! Nodes are tagged variants: a leaf carries its token, an inner node
//! carries the rule that produced it, its children in source order, and a
//! type slot the annotator fills for expression-like nodes. Parents own
//! their children; the whole tree is dropped in one sweep from the root.

use crate::grammar::Grammar;
use std::fmt::Write;
use wlp4c_lex::Token;
use wlp4c_util::DataType;

#[derive(Debug, Clone)]
pub enum ParseNode {
    Leaf(Token),
    Inner(InnerNode),
}

#[derive(Debug, Clone)]
pub struct InnerNode {
    /// Index of the producing rule in the grammar.
    pub rule: usize,
    /// Filled by the type annotator for expr/term/factor/lvalue nodes.
    pub ty: Option<DataType>,
    /// Children in source order; length equals the rule's rhs length.
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    pub fn leaf(&self) -> Option<&Token> {
        match self {
            ParseNode::Leaf(tok) => Some(tok),
            ParseNode::Inner(_) => None,
        }
    }

    pub fn inner(&self) -> Option<&InnerNode> {
        match self {
            ParseNode::Leaf(_) => None,
            ParseNode::Inner(inner) => Some(inner),
        }
    }

    pub fn inner_mut(&mut self) -> Option<&mut InnerNode> {
        match self {
            ParseNode::Leaf(_) => None,
            ParseNode::Inner(inner) => Some(inner),
        }
    }

    /// The grammar symbol this node stands for: the token kind of a leaf,
    /// or the left-hand side of an inner node's rule.
    pub fn symbol_name<'g>(&'g self, g: &'g Grammar) -> &'g str {
        match self {
            ParseNode::Leaf(tok) => &tok.kind,
            ParseNode::Inner(inner) => g.sym_name(g.rule(inner.rule).lhs),
        }
    }

    /// Annotated type, if any. Leaves carry none.
    pub fn ty(&self) -> Option<DataType> {
        match self {
            ParseNode::Leaf(_) => None,
            ParseNode::Inner(inner) => inner.ty,
        }
    }

    /// Writes the preorder derivation: `lhs rhs...` (or `lhs .EMPTY`) for
    /// inner nodes, `KIND lexeme` for leaves.
    pub fn write_derivation(&self, g: &Grammar, out: &mut String) {
        match self {
            ParseNode::Leaf(tok) => {
                let _ = writeln!(out, "{} {}", tok.kind, tok.lexeme);
            }
            ParseNode::Inner(inner) => {
                let rule = g.rule(inner.rule);
                let _ = write!(out, "{}", g.sym_name(rule.lhs));
                if rule.rhs.is_empty() {
                    let _ = write!(out, " .EMPTY");
                } else {
                    for &sym in &rule.rhs {
                        let _ = write!(out, " {}", g.sym_name(sym));
                    }
                }
                let _ = writeln!(out);
                for child in &inner.children {
                    child.write_derivation(g, out);
                }
            }
        }
    }
}

impl InnerNode {
    pub fn lhs_name<'g>(&self, g: &'g Grammar) -> &'g str {
        g.sym_name(g.rule(self.rule).lhs)
    }

    /// Name of the `i`th right-hand-side symbol of the producing rule.
    pub fn rhs_name<'g>(&self, g: &'g Grammar, i: usize) -> Option<&'g str> {
        g.rule(self.rule).rhs.get(i).map(|&s| g.sym_name(s))
    }

    /// The `nth` (1-based) child standing for the named grammar symbol, in
    /// source order.
    pub fn child<'a>(&'a self, g: &Grammar, name: &str, nth: usize) -> Option<&'a ParseNode> {
        let mut remaining = nth;
        for child in &self.children {
            if child.symbol_name(g) == name {
                remaining -= 1;
                if remaining == 0 {
                    return Some(child);
                }
            }
        }
        None
    }

    pub fn child_mut<'a>(
        &'a mut self,
        g: &Grammar,
        name: &str,
        nth: usize,
    ) -> Option<&'a mut ParseNode> {
        let mut remaining = nth;
        for child in &mut self.children {
            if child.symbol_name(g) == name {
                remaining -= 1;
                if remaining == 0 {
                    return Some(child);
                }
            }
        }
        None
    }
}
