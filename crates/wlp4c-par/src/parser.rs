//! SLR(1) shift-reduce drive loop.
//!
//! The token stream is augmented with `BOF` at the front and `EOF` plus an
//! `.ACCEPT` marker at the back. At each step, reductions are exhausted
//! before the shift/accept decision. Reductions pop right-hand sides off
//! the state and tree stacks and push the new inner node; shifts wrap the
//! front token as a leaf. When neither applies, the front token must be the
//! `.ACCEPT` marker, and exactly one tree remains: the augmented start.

use crate::grammar::{Grammar, ACCEPT_MARKER};
use crate::tables::SlrTables;
use crate::tree::{InnerNode, ParseNode};
use std::collections::VecDeque;
use thiserror::Error;
use wlp4c_lex::Token;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected token {kind} '{lexeme}'")]
    NoAction { kind: String, lexeme: String },

    #[error("token kind {0} is not a grammar symbol")]
    UnknownKind(String),

    #[error("no goto from state {state} on {symbol}")]
    MissingGoto { state: u32, symbol: String },

    #[error("parser stacks out of step (this is a bug)")]
    StackMismatch,
}

/// Parses a token stream into the augmented start tree.
pub fn parse(
    tokens: Vec<Token>,
    g: &Grammar,
    tables: &SlrTables,
) -> Result<ParseNode, ParseError> {
    let mut input: VecDeque<Token> = tokens.into();
    input.push_front(Token::new("BOF", "BOF"));
    input.push_back(Token::new("EOF", "EOF"));
    input.push_back(Token::new(ACCEPT_MARKER, ACCEPT_MARKER));

    let mut states: Vec<u32> = vec![0];
    let mut trees: Vec<ParseNode> = Vec::new();

    while let Some(front) = input.front() {
        let lookahead = g
            .lookup(&front.kind)
            .ok_or_else(|| ParseError::UnknownKind(front.kind.clone()))?;

        // Reduce as long as possible.
        while let Some(rule_id) = tables.reduction(top(&states)?, lookahead) {
            let rule = g.rule(rule_id);
            let arity = rule.rhs.len();
            if trees.len() < arity || states.len() <= arity {
                return Err(ParseError::StackMismatch);
            }
            let children = trees.split_off(trees.len() - arity);
            trees.push(ParseNode::Inner(InnerNode {
                rule: rule_id,
                ty: None,
                children,
            }));
            states.truncate(states.len() - arity);
            let goto = tables
                .transition(top(&states)?, rule.lhs)
                .ok_or_else(|| ParseError::MissingGoto {
                    state: *states.last().unwrap_or(&0),
                    symbol: g.sym_name(rule.lhs).to_owned(),
                })?;
            states.push(goto);
        }

        // Shift, or accept.
        if let Some(next) = tables.transition(top(&states)?, lookahead) {
            states.push(next);
            let token = input.pop_front().ok_or(ParseError::StackMismatch)?;
            trees.push(ParseNode::Leaf(token));
        } else if front.lexeme == ACCEPT_MARKER {
            input.pop_front();
        } else {
            return Err(ParseError::NoAction {
                kind: front.kind.clone(),
                lexeme: front.lexeme.clone(),
            });
        }
    }

    if trees.len() != 1 {
        return Err(ParseError::StackMismatch);
    }
    Ok(trees.remove(0))
}

fn top(states: &[u32]) -> Result<u32, ParseError> {
    states.last().copied().ok_or(ParseError::StackMismatch)
}
