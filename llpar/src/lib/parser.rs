use std::{error::Error, fmt};

use llgrammar::{
    ll::{Child, LLGrammar, Token, TokenKind},
    PIdx, Symbol,
};
use num_traits::{AsPrimitive, PrimInt, Unsigned};

use crate::{
    lltable::{LLTable, LLTableError},
    tokenstream::TokenStream,
};

/// The various different possible parse errors.
#[derive(Debug, Eq, PartialEq)]
pub enum ParseErrorKind {
    /// The terminal demanded by the grammar and the lookahead token disagree.
    UnexpectedToken { expected: String, actual: String },
    /// A rule was to be expanded but the transition table has no entry for the
    /// lookahead terminal.
    NoTransition { rule: String, lookahead: String },
}

/// A syntax error, aborting the parse it occurred in. Carries the most precise
/// position available: line and column when the offending token has them, else its byte
/// offset; `off` is `None` when the error is at end of input.
#[derive(Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub off: Option<usize>,
    pub line: Option<u32>,
    pub col: Option<u32>,
}

impl Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Syntax error at ")?;
        match (self.off, self.line, self.col) {
            (Some(_), Some(line), Some(col)) => write!(f, "line {} column {}", line, col)?,
            (Some(_), Some(line), None) => write!(f, "line {}", line)?,
            (Some(off), _, _) => write!(f, "offset {}", off)?,
            (None, _, _) => write!(f, "end of input")?,
        }
        match &self.kind {
            ParseErrorKind::UnexpectedToken { expected, actual } => {
                write!(f, ": expected '{}', got '{}'", expected, actual)
            }
            ParseErrorKind::NoTransition { rule, lookahead } => {
                write!(
                    f,
                    ": no valid transition from rule '{}' with lookahead '{}'",
                    rule, lookahead
                )
            }
        }
    }
}

fn syntax_error(
    kind: ParseErrorKind,
    off: usize,
    line: Option<u32>,
    col: Option<u32>,
    at_eof: bool,
) -> ParseError {
    ParseError {
        kind,
        off: if at_eof { None } else { Some(off) },
        line,
        col,
    }
}

/// A node of the parse-internal evaluation tree. Nodes live in a per-parse arena and
/// reference each other by arena index; nothing here escapes a `parse` call except
/// through the semantic actions' view of their children.
struct AstNode<T, StorageT> {
    sym: Symbol<StorageT>,
    children: Vec<usize>,
    token: Option<Token<T>>,
    pidx: Option<PIdx<StorageT>>,
}

impl<T, StorageT> AstNode<T, StorageT> {
    fn new(sym: Symbol<StorageT>) -> Self {
        AstNode {
            sym,
            children: Vec::new(),
            token: None,
            pidx: None,
        }
    }
}

/// An LL(1) grammar compiled into its deterministic transition table. Built once, then
/// reusable for unboundedly many independent parses: it holds no per-parse state and is
/// safe to share read-only across threads.
pub struct CompiledGrammar<T: TokenKind, Out, StorageT = u32> {
    grm: LLGrammar<T, Out, StorageT>,
    table: LLTable<StorageT>,
}

impl<T: TokenKind, Out, StorageT: 'static + PrimInt + Unsigned> CompiledGrammar<T, Out, StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Compile `grm`'s transition table. An LL(1) conflict surfaces here, never at
    /// parse time; there is no partial or degraded compiled form.
    pub fn new(grm: LLGrammar<T, Out, StorageT>) -> Result<Self, LLTableError> {
        let table = LLTable::new(&grm)?;
        Ok(CompiledGrammar { grm, table })
    }

    /// The grammar this compiled form was built from. Callers use it to map the
    /// indices and names appearing in errors back to rules, tokens, and productions.
    pub fn grammar(&self) -> &LLGrammar<T, Out, StorageT> {
        &self.grm
    }

    /// Parse `input`, returning the value the grammar's semantic actions fold it into,
    /// or the first syntax error encountered. The driver is an explicit-stack
    /// automaton: parse depth is bounded by memory, not the call stack.
    pub fn parse<I>(&self, input: I) -> Result<Out, ParseError>
    where
        I: IntoIterator<Item = Token<T>>,
    {
        let mut stream = TokenStream::new(input.into_iter());
        // The synthetic start rule's production ends in the end-of-input terminal, so
        // its node alone seeds the stack: the stack can only empty once end-of-input
        // has been matched and consumed.
        let mut arena: Vec<AstNode<T, StorageT>> = Vec::new();
        let root = arena.len();
        arena.push(AstNode::new(Symbol::Rule(self.grm.start_rule_idx())));
        let mut pstack: Vec<usize> = vec![root];

        loop {
            let (next_tidx, off, line, col, at_eof) = match stream.peek() {
                None => break,
                Some(tok) => {
                    let tidx = match tok.kind() {
                        Some(k) => self.grm.tidx(k),
                        None => self.grm.eof_token_idx(),
                    };
                    (tidx, tok.off(), tok.line(), tok.col(), tok.is_eof())
                }
            };
            // The stream reporting a token means end-of-input hasn't been consumed, so
            // its stack node is still present and the stack is non-empty.
            let nidx = pstack.pop().unwrap();
            match arena[nidx].sym {
                Symbol::Token(tidx) => {
                    if tidx == next_tidx {
                        // Advance the input and attach the matched token.
                        arena[nidx].token = stream.next();
                    } else {
                        return Err(syntax_error(
                            ParseErrorKind::UnexpectedToken {
                                expected: self.grm.token_name(tidx).to_string(),
                                actual: self.grm.token_name(next_tidx).to_string(),
                            },
                            off,
                            line,
                            col,
                            at_eof,
                        ));
                    }
                }
                Symbol::Rule(ridx) => match self.table.entry(ridx, next_tidx) {
                    Some(pidx) => {
                        arena[nidx].pidx = Some(pidx);
                        let prod = self.grm.prod(pidx);
                        let mut children = Vec::with_capacity(prod.len());
                        for &sym in prod.iter() {
                            children.push(arena.len());
                            arena.push(AstNode::new(sym));
                        }
                        // Push right to left so the children pop in left-to-right
                        // order.
                        for &cidx in children.iter().rev() {
                            pstack.push(cidx);
                        }
                        arena[nidx].children = children;
                    }
                    None => {
                        return Err(syntax_error(
                            ParseErrorKind::NoTransition {
                                rule: self.grm.rule_name(ridx).to_string(),
                                lookahead: self.grm.token_name(next_tidx).to_string(),
                            },
                            off,
                            line,
                            col,
                            at_eof,
                        ));
                    }
                },
            }
        }

        Ok(self.evaluate(&mut arena, root))
    }

    /// Fold the completed tree bottom-up into the grammar's result value. Post-order
    /// with an explicit stack: evaluation depth, like parse depth, is bounded by
    /// memory.
    fn evaluate(&self, arena: &mut [AstNode<T, StorageT>], root: usize) -> Out {
        let mut results: Vec<Option<Child<T, Out>>> = Vec::with_capacity(arena.len());
        results.resize_with(arena.len(), || None);
        let mut estack: Vec<(usize, bool)> = vec![(root, false)];
        while let Some((nidx, children_done)) = estack.pop() {
            if !children_done {
                estack.push((nidx, true));
                for &cidx in arena[nidx].children.iter().rev() {
                    estack.push((cidx, false));
                }
                continue;
            }
            let res = if let Some(tok) = arena[nidx].token.take() {
                Child::Token(tok)
            } else {
                let pidx = match arena[nidx].pidx {
                    Some(p) => p,
                    None => panic!("Internal error"),
                };
                let children = std::mem::take(&mut arena[nidx].children);
                let cs = children
                    .iter()
                    .map(|&cidx| match results[cidx].take() {
                        Some(r) => r,
                        None => panic!("Internal error"),
                    })
                    .collect();
                Child::Value((self.grm.action(pidx))(cs))
            };
            results[nidx] = Some(res);
        }
        match results[root].take() {
            Some(Child::Value(v)) => v,
            _ => panic!("Internal error"),
        }
    }
}
