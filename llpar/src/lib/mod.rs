//! A table-driven LL(1) parser and evaluator for grammars built with the
//! [`llgrammar`] crate.
//!
//! [`CompiledGrammar::new`] turns an [`llgrammar::ll::LLGrammar`] into its
//! deterministic transition table, rejecting any grammar with an LL(1) conflict;
//! [`CompiledGrammar::parse`] then runs any number of independent parses over
//! token streams, folding each accepted input into a value via the grammar's
//! semantic actions. Both parsing and evaluation use explicit stacks, so input
//! nesting depth is bounded by memory rather than by the call stack.

mod lltable;
mod parser;
mod tokenstream;

pub use crate::{
    lltable::{LLTable, LLTableError, LLTableErrorKind},
    parser::{CompiledGrammar, ParseError, ParseErrorKind},
    tokenstream::TokenStream,
};
