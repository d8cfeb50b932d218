#![allow(clippy::new_without_default)]
#![allow(clippy::upper_case_acronyms)]

//! A library for describing and analysing LL(1) grammars. A grammar is built
//! programmatically: the caller supplies a token-type enumeration (the universe of
//! terminals), allocates rules, attaches alternative productions (each with a semantic
//! action) to them, and designates a start rule. The result is an immutable
//! [`LLGrammar`](ll/struct.LLGrammar.html) over which the classic nullable/FIRST/FOLLOW
//! analyses can be run; table construction and parsing live in the `llpar` crate.
//!
//! llgrammar makes the following guarantees about grammars:
//!
//!   * Productions are numbered from `0` to `prods_len() - 1` (inclusive).
//!   * Rules are numbered from `0` to `rules_len() - 1` (inclusive).
//!   * Tokens are numbered from `0` to `tokens_len() - 1` (inclusive); the reserved
//!     end-of-input terminal is the last token index and is never a member of the
//!     caller's enumeration.
//!   * Rules are identified by the handle returned from
//!     [`GrammarBuilder::rule`](ll/struct.GrammarBuilder.html#method.rule), not by name:
//!     two rules that share a name are still distinct. Grammars are graphs, often
//!     mutually recursive, and name equality would accidentally collapse distinct
//!     recursive occurrences.
//!   * The `StorageT` type used to store production, rule, and token indices can be
//!     infallibly converted into `usize` (see [`TIdx`](struct.TIdx.html) and friends for
//!     more details).

mod idxnewtype;
pub mod ll;

pub use crate::idxnewtype::{PIdx, RIdx, TIdx};

/// The internal representation of a single element on a production's right-hand side:
/// either a rule (non-terminal) or a token (terminal), both as arena indices.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Symbol<StorageT> {
    Rule(RIdx<StorageT>),
    Token(TIdx<StorageT>),
}
