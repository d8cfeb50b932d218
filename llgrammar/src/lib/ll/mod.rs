//! LL grammar construction and the static analyses (nullable, FIRST, FOLLOW) needed to
//! compile a deterministic one-token-lookahead parse table from one.

mod firsts;
mod follows;
pub mod grammar;
mod nullables;

pub use self::{
    firsts::LLFirsts,
    follows::LLFollows,
    grammar::{
        ActionFn, Child, Element, GrammarBuilder, LLGrammar, LLGrammarError, LLGrammarErrorKind,
        Token, TokenKind,
    },
    nullables::LLNullables,
};
