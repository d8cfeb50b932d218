use std::marker::PhantomData;

use num_traits::{AsPrimitive, PrimInt, Unsigned};
use vob::Vob;

use super::{
    firsts::LLFirsts,
    grammar::{LLGrammar, TokenKind},
    nullables::LLNullables,
};
use crate::{RIdx, Symbol, TIdx};

/// `LLFollows` stores the FOLLOW set of every rule in a grammar: the terminals that can
/// immediately follow that rule in some derivation. End-of-input needs no special
/// seeding: the synthetic start production mentions the end-of-input terminal
/// explicitly, so it propagates into FOLLOW of the user's start rule like any other
/// token.
#[derive(Debug)]
pub struct LLFollows<StorageT> {
    follows: Vec<Vob>,
    phantom: PhantomData<StorageT>,
}

impl<StorageT: 'static + PrimInt + Unsigned> LLFollows<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Generates and returns the FOLLOW sets for the given grammar. `nullables` and
    /// `firsts` must have been computed for the same grammar.
    pub fn new<T: TokenKind, Out>(
        grm: &LLGrammar<T, Out, StorageT>,
        nullables: &LLNullables<StorageT>,
        firsts: &LLFirsts<StorageT>,
    ) -> Self {
        let mut follows = vec![
            Vob::from_elem(usize::from(grm.tokens_len()), false);
            usize::from(grm.rules_len())
        ];

        loop {
            let mut changed = false;
            for pidx in grm.iter_pidxs() {
                let ridx = grm.prod_to_rule(pidx);
                // Walk the production right to left, keeping in `trailer` the set of
                // terminals that can follow the current position. The trailer starts as
                // FOLLOW of the production's own rule; a fresh copy per production, so
                // updates to it never alias the sets being built.
                let mut trailer = follows[usize::from(ridx)].clone();
                for sym in grm.prod(pidx).iter().rev() {
                    match *sym {
                        Symbol::Token(s_tidx) => {
                            trailer = Vob::from_elem(usize::from(grm.tokens_len()), false);
                            trailer.set(usize::from(s_tidx), true);
                        }
                        Symbol::Rule(s_ridx) => {
                            if follows[usize::from(s_ridx)].or(&trailer) {
                                changed = true;
                            }
                            if nullables.is_set(s_ridx) {
                                trailer.or(firsts.firsts(s_ridx));
                            } else {
                                trailer = firsts.firsts(s_ridx).clone();
                            }
                        }
                    }
                }
            }
            if !changed {
                return LLFollows {
                    follows,
                    phantom: PhantomData,
                };
            }
        }
    }

    /// Return the FOLLOW set for rule `ridx` as a token-indexed bit vector.
    pub fn follows(&self, ridx: RIdx<StorageT>) -> &Vob {
        &self.follows[usize::from(ridx)]
    }

    /// Returns true if the token `tidx` is in the FOLLOW set for rule `ridx`.
    pub fn is_set(&self, ridx: RIdx<StorageT>, tidx: TIdx<StorageT>) -> bool {
        self.follows[usize::from(ridx)][usize::from(tidx)]
    }
}
