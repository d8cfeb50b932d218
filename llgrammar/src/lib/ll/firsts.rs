use std::marker::PhantomData;

use num_traits::{AsPrimitive, PrimInt, Unsigned};
use vob::Vob;

use super::{
    grammar::{LLGrammar, TokenKind},
    nullables::LLNullables,
};
use crate::{RIdx, Symbol, TIdx};

/// `LLFirsts` stores the FIRST set of every rule in a grammar: the terminals that can
/// begin some derivation of that rule. For a production's right-hand side, FIRST is
/// accumulated left to right over the longest nullable prefix plus the element that
/// breaks nullability; FIRST of a terminal is the terminal itself. Rules may be
/// mutually recursive, so the computation iterates to a fixpoint.
#[derive(Debug)]
pub struct LLFirsts<StorageT> {
    firsts: Vec<Vob>,
    phantom: PhantomData<StorageT>,
}

impl<StorageT: 'static + PrimInt + Unsigned> LLFirsts<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Generates and returns the FIRST sets for the given grammar. `nullables` must
    /// have been computed for the same grammar.
    pub fn new<T: TokenKind, Out>(
        grm: &LLGrammar<T, Out, StorageT>,
        nullables: &LLNullables<StorageT>,
    ) -> Self {
        let mut firsts = LLFirsts {
            firsts: vec![
                Vob::from_elem(usize::from(grm.tokens_len()), false);
                usize::from(grm.rules_len())
            ],
            phantom: PhantomData,
        };

        // Loop looking for changes to the FIRST sets until we reach a fixpoint. In
        // essence, we look at each rule E and see if any of the rules at the start of
        // its productions have new elements in since we last looked.
        loop {
            let mut changed = false;
            for ridx in grm.iter_rules() {
                for &pidx in grm.rule_to_prods(ridx).iter() {
                    for sym in grm.prod(pidx).iter() {
                        match *sym {
                            Symbol::Token(s_tidx) => {
                                // A terminal ends the nullable prefix: add it and stop.
                                if firsts.set(ridx, s_tidx) {
                                    changed = true;
                                }
                                break;
                            }
                            Symbol::Rule(s_ridx) => {
                                // Union the referenced rule's FIRSTs into ours. This is
                                // (intentionally) a no-op if the two rules are one and
                                // the same.
                                for tidx in grm.iter_tidxs() {
                                    if firsts.is_set(s_ridx, tidx) && firsts.set(ridx, tidx) {
                                        changed = true;
                                    }
                                }
                                if !nullables.is_set(s_ridx) {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            if !changed {
                return firsts;
            }
        }
    }

    /// Return all the firsts for rule `ridx` as a token-indexed bit vector.
    pub fn firsts(&self, ridx: RIdx<StorageT>) -> &Vob {
        &self.firsts[usize::from(ridx)]
    }

    /// Returns true if the token `tidx` is in the FIRST set for rule `ridx`.
    pub fn is_set(&self, ridx: RIdx<StorageT>, tidx: TIdx<StorageT>) -> bool {
        self.firsts[usize::from(ridx)][usize::from(tidx)]
    }

    /// Set the FIRST bit for token `tidx` of rule `ridx`, returning true if this
    /// changed anything.
    fn set(&mut self, ridx: RIdx<StorageT>, tidx: TIdx<StorageT>) -> bool {
        self.firsts[usize::from(ridx)].set(usize::from(tidx), true)
    }
}
