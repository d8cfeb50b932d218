use std::marker::PhantomData;

use num_traits::{AsPrimitive, PrimInt, Unsigned};
use vob::Vob;

use super::grammar::{LLGrammar, TokenKind};
use crate::{PIdx, RIdx, Symbol};

/// `LLNullables` stores which of a grammar's rules can derive the empty sequence.
/// Terminals are never nullable; a rule is nullable iff at least one of its productions
/// consists solely of already-nullable elements (an empty production vacuously so).
#[derive(Debug)]
pub struct LLNullables<StorageT> {
    nullables: Vob,
    phantom: PhantomData<StorageT>,
}

impl<StorageT: 'static + PrimInt + Unsigned> LLNullables<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Generates and returns the nullable set for the given grammar.
    pub fn new<T: TokenKind, Out>(grm: &LLGrammar<T, Out, StorageT>) -> Self {
        let mut nullables = Vob::from_elem(usize::from(grm.rules_len()), false);
        // Fixpoint: the set grows monotonically and is bounded by the rule count, so
        // this always terminates.
        loop {
            let mut changed = false;
            for ridx in grm.iter_rules() {
                if nullables[usize::from(ridx)] {
                    continue;
                }
                for &pidx in grm.rule_to_prods(ridx).iter() {
                    let prod_nullable = grm.prod(pidx).iter().all(|sym| match *sym {
                        Symbol::Token(_) => false,
                        Symbol::Rule(s_ridx) => nullables[usize::from(s_ridx)],
                    });
                    if prod_nullable {
                        nullables.set(usize::from(ridx), true);
                        changed = true;
                        break;
                    }
                }
            }
            if !changed {
                return LLNullables {
                    nullables,
                    phantom: PhantomData,
                };
            }
        }
    }

    /// Returns true if rule `ridx` is nullable.
    pub fn is_set(&self, ridx: RIdx<StorageT>) -> bool {
        self.nullables[usize::from(ridx)]
    }

    /// Returns true if every element of production `pidx` is nullable (vacuously true
    /// for an empty production).
    pub fn prod_is_nullable<T: TokenKind, Out>(
        &self,
        grm: &LLGrammar<T, Out, StorageT>,
        pidx: PIdx<StorageT>,
    ) -> bool {
        grm.prod(pidx).iter().all(|sym| match *sym {
            Symbol::Token(_) => false,
            Symbol::Rule(s_ridx) => self.is_set(s_ridx),
        })
    }
}

#[cfg(test)]
mod test {
    use super::{
        super::grammar::{Element, GrammarBuilder, LLGrammar, TokenKind},
        LLNullables,
    };

    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    enum TestTok {
        A,
        B,
        C,
    }

    impl TokenKind for TestTok {
        fn all() -> &'static [Self] {
            &[TestTok::A, TestTok::B, TestTok::C]
        }
    }

    fn has(grm: &LLGrammar<TestTok, ()>, nullables: &LLNullables<u32>, rn: &str, expected: bool) {
        let ridx = grm.rule_idx(rn).unwrap();
        if nullables.is_set(ridx) != expected {
            panic!("nullable({}) != {}", rn, expected);
        }
    }

    // S: A B 'c'; A: 'a' | ; B: A A; C: 'c' B;
    fn test_grammar() -> LLGrammar<TestTok, ()> {
        let mut gb = GrammarBuilder::new();
        let s = gb.rule("S");
        let a = gb.rule("A");
        let b = gb.rule("B");
        let c = gb.rule("C");
        gb.prod(
            s,
            vec![
                Element::Rule(a),
                Element::Rule(b),
                Element::Token(TestTok::C),
            ],
            |_| (),
        );
        gb.prod(a, vec![Element::Token(TestTok::A)], |_| ());
        gb.prod(a, vec![], |_| ());
        gb.prod(b, vec![Element::Rule(a), Element::Rule(a)], |_| ());
        gb.prod(c, vec![Element::Token(TestTok::C), Element::Rule(b)], |_| ());
        gb.build(s).unwrap()
    }

    #[test]
    fn test_nullable() {
        let grm = test_grammar();
        let nullables = LLNullables::new(&grm);
        has(&grm, &nullables, "S", false);
        has(&grm, &nullables, "A", true);
        has(&grm, &nullables, "B", true);
        has(&grm, &nullables, "C", false);
        has(&grm, &nullables, "^", false);
    }

    #[test]
    fn test_empty_production_vacuously_nullable() {
        let mut gb = GrammarBuilder::<TestTok, (), u32>::new();
        let s = gb.rule("S");
        gb.prod(s, vec![], |_| ());
        let grm = gb.build(s).unwrap();
        let nullables = LLNullables::new(&grm);
        has(&grm, &nullables, "S", true);
        // The synthetic start rule demands end-of-input, so it never is.
        has(&grm, &nullables, "^", false);
    }

    #[test]
    fn test_prod_is_nullable() {
        let grm = test_grammar();
        let nullables = LLNullables::new(&grm);
        let b = grm.rule_idx("B").unwrap();
        assert!(nullables.prod_is_nullable(&grm, grm.rule_to_prods(b)[0]));
        let c = grm.rule_idx("C").unwrap();
        assert!(!nullables.prod_is_nullable(&grm, grm.rule_to_prods(c)[0]));
    }

    #[test]
    fn test_nullable_order_independent() {
        // The same rules declared in the reverse order produce the same answers.
        let mut gb = GrammarBuilder::<TestTok, (), u32>::new();
        let c = gb.rule("C");
        let b = gb.rule("B");
        let a = gb.rule("A");
        let s = gb.rule("S");
        gb.prod(
            s,
            vec![
                Element::Rule(a),
                Element::Rule(b),
                Element::Token(TestTok::C),
            ],
            |_| (),
        );
        gb.prod(a, vec![Element::Token(TestTok::A)], |_| ());
        gb.prod(a, vec![], |_| ());
        gb.prod(b, vec![Element::Rule(a), Element::Rule(a)], |_| ());
        gb.prod(c, vec![Element::Token(TestTok::C), Element::Rule(b)], |_| ());
        let grm = gb.build(s).unwrap();
        let nullables = LLNullables::new(&grm);
        for (rn, expected) in [("S", false), ("A", true), ("B", true), ("C", false)] {
            has(&grm, &nullables, rn, expected);
        }
    }
}
