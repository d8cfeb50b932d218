use std::{error::Error, fmt};

use llgrammar::{
    ll::{LLFirsts, LLFollows, LLGrammar, LLNullables, TokenKind},
    PIdx, RIdx, Symbol, TIdx,
};
use num_traits::{AsPrimitive, PrimInt, Unsigned};
use vob::Vob;

/// The various ways building an LL(1) table can fail.
#[derive(Debug)]
pub enum LLTableErrorKind {
    Conflict,
}

/// Any error from the LL(1) table builder returns an instance of this struct. All
/// failures are construction-time: a grammar that compiles never fails for
/// grammar-related reasons at parse time.
#[derive(Debug)]
pub struct LLTableError {
    pub kind: LLTableErrorKind,
    /// Name of the rule whose cell was contested.
    pub rule: String,
    /// Name of the lookahead terminal both productions claimed.
    pub lookahead: String,
    /// The two competing productions, pretty-printed.
    pub prods: [String; 2],
}

impl Error for LLTableError {}

impl fmt::Display for LLTableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            LLTableErrorKind::Conflict => write!(
                f,
                "LL(1) conflict in rule '{}' on lookahead '{}': '{}' vs '{}'",
                self.rule, self.lookahead, self.prods[0], self.prods[1]
            ),
        }
    }
}

/// A deterministic LL(1) transition table: one cell per (rule, lookahead terminal)
/// pair, holding the production to expand (or nothing, meaning a syntax error). Rows
/// are rules and columns tokens, stored as a single dense vector, so lookup is two
/// multiplies away from a branch.
#[derive(Debug)]
pub struct LLTable<StorageT> {
    cells: Vec<Option<PIdx<StorageT>>>,
    tokens_len: TIdx<StorageT>,
}

impl<StorageT: 'static + PrimInt + Unsigned> LLTable<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Build the transition table for `grm`, validating that it is LL(1): every
    /// (rule, lookahead) pair must select at most one production. A grammar failing
    /// that property is rejected here with a [`LLTableError`] naming the contested
    /// cell and both competing productions.
    pub fn new<T: TokenKind, Out>(
        grm: &LLGrammar<T, Out, StorageT>,
    ) -> Result<Self, LLTableError> {
        let nullables = LLNullables::new(grm);
        let firsts = LLFirsts::new(grm, &nullables);
        let follows = LLFollows::new(grm, &nullables, &firsts);

        let tokens_len = grm.tokens_len();
        let mut cells = vec![None; usize::from(grm.rules_len()) * usize::from(tokens_len)];
        for ridx in grm.iter_rules() {
            for &pidx in grm.rule_to_prods(ridx).iter() {
                for tidx in prod_firsts(grm, &nullables, &firsts, pidx).iter_set_bits(..) {
                    insert(grm, &mut cells, ridx, TIdx(tidx.as_()), pidx)?;
                }
                // A production that can derive the empty sequence is also chosen on
                // anything that may follow its rule.
                if nullables.prod_is_nullable(grm, pidx) {
                    for tidx in follows.follows(ridx).iter_set_bits(..) {
                        insert(grm, &mut cells, ridx, TIdx(tidx.as_()), pidx)?;
                    }
                }
            }
        }
        Ok(LLTable { cells, tokens_len })
    }

    /// The production to expand for rule `ridx` on lookahead `tidx`, if any.
    pub fn entry(&self, ridx: RIdx<StorageT>, tidx: TIdx<StorageT>) -> Option<PIdx<StorageT>> {
        self.cells[usize::from(ridx) * usize::from(self.tokens_len) + usize::from(tidx)]
    }
}

/// FIRST of production `pidx`'s right-hand side: scan left to right, accumulating FIRST
/// of each element over the longest nullable prefix, including the element that breaks
/// nullability.
fn prod_firsts<T: TokenKind, Out, StorageT: 'static + PrimInt + Unsigned>(
    grm: &LLGrammar<T, Out, StorageT>,
    nullables: &LLNullables<StorageT>,
    firsts: &LLFirsts<StorageT>,
    pidx: PIdx<StorageT>,
) -> Vob
where
    usize: AsPrimitive<StorageT>,
{
    let mut fs = Vob::from_elem(usize::from(grm.tokens_len()), false);
    for sym in grm.prod(pidx).iter() {
        match *sym {
            Symbol::Token(s_tidx) => {
                fs.set(usize::from(s_tidx), true);
                break;
            }
            Symbol::Rule(s_ridx) => {
                fs.or(firsts.firsts(s_ridx));
                if !nullables.is_set(s_ridx) {
                    break;
                }
            }
        }
    }
    fs
}

fn insert<T: TokenKind, Out, StorageT: 'static + PrimInt + Unsigned>(
    grm: &LLGrammar<T, Out, StorageT>,
    cells: &mut [Option<PIdx<StorageT>>],
    ridx: RIdx<StorageT>,
    tidx: TIdx<StorageT>,
    pidx: PIdx<StorageT>,
) -> Result<(), LLTableError>
where
    usize: AsPrimitive<StorageT>,
{
    let off = usize::from(ridx) * usize::from(grm.tokens_len()) + usize::from(tidx);
    match cells[off] {
        None => {
            cells[off] = Some(pidx);
            Ok(())
        }
        // Reasserting the same production (its FIRST set can overlap its rule's FOLLOW
        // set) is not a conflict: the cell still selects deterministically.
        Some(other) if other == pidx => Ok(()),
        Some(other) => Err(LLTableError {
            kind: LLTableErrorKind::Conflict,
            rule: grm.rule_name(ridx).to_string(),
            lookahead: grm.token_name(tidx).to_string(),
            prods: [grm.pp_prod(other), grm.pp_prod(pidx)],
        }),
    }
}
