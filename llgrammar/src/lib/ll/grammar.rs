use std::{collections::HashMap, error::Error, fmt};

use num_traits::{self, AsPrimitive, PrimInt, Unsigned};

use crate::{PIdx, RIdx, Symbol, TIdx};

const START_RULE: &str = "^";

/// The caller's token-type enumeration: the universe of terminals a grammar is defined
/// over. The reserved end-of-input terminal is always implicitly available and must not
/// be a member of the enumeration (it is appended as the final token index by
/// [`GrammarBuilder`]).
pub trait TokenKind: Copy + Eq + std::hash::Hash + fmt::Debug + 'static {
    /// Every member of the enumeration, in a fixed order. Each member must appear
    /// exactly once.
    fn all() -> &'static [Self];
}

/// A single token as produced by a lexer (which lives outside this library). `kind` is
/// `None` only for the end-of-input token.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token<T> {
    kind: Option<T>,
    value: String,
    off: usize,
    line: Option<u32>,
    col: Option<u32>,
}

impl<T: TokenKind> Token<T> {
    /// Create a token of kind `kind` whose raw lexical value is `value`, starting at
    /// byte offset `off` in the input.
    pub fn new<S: Into<String>>(kind: T, value: S, off: usize) -> Self {
        Token {
            kind: Some(kind),
            value: value.into(),
            off,
            line: None,
            col: None,
        }
    }

    /// Attach a line and column number to this token. Position reporting degrades to
    /// offset-only for tokens without one.
    pub fn with_line_col(mut self, line: u32, col: u32) -> Self {
        self.line = Some(line);
        self.col = Some(col);
        self
    }

    /// The reserved end-of-input token. Callers never need to append this to their
    /// input: the token stream synthesizes it after the real input is exhausted.
    pub fn eof() -> Self {
        Token {
            kind: None,
            value: String::new(),
            off: 0,
            line: None,
            col: None,
        }
    }

    /// This token's kind; `None` only for the end-of-input token.
    pub fn kind(&self) -> Option<T> {
        self.kind
    }

    pub fn is_eof(&self) -> bool {
        self.kind.is_none()
    }

    /// The raw lexical value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Byte offset of the start of the token. Meaningless for the end-of-input token.
    pub fn off(&self) -> usize {
        self.off
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn col(&self) -> Option<u32> {
        self.col
    }
}

/// One evaluated child of a production, in right-hand-side order: either the raw token a
/// terminal matched, or the value a nested rule's semantic action produced.
#[derive(Debug)]
pub enum Child<T, Out> {
    Token(Token<T>),
    Value(Out),
}

/// A semantic action: folds the ordered child results of one production into the
/// production's result value. Actions are `Send + Sync` so that a compiled grammar can
/// be shared across threads.
pub type ActionFn<T, Out> = Box<dyn Fn(Vec<Child<T, Out>>) -> Out + Send + Sync>;

/// A production element as written by the caller: a terminal from the token-type
/// enumeration, or a rule handle from [`GrammarBuilder::rule`].
#[derive(Clone, Copy, Debug)]
pub enum Element<T, StorageT = u32> {
    Token(T),
    Rule(RIdx<StorageT>),
}

/// The various ways a grammar can be malformed at build time.
#[derive(Debug, Eq, PartialEq)]
pub enum LLGrammarErrorKind {
    RuleHasNoProductions,
    InvalidStartRule,
}

/// Returned by [`GrammarBuilder::build`] when the grammar breaks a structural
/// invariant. LL(1) conflicts are a separate, later failure (table construction).
#[derive(Debug)]
pub struct LLGrammarError {
    pub kind: LLGrammarErrorKind,
    /// The rule the error refers to (a name for `RuleHasNoProductions`, the offending
    /// handle rendered as `#n` for `InvalidStartRule`).
    pub rule: String,
}

impl Error for LLGrammarError {}

impl fmt::Display for LLGrammarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            LLGrammarErrorKind::RuleHasNoProductions => {
                write!(f, "Rule '{}' has no productions", self.rule)
            }
            LLGrammarErrorKind::InvalidStartRule => {
                write!(f, "Start rule '{}' does not appear in the grammar", self.rule)
            }
        }
    }
}

/// Accumulates rules and productions, then builds an immutable [`LLGrammar`].
///
/// `T` is the caller's token-type enumeration, `Out` the result type its semantic
/// actions produce, and `StorageT` the unsigned type indices are stored in.
pub struct GrammarBuilder<T, Out, StorageT = u32> {
    rule_names: Vec<String>,
    rules_prods: Vec<Vec<PIdx<StorageT>>>,
    prods: Vec<Vec<Symbol<StorageT>>>,
    prods_rules: Vec<RIdx<StorageT>>,
    actions: Vec<ActionFn<T, Out>>,
    token_map: HashMap<T, TIdx<StorageT>>,
    token_names: Vec<String>,
    eof_token_idx: TIdx<StorageT>,
}

impl<T: TokenKind, Out, StorageT: 'static + PrimInt + Unsigned> GrammarBuilder<T, Out, StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    pub fn new() -> Self {
        let all = T::all();
        if all.len() + 1 > num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's tokens.");
        }
        let mut token_map = HashMap::with_capacity(all.len());
        let mut token_names = Vec::with_capacity(all.len() + 1);
        for (i, t) in all.iter().enumerate() {
            if token_map.insert(*t, TIdx(i.as_())).is_some() {
                panic!("Token kind {:?} appears twice in TokenKind::all().", t);
            }
            token_names.push(format!("{:?}", t));
        }
        let eof_token_idx = TIdx(all.len().as_());
        token_names.push("$".to_string());
        GrammarBuilder {
            rule_names: Vec::new(),
            rules_prods: Vec::new(),
            prods: Vec::new(),
            prods_rules: Vec::new(),
            actions: Vec::new(),
            token_map,
            token_names,
            eof_token_idx,
        }
    }

    /// Allocate a fresh rule and return its handle. `name` is used for diagnostics
    /// only: two rules sharing a name are still distinct rules.
    pub fn rule(&mut self, name: &str) -> RIdx<StorageT> {
        // The `+ 1` reserves room for the synthetic start rule added by `build`.
        if self.rule_names.len() + 1 >= num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's rules.");
        }
        let ridx = RIdx(self.rule_names.len().as_());
        self.rule_names.push(name.to_string());
        self.rules_prods.push(Vec::new());
        ridx
    }

    /// Append one alternative production (possibly empty) to rule `ridx`, with the
    /// semantic action evaluated for it at parse time. Panics if `ridx` or a referenced
    /// element does not belong to this builder's arena.
    pub fn prod<F>(&mut self, ridx: RIdx<StorageT>, elems: Vec<Element<T, StorageT>>, action: F)
    where
        F: Fn(Vec<Child<T, Out>>) -> Out + Send + Sync + 'static,
    {
        if usize::from(ridx) >= self.rule_names.len() {
            panic!("Rule handle #{} does not belong to this grammar.", usize::from(ridx));
        }
        if self.prods.len() + 1 >= num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's productions.");
        }
        let mut prod = Vec::with_capacity(elems.len());
        for e in elems {
            match e {
                Element::Token(t) => match self.token_map.get(&t) {
                    Some(&tidx) => prod.push(Symbol::Token(tidx)),
                    None => panic!("Token kind {:?} is not in TokenKind::all().", t),
                },
                Element::Rule(r) => {
                    if usize::from(r) >= self.rule_names.len() {
                        panic!("Rule handle #{} does not belong to this grammar.", usize::from(r));
                    }
                    prod.push(Symbol::Rule(r));
                }
            }
        }
        let pidx = PIdx(self.prods.len().as_());
        self.prods.push(prod);
        self.prods_rules.push(ridx);
        self.rules_prods[usize::from(ridx)].push(pidx);
        self.actions.push(Box::new(action));
    }

    /// Validate the grammar and seal it, designating `start` as the start rule.
    ///
    /// A synthetic start rule (named `^`, suffixed until unique) is added whose sole
    /// production is `[start, $]` with a pass-through action: the compiled parser
    /// demands end-of-input after the real start symbol.
    pub fn build(
        mut self,
        start: RIdx<StorageT>,
    ) -> Result<LLGrammar<T, Out, StorageT>, LLGrammarError> {
        if usize::from(start) >= self.rule_names.len() {
            return Err(LLGrammarError {
                kind: LLGrammarErrorKind::InvalidStartRule,
                rule: format!("#{}", usize::from(start)),
            });
        }
        for (i, prods) in self.rules_prods.iter().enumerate() {
            if prods.is_empty() {
                return Err(LLGrammarError {
                    kind: LLGrammarErrorKind::RuleHasNoProductions,
                    rule: self.rule_names[i].clone(),
                });
            }
        }

        let mut start_name = START_RULE.to_string();
        while self.rule_names.iter().any(|n| n == &start_name) {
            start_name += START_RULE;
        }
        let start_ridx = RIdx(self.rule_names.len().as_());
        let start_pidx = PIdx(self.prods.len().as_());
        self.rule_names.push(start_name);
        self.rules_prods.push(vec![start_pidx]);
        self.prods
            .push(vec![Symbol::Rule(start), Symbol::Token(self.eof_token_idx)]);
        self.prods_rules.push(start_ridx);
        // The start symbol is a rule, so the first child is always a `Value`.
        self.actions.push(Box::new(|cs| match cs.into_iter().next() {
            Some(Child::Value(v)) => v,
            _ => panic!("Internal error"),
        }));

        Ok(LLGrammar {
            rules_len: RIdx(self.rule_names.len().as_()),
            rule_names: self.rule_names,
            tokens_len: TIdx(self.token_names.len().as_()),
            token_names: self.token_names,
            token_map: self.token_map,
            eof_token_idx: self.eof_token_idx,
            prods_len: PIdx(self.prods.len().as_()),
            prods: self.prods,
            rules_prods: self.rules_prods,
            prods_rules: self.prods_rules,
            actions: self.actions,
            start_rule_idx: start_ridx,
            start_prod: start_pidx,
        })
    }
}

/// An immutable LL grammar. See the [top-level documentation](../index.html) for the
/// guarantees this struct makes about rule, token, and production numbering.
pub struct LLGrammar<T, Out, StorageT = u32> {
    rules_len: RIdx<StorageT>,
    rule_names: Vec<String>,
    tokens_len: TIdx<StorageT>,
    /// A mapping from `TIdx` -> name. Caller tokens are named via `Debug`; the
    /// end-of-input token is `"$"`.
    token_names: Vec<String>,
    token_map: HashMap<T, TIdx<StorageT>>,
    eof_token_idx: TIdx<StorageT>,
    prods_len: PIdx<StorageT>,
    prods: Vec<Vec<Symbol<StorageT>>>,
    /// A mapping from rules to their productions. Every rule has at least 1 production;
    /// productions are not necessarily stored sequentially.
    rules_prods: Vec<Vec<PIdx<StorageT>>>,
    prods_rules: Vec<RIdx<StorageT>>,
    actions: Vec<ActionFn<T, Out>>,
    start_rule_idx: RIdx<StorageT>,
    start_prod: PIdx<StorageT>,
}

impl<T, Out, StorageT: fmt::Debug> fmt::Debug for LLGrammar<T, Out, StorageT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LLGrammar")
            .field("rules_len", &self.rules_len)
            .field("rule_names", &self.rule_names)
            .field("tokens_len", &self.tokens_len)
            .field("token_names", &self.token_names)
            .field("eof_token_idx", &self.eof_token_idx)
            .field("prods_len", &self.prods_len)
            .field("prods", &self.prods)
            .field("rules_prods", &self.rules_prods)
            .field("prods_rules", &self.prods_rules)
            .field("start_rule_idx", &self.start_rule_idx)
            .field("start_prod", &self.start_prod)
            .finish_non_exhaustive()
    }
}

impl<T: TokenKind, Out, StorageT: 'static + PrimInt + Unsigned> LLGrammar<T, Out, StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// How many rules does this grammar have (the synthetic start rule included)?
    pub fn rules_len(&self) -> RIdx<StorageT> {
        self.rules_len
    }

    /// Return an iterator which produces (in order from `0..self.rules_len()`) all this
    /// grammar's valid `RIdx`s.
    pub fn iter_rules(&self) -> impl Iterator<Item = RIdx<StorageT>> {
        // We can use as_ safely, because we're only generating integers from
        // 0..self.rules_len() and those fit within StorageT by construction.
        (0..usize::from(self.rules_len)).map(|x| RIdx(x.as_()))
    }

    /// How many tokens does this grammar have (the end-of-input token included)?
    pub fn tokens_len(&self) -> TIdx<StorageT> {
        self.tokens_len
    }

    /// Return an iterator which produces (in order from `0..self.tokens_len()`) all this
    /// grammar's valid `TIdx`s.
    pub fn iter_tidxs(&self) -> impl Iterator<Item = TIdx<StorageT>> {
        (0..usize::from(self.tokens_len)).map(|x| TIdx(x.as_()))
    }

    /// The index of the reserved end-of-input token.
    pub fn eof_token_idx(&self) -> TIdx<StorageT> {
        self.eof_token_idx
    }

    /// The index of the synthetic start rule.
    pub fn start_rule_idx(&self) -> RIdx<StorageT> {
        self.start_rule_idx
    }

    /// The production index of the synthetic start rule's sole production.
    pub fn start_prod(&self) -> PIdx<StorageT> {
        self.start_prod
    }

    /// How many productions does this grammar have?
    pub fn prods_len(&self) -> PIdx<StorageT> {
        self.prods_len
    }

    /// Return an iterator which produces (in order from `0..self.prods_len()`) all this
    /// grammar's valid `PIdx`s.
    pub fn iter_pidxs(&self) -> impl Iterator<Item = PIdx<StorageT>> {
        (0..usize::from(self.prods_len)).map(|x| PIdx(x.as_()))
    }

    /// Get the sequence of symbols for production `pidx`. Panics if `pidx` doesn't
    /// exist.
    pub fn prod(&self, pidx: PIdx<StorageT>) -> &[Symbol<StorageT>] {
        &self.prods[usize::from(pidx)]
    }

    /// Return the rule index of the production `pidx`. Panics if `pidx` doesn't exist.
    pub fn prod_to_rule(&self, pidx: PIdx<StorageT>) -> RIdx<StorageT> {
        self.prods_rules[usize::from(pidx)]
    }

    /// Return the productions for rule `ridx`. Panics if `ridx` doesn't exist.
    pub fn rule_to_prods(&self, ridx: RIdx<StorageT>) -> &[PIdx<StorageT>] {
        &self.rules_prods[usize::from(ridx)]
    }

    /// Return the name of rule `ridx`. Panics if `ridx` doesn't exist.
    pub fn rule_name(&self, ridx: RIdx<StorageT>) -> &str {
        &self.rule_names[usize::from(ridx)]
    }

    /// Return the index of the first rule declared with name `n` or `None` if it
    /// doesn't exist. Since names don't identify rules, this is for diagnostics and
    /// tests only.
    pub fn rule_idx(&self, n: &str) -> Option<RIdx<StorageT>> {
        self.rule_names
            .iter()
            .position(|x| x == n)
            .map(|x| RIdx(x.as_()))
    }

    /// Return the name of token `tidx` (`"$"` for the end-of-input token). Panics if
    /// `tidx` doesn't exist.
    pub fn token_name(&self, tidx: TIdx<StorageT>) -> &str {
        &self.token_names[usize::from(tidx)]
    }

    /// Return the index of token kind `t`. Panics if `t` is not in
    /// `TokenKind::all()`.
    pub fn tidx(&self, t: T) -> TIdx<StorageT> {
        match self.token_map.get(&t) {
            Some(&tidx) => tidx,
            None => panic!("Token kind {:?} is not in TokenKind::all().", t),
        }
    }

    /// Return the semantic action of production `pidx`. Panics if `pidx` doesn't
    /// exist.
    pub fn action(&self, pidx: PIdx<StorageT>) -> &ActionFn<T, Out> {
        &self.actions[usize::from(pidx)]
    }

    /// Pretty-print production `pidx` as e.g. `S -> LPAREN S RPAREN S` (an empty
    /// right-hand side prints as `%empty`).
    pub fn pp_prod(&self, pidx: PIdx<StorageT>) -> String {
        let mut s = format!("{} ->", self.rule_name(self.prod_to_rule(pidx)));
        let prod = self.prod(pidx);
        if prod.is_empty() {
            s.push_str(" %empty");
        } else {
            for sym in prod.iter() {
                s.push(' ');
                match *sym {
                    Symbol::Rule(ridx) => s.push_str(self.rule_name(ridx)),
                    Symbol::Token(tidx) => s.push_str(self.token_name(tidx)),
                }
            }
        }
        s
    }
}

#[cfg(test)]
mod test {
    use super::{Child, Element, GrammarBuilder, LLGrammar, LLGrammarErrorKind, Token, TokenKind};
    use crate::Symbol;

    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    enum TestTok {
        A,
        B,
    }

    impl TokenKind for TestTok {
        fn all() -> &'static [Self] {
            &[TestTok::A, TestTok::B]
        }
    }

    fn pair_grammar() -> LLGrammar<TestTok, ()> {
        let mut gb = GrammarBuilder::new();
        let s = gb.rule("S");
        gb.prod(
            s,
            vec![Element::Token(TestTok::A), Element::Token(TestTok::B)],
            |_| (),
        );
        gb.build(s).unwrap()
    }

    #[test]
    fn test_token_numbering() {
        let grm = pair_grammar();
        assert_eq!(usize::from(grm.tokens_len()), 3);
        assert_eq!(usize::from(grm.eof_token_idx()), 2);
        assert_eq!(grm.token_name(grm.eof_token_idx()), "$");
        assert_eq!(grm.token_name(grm.tidx(TestTok::A)), "A");
        assert_eq!(grm.token_name(grm.tidx(TestTok::B)), "B");
    }

    #[test]
    fn test_synthetic_start_rule() {
        let grm = pair_grammar();
        assert_eq!(usize::from(grm.rules_len()), 2);
        let start = grm.start_rule_idx();
        assert_eq!(grm.rule_name(start), "^");
        assert_eq!(grm.rule_to_prods(start), &[grm.start_prod()]);
        let user_start = grm.rule_idx("S").unwrap();
        assert_eq!(
            grm.prod(grm.start_prod()),
            &[Symbol::Rule(user_start), Symbol::Token(grm.eof_token_idx())]
        );
    }

    #[test]
    fn test_start_rule_name_uniquified() {
        let mut gb = GrammarBuilder::<TestTok, (), u32>::new();
        let r = gb.rule("^");
        gb.prod(r, vec![Element::Token(TestTok::A)], |_| ());
        let grm = gb.build(r).unwrap();
        assert_eq!(grm.rule_name(grm.start_rule_idx()), "^^");
    }

    #[test]
    fn test_same_named_rules_are_distinct() {
        let mut gb = GrammarBuilder::<TestTok, (), u32>::new();
        let x1 = gb.rule("X");
        let x2 = gb.rule("X");
        assert_ne!(x1, x2);
        let s = gb.rule("S");
        gb.prod(s, vec![Element::Rule(x1), Element::Rule(x2)], |_| ());
        gb.prod(x1, vec![Element::Token(TestTok::A)], |_| ());
        gb.prod(x2, vec![Element::Token(TestTok::B)], |_| ());
        let grm = gb.build(s).unwrap();
        // The first declared "X" is the one rule_idx finds; both survive as rules.
        assert_eq!(grm.rule_idx("X").unwrap(), x1);
        assert_eq!(usize::from(grm.rules_len()), 4);
        assert_eq!(grm.rule_to_prods(x1).len(), 1);
        assert_eq!(grm.rule_to_prods(x2).len(), 1);
    }

    #[test]
    fn test_rule_without_productions_rejected() {
        let mut gb = GrammarBuilder::<TestTok, (), u32>::new();
        let s = gb.rule("S");
        let dangling = gb.rule("Dangling");
        gb.prod(s, vec![Element::Rule(dangling)], |_| ());
        let e = gb.build(s).unwrap_err();
        assert_eq!(e.kind, LLGrammarErrorKind::RuleHasNoProductions);
        assert_eq!(e.rule, "Dangling");
        assert_eq!(format!("{}", e), "Rule 'Dangling' has no productions");
    }

    #[test]
    fn test_foreign_start_rule_rejected() {
        let mut gb = GrammarBuilder::<TestTok, (), u32>::new();
        let s = gb.rule("S");
        gb.prod(s, vec![], |_| ());
        let e = gb.build(crate::RIdx(7)).unwrap_err();
        assert_eq!(e.kind, LLGrammarErrorKind::InvalidStartRule);
    }

    #[test]
    #[should_panic]
    fn test_foreign_rule_handle_in_prod() {
        let mut gb = GrammarBuilder::<TestTok, (), u32>::new();
        let s = gb.rule("S");
        gb.prod(s, vec![Element::Rule(crate::RIdx(7))], |_| ());
    }

    #[test]
    fn test_pp_prod() {
        let mut gb = GrammarBuilder::<TestTok, (), u32>::new();
        let s = gb.rule("S");
        gb.prod(
            s,
            vec![
                Element::Token(TestTok::A),
                Element::Rule(s),
                Element::Token(TestTok::B),
            ],
            |_| (),
        );
        gb.prod(s, vec![], |_| ());
        let grm = gb.build(s).unwrap();
        let prods = grm.rule_to_prods(grm.rule_idx("S").unwrap()).to_vec();
        assert_eq!(grm.pp_prod(prods[0]), "S -> A S B");
        assert_eq!(grm.pp_prod(prods[1]), "S -> %empty");
    }

    #[test]
    fn test_actions_applied_to_children() {
        let mut gb = GrammarBuilder::<TestTok, String, u32>::new();
        let s = gb.rule("S");
        gb.prod(s, vec![Element::Token(TestTok::A)], |mut cs| {
            match cs.pop() {
                Some(Child::Token(t)) => t.value().to_string(),
                _ => unreachable!(),
            }
        });
        let grm = gb.build(s).unwrap();
        let pidx = grm.rule_to_prods(s)[0];
        let out = (grm.action(pidx))(vec![Child::Token(Token::new(TestTok::A, "a", 0))]);
        assert_eq!(out, "a");
    }

    #[test]
    fn test_token_positions() {
        let t = Token::new(TestTok::A, "a", 5).with_line_col(2, 3);
        assert_eq!(t.off(), 5);
        assert_eq!(t.line(), Some(2));
        assert_eq!(t.col(), Some(3));
        assert!(!t.is_eof());
        let eof = Token::<TestTok>::eof();
        assert!(eof.is_eof());
        assert_eq!(eof.kind(), None);
    }
}
