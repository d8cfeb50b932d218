use llgrammar::ll::{Token, TokenKind};

/// A one-token lookahead view over any finite token source, with the reserved
/// end-of-input token appended exactly once after the real input is exhausted.
///
/// Once the end-of-input token has been consumed by [`next`](TokenStream::next), the
/// stream is exhausted for good: `peek` returns `None` (not the end-of-input token
/// again) and `next` fails. This guards against double-consumption bugs in the parse
/// driver.
pub struct TokenStream<T, I> {
    input: I,
    peeked: Option<Token<T>>,
    eof_consumed: bool,
}

impl<T: TokenKind, I: Iterator<Item = Token<T>>> TokenStream<T, I> {
    pub fn new(input: I) -> Self {
        TokenStream {
            input,
            peeked: None,
            eof_consumed: false,
        }
    }

    /// Return the next token without consuming it. Repeated calls return the same
    /// token. Returns `None` iff the stream is exhausted.
    pub fn peek(&mut self) -> Option<&Token<T>> {
        if self.eof_consumed {
            return None;
        }
        if self.peeked.is_none() {
            self.peeked = Some(self.input.next().unwrap_or_else(Token::eof));
        }
        self.peeked.as_ref()
    }

    /// Consume and return the next token. Returns `None` iff the stream is exhausted.
    pub fn next(&mut self) -> Option<Token<T>> {
        if self.eof_consumed {
            return None;
        }
        let tok = match self.peeked.take() {
            Some(t) => t,
            None => self.input.next().unwrap_or_else(Token::eof),
        };
        if tok.is_eof() {
            self.eof_consumed = true;
        }
        Some(tok)
    }
}
