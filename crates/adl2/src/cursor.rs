//! Token cursor shared by the recursive-descent parsers.

use crate::error::{AdlError, AdlResult};
use crate::lexer::{Token, TokenKind};

/// Cursor over a token slice with one-token lookahead.
///
/// A cursor is single-use: it owns a monotonically advancing index and must
/// not be shared between parse call sites. Reads past the end of the slice
/// yield a synthetic end-of-input token positioned after the last real one.
pub(crate) struct TokenCursor<'t> {
    tokens: &'t [Token],
    pos: usize,
    eof: Token,
}

impl<'t> TokenCursor<'t> {
    pub(crate) fn new(tokens: &'t [Token]) -> Self {
        let eof = match tokens.last() {
            Some(t) if t.kind == TokenKind::Eof => t.clone(),
            Some(t) => Token::eof(t.line, t.column + t.text.chars().count() as u32),
            None => Token::eof(1, 1),
        };
        TokenCursor {
            tokens,
            pos: 0,
            eof,
        }
    }

    /// Current token without consuming it.
    pub(crate) fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    /// Token `n` positions ahead without consuming.
    pub(crate) fn peek_nth(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&self.eof)
    }

    /// Kind of the current token.
    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    /// Consumes and returns the current token.
    pub(crate) fn advance(&mut self) -> &Token {
        let token = self.tokens.get(self.pos).unwrap_or(&self.eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Consumes the current token if it has the given kind.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the current token, requiring the given kind.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> AdlResult<&Token> {
        if self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.expected(&format!("`{}`", kind)))
        }
    }

    /// True once the cursor has passed the last token (the EOF marker, if the
    /// slice carries one, still counts as a real position).
    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.peek_kind() == TokenKind::Eof
    }

    /// Tokens not yet consumed, including the end marker if the slice
    /// carries one.
    pub(crate) fn remaining(&self) -> &'t [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    /// Advances past `n` tokens.
    pub(crate) fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.tokens.len());
    }

    /// Builds a syntax error describing what the grammar required here.
    pub(crate) fn expected(&self, what: &str) -> AdlError {
        let found = self.peek();
        AdlError::Syntax {
            line: found.line,
            column: found.column,
            expected: what.to_string(),
            found: found.to_string(),
        }
    }
}
