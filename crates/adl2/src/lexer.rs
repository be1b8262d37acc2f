//! Lexical analysis for ADL2 source text.
//!
//! [`tokenize`] turns raw ADL2 text into a positioned token stream terminated
//! by a [`TokenKind::Eof`] marker. The parsers never touch the source text
//! again; they hold only a cursor index into the returned stream.
//!
//! Lexing is all-or-nothing: an unknown character, an unterminated string, or
//! a bad escape aborts the whole pass with [`AdlError::Lex`]. There is no
//! partial token stream.

use logos::Logos;

use crate::error::{AdlError, AdlResult};

/// Scanner-side token definitions.
///
/// Kept separate from the public [`TokenKind`] because the end-of-input
/// marker appended by [`tokenize`] has no lexical pattern of its own.
/// The `raw_to_kind` match is the single mapping between the two.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"--[^\n]*")]
enum RawToken {
    // === Keywords ===
    #[token("archetype")]
    Archetype,
    #[token("template")]
    Template,
    #[token("operational_template")]
    OperationalTemplate,
    #[token("language")]
    Language,
    #[token("description")]
    Description,
    #[token("definition")]
    Definition,
    #[token("rules")]
    Rules,
    #[token("terminology")]
    Terminology,
    #[token("annotations")]
    Annotations,
    #[token("rm_overlay")]
    RmOverlay,
    #[token("matches")]
    Matches,
    #[token("occurrences")]
    Occurrences,
    #[token("cardinality")]
    Cardinality,
    #[token("existence")]
    Existence,
    #[token("specialize")]
    Specialize,

    // === Semantic codes ===
    // The digit requirement plus raised priority gives the mandated back-off:
    // `id1` is a code, but `identifier` and `action` stay plain identifiers.
    #[regex("id[0-9]+", priority = 10)]
    IdCode,
    #[regex("at[0-9]+", priority = 10)]
    AtCode,
    #[regex("ac[0-9]+", priority = 10)]
    AcCode,

    // === Literals and identifiers ===
    /// Hyphen-tolerant identifier for archetype-id fragments such as
    /// `openEHR-EHR-OBSERVATION`. A hyphen must be followed by an
    /// alphanumeric so that `--` comments are never bitten into.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(-[A-Za-z0-9_]+)*")]
    Identifier,

    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,

    #[regex(r"-?[0-9]+")]
    Integer,

    /// Real literal. The repeated fractional group admits version-style
    /// literals like `2.0.5`; a dot is only consumed when a digit follows,
    /// so `0..1` lexes as INTEGER DOTDOT INTEGER.
    #[regex(r"-?[0-9]+(\.[0-9]+)+")]
    Real,

    // === Punctuation ===
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("=")]
    Eq,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("|")]
    Pipe,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("-")]
    Minus,
}

/// Kind of a lexed ADL2 token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum TokenKind {
    // Keywords
    Archetype,
    Template,
    OperationalTemplate,
    Language,
    Description,
    Definition,
    Rules,
    Terminology,
    Annotations,
    RmOverlay,
    Matches,
    Occurrences,
    Cardinality,
    Existence,
    Specialize,
    // Semantic codes
    IdCode,
    AtCode,
    AcCode,
    // Literals and identifiers
    Identifier,
    Str,
    Integer,
    Real,
    // Punctuation
    ColonColon,
    Colon,
    DotDot,
    Dot,
    Semicolon,
    Comma,
    Eq,
    LAngle,
    RAngle,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Pipe,
    Star,
    Slash,
    Minus,
    /// End-of-input marker appended by [`tokenize`].
    Eof,
}

impl TokenKind {
    /// True for the six section keywords the archetype parser dispatches on,
    /// plus `rm_overlay`.
    pub fn is_section_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Language
                | TokenKind::Description
                | TokenKind::Definition
                | TokenKind::Rules
                | TokenKind::Terminology
                | TokenKind::Annotations
                | TokenKind::RmOverlay
        )
    }

    /// True for tokens the ODIN grammar accepts in attribute-name position.
    /// Section keywords are deliberately included: `language = <[ISO_639-1::en]>`
    /// appears inside description blocks.
    pub fn is_identifier_like(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::Language
                | TokenKind::Description
                | TokenKind::Definition
                | TokenKind::Rules
                | TokenKind::Terminology
                | TokenKind::Annotations
                | TokenKind::RmOverlay
                | TokenKind::Template
                | TokenKind::Archetype
                | TokenKind::Matches
                | TokenKind::Occurrences
                | TokenKind::Cardinality
                | TokenKind::Existence
        )
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenKind::Archetype => "archetype",
            TokenKind::Template => "template",
            TokenKind::OperationalTemplate => "operational_template",
            TokenKind::Language => "language",
            TokenKind::Description => "description",
            TokenKind::Definition => "definition",
            TokenKind::Rules => "rules",
            TokenKind::Terminology => "terminology",
            TokenKind::Annotations => "annotations",
            TokenKind::RmOverlay => "rm_overlay",
            TokenKind::Matches => "matches",
            TokenKind::Occurrences => "occurrences",
            TokenKind::Cardinality => "cardinality",
            TokenKind::Existence => "existence",
            TokenKind::Specialize => "specialize",
            TokenKind::IdCode => "id-code",
            TokenKind::AtCode => "at-code",
            TokenKind::AcCode => "ac-code",
            TokenKind::Identifier => "identifier",
            TokenKind::Str => "string literal",
            TokenKind::Integer => "integer literal",
            TokenKind::Real => "real literal",
            TokenKind::ColonColon => "::",
            TokenKind::Colon => ":",
            TokenKind::DotDot => "..",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Eq => "=",
            TokenKind::LAngle => "<",
            TokenKind::RAngle => ">",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Pipe => "|",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Minus => "-",
            TokenKind::Eof => "end of input",
        };
        f.write_str(s)
    }
}

fn raw_to_kind(raw: RawToken) -> TokenKind {
    match raw {
        RawToken::Archetype => TokenKind::Archetype,
        RawToken::Template => TokenKind::Template,
        RawToken::OperationalTemplate => TokenKind::OperationalTemplate,
        RawToken::Language => TokenKind::Language,
        RawToken::Description => TokenKind::Description,
        RawToken::Definition => TokenKind::Definition,
        RawToken::Rules => TokenKind::Rules,
        RawToken::Terminology => TokenKind::Terminology,
        RawToken::Annotations => TokenKind::Annotations,
        RawToken::RmOverlay => TokenKind::RmOverlay,
        RawToken::Matches => TokenKind::Matches,
        RawToken::Occurrences => TokenKind::Occurrences,
        RawToken::Cardinality => TokenKind::Cardinality,
        RawToken::Existence => TokenKind::Existence,
        RawToken::Specialize => TokenKind::Specialize,
        RawToken::IdCode => TokenKind::IdCode,
        RawToken::AtCode => TokenKind::AtCode,
        RawToken::AcCode => TokenKind::AcCode,
        RawToken::Identifier => TokenKind::Identifier,
        RawToken::Str => TokenKind::Str,
        RawToken::Integer => TokenKind::Integer,
        RawToken::Real => TokenKind::Real,
        RawToken::ColonColon => TokenKind::ColonColon,
        RawToken::Colon => TokenKind::Colon,
        RawToken::DotDot => TokenKind::DotDot,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Eq => TokenKind::Eq,
        RawToken::LAngle => TokenKind::LAngle,
        RawToken::RAngle => TokenKind::RAngle,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::Pipe => TokenKind::Pipe,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Minus => TokenKind::Minus,
    }
}

/// One lexed token.
///
/// `text` holds the processed lexeme: for string literals the quotes are
/// stripped and escapes resolved, for everything else it is the raw slice.
/// `line` and `column` are 1-based and point at the first character.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    /// Kind of the token.
    pub kind: TokenKind,
    /// Processed lexeme text.
    pub text: String,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl Token {
    /// Builds the end-of-input marker at the given position.
    pub(crate) fn eof(line: u32, column: u32) -> Self {
        Token {
            kind: TokenKind::Eof,
            text: String::new(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Str => write!(f, "\"{}\"", self.text),
            _ => f.write_str(&self.text),
        }
    }
}

/// Incremental byte-offset to line/column translation.
///
/// Offsets must be requested in non-decreasing order, which holds for a
/// single left-to-right lexing pass.
struct PositionTracker<'s> {
    rest: std::str::Chars<'s>,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'s> PositionTracker<'s> {
    fn new(source: &'s str) -> Self {
        PositionTracker {
            rest: source.chars(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn locate(&mut self, target: usize) -> (u32, u32) {
        while self.offset < target {
            match self.rest.next() {
                Some('\n') => {
                    self.offset += 1;
                    self.line += 1;
                    self.column = 1;
                }
                Some(c) => {
                    self.offset += c.len_utf8();
                    self.column += 1;
                }
                None => break,
            }
        }
        (self.line, self.column)
    }
}

/// Resolves the escape sequences `\n \t \r \\ \"` inside a string literal
/// body (quotes already stripped).
fn unescape(body: &str) -> Result<String, String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => return Err(format!("unsupported escape sequence `\\{}`", other)),
            None => return Err("trailing backslash in string literal".to_string()),
        }
    }
    Ok(out)
}

/// Tokenizes ADL2 source text.
///
/// Returns the full ordered token stream terminated by a
/// [`TokenKind::Eof`] marker, or a fatal [`AdlError::Lex`] carrying the
/// line/column of the first offending character.
///
/// # Examples
///
/// ```rust
/// use adl2::{tokenize, TokenKind};
///
/// let tokens = tokenize("ELEMENT[id5] occurrences matches {0..1}").unwrap();
/// assert_eq!(tokens[0].kind, TokenKind::Identifier);
/// assert_eq!(tokens[1].kind, TokenKind::LBracket);
/// assert_eq!(tokens[2].kind, TokenKind::IdCode);
/// assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
/// ```
pub fn tokenize(source: &str) -> AdlResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut tracker = PositionTracker::new(source);
    let mut lexer = RawToken::lexer(source);

    while let Some(item) = lexer.next() {
        let span = lexer.span();
        let (line, column) = tracker.locate(span.start);
        match item {
            Ok(raw) => {
                let kind = raw_to_kind(raw);
                let text = if kind == TokenKind::Str {
                    let body = &source[span.start + 1..span.end - 1];
                    unescape(body).map_err(|message| AdlError::Lex {
                        line,
                        column,
                        message,
                    })?
                } else {
                    source[span].to_string()
                };
                tokens.push(Token {
                    kind,
                    text,
                    line,
                    column,
                });
            }
            Err(()) => {
                let offending = source[span.start..].chars().next();
                let message = match offending {
                    Some('"') => "unterminated string literal".to_string(),
                    Some(c) => format!("unexpected character `{}`", c),
                    None => "unexpected end of input".to_string(),
                };
                return Err(AdlError::Lex {
                    line,
                    column,
                    message,
                });
            }
        }
    }

    let (line, column) = tracker.locate(source.len());
    tokens.push(Token::eof(line, column));
    Ok(tokens)
}
