//! Error types for ADL2 parsing.

use thiserror::Error;

/// Errors that can occur while lexing or parsing ADL2 text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdlError {
    /// Lexical error: unknown character, unterminated string, bad escape.
    #[error("lex error at line {line}, column {column}: {message}")]
    Lex {
        /// 1-based line of the offending character.
        line: u32,
        /// 1-based column of the offending character.
        column: u32,
        /// Description of the error.
        message: String,
    },

    /// Syntax error: the parser found something other than what the grammar
    /// requires at this point.
    #[error("syntax error at line {line}, column {column}: expected {expected}, found {found}")]
    Syntax {
        /// 1-based line of the offending token.
        line: u32,
        /// 1-based column of the offending token.
        column: u32,
        /// What the grammar required here.
        expected: String,
        /// What was actually found.
        found: String,
    },

    /// Empty source text was given to a parse entry point.
    #[error("empty ADL source")]
    EmptySource,
}

/// Result type for ADL2 operations.
pub type AdlResult<T> = std::result::Result<T, AdlError>;
