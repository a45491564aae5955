//! Lexical and syntactic error types. See `SPEC_FULL.md` §10.2.
//!
//! `LexError` describes what can go wrong while turning source text into
//! tokens; `ParseErrorType`/`ParseError` describe the handful of *fatal*
//! syntactic conditions that abort compilation outright (an unknown
//! top-level token). Every other recoverable syntax problem described in
//! `spec.md` §4.2 becomes an in-band [`crate::Ast::Error`] node instead of a
//! `Result` — these types exist only for the narrow set of conditions that
//! really do stop the driver.

use std::fmt;

use crate::token::Position;

/// A lexical error: the lexer produced a [`crate::TokenKind::Error`] token,
/// and the driver wants to report why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A code point that starts no valid token (not a digit, quote, `#`,
    /// known operator/delimiter character, or identifier-start character).
    UnexpectedCharacter(char),
    /// A `"` was opened but input ended before a closing `"`.
    UnterminatedString,
    /// A closing delimiter did not match the innermost open one, or closed
    /// with nothing open at all.
    DelimiterMismatch(String),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedCharacter(c) => write!(f, "unexpected character '{c}'"),
            LexError::UnterminatedString => write!(f, "unterminated string literal"),
            LexError::DelimiterMismatch(detail) => write!(f, "{detail}"),
        }
    }
}

impl std::error::Error for LexError {}

impl LexError {
    /// Attaches a [`Position`], producing the [`ParseErrorType`] variant the
    /// driver reports for a lexical failure it has chosen not to recover
    /// from in-band.
    pub fn into_parse_error(self, position: Position) -> ParseError {
        ParseError::new(ParseErrorType::Lexical(self), position)
    }
}

/// The handful of syntactic conditions that are fatal rather than recovered
/// in-band as an [`crate::Ast::Error`] node. Per `spec.md` §4.2, an unknown
/// top-level token is the one production that propagates a real syntax
/// error instead of constructing a partial AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorType {
    /// A lexical error the driver decided to surface directly rather than
    /// let the parser attempt in-band recovery around it.
    Lexical(LexError),
    /// A top-level statement did not start with any keyword or identifier
    /// the dispatch table recognizes.
    UnknownTopLevelToken(String),
    /// Input ended while a construct (other than the five named recoverable
    /// cases) was still open.
    UnexpectedEof,
}

impl fmt::Display for ParseErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorType::Lexical(err) => write!(f, "{err}"),
            ParseErrorType::UnknownTopLevelToken(lexeme) => {
                write!(f, "unknown top-level token '{lexeme}'")
            }
            ParseErrorType::UnexpectedEof => write!(f, "unexpected end of input"),
        }
    }
}

impl std::error::Error for ParseErrorType {}

/// A [`ParseErrorType`] tagged with the position it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(Box<ParseErrorType>, Position);

impl ParseError {
    pub fn new(kind: ParseErrorType, position: Position) -> Self {
        Self(Box::new(kind), position)
    }

    pub fn kind(&self) -> &ParseErrorType {
        &self.0
    }

    pub fn position(&self) -> Position {
        self.1
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.0, self.1)
    }
}

impl std::error::Error for ParseError {}
