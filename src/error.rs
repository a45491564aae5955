//! The driver-facing error type. See `SPEC_FULL.md` §10.2.
//!
//! `HanaError` covers exactly the conditions that abort a compilation
//! outright: I/O failure and the one unrecoverable parser condition
//! (an unknown top-level token). Every other lexical/syntactic problem is
//! represented in-band as an [`crate::Ast::Error`] node rather than through
//! this type, per `spec.md` §7's "never fatal at the stage boundary" rule.

use std::fmt;

use crate::error_parsing::ParseError;

#[derive(Debug)]
pub enum HanaError {
    Io(std::io::Error),
    Parse(ParseError),
}

impl fmt::Display for HanaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HanaError::Io(err) => write!(f, "I/O error: {err}"),
            HanaError::Parse(err) => write!(f, "parse error: {err}"),
        }
    }
}

impl std::error::Error for HanaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HanaError::Io(err) => Some(err),
            HanaError::Parse(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for HanaError {
    fn from(err: std::io::Error) -> Self {
        HanaError::Io(err)
    }
}

impl From<ParseError> for HanaError {
    fn from(err: ParseError) -> Self {
        HanaError::Parse(err)
    }
}
