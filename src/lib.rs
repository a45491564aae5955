//! # Hana — a small Korean-keyword imperative language, compiled to MIPS32
//!
//! Hana programs are lexed, parsed into an AST, optionally folded/simplified
//! by a conservative optimizer, and lowered to MIPS32 assembly text targeting
//! a SPIM/MARS-style simulator.
//!
//! ```
//! use hana::{compile_source, CompileOptions};
//!
//! let source = "출력(1 + 2)";
//! let output = compile_source(source, &CompileOptions::default()).unwrap();
//! assert!(output.assembly.starts_with(".data\n"));
//! ```
//!
//! The pipeline is strictly sequential and single-threaded (no stage ever
//! streams into the next): `source text -> token stream -> AST -> optimized
//! AST -> assembly text`. Lexical and syntactic errors are never fatal at a
//! stage boundary — they surface as in-band [`ast::Ast::Error`] nodes that the
//! code generator treats as a hard stop for the *containing* top-level item
//! only, emitting a comment in its place and continuing with the rest of the
//! program.

mod ast;
mod codegen;
pub mod driver;
mod error;
mod error_parsing;
mod optimize;
mod parse;
mod token;

pub use ast::Ast;
pub use codegen::CodeGenerator;
pub use driver::{compile_source, CompileOptions, CompileOutput};
pub use error::HanaError;
pub use error_parsing::{LexError, ParseError, ParseErrorType};
pub use optimize::{optimize, OptimizationLevel};
pub use parse::Parser;
pub use token::{Lexer, Position, Token, TokenKind};

/// Small, usually stack-resident vector for AST children (parameter lists,
/// call arguments, list/dict element lists). Most Hana call sites and
/// parameter lists have at most a handful of entries, so four inline slots
/// avoid a heap allocation for the overwhelming majority of programs.
pub(crate) type SmallVec<T> = smallvec::SmallVec<[T; 4]>;
