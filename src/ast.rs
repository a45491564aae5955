//! The abstract syntax tree. A single tagged variant, [`Ast`], covers every
//! syntactic shape the parser can produce — see `SPEC_FULL.md` §3.
//!
//! AST nodes are produced once by the parser, may be *replaced* (never
//! mutated in place) by the optimizer, and are then traversed once by the
//! code generator.

use crate::SmallVec;

/// An AST node. Every child field is another [`Ast`] node unless noted
/// otherwise.
///
/// Invariants (see `SPEC_FULL.md` §3):
/// - `Assign`'s target is always an `Identifier`.
/// - `If`/`While`/`FuncDef` bodies are ordered, possibly empty statement
///   sequences.
/// - `BinaryOp`'s operands are expression-shaped nodes.
/// - Once an `Error` node appears in a subtree, nothing downstream of it in
///   source order within that top-level item is emitted by the generator.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// An integer literal. Hana has no type checking and no floats; the
    /// value is parsed eagerly so the optimizer can fold on it directly.
    Number(i64),
    /// A string literal, stored as the raw lexeme (including the
    /// surrounding quotes).
    StringLit(String),
    Boolean(bool),
    Null,
    Identifier(String),
    BinaryOp {
        left: Box<Ast>,
        op: String,
        right: Box<Ast>,
    },
    UnaryOp {
        op: String,
        operand: Box<Ast>,
    },
    /// `target = expr`. `target` is always an `Identifier`.
    Assign {
        target: Box<Ast>,
        expr: Box<Ast>,
    },
    If {
        condition: Box<Ast>,
        body: Vec<Ast>,
        else_body: Option<Vec<Ast>>,
    },
    While {
        condition: Box<Ast>,
        body: Vec<Ast>,
    },
    FuncDef {
        name: String,
        params: SmallVec<String>,
        body: Vec<Ast>,
    },
    Return(Box<Ast>),
    FuncCall {
        name: String,
        args: SmallVec<Ast>,
    },
    /// `receiver.method(args)`, e.g. `numbers.추가(1)`.
    MethodCall {
        receiver: String,
        method: String,
        args: SmallVec<Ast>,
    },
    /// `배열 name = []` — declares a fixed-size, zero-initialized list.
    List {
        name: String,
    },
    /// `list[index]`.
    ListElem {
        list: Box<Ast>,
        index: Box<Ast>,
    },
    /// `딕셔너리 name = {}` when `key`/`value` are both `None` (a
    /// declaration); the shape also accommodates an inline key/value pair
    /// for data-model completeness, though the parser documented in
    /// `SPEC_FULL.md` §4.2 only ever constructs the declaration form.
    Dict {
        name: String,
        key: Option<Box<Ast>>,
        value: Option<Box<Ast>>,
    },
    /// `dict[key] = value`.
    DictAssign {
        dict: Box<Ast>,
        key: Box<Ast>,
        value: Box<Ast>,
    },
    Print(Box<Ast>),
    /// A source comment. The parser skips comment *tokens* transparently
    /// and never constructs this variant on its own; it exists so the AST
    /// shape matches the data model in full and so tests can exercise the
    /// generator's handling of it directly.
    Comment(String),
    /// A first-class, in-band recovery node. `context` is a best-effort
    /// partial AST captured at the point of failure, when one is
    /// available. The generator treats this as a hard stop for whichever
    /// top-level item contains it.
    Error {
        message: String,
        context: Option<Box<Ast>>,
    },
}

impl Ast {
    /// Shorthand for constructing an `Error` node without a context.
    pub fn error(message: impl Into<String>) -> Self {
        Ast::Error {
            message: message.into(),
            context: None,
        }
    }

    /// Shorthand for constructing an `Error` node with a partial AST.
    pub fn error_with_context(message: impl Into<String>, context: Ast) -> Self {
        Ast::Error {
            message: message.into(),
            context: Some(Box::new(context)),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Ast::Error { .. })
    }
}
