//! The recursive-descent parser. Turns a flat [`Token`] stream into a
//! sequence of top-level [`Ast`] nodes. See `SPEC_FULL.md` §4.2.
//!
//! Almost every syntax problem becomes an in-band [`Ast::Error`] node rather
//! than aborting the parse — the one exception is an unknown top-level
//! token, which propagates a real [`ParseError`] (per `spec.md` §4.2's
//! explicit "propagate a syntax error" rule and `SPEC_FULL.md` §11.1's
//! preserved-comma-precedence decision, both cited inline below where they
//! bite).

use crate::error_parsing::{ParseError, ParseErrorType};
use crate::token::{Token, TokenKind};
use crate::{Ast, SmallVec};

const EXPR_OPS: &[&str] = &["==", "!=", "<", "<=", ">", ">=", "그리고", "이거나", ","];
const PRED_OPS: &[&str] = &["+", "-"];
const TERM_OPS: &[&str] = &["*", "**", "/", "%"];

/// A cursor over a token stream. Comment tokens are skipped transparently
/// at every advance — the parser never constructs [`Ast::Comment`] itself
/// (see `SPEC_FULL.md` §10.5).
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parses a full token stream into the program's top-level statements.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Ast>, ParseError> {
    Parser::new(tokens).parse_program()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut parser = Self { tokens, pos: 0 };
        parser.skip_comments();
        parser
    }

    fn skip_comments(&mut self) {
        while matches!(
            self.tokens.get(self.pos).map(|t| t.kind),
            Some(TokenKind::Comment)
        ) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
            self.skip_comments();
        }
        token
    }

    fn check(&self, kind: TokenKind, lexeme: &str) -> bool {
        self.peek()
            .map_or(false, |t| t.kind == kind && t.lexeme == lexeme)
    }

    fn consume(&mut self, kind: TokenKind, lexeme: &str) -> Option<Token> {
        if self.check(kind, lexeme) {
            self.advance()
        } else {
            None
        }
    }

    fn consume_identifier(&mut self) -> Option<String> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Identifier => self.advance().map(|t| t.lexeme),
            _ => None,
        }
    }

    /// A method name may be a reserved word (`추가`, `뽑기`, ...) or a plain
    /// identifier.
    fn consume_method_name(&mut self) -> Option<String> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Identifier || t.kind == TokenKind::Keyword => {
                self.advance().map(|t| t.lexeme)
            }
            _ => None,
        }
    }

    fn match_op(&mut self, ops: &[&str]) -> Option<String> {
        let token = self.peek()?;
        let is_candidate_kind = token.kind == TokenKind::Operator
            || (token.kind == TokenKind::Delimiter && token.lexeme == ",");
        if is_candidate_kind && ops.contains(&token.lexeme.as_str()) {
            let lexeme = token.lexeme.clone();
            self.advance();
            Some(lexeme)
        } else {
            None
        }
    }

    /// Consumes tokens until the matching `closer` for an already-consumed
    /// `opener` is found, tracking nesting depth of that same pair.
    fn skip_to_matching(&mut self, opener: &str, closer: &str) {
        let mut depth = 1;
        while depth > 0 {
            let Some(token) = self.peek().cloned() else {
                break;
            };
            if token.kind == TokenKind::Delimiter && token.lexeme == opener {
                depth += 1;
            } else if token.kind == TokenKind::Delimiter && token.lexeme == closer {
                depth -= 1;
            }
            self.advance();
        }
    }

    pub fn parse_program(&mut self) -> Result<Vec<Ast>, ParseError> {
        let mut items = Vec::new();
        while self.peek().is_some() {
            items.push(self.parse_statement()?);
        }
        Ok(items)
    }

    fn parse_statement(&mut self) -> Result<Ast, ParseError> {
        let token = self
            .peek()
            .cloned()
            .expect("parse_statement called at end of input");
        match (token.kind, token.lexeme.as_str()) {
            (TokenKind::Keyword, "함수") => self.parse_func_def(),
            (TokenKind::Keyword, "출력") => Ok(self.parse_print()),
            (TokenKind::Keyword, "만약에") | (TokenKind::Keyword, "만약") => self.parse_if(),
            (TokenKind::Keyword, "동안에") => self.parse_while(),
            (TokenKind::Keyword, "반환") => Ok(self.parse_return()),
            (TokenKind::Keyword, "배열") => self.parse_list_decl(),
            (TokenKind::Keyword, "딕셔너리") => self.parse_dict_decl(),
            (TokenKind::Identifier, _) => Ok(self.parse_identifier_statement()),
            (TokenKind::Error, _) => {
                self.advance();
                Ok(Ast::error(token.lexeme))
            }
            _ => {
                self.advance();
                Err(ParseError::new(
                    ParseErrorType::UnknownTopLevelToken(token.lexeme),
                    token.position,
                ))
            }
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Ast>, ParseError> {
        if self.consume(TokenKind::Delimiter, "{").is_none() {
            return Ok(vec![Ast::error("Expected '{' to open block")]);
        }
        let mut stmts = Vec::new();
        while !self.check(TokenKind::Delimiter, "}") && self.peek().is_some() {
            stmts.push(self.parse_statement()?);
        }
        self.consume(TokenKind::Delimiter, "}");
        Ok(stmts)
    }

    fn parse_if(&mut self) -> Result<Ast, ParseError> {
        self.advance();
        let condition = self.parse_expr();
        let body = self.parse_block()?;
        let else_body = if self.check(TokenKind::Keyword, "아니면") {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Ast::If {
            condition: Box::new(condition),
            body,
            else_body,
        })
    }

    fn parse_while(&mut self) -> Result<Ast, ParseError> {
        self.advance();
        let condition = self.parse_expr();
        let body = self.parse_block()?;
        Ok(Ast::While {
            condition: Box::new(condition),
            body,
        })
    }

    fn parse_return(&mut self) -> Ast {
        self.advance();
        let expr = self.parse_expr();
        Ast::Return(Box::new(expr))
    }

    fn parse_print(&mut self) -> Ast {
        self.advance();
        if self.consume(TokenKind::Delimiter, "(").is_none() {
            return Ast::error("Expected '(' after 출력");
        }
        let expr = self.parse_expr();
        if self.consume(TokenKind::Delimiter, ")").is_none() {
            return Ast::error_with_context("Expected ')'", expr);
        }
        Ast::Print(Box::new(expr))
    }

    fn parse_params(&mut self) -> SmallVec<String> {
        let mut params = SmallVec::new();
        if self.check(TokenKind::Delimiter, ")") {
            return params;
        }
        loop {
            match self.consume_identifier() {
                Some(name) => params.push(name),
                None => break,
            }
            if self.consume(TokenKind::Delimiter, ",").is_some() {
                continue;
            }
            break;
        }
        params
    }

    /// A function definition. Two recovery rules apply here (`SPEC_FULL.md`
    /// §4.2 / §11): an unexpected body opener (`[` or `(` where `{` is
    /// required) is skipped to its matching closer and reported in-band
    /// rather than treated as fatal; a body left unterminated at
    /// end-of-input reports the partial definition rather than discarding
    /// it.
    fn parse_func_def(&mut self) -> Result<Ast, ParseError> {
        self.advance();
        let name = match self.consume_identifier() {
            Some(name) => name,
            None => return Ok(Ast::error("Expected function name")),
        };
        if self.consume(TokenKind::Delimiter, "(").is_none() {
            return Ok(Ast::error_with_context(
                "Expected '(' after function name",
                Ast::Identifier(name),
            ));
        }
        let params = self.parse_params();
        if self.consume(TokenKind::Delimiter, ")").is_none() {
            return Ok(Ast::error_with_context(
                "Expected ')' after parameter list",
                Ast::FuncDef {
                    name,
                    params,
                    body: Vec::new(),
                },
            ));
        }
        if let Some(open) = self.peek().cloned() {
            if open.kind == TokenKind::Delimiter && (open.lexeme == "[" || open.lexeme == "(") {
                let closer = if open.lexeme == "[" { "]" } else { ")" };
                self.advance();
                self.skip_to_matching(&open.lexeme, closer);
                return Ok(Ast::error_with_context(
                    "Unexpected function open",
                    Ast::FuncDef {
                        name,
                        params,
                        body: Vec::new(),
                    },
                ));
            }
        }
        if self.consume(TokenKind::Delimiter, "{").is_none() {
            return Ok(Ast::error_with_context(
                "Expected function body opened with '{'",
                Ast::FuncDef {
                    name,
                    params,
                    body: Vec::new(),
                },
            ));
        }
        let mut body = Vec::new();
        loop {
            if self.consume(TokenKind::Delimiter, "}").is_some() {
                break;
            }
            if self.peek().is_none() {
                return Ok(Ast::error_with_context(
                    "Expected function closed with '}', got EOF",
                    Ast::FuncDef { name, params, body },
                ));
            }
            body.push(self.parse_statement()?);
        }
        Ok(Ast::FuncDef { name, params, body })
    }

    fn parse_list_decl(&mut self) -> Result<Ast, ParseError> {
        self.advance();
        let name = match self.consume_identifier() {
            Some(name) => name,
            None => return Ok(Ast::error("Expected list name")),
        };
        if self.consume(TokenKind::Operator, "=").is_none() {
            return Ok(Ast::error_with_context(
                "Expected '=' in list declaration",
                Ast::Identifier(name),
            ));
        }
        if self.consume(TokenKind::Delimiter, "[").is_none() {
            return Ok(Ast::error_with_context(
                "Expected '[' in list declaration",
                Ast::Identifier(name),
            ));
        }
        if self.consume(TokenKind::Delimiter, "]").is_none() {
            return Ok(Ast::error_with_context(
                "Expected ']' in list declaration",
                Ast::Identifier(name),
            ));
        }
        Ok(Ast::List { name })
    }

    fn parse_dict_decl(&mut self) -> Result<Ast, ParseError> {
        self.advance();
        let name = match self.consume_identifier() {
            Some(name) => name,
            None => return Ok(Ast::error("Expected dictionary name")),
        };
        if self.consume(TokenKind::Operator, "=").is_none() {
            return Ok(Ast::error_with_context(
                "Expected '=' in dictionary declaration",
                Ast::Identifier(name),
            ));
        }
        if self.consume(TokenKind::Delimiter, "{").is_none() {
            return Ok(Ast::error_with_context(
                "Expected '{' in dictionary declaration",
                Ast::Identifier(name),
            ));
        }
        if self.consume(TokenKind::Delimiter, "}").is_none() {
            return Ok(Ast::error_with_context(
                "Expected '}' in dictionary declaration",
                Ast::Identifier(name),
            ));
        }
        Ok(Ast::Dict {
            name,
            key: None,
            value: None,
        })
    }

    /// An identifier-led statement: a call, a method call, a dictionary
    /// assignment, or a plain assignment.
    fn parse_identifier_statement(&mut self) -> Ast {
        let name = self.advance().expect("checked by caller").lexeme;
        match self.peek().cloned() {
            Some(t) if t.kind == TokenKind::Delimiter && t.lexeme == "(" => {
                self.advance();
                let args = self.parse_call_args();
                if self.consume(TokenKind::Delimiter, ")").is_none() {
                    return Ast::error_with_context("Expected ')'", Ast::FuncCall { name, args });
                }
                Ast::FuncCall { name, args }
            }
            Some(t) if t.kind == TokenKind::Delimiter && t.lexeme == "." => {
                self.advance();
                self.parse_method_call(name)
            }
            Some(t) if t.kind == TokenKind::Delimiter && t.lexeme == "[" => {
                self.advance();
                let key = self.parse_expr();
                if self.consume(TokenKind::Delimiter, "]").is_none() {
                    return Ast::error_with_context("Expected ']'", Ast::Identifier(name));
                }
                if self.consume(TokenKind::Operator, "=").is_none() {
                    return Ast::error_with_context(
                        "Expected '=' in dictionary assignment",
                        Ast::Identifier(name),
                    );
                }
                let value = self.parse_expr();
                Ast::DictAssign {
                    dict: Box::new(Ast::Identifier(name)),
                    key: Box::new(key),
                    value: Box::new(value),
                }
            }
            Some(t) if t.kind == TokenKind::Operator && t.lexeme == "=" => {
                self.advance();
                let expr = self.parse_expr();
                Ast::Assign {
                    target: Box::new(Ast::Identifier(name)),
                    expr: Box::new(expr),
                }
            }
            _ => Ast::error(format!("Unexpected token after identifier '{name}'")),
        }
    }

    fn parse_method_call(&mut self, receiver: String) -> Ast {
        let Some(method) = self.consume_method_name() else {
            return Ast::error_with_context("Expected method name", Ast::Identifier(receiver));
        };
        if self.consume(TokenKind::Delimiter, "(").is_none() {
            return Ast::error_with_context(
                "Expected '(' after method name",
                Ast::MethodCall {
                    receiver,
                    method,
                    args: SmallVec::new(),
                },
            );
        }
        let args = self.parse_call_args();
        if self.consume(TokenKind::Delimiter, ")").is_none() {
            return Ast::error_with_context(
                "Expected ')'",
                Ast::MethodCall {
                    receiver,
                    method,
                    args,
                },
            );
        }
        Ast::MethodCall {
            receiver,
            method,
            args,
        }
    }

    /// Call argument lists are *not* parsed as a comma-separated expression
    /// list: `,` sits at the lowest precedence level inside `expr` itself
    /// (`SPEC_FULL.md` §11.1), so `f(a, b)` parses its whole argument list
    /// as a single `BinaryOp(a, ",", b)` expression. This is an
    /// intentionally preserved quirk, not a bug to fix here.
    fn parse_call_args(&mut self) -> SmallVec<Ast> {
        let mut args = SmallVec::new();
        if !self.check(TokenKind::Delimiter, ")") {
            args.push(self.parse_expr());
        }
        args
    }

    fn parse_expr(&mut self) -> Ast {
        let mut left = self.parse_pred();
        while let Some(op) = self.match_op(EXPR_OPS) {
            let right = self.parse_pred();
            left = Ast::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        left
    }

    fn parse_pred(&mut self) -> Ast {
        let mut left = self.parse_term();
        while let Some(op) = self.match_op(PRED_OPS) {
            let right = self.parse_term();
            left = Ast::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        left
    }

    fn parse_term(&mut self) -> Ast {
        let mut left = self.parse_base();
        while let Some(op) = self.match_op(TERM_OPS) {
            let right = self.parse_base();
            left = Ast::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        left
    }

    fn parse_base(&mut self) -> Ast {
        let Some(token) = self.peek().cloned() else {
            return Ast::error("Unexpected end of input");
        };
        match token.kind {
            TokenKind::Number => {
                self.advance();
                let digits = token.lexeme.split('.').next().unwrap_or(&token.lexeme);
                Ast::Number(digits.parse().unwrap_or(0))
            }
            TokenKind::String => {
                self.advance();
                Ast::StringLit(token.lexeme)
            }
            TokenKind::Error => {
                self.advance();
                if token.lexeme.starts_with('"') {
                    Ast::error_with_context(
                        "Unterminated string literal",
                        Ast::StringLit(token.lexeme),
                    )
                } else {
                    Ast::error(token.lexeme)
                }
            }
            TokenKind::Keyword if token.lexeme == "진실" => {
                self.advance();
                Ast::Boolean(true)
            }
            TokenKind::Keyword if token.lexeme == "거짓" => {
                self.advance();
                Ast::Boolean(false)
            }
            TokenKind::Keyword if token.lexeme == "널" => {
                self.advance();
                Ast::Null
            }
            TokenKind::Keyword if token.lexeme == "랜덤" => self.parse_random_call(),
            TokenKind::Identifier => self.parse_identifier_expr(),
            TokenKind::Delimiter if token.lexeme == "(" => {
                self.advance();
                let inner = self.parse_expr();
                if self.consume(TokenKind::Delimiter, ")").is_none() {
                    return Ast::error_with_context("Expected ')'", inner);
                }
                inner
            }
            TokenKind::Operator if token.lexeme == "-" => {
                self.advance();
                let operand = self.parse_base();
                Ast::UnaryOp {
                    op: token.lexeme,
                    operand: Box::new(operand),
                }
            }
            _ => {
                self.advance();
                Ast::error(format!("Unexpected token '{}'", token.lexeme))
            }
        }
    }

    fn parse_identifier_expr(&mut self) -> Ast {
        let name = self.advance().expect("checked by caller").lexeme;
        if self.check(TokenKind::Delimiter, "[") {
            self.advance();
            let index = self.parse_expr();
            if self.consume(TokenKind::Delimiter, "]").is_none() {
                return Ast::error_with_context("Expected ']'", Ast::Identifier(name));
            }
            return Ast::ListElem {
                list: Box::new(Ast::Identifier(name)),
                index: Box::new(index),
            };
        }
        if self.check(TokenKind::Delimiter, ".") {
            self.advance();
            return self.parse_method_call(name);
        }
        Ast::Identifier(name)
    }

    fn parse_random_call(&mut self) -> Ast {
        self.advance();
        if self.consume(TokenKind::Delimiter, "(").is_none() {
            return Ast::error_with_context(
                "Expected '('",
                Ast::FuncCall {
                    name: "랜덤".to_string(),
                    args: SmallVec::new(),
                },
            );
        }
        if self.consume(TokenKind::Delimiter, ")").is_none() {
            return Ast::error_with_context(
                "Expected ')'",
                Ast::FuncCall {
                    name: "랜덤".to_string(),
                    args: SmallVec::new(),
                },
            );
        }
        Ast::FuncCall {
            name: "랜덤".to_string(),
            args: SmallVec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Lexer;

    fn parse_source(source: &str) -> Vec<Ast> {
        let tokens = Lexer::new(source).tokenize();
        parse(tokens).expect("expected a successful parse")
    }

    #[test]
    fn arithmetic_precedence_and_associativity() {
        let items = parse_source("출력(1 + 2 * 3)");
        assert_eq!(
            items[0],
            Ast::Print(Box::new(Ast::BinaryOp {
                left: Box::new(Ast::Number(1)),
                op: "+".to_string(),
                right: Box::new(Ast::BinaryOp {
                    left: Box::new(Ast::Number(2)),
                    op: "*".to_string(),
                    right: Box::new(Ast::Number(3)),
                }),
            }))
        );
    }

    #[test]
    fn left_associative_subtraction() {
        let items = parse_source("출력(10 - 2 - 3)");
        assert_eq!(
            items[0],
            Ast::Print(Box::new(Ast::BinaryOp {
                left: Box::new(Ast::BinaryOp {
                    left: Box::new(Ast::Number(10)),
                    op: "-".to_string(),
                    right: Box::new(Ast::Number(2)),
                }),
                op: "-".to_string(),
                right: Box::new(Ast::Number(3)),
            }))
        );
    }

    #[test]
    fn if_else_shape() {
        let items = parse_source("만약에 1 == 1 { 출력(1) } 아니면 { 출력(0) }");
        match &items[0] {
            Ast::If {
                body, else_body, ..
            } => {
                assert_eq!(body.len(), 1);
                assert!(else_body.is_some());
                assert_eq!(else_body.as_ref().unwrap().len(), 1);
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn multi_arg_call_folds_into_one_comma_expression() {
        let items = parse_source("f(a, b)");
        match &items[0] {
            Ast::FuncCall { name, args } => {
                assert_eq!(name, "f");
                assert_eq!(args.len(), 1);
                assert!(matches!(&args[0], Ast::BinaryOp { op, .. } if op == ","));
            }
            other => panic!("expected FuncCall, got {other:?}"),
        }
    }

    #[test]
    fn random_without_parens_is_in_band_error() {
        let items = parse_source("출력(랜덤)");
        match &items[0] {
            Ast::Print(inner) => assert!(inner.is_error()),
            other => panic!("expected Print, got {other:?}"),
        }
    }

    #[test]
    fn wrong_function_opener_is_recovered_in_band() {
        let items = parse_source("함수 f() [ 출력(1) ]");
        match &items[0] {
            Ast::Error { message, context } => {
                assert_eq!(message, "Unexpected function open");
                assert!(matches!(context.as_deref(), Some(Ast::FuncDef { .. })));
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_function_body_reports_partial_def() {
        let items = parse_source("함수 f() { 출력(1)");
        match &items[0] {
            Ast::Error { message, context } => {
                assert_eq!(message, "Expected function closed with '}', got EOF");
                match context.as_deref() {
                    Some(Ast::FuncDef { body, .. }) => assert_eq!(body.len(), 1),
                    other => panic!("expected FuncDef context, got {other:?}"),
                }
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_top_level_token_is_fatal() {
        let tokens = Lexer::new(")").tokenize();
        let result = parse(tokens);
        assert!(result.is_err());
    }

    #[test]
    fn dictionary_assignment_shape() {
        let items = parse_source("딕셔너리 d = {}\nd[1] = 42");
        match &items[1] {
            Ast::DictAssign { dict, key, value } => {
                assert_eq!(**dict, Ast::Identifier("d".to_string()));
                assert_eq!(**key, Ast::Number(1));
                assert_eq!(**value, Ast::Number(42));
            }
            other => panic!("expected DictAssign, got {other:?}"),
        }
    }

    #[test]
    fn method_call_shape() {
        let items = parse_source("numbers.추가(1)");
        assert_eq!(
            items[0],
            Ast::MethodCall {
                receiver: "numbers".to_string(),
                method: "추가".to_string(),
                args: SmallVec::from_vec(vec![Ast::Number(1)]),
            }
        );
    }
}
