//! The single entry point the CLI (and any future embedder) calls. See
//! `SPEC_FULL.md` §10.4.
//!
//! Every call to [`compile_source`] starts from completely fresh state —
//! a new lexer, a new parser cursor, a new optimizer constant environment,
//! and a new code generator — matching `spec.md` §5's "no state shared
//! across compilations" rule.

use tracing::debug;

use crate::codegen::CodeGenerator;
use crate::error::HanaError;
use crate::optimize::{optimize, OptimizationLevel};
use crate::parse::parse;
use crate::token::Lexer;
use crate::Ast;

/// Options controlling a single compilation. Constructed directly by
/// library callers, or derived from [`crate::Ast`]-free CLI flags by
/// `hanac` (see `SPEC_FULL.md` §10.3).
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    pub optimization_level: OptimizationLevel,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimization_level: OptimizationLevel::Simple,
        }
    }
}

/// The result of a single compilation: the emitted assembly plus every
/// in-band [`crate::Ast::Error`] node encountered, so a caller can inspect
/// both without the driver deciding unilaterally that a recoverable error
/// is fatal (`spec.md` §7).
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub assembly: String,
    pub errors: Vec<String>,
}

fn collect_errors(items: &[Ast], out: &mut Vec<String>) {
    for item in items {
        collect_errors_in(item, out);
    }
}

fn collect_errors_in(node: &Ast, out: &mut Vec<String>) {
    match node {
        Ast::Error { message, context } => {
            out.push(message.clone());
            if let Some(context) = context {
                collect_errors_in(context, out);
            }
        }
        Ast::If {
            condition,
            body,
            else_body,
        } => {
            collect_errors_in(condition, out);
            collect_errors(body, out);
            if let Some(else_body) = else_body {
                collect_errors(else_body, out);
            }
        }
        Ast::While { condition, body } => {
            collect_errors_in(condition, out);
            collect_errors(body, out);
        }
        Ast::FuncDef { body, .. } => collect_errors(body, out),
        Ast::Assign { target, expr } => {
            collect_errors_in(target, out);
            collect_errors_in(expr, out);
        }
        Ast::BinaryOp { left, right, .. } => {
            collect_errors_in(left, out);
            collect_errors_in(right, out);
        }
        Ast::UnaryOp { operand, .. } => collect_errors_in(operand, out),
        Ast::Print(expr) | Ast::Return(expr) => collect_errors_in(expr, out),
        Ast::DictAssign { key, value, .. } => {
            collect_errors_in(key, out);
            collect_errors_in(value, out);
        }
        Ast::ListElem { list, index } => {
            collect_errors_in(list, out);
            collect_errors_in(index, out);
        }
        Ast::FuncCall { args, .. } | Ast::MethodCall { args, .. } => {
            for arg in args {
                collect_errors_in(arg, out);
            }
        }
        _ => {}
    }
}

/// Runs the full pipeline — lex, parse, optionally optimize, generate —
/// over `text`. The only condition that aborts outright (returning `Err`)
/// is the one fatal parser condition: an unknown top-level token.
/// Everything else surfaces as an `Ast::Error` entry in
/// [`CompileOutput::errors`] alongside whatever assembly could still be
/// produced for the rest of the program.
pub fn compile_source(text: &str, opts: &CompileOptions) -> Result<CompileOutput, HanaError> {
    debug!("lexing");
    let tokens = Lexer::new(text).tokenize();

    debug!(count = tokens.len(), "parsing");
    let items = parse(tokens).map_err(HanaError::from)?;

    debug!(level = ?opts.optimization_level, "optimizing");
    let items = optimize(items, opts.optimization_level);

    let mut errors = Vec::new();
    collect_errors(&items, &mut errors);

    debug!("generating assembly");
    let assembly = CodeGenerator::new().generate(&items);

    Ok(CompileOutput { assembly, errors })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_arithmetic_and_print() {
        let output = compile_source("출력(1 + 2)", &CompileOptions::default()).unwrap();
        assert!(output.assembly.starts_with(".data\n"));
        assert!(output.errors.is_empty());
    }

    #[test]
    fn end_to_end_single_allocation() {
        let output = compile_source("x = 5\n출력(x)", &CompileOptions::default()).unwrap();
        assert_eq!(output.assembly.matches("-4($fp)").count(), 2);
    }

    #[test]
    fn end_to_end_dead_branch_reduction() {
        let output = compile_source(
            "만약에 1 == 1 { 출력(1) } 아니면 { 출력(0) }",
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(output.assembly.contains("li $v0, 1"));
        assert!(!output.assembly.contains("li $v0, 0"));
    }

    #[test]
    fn end_to_end_while_loop_has_labels() {
        let output = compile_source(
            "x = 0\n동안에 x < 10 { x = x + 1 }",
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(output.assembly.contains("while_"));
    }

    #[test]
    fn end_to_end_dictionary_store() {
        let output =
            compile_source("딕셔너리 d = {}\nd[1] = 42", &CompileOptions::default()).unwrap();
        assert!(output.assembly.contains("d_dict: .space 400"));
    }

    #[test]
    fn end_to_end_wrong_function_opener_recovers() {
        let output = compile_source(
            "함수 f() [ 출력(1) ]\n출력(2)",
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(output.errors, vec!["Unexpected function open".to_string()]);
        assert!(output.assembly.contains("li $v0, 2"));
    }

    #[test]
    fn unknown_top_level_token_is_a_hard_error() {
        let result = compile_source(")", &CompileOptions::default());
        assert!(result.is_err());
    }
}
