//! The AST optimizer: constant folding, constant propagation, algebraic
//! identity elimination, and dead-branch elimination. See `SPEC_FULL.md`
//! §4.3.
//!
//! The optimizer never reorders side effects and never evaluates a
//! function/method call — a call invalidates every tracked constant rather
//! than being folded through, since Hana has no lexical scoping and the
//! optimizer has no way to know what a callee touches.

use ahash::AHashMap;

use crate::Ast;

/// How aggressively [`optimize`] rewrites the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationLevel {
    /// Emit the parser's output unchanged (`--no-optimize`, `SPEC_FULL.md`
    /// §10.3).
    None,
    /// Constant folding, propagation, algebraic identities, and dead-branch
    /// elimination.
    Simple,
}

/// Optimizes a full program (the parser's top-level items) at the given
/// level.
pub fn optimize(items: Vec<Ast>, level: OptimizationLevel) -> Vec<Ast> {
    match level {
        OptimizationLevel::None => items,
        OptimizationLevel::Simple => Optimizer::new().optimize_block(items),
    }
}

/// Tracks the last known literal value of each identifier in program order.
/// Since Hana has a single flat stack frame (no lexical scoping,
/// `SPEC_FULL.md` §9), one map suffices for an entire compilation unit.
struct Optimizer {
    constants: AHashMap<String, i64>,
}

impl Optimizer {
    fn new() -> Self {
        Self {
            constants: AHashMap::default(),
        }
    }

    /// Any branch or call whose effect on the variable set isn't tracked
    /// precisely clears every known constant, rather than risk folding a
    /// stale value. This is the conservative choice `spec.md` §4.3 calls
    /// for; see `DESIGN.md` for why a full per-branch merge was not built.
    fn forget_all(&mut self) {
        self.constants.clear();
    }

    fn optimize_block(&mut self, stmts: Vec<Ast>) -> Vec<Ast> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            out.extend(self.optimize_stmt(stmt));
        }
        out
    }

    /// Optimizes one statement, returning zero, one, or many replacement
    /// statements — dead-branch elimination can both delete a statement
    /// (`동안에 거짓 { ... }`) and inline a whole block in its place
    /// (`만약에 진실 { ... }`), neither of which fits a 1:1 rewrite.
    fn optimize_stmt(&mut self, node: Ast) -> Vec<Ast> {
        match node {
            Ast::Assign { target, expr } => {
                let expr = self.optimize_expr(*expr);
                if let Ast::Identifier(name) = target.as_ref() {
                    match &expr {
                        Ast::Number(n) => {
                            self.constants.insert(name.clone(), *n);
                        }
                        _ => {
                            self.constants.remove(name);
                        }
                    }
                }
                vec![Ast::Assign {
                    target,
                    expr: Box::new(expr),
                }]
            }
            Ast::If {
                condition,
                body,
                else_body,
            } => {
                let condition = self.optimize_expr(*condition);
                match condition {
                    Ast::Boolean(true) => {
                        self.forget_all();
                        self.optimize_block(body)
                    }
                    Ast::Boolean(false) => {
                        self.forget_all();
                        else_body.map(|e| self.optimize_block(e)).unwrap_or_default()
                    }
                    _ => {
                        self.forget_all();
                        let body = self.optimize_block(body);
                        let else_body = else_body.map(|e| self.optimize_block(e));
                        vec![Ast::If {
                            condition: Box::new(condition),
                            body,
                            else_body,
                        }]
                    }
                }
            }
            Ast::While { condition, body } => {
                let condition = self.optimize_expr(*condition);
                if matches!(condition, Ast::Boolean(false)) {
                    return Vec::new();
                }
                self.forget_all();
                let body = self.optimize_block(body);
                vec![Ast::While {
                    condition: Box::new(condition),
                    body,
                }]
            }
            Ast::FuncDef { name, params, body } => {
                // A function body is a fresh sub-problem: no outer constant
                // leaks in, since a call site may run before or after the
                // values captured at definition time have changed.
                let body = Optimizer::new().optimize_block(body);
                vec![Ast::FuncDef { name, params, body }]
            }
            Ast::Print(expr) => vec![Ast::Print(Box::new(self.optimize_expr(*expr)))],
            Ast::Return(expr) => vec![Ast::Return(Box::new(self.optimize_expr(*expr)))],
            Ast::FuncCall { name, args } => {
                let args = args.into_iter().map(|a| self.optimize_expr(a)).collect();
                self.forget_all();
                vec![Ast::FuncCall { name, args }]
            }
            Ast::MethodCall {
                receiver,
                method,
                args,
            } => {
                let args = args.into_iter().map(|a| self.optimize_expr(a)).collect();
                self.constants.remove(&receiver);
                vec![Ast::MethodCall {
                    receiver,
                    method,
                    args,
                }]
            }
            Ast::DictAssign { dict, key, value } => {
                let key = self.optimize_expr(*key);
                let value = self.optimize_expr(*value);
                vec![Ast::DictAssign {
                    dict,
                    key: Box::new(key),
                    value: Box::new(value),
                }]
            }
            other => vec![other],
        }
    }

    fn optimize_expr(&mut self, node: Ast) -> Ast {
        match node {
            Ast::Identifier(name) => match self.constants.get(&name) {
                Some(value) => Ast::Number(*value),
                None => Ast::Identifier(name),
            },
            Ast::UnaryOp { op, operand } => {
                let operand = self.optimize_expr(*operand);
                if op == "-" {
                    if let Ast::Number(n) = operand {
                        return Ast::Number(-n);
                    }
                }
                Ast::UnaryOp {
                    op,
                    operand: Box::new(operand),
                }
            }
            Ast::BinaryOp { left, op, right } => {
                let left = self.optimize_expr(*left);
                let right = self.optimize_expr(*right);
                fold_binary(left, op, right)
            }
            Ast::ListElem { list, index } => Ast::ListElem {
                list: Box::new(self.optimize_expr(*list)),
                index: Box::new(self.optimize_expr(*index)),
            },
            Ast::FuncCall { name, args } => {
                let args = args.into_iter().map(|a| self.optimize_expr(a)).collect();
                Ast::FuncCall { name, args }
            }
            Ast::MethodCall {
                receiver,
                method,
                args,
            } => {
                let args = args.into_iter().map(|a| self.optimize_expr(a)).collect();
                Ast::MethodCall {
                    receiver,
                    method,
                    args,
                }
            }
            other => other,
        }
    }
}

fn fold_binary(left: Ast, op: String, right: Ast) -> Ast {
    if let Some(simplified) = algebraic_identity(&left, &op, &right) {
        return simplified;
    }
    if let (Ast::Number(a), Ast::Number(b)) = (&left, &right) {
        if let Some(folded) = fold_numeric(*a, &op, *b) {
            return folded;
        }
    }
    Ast::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// `x + 0`, `x - 0`, `x * 1`, `x / 1`, and their commutative `+`/`*` forms
/// collapse to `x` without waiting for `x` itself to be a known constant.
fn algebraic_identity(left: &Ast, op: &str, right: &Ast) -> Option<Ast> {
    match (op, right) {
        ("+", Ast::Number(0)) | ("-", Ast::Number(0)) => return Some(left.clone()),
        ("*", Ast::Number(1)) | ("/", Ast::Number(1)) => return Some(left.clone()),
        _ => {}
    }
    match (op, left) {
        ("+", Ast::Number(0)) | ("*", Ast::Number(1)) => Some(right.clone()),
        _ => None,
    }
}

fn fold_numeric(a: i64, op: &str, b: i64) -> Option<Ast> {
    Some(match op {
        "+" => Ast::Number(a.wrapping_add(b)),
        "-" => Ast::Number(a.wrapping_sub(b)),
        "*" => Ast::Number(a.wrapping_mul(b)),
        "/" => Ast::Number(if b == 0 { 0 } else { a.div_euclid(b) }),
        "%" => Ast::Number(if b == 0 { 0 } else { a.rem_euclid(b) }),
        "**" => Ast::Number(if b >= 0 {
            a.checked_pow(b as u32).unwrap_or(0)
        } else {
            0
        }),
        "==" => Ast::Boolean(a == b),
        "!=" => Ast::Boolean(a != b),
        "<" => Ast::Boolean(a < b),
        "<=" => Ast::Boolean(a <= b),
        ">" => Ast::Boolean(a > b),
        ">=" => Ast::Boolean(a >= b),
        "그리고" => Ast::Boolean(a != 0 && b != 0),
        "이거나" => Ast::Boolean(a != 0 || b != 0),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(items: Vec<Ast>) -> Vec<Ast> {
        optimize(items, OptimizationLevel::Simple)
    }

    #[test]
    fn folds_constant_arithmetic() {
        let items = opt(vec![Ast::Print(Box::new(Ast::BinaryOp {
            left: Box::new(Ast::Number(2)),
            op: "+".to_string(),
            right: Box::new(Ast::Number(3)),
        }))]);
        assert_eq!(items[0], Ast::Print(Box::new(Ast::Number(5))));
    }

    #[test]
    fn propagates_constants_across_statements() {
        let items = opt(vec![
            Ast::Assign {
                target: Box::new(Ast::Identifier("x".to_string())),
                expr: Box::new(Ast::Number(5)),
            },
            Ast::Print(Box::new(Ast::Identifier("x".to_string()))),
        ]);
        assert_eq!(items[1], Ast::Print(Box::new(Ast::Number(5))));
    }

    #[test]
    fn reassignment_to_non_constant_invalidates() {
        let items = opt(vec![
            Ast::Assign {
                target: Box::new(Ast::Identifier("x".to_string())),
                expr: Box::new(Ast::Number(5)),
            },
            Ast::Assign {
                target: Box::new(Ast::Identifier("x".to_string())),
                expr: Box::new(Ast::FuncCall {
                    name: "읽기".to_string(),
                    args: Default::default(),
                }),
            },
            Ast::Print(Box::new(Ast::Identifier("x".to_string()))),
        ]);
        assert_eq!(
            items[2],
            Ast::Print(Box::new(Ast::Identifier("x".to_string())))
        );
    }

    #[test]
    fn algebraic_identity_elimination() {
        let items = opt(vec![Ast::Print(Box::new(Ast::BinaryOp {
            left: Box::new(Ast::Identifier("x".to_string())),
            op: "+".to_string(),
            right: Box::new(Ast::Number(0)),
        }))]);
        assert_eq!(
            items[0],
            Ast::Print(Box::new(Ast::Identifier("x".to_string())))
        );
    }

    #[test]
    fn dead_if_true_inlines_body() {
        let items = opt(vec![Ast::If {
            condition: Box::new(Ast::Boolean(true)),
            body: vec![Ast::Print(Box::new(Ast::Number(1)))],
            else_body: Some(vec![Ast::Print(Box::new(Ast::Number(2)))]),
        }]);
        assert_eq!(items, vec![Ast::Print(Box::new(Ast::Number(1)))]);
    }

    #[test]
    fn dead_if_false_inlines_else() {
        let items = opt(vec![Ast::If {
            condition: Box::new(Ast::Boolean(false)),
            body: vec![Ast::Print(Box::new(Ast::Number(1)))],
            else_body: Some(vec![Ast::Print(Box::new(Ast::Number(2)))]),
        }]);
        assert_eq!(items, vec![Ast::Print(Box::new(Ast::Number(2)))]);
    }

    #[test]
    fn dead_while_false_is_removed_entirely() {
        let items = opt(vec![Ast::While {
            condition: Box::new(Ast::Boolean(false)),
            body: vec![Ast::Print(Box::new(Ast::Number(1)))],
        }]);
        assert!(items.is_empty());
    }

    #[test]
    fn optimization_is_idempotent() {
        let source = vec![
            Ast::Assign {
                target: Box::new(Ast::Identifier("x".to_string())),
                expr: Box::new(Ast::BinaryOp {
                    left: Box::new(Ast::Number(2)),
                    op: "*".to_string(),
                    right: Box::new(Ast::Number(3)),
                }),
            },
            Ast::Print(Box::new(Ast::Identifier("x".to_string()))),
        ];
        let once = opt(source);
        let twice = optimize(once.clone(), OptimizationLevel::Simple);
        assert_eq!(once, twice);
    }

    #[test]
    fn none_level_is_a_no_op() {
        let source = vec![Ast::Print(Box::new(Ast::BinaryOp {
            left: Box::new(Ast::Number(2)),
            op: "+".to_string(),
            right: Box::new(Ast::Number(3)),
        }))];
        let items = optimize(source.clone(), OptimizationLevel::None);
        assert_eq!(items, source);
    }
}
