//! Black-box optimizer tests against the public API.

use hana::{optimize, Ast, OptimizationLevel};

#[test]
fn constant_folding_through_public_api() {
    let items = vec![Ast::Print(Box::new(Ast::BinaryOp {
        left: Box::new(Ast::Number(4)),
        op: "*".to_string(),
        right: Box::new(Ast::Number(5)),
    }))];
    let optimized = optimize(items, OptimizationLevel::Simple);
    assert_eq!(optimized[0], Ast::Print(Box::new(Ast::Number(20))));
}

#[test]
fn no_optimize_level_leaves_tree_untouched() {
    let items = vec![Ast::Print(Box::new(Ast::BinaryOp {
        left: Box::new(Ast::Identifier("x".to_string())),
        op: "+".to_string(),
        right: Box::new(Ast::Number(0)),
    }))];
    let optimized = optimize(items.clone(), OptimizationLevel::None);
    assert_eq!(optimized, items);
}

#[test]
fn dead_while_loop_vanishes() {
    let items = vec![Ast::While {
        condition: Box::new(Ast::Boolean(false)),
        body: vec![Ast::Print(Box::new(Ast::Number(1)))],
    }];
    let optimized = optimize(items, OptimizationLevel::Simple);
    assert!(optimized.is_empty());
}
