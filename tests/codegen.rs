//! Black-box code generator tests against the public API.

use hana::{optimize, CodeGenerator, Lexer, OptimizationLevel, Parser};

fn generate(source: &str) -> String {
    let tokens = Lexer::new(source).tokenize();
    let items = Parser::new(tokens).parse_program().expect("parse failed");
    let items = optimize(items, OptimizationLevel::Simple);
    CodeGenerator::new().generate(&items)
}

#[test]
fn emits_data_and_text_sections() {
    let asm = generate("출력(1)");
    assert!(asm.contains(".data"));
    assert!(asm.contains(".globl main"));
}

#[test]
fn list_append_and_pop_reference_the_same_label() {
    let asm = generate("배열 xs = []\nxs.추가(1)\nxs.뽑기()");
    let label_count = asm.matches("xs_list").count();
    assert!(label_count >= 2);
}

#[test]
fn unsupported_method_is_a_comment_not_a_crash() {
    let asm = generate("배열 xs = []\nxs.정렬()");
    assert!(asm.contains("# unsupported method: 정렬"));
}
