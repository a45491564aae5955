//! The MIPS32 code generator. Walks the (optionally optimized) AST once,
//! in source order, and emits SPIM/MARS-style assembly text. See
//! `SPEC_FULL.md` §4.4.
//!
//! Registers follow a single fixed convention throughout: every expression
//! leaves its result in `$v0`; a binary operator first evaluates its left
//! operand into `$v0`, saves it to `$t1`, then evaluates the right operand
//! into `$v0` and combines the two back into `$v0`. Variables live in one
//! flat stack frame addressed through `$fp` (`spec.md`'s "no lexical
//! scoping" non-goal — see `DESIGN.md`), allocated on first use at a
//! monotonically decreasing offset starting at `-4`.

use ahash::AHashMap;

use crate::Ast;

const LIST_DICT_SLOTS: i32 = 100;
const LIST_DICT_BYTES: i32 = LIST_DICT_SLOTS * 4;
/// Size of the fixed frame reserved under `$fp` in `main`. Generously sized
/// rather than computed by a separate sizing pass — see `DESIGN.md` for why
/// a two-pass frame-size calculation wasn't built for a language with no
/// recursion-heavy or deeply nested programs in its test corpus.
const FRAME_BYTES: i32 = 1024;

pub struct CodeGenerator {
    stack_offset: i32,
    variables: AHashMap<String, i32>,
    lists: AHashMap<String, String>,
    dicts: AHashMap<String, String>,
    data_section: Vec<String>,
    text: Vec<String>,
    label_counter: u32,
    string_counter: u32,
    last_li_v0: Option<i64>,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            stack_offset: -4,
            variables: AHashMap::default(),
            lists: AHashMap::default(),
            dicts: AHashMap::default(),
            data_section: Vec::new(),
            text: Vec::new(),
            label_counter: 0,
            string_counter: 0,
            last_li_v0: None,
        }
    }

    /// Generates assembly for a full (already optimized, if requested)
    /// program and returns the complete `.data`/`.text` text.
    pub fn generate(mut self, items: &[Ast]) -> String {
        self.emit(format!("addi $sp, $sp, -{FRAME_BYTES}"));
        self.emit("move $fp, $sp".to_string());
        for item in items {
            self.gen_item(item);
        }
        self.emit("move $sp, $fp".to_string());
        self.emit(format!("addi $sp, $sp, {FRAME_BYTES}"));
        self.emit("li $v0, 10".to_string());
        self.emit("syscall".to_string());

        let mut out = String::from(".data\n");
        for line in &self.data_section {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("\n.text\n.globl main\nmain:\n");
        for line in &self.text {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    fn emit(&mut self, line: impl Into<String>) {
        self.text.push(line.into());
    }

    fn emit_label(&mut self, label: &str) {
        self.text.push(format!("{label}:"));
    }

    fn new_label(&mut self, prefix: &str) -> String {
        let label = format!("{prefix}_{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    fn invalidate_peephole(&mut self) {
        self.last_li_v0 = None;
    }

    /// Returns the `$fp`-relative stack offset for `name`, allocating a new
    /// slot (and warning) the first time it's seen — the deferred
    /// "semantic" error kind of `spec.md` §7.
    fn offset_for(&mut self, name: &str) -> i32 {
        if let Some(&offset) = self.variables.get(name) {
            offset
        } else {
            tracing::warn!(variable = name, "auto-allocating undeclared identifier");
            let offset = self.stack_offset;
            self.stack_offset -= 4;
            self.variables.insert(name.to_string(), offset);
            offset
        }
    }

    fn data_label_for_string(&mut self, text: &str) -> String {
        let label = format!("str_{}", self.string_counter);
        self.string_counter += 1;
        let escaped = text.trim_matches('"').replace('\\', "\\\\").replace('"', "\\\"");
        self.data_section
            .push(format!("{label}: .asciiz \"{escaped}\""));
        label
    }

    /// Generates one top-level item. An `Error` node (or one reached deep
    /// inside a statement) hard-stops emission for *this* item only — the
    /// rest of the program still gets generated (`spec.md` §4.5).
    fn gen_item(&mut self, item: &Ast) {
        if item.is_error() {
            self.gen_error(item);
            return;
        }
        self.gen_stmt(item);
    }

    fn gen_error(&mut self, node: &Ast) {
        if let Ast::Error { message, .. } = node {
            tracing::warn!(message = %message, "stopping emission for item containing an error node");
            self.emit(format!("# Error encountered: {message}"));
        }
    }

    fn gen_stmt(&mut self, node: &Ast) {
        if node.is_error() {
            self.gen_error(node);
            return;
        }
        match node {
            Ast::Assign { target, expr } => {
                let Ast::Identifier(name) = target.as_ref() else {
                    return;
                };
                self.gen_expr(expr);
                let offset = self.offset_for(name);
                self.emit(format!("sw $v0, {offset}($fp)"));
                self.invalidate_peephole();
            }
            Ast::Print(expr) => self.gen_print(expr),
            Ast::If {
                condition,
                body,
                else_body,
            } => self.gen_if(condition, body, else_body.as_deref()),
            Ast::While { condition, body } => self.gen_while(condition, body),
            Ast::FuncDef { name, params, body } => self.gen_func_def(name, params, body),
            Ast::Return(expr) => {
                self.gen_expr(expr);
            }
            Ast::FuncCall { name, args } => {
                self.gen_call(name, args);
            }
            Ast::MethodCall {
                receiver,
                method,
                args,
            } => {
                self.gen_method_call(receiver, method, args);
            }
            Ast::List { name } => {
                let label = format!("{name}_list");
                self.data_section
                    .push(format!("{label}: .space {LIST_DICT_BYTES}"));
                self.lists.insert(name.clone(), label);
            }
            Ast::Dict { name, .. } => {
                let label = format!("{name}_dict");
                self.data_section
                    .push(format!("{label}: .space {LIST_DICT_BYTES}"));
                self.dicts.insert(name.clone(), label);
            }
            Ast::DictAssign { dict, key, value } => self.gen_dict_assign(dict, key, value),
            Ast::Comment(_) => {}
            _ => {
                self.gen_expr(node);
            }
        }
    }

    fn gen_print(&mut self, expr: &Ast) {
        if let Ast::StringLit(text) = expr {
            let label = self.data_label_for_string(text);
            self.emit(format!("la $a0, {label}"));
            self.emit("li $v0, 4".to_string());
            self.emit("syscall".to_string());
            self.invalidate_peephole();
            return;
        }
        self.gen_expr(expr);
        self.emit("move $a0, $v0".to_string());
        self.emit("li $v0, 1".to_string());
        self.emit("syscall".to_string());
        self.invalidate_peephole();
    }

    fn gen_if(&mut self, condition: &Ast, body: &[Ast], else_body: Option<&[Ast]>) {
        self.gen_expr(condition);
        let else_label = self.new_label("else");
        let end_label = self.new_label("endif");
        self.emit(format!("beq $v0, $zero, {else_label}"));
        for stmt in body {
            self.gen_stmt(stmt);
        }
        self.emit(format!("j {end_label}"));
        self.emit_label(&else_label);
        if let Some(else_body) = else_body {
            for stmt in else_body {
                self.gen_stmt(stmt);
            }
        }
        self.emit_label(&end_label);
    }

    fn gen_while(&mut self, condition: &Ast, body: &[Ast]) {
        let start_label = self.new_label("while");
        let end_label = self.new_label("endwhile");
        self.emit_label(&start_label);
        self.gen_expr(condition);
        self.emit(format!("beq $v0, $zero, {end_label}"));
        for stmt in body {
            self.gen_stmt(stmt);
        }
        self.emit(format!("j {start_label}"));
        self.emit_label(&end_label);
    }

    fn gen_func_def(&mut self, name: &str, params: &[String], body: &[Ast]) {
        self.emit_label(name);
        for (i, param) in params.iter().enumerate() {
            let arg_offset = -((i as i32) + 1) * 4;
            self.emit(format!("lw $v0, {arg_offset}($sp)"));
            let offset = self.offset_for(param);
            self.emit(format!("sw $v0, {offset}($fp)"));
        }
        self.emit("addi $sp, $sp, -4".to_string());
        self.emit("sw $ra, 0($sp)".to_string());
        for stmt in body {
            self.gen_stmt(stmt);
        }
        self.emit("lw $ra, 0($sp)".to_string());
        self.emit("addi $sp, $sp, 4".to_string());
        self.emit("jr $ra".to_string());
        self.invalidate_peephole();
    }

    /// Pushes each argument to `-(i+1)*4($sp)` before jumping, per
    /// `SPEC_FULL.md` §4.4. Because `,` sits at the lowest expression
    /// precedence (`SPEC_FULL.md` §11.1), a call written as `f(a, b)` almost
    /// always parses to a *single* comma-expression argument rather than
    /// two — this loop still handles the general shape faithfully.
    ///
    /// `랜덤()` is the one built-in: `spec.md` names it as a keyword, not a
    /// user-defined function, so it lowers directly to MARS's "random int"
    /// syscall rather than a `jal` to an undefined label.
    fn gen_call(&mut self, name: &str, args: &[Ast]) {
        if name == "랜덤" {
            self.emit("li $a0, 0".to_string());
            self.emit("li $v0, 41".to_string());
            self.emit("syscall".to_string());
            self.emit("move $v0, $a0".to_string());
            self.invalidate_peephole();
            return;
        }
        for (i, arg) in args.iter().enumerate() {
            self.gen_expr(arg);
            let arg_offset = -((i as i32) + 1) * 4;
            self.emit(format!("sw $v0, {arg_offset}($sp)"));
        }
        self.emit(format!("jal {name}"));
        self.invalidate_peephole();
    }

    fn gen_method_call(&mut self, receiver: &str, method: &str, args: &[Ast]) {
        match method {
            "추가" => self.gen_list_append(receiver, args.first()),
            "뽑기" => self.gen_list_pop(receiver),
            other => {
                tracing::warn!(method = other, receiver, "unsupported method");
                self.emit(format!("# unsupported method: {other}"));
            }
        }
    }

    fn list_label(&mut self, name: &str) -> String {
        self.lists
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("{name}_list"))
    }

    /// Scans the list's reserved slots for the first zero-valued one and
    /// stores the argument there. A full list (no zero slot found) is
    /// silently a no-op.
    fn gen_list_append(&mut self, name: &str, value: Option<&Ast>) {
        let label = self.list_label(name);
        let scan = self.new_label("append_scan");
        let store = self.new_label("append_store");
        let done = self.new_label("append_done");
        self.emit(format!("la $t0, {label}"));
        self.emit("li $t5, 0".to_string());
        self.emit_label(&scan);
        self.emit(format!("bge $t5, {LIST_DICT_BYTES}, {done}"));
        self.emit("add $t6, $t0, $t5".to_string());
        self.emit("lw $t7, 0($t6)".to_string());
        self.emit(format!("beq $t7, $zero, {store}"));
        self.emit("addi $t5, $t5, 4".to_string());
        self.emit(format!("j {scan}"));
        self.emit_label(&store);
        if let Some(value) = value {
            self.gen_expr(value);
        } else {
            self.emit("li $v0, 0".to_string());
        }
        self.emit("sw $v0, 0($t6)".to_string());
        self.emit_label(&done);
        self.invalidate_peephole();
    }

    /// Scans for the last non-zero slot, leaves its value in `$v0` and
    /// zeroes it. An entirely empty list leaves `$v0` untouched
    /// (`SPEC_FULL.md` §11.3).
    fn gen_list_pop(&mut self, name: &str) {
        let label = self.list_label(name);
        let loop_label = self.new_label("pop_loop");
        let next_label = self.new_label("pop_next");
        let done_label = self.new_label("pop_done");
        let end_label = self.new_label("pop_end");
        self.emit(format!("la $t0, {label}"));
        self.emit("li $t3, 0".to_string());
        self.emit("li $t4, 0".to_string());
        self.emit("li $t5, 0".to_string());
        self.emit_label(&loop_label);
        self.emit(format!("bge $t5, {LIST_DICT_BYTES}, {done_label}"));
        self.emit("add $t6, $t0, $t5".to_string());
        self.emit("lw $t7, 0($t6)".to_string());
        self.emit(format!("beq $t7, $zero, {next_label}"));
        self.emit("li $t3, 1".to_string());
        self.emit("move $t4, $t6".to_string());
        self.emit_label(&next_label);
        self.emit("addi $t5, $t5, 4".to_string());
        self.emit(format!("j {loop_label}"));
        self.emit_label(&done_label);
        self.emit(format!("beq $t3, $zero, {end_label}"));
        self.emit("lw $v0, 0($t4)".to_string());
        self.emit("sw $zero, 0($t4)".to_string());
        self.emit_label(&end_label);
        self.invalidate_peephole();
    }

    /// Four-instruction store once the key is in `$t1` and the value is in
    /// `$v0`: scale the key, compute the effective address, store.
    fn gen_dict_assign(&mut self, dict: &Ast, key: &Ast, value: &Ast) {
        let Ast::Identifier(name) = dict else {
            return;
        };
        let label = self
            .dicts
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("{name}_dict"));
        self.gen_expr(key);
        self.emit("move $t1, $v0".to_string());
        self.gen_expr(value);
        self.emit("sll $t1, $t1, 2".to_string());
        self.emit(format!("la $t2, {label}"));
        self.emit("add $t2, $t2, $t1".to_string());
        self.emit("sw $v0, 0($t2)".to_string());
        self.invalidate_peephole();
    }

    /// Evaluates an expression, leaving its result in `$v0`.
    fn gen_expr(&mut self, node: &Ast) {
        match node {
            Ast::Number(n) => self.gen_number(*n),
            Ast::Boolean(b) => self.gen_number(if *b { 1 } else { 0 }),
            Ast::Null => self.gen_number(0),
            Ast::StringLit(text) => {
                let label = self.data_label_for_string(text);
                self.emit(format!("la $v0, {label}"));
                self.invalidate_peephole();
            }
            Ast::Identifier(name) => {
                let offset = self.offset_for(name);
                self.emit(format!("lw $v0, {offset}($fp)"));
                self.invalidate_peephole();
            }
            Ast::UnaryOp { op, operand } => {
                self.gen_expr(operand);
                if op == "-" {
                    self.emit("sub $v0, $zero, $v0".to_string());
                    self.invalidate_peephole();
                }
            }
            Ast::BinaryOp { left, op, right } => self.gen_binary(left, op, right),
            Ast::ListElem { list, index } => self.gen_list_elem(list, index),
            Ast::FuncCall { name, args } => self.gen_call(name, args),
            Ast::MethodCall {
                receiver,
                method,
                args,
            } => self.gen_method_call(receiver, method, args),
            Ast::Error { .. } => self.gen_error(node),
            _ => {}
        }
    }

    fn gen_number(&mut self, n: i64) {
        if self.last_li_v0 == Some(n) {
            return;
        }
        self.emit(format!("li $v0, {n}"));
        self.last_li_v0 = Some(n);
    }

    fn gen_list_elem(&mut self, list: &Ast, index: &Ast) {
        let Ast::Identifier(name) = list else {
            return;
        };
        let label = self.list_label(name);
        self.gen_expr(index);
        self.emit("sll $v0, $v0, 2".to_string());
        self.emit(format!("la $t0, {label}"));
        self.emit("add $t0, $t0, $v0".to_string());
        self.emit("lw $v0, 0($t0)".to_string());
        self.invalidate_peephole();
    }

    fn gen_binary(&mut self, left: &Ast, op: &str, right: &Ast) {
        if op == "," {
            self.gen_expr(left);
            self.gen_expr(right);
            return;
        }
        self.gen_expr(left);
        self.emit("move $t1, $v0".to_string());
        self.gen_expr(right);
        if op == "**" {
            self.gen_power();
            return;
        }
        let mnemonic = match op {
            "+" => "add",
            "-" => "sub",
            "*" => "mul",
            "/" => "div",
            "%" => "rem",
            "==" => "seq",
            "!=" => "sne",
            "<" => "slt",
            "<=" => "sle",
            ">" => "sgt",
            ">=" => "sge",
            "그리고" => "and",
            "이거나" => "or",
            _ => {
                self.emit(format!("# unsupported operator: {op}"));
                return;
            }
        };
        self.emit(format!("{mnemonic} $v0, $t1, $v0"));
        self.invalidate_peephole();
    }

    /// `**` has no native MIPS mnemonic; emit a small multiply loop with
    /// `$t1` as the base and `$v0` as the (non-negative) exponent.
    fn gen_power(&mut self) {
        let loop_label = self.new_label("pow_loop");
        let done_label = self.new_label("pow_done");
        self.emit("move $t2, $v0".to_string());
        self.emit("li $v0, 1".to_string());
        self.emit_label(&loop_label);
        self.emit(format!("beq $t2, $zero, {done_label}"));
        self.emit("mul $v0, $v0, $t1".to_string());
        self.emit("addi $t2, $t2, -1".to_string());
        self.emit(format!("j {loop_label}"));
        self.emit_label(&done_label);
        self.invalidate_peephole();
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::{optimize, OptimizationLevel};
    use crate::parse::parse;
    use crate::token::Lexer;

    fn generate_source(source: &str) -> String {
        let tokens = Lexer::new(source).tokenize();
        let items = parse(tokens).expect("expected a successful parse");
        let items = optimize(items, OptimizationLevel::Simple);
        CodeGenerator::new().generate(&items)
    }

    #[test]
    fn output_has_fixed_layout() {
        let asm = generate_source("출력(1)");
        assert!(asm.starts_with(".data\n"));
        assert!(asm.contains("\n.text\n.globl main\nmain:\n"));
    }

    #[test]
    fn arithmetic_and_print_emits_syscall_one() {
        let asm = generate_source("출력(1 + 2)");
        assert!(asm.contains("li $v0, 3"));
        assert!(asm.contains("li $v0, 1"));
        assert!(asm.contains("syscall"));
    }

    #[test]
    fn single_assignment_allocates_one_stack_slot() {
        let asm = generate_source("x = 5\n출력(x)");
        assert_eq!(asm.matches("-4($fp)").count(), 2);
    }

    #[test]
    fn while_loop_generates_paired_labels() {
        let asm = generate_source("x = 0\n동안에 x < 10 { x = x + 1 }");
        assert!(asm.contains("while_0:"));
        assert!(asm.contains("endwhile_1:"));
    }

    #[test]
    fn dictionary_assignment_emits_store_sequence() {
        let asm = generate_source("딕셔너리 d = {}\nd[1] = 42");
        assert!(asm.contains("d_dict: .space 400"));
        assert!(asm.contains("sll $t1, $t1, 2"));
        assert!(asm.contains("sw $v0, 0($t2)"));
    }

    #[test]
    fn error_node_stops_emission_for_its_item() {
        let asm = generate_source("함수 f() [ 출력(1) ]\n출력(2)");
        assert!(asm.contains("# Error encountered: Unexpected function open"));
        assert!(asm.contains("li $v0, 2"));
    }

    #[test]
    fn random_builtin_lowers_to_syscall_not_jal() {
        let asm = generate_source("출력(랜덤)");
        assert!(asm.contains("li $v0, 41"));
        assert!(!asm.contains("jal 랜덤"));
    }
}
