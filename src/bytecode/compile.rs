use std::collections::HashMap;

use crate::{
    bytecode::{
        compile_error::CompileError,
        ir::FrameTemplate,
        op::{Instr, Op, UNPATCHED},
    },
    lang::{
        ast::{
            AssignStmt, BinOp, CallExpr, Expr, ForStmt, FunDef, IfStmt, PathSegment, Program,
            RValue, Stmt, UnaryOp, VarPath, VarStmt, WhileStmt,
        },
        value::Value,
    },
};

/// Maps variable names to frame slots.
///
/// Slots are handed out densely in declaration order. Closing a scope frees
/// its slots, so a later declaration reuses them.
#[derive(Debug, Default)]
struct VarTable {
    names: Vec<String>,
    scope_starts: Vec<usize>,
}

impl VarTable {
    fn push_scope(&mut self) {
        self.scope_starts.push(self.names.len());
    }

    fn pop_scope(&mut self) {
        if let Some(start) = self.scope_starts.pop() {
            self.names.truncate(start);
        }
    }

    fn declare(&mut self, name: &str) -> usize {
        self.names.push(name.to_string());
        self.names.len() - 1
    }

    /// Innermost binding of `name`.
    fn get(&self, name: &str) -> Option<usize> {
        self.names.iter().rposition(|n| n == name)
    }
}

/// Translates a checked program into one [`FrameTemplate`] per function.
pub struct CodeGenerator {
    /// Struct name -> field names in declaration order
    structs: HashMap<String, Vec<String>>,

    /// Template of the function being generated
    template: FrameTemplate,

    vars: VarTable,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            structs: HashMap::new(),
            template: FrameTemplate::new(""),
            vars: VarTable::default(),
        }
    }

    pub fn compile(mut self, program: &Program) -> Result<Vec<FrameTemplate>, CompileError> {
        for def in &program.structs {
            let fields = def.fields.iter().map(|f| f.name.name.clone()).collect();
            self.structs.insert(def.name.name.clone(), fields);
        }

        program
            .functions
            .iter()
            .map(|def| self.compile_function(def))
            .collect()
    }

    fn compile_function(&mut self, def: &FunDef) -> Result<FrameTemplate, CompileError> {
        self.template = FrameTemplate::new(def.name.name.as_str());
        self.vars = VarTable::default();
        self.vars.push_scope();

        for param in &def.params {
            let slot = self.vars.declare(&param.name.name);
            self.emit_c(Op::Store(slot), format!("param {}", param.name.name));
        }

        self.compile_block(&def.body)?;

        let ends_with_ret = matches!(self.template.last_op(), Some(Op::Ret));
        let end = self.template.len() as i32;
        let end_is_target = self.template.jump_targets().contains(&end);
        if !ends_with_ret || end_is_target {
            self.emit_c(Op::Push(Value::Null), "implicit return");
            self.emit(Op::Ret);
        }

        self.vars.pop_scope();

        let template = std::mem::replace(&mut self.template, FrameTemplate::new(""));
        tracing::debug!(
            function = %template.name,
            instrs = template.len(),
            "compiled function"
        );
        Ok(template)
    }

    // =========================================================================
    // Emission helpers
    // =========================================================================

    fn emit(&mut self, op: Op) -> usize {
        self.template.push(op)
    }

    fn emit_c(&mut self, op: Op, comment: impl Into<String>) -> usize {
        self.template.push(Instr::with_comment(op, comment))
    }

    /// Points the jump at `index` to the next instruction to be emitted.
    fn patch_here(&mut self, index: usize) -> Result<(), CompileError> {
        let here = self.template.len();
        self.template.patch(index, here)
    }

    fn scoped_block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        self.vars.push_scope();
        let result = self.compile_block(stmts);
        self.vars.pop_scope();
        result
    }

    fn slot(&self, segment: &PathSegment) -> Result<usize, CompileError> {
        self.vars
            .get(&segment.name.name)
            .ok_or_else(|| CompileError::undeclared(&segment.name.name, segment.name.span))
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn compile_block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Var(var) => self.compile_var(var),
            Stmt::Assign(assign) => self.compile_assign(assign),
            Stmt::Return(ret) => {
                self.compile_expr(&ret.value)?;
                self.emit_c(Op::Ret, "return");
                Ok(())
            }
            Stmt::While(w) => self.compile_while(w),
            Stmt::For(f) => self.compile_for(f),
            Stmt::If(stmt) => self.compile_if(stmt),
            Stmt::Call(call) => {
                if call.name.name == "print" {
                    self.compile_print(call)
                } else {
                    self.compile_call(call)?;
                    self.emit_c(Op::Pop, format!("discard {}()", call.name.name));
                    Ok(())
                }
            }
        }
    }

    fn compile_var(&mut self, var: &VarStmt) -> Result<(), CompileError> {
        // The initializer cannot see the name it initializes.
        match &var.init {
            Some(init) => self.compile_expr(init)?,
            None => {
                self.emit(Op::Push(Value::Null));
            }
        }
        let slot = self.vars.declare(&var.name.name);
        self.emit_c(Op::Store(slot), format!("var {}", var.name.name));
        Ok(())
    }

    fn compile_assign(&mut self, assign: &AssignStmt) -> Result<(), CompileError> {
        let segments = assign.target.segments();
        let (last, init) = match segments.split_last() {
            Some(split) => split,
            None => return Err(CompileError::internal("empty assignment target")),
        };

        if init.is_empty() {
            let slot = self.slot(last)?;
            match &last.index {
                Some(index) => {
                    self.emit_c(Op::Load(slot), format!("{}[...] =", last.name.name));
                    self.compile_expr(index)?;
                    self.compile_expr(&assign.value)?;
                    self.emit(Op::Seti);
                }
                None => {
                    self.compile_expr(&assign.value)?;
                    self.emit_c(Op::Store(slot), format!("{} =", last.name.name));
                }
            }
            return Ok(());
        }

        self.compile_path_prefix(init)?;
        let field = &last.name.name;
        match &last.index {
            Some(index) => {
                self.emit_c(Op::Getf(field.clone()), format!("{}[...] =", field));
                self.compile_expr(index)?;
                self.compile_expr(&assign.value)?;
                self.emit(Op::Seti);
            }
            None => {
                self.compile_expr(&assign.value)?;
                self.emit_c(Op::Setf(field.clone()), format!(".{} =", field));
            }
        }
        Ok(())
    }

    fn compile_while(&mut self, w: &WhileStmt) -> Result<(), CompileError> {
        let start = self.template.len();
        self.compile_expr(&w.cond)?;
        let exit = self.emit_c(Op::Jmpf(UNPATCHED), "while");
        self.scoped_block(&w.body)?;
        self.emit_c(Op::Jmp(start as i32), "loop");
        self.patch_here(exit)
    }

    fn compile_for(&mut self, f: &ForStmt) -> Result<(), CompileError> {
        self.vars.push_scope();

        self.compile_expr(&f.from)?;
        let slot = self.vars.declare(&f.var.name);
        self.emit_c(Op::Store(slot), format!("for {}", f.var.name));

        let start = self.template.len();
        self.emit(Op::Load(slot));
        self.compile_expr(&f.to)?;
        self.emit(Op::CmpLe);
        let exit = self.emit_c(Op::Jmpf(UNPATCHED), "for exit");

        let body = self.compile_block(&f.body);
        self.vars.pop_scope();
        body?;

        self.emit(Op::Load(slot));
        self.emit(Op::Push(Value::Int(1)));
        self.emit(Op::Add);
        self.emit_c(Op::Store(slot), format!("{} += 1", f.var.name));
        self.emit_c(Op::Jmp(start as i32), "loop");
        self.patch_here(exit)
    }

    fn compile_if(&mut self, stmt: &IfStmt) -> Result<(), CompileError> {
        let mut end_jumps = Vec::with_capacity(stmt.branches.len());

        for (i, branch) in stmt.branches.iter().enumerate() {
            self.compile_expr(&branch.cond)?;
            let label = if i == 0 { "if" } else { "else if" };
            let next = self.emit_c(Op::Jmpf(UNPATCHED), label);
            self.scoped_block(&branch.body)?;
            end_jumps.push(self.emit_c(Op::Jmp(UNPATCHED), "end if"));
            self.patch_here(next)?;
        }

        if let Some(body) = &stmt.else_body {
            self.scoped_block(body)?;
        }

        for jump in end_jumps {
            self.patch_here(jump)?;
        }
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Basic(rvalue) => self.compile_rvalue(rvalue),
            Expr::Unary {
                op: UnaryOp::Not,
                expr,
                ..
            } => {
                self.compile_expr(expr)?;
                self.emit(Op::Not);
                Ok(())
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                // `a > b` is `b < a`; `a >= b` is `b <= a`.
                if matches!(op, BinOp::Gt | BinOp::Ge) {
                    self.compile_expr(rhs)?;
                    self.compile_expr(lhs)?;
                } else {
                    self.compile_expr(lhs)?;
                    self.compile_expr(rhs)?;
                }
                self.emit(binary_op(*op));
                Ok(())
            }
        }
    }

    fn compile_rvalue(&mut self, rvalue: &RValue) -> Result<(), CompileError> {
        match rvalue {
            RValue::Literal { value, .. } => {
                self.emit(Op::Push(Value::from(value)));
            }
            RValue::Var(path) => self.compile_path_load(path)?,
            RValue::Call(call) => self.compile_call(call)?,
            RValue::NewStruct { name, args } => {
                let fields = self
                    .structs
                    .get(&name.name)
                    .cloned()
                    .ok_or_else(|| CompileError::unknown_struct(&name.name, name.span))?;
                if fields.len() != args.len() {
                    return Err(CompileError::internal(format!(
                        "struct '{}' has {} fields but {} values were given",
                        name.name,
                        fields.len(),
                        args.len()
                    )));
                }
                self.emit_c(Op::Allocs, format!("new {}", name.name));
                for (field, arg) in fields.into_iter().zip(args) {
                    self.emit(Op::Dup);
                    self.compile_expr(arg)?;
                    self.emit(Op::Setf(field));
                }
            }
            RValue::NewArray { elem, size } => {
                self.compile_expr(size)?;
                self.emit_c(Op::Alloca, format!("new {}[...]", elem.name));
            }
        }
        Ok(())
    }

    /// Pushes the value a path names.
    fn compile_path_load(&mut self, path: &VarPath) -> Result<(), CompileError> {
        let segments = path.segments();
        self.compile_path_prefix(segments)
    }

    /// Pushes the value of every segment in `segments`, root first.
    fn compile_path_prefix(&mut self, segments: &[PathSegment]) -> Result<(), CompileError> {
        let Some((root, rest)) = segments.split_first() else {
            return Err(CompileError::internal("empty variable path"));
        };

        let slot = self.slot(root)?;
        self.emit_c(Op::Load(slot), root.name.name.clone());
        if let Some(index) = &root.index {
            self.compile_expr(index)?;
            self.emit(Op::Geti);
        }

        for segment in rest {
            self.emit(Op::Getf(segment.name.name.clone()));
            if let Some(index) = &segment.index {
                self.compile_expr(index)?;
                self.emit(Op::Geti);
            }
        }
        Ok(())
    }

    fn expect_args(call: &CallExpr, expected: usize) -> Result<(), CompileError> {
        if call.args.len() != expected {
            return Err(CompileError::builtin_arity(
                &call.name.name,
                expected,
                call.args.len(),
                call.name.span,
            ));
        }
        Ok(())
    }

    /// `print` as a statement: no result value is produced.
    fn compile_print(&mut self, call: &CallExpr) -> Result<(), CompileError> {
        Self::expect_args(call, 1)?;
        self.compile_expr(&call.args[0])?;
        self.emit_c(Op::Write, "print");
        Ok(())
    }

    /// Any call in expression position. Leaves exactly one value on the stack.
    fn compile_call(&mut self, call: &CallExpr) -> Result<(), CompileError> {
        let name = call.name.name.as_str();
        match name {
            "print" => {
                self.compile_print(call)?;
                self.emit(Op::Push(Value::Null));
            }
            "println" => {
                Self::expect_args(call, 1)?;
                self.compile_expr(&call.args[0])?;
                self.emit_c(Op::Write, "println");
                self.emit(Op::Push(Value::Str("\n".to_string())));
                self.emit(Op::Write);
                self.emit(Op::Push(Value::Null));
            }
            "readln" => {
                Self::expect_args(call, 0)?;
                self.emit_c(Op::Read, "readln");
            }
            "str_val" | "int_val" | "dbl_val" | "size" => {
                Self::expect_args(call, 1)?;
                self.compile_expr(&call.args[0])?;
                let op = match name {
                    "str_val" => Op::ToStr,
                    "int_val" => Op::ToInt,
                    "dbl_val" => Op::ToDbl,
                    _ => Op::Len,
                };
                self.emit_c(op, name);
            }
            "get" => {
                Self::expect_args(call, 2)?;
                self.compile_expr(&call.args[1])?;
                self.compile_expr(&call.args[0])?;
                self.emit_c(Op::Getc, "get");
            }
            _ => {
                for arg in call.args.iter().rev() {
                    self.compile_expr(arg)?;
                }
                self.emit_c(Op::Call(name.to_string()), format!("call {}", name));
            }
        }
        Ok(())
    }
}

fn binary_op(op: BinOp) -> Op {
    match op {
        BinOp::Add => Op::Add,
        BinOp::Sub => Op::Sub,
        BinOp::Mul => Op::Mul,
        BinOp::Div => Op::Div,
        BinOp::And => Op::And,
        BinOp::Or => Op::Or,
        BinOp::Eq => Op::CmpEq,
        BinOp::Ne => Op::CmpNe,
        BinOp::Lt | BinOp::Gt => Op::CmpLt,
        BinOp::Le | BinOp::Ge => Op::CmpLe,
    }
}

/// Convenience wrapper around [`CodeGenerator::compile`].
pub fn compile_program(program: &Program) -> Result<Vec<FrameTemplate>, CompileError> {
    CodeGenerator::new().compile(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::verify::verify_template;
    use crate::frontend::{checker::check, lexer::Lexer, parser::parse};
    use pretty_assertions::assert_eq;

    fn parse_src(source: &str) -> Program {
        parse(Lexer::new(source).tokenize().unwrap()).unwrap()
    }

    fn compile_src(source: &str) -> Vec<FrameTemplate> {
        let program = parse_src(source);
        check(&program).unwrap();
        let templates = compile_program(&program).unwrap();
        for t in &templates {
            verify_template(t).unwrap();
        }
        templates
    }

    fn ops_of(templates: &[FrameTemplate], name: &str) -> Vec<Op> {
        templates
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.instrs.iter().map(|i| i.op.clone()).collect())
            .unwrap()
    }

    fn main_ops(source: &str) -> Vec<Op> {
        ops_of(&compile_src(source), "main")
    }

    fn int(n: i32) -> Op {
        Op::Push(Value::Int(n))
    }

    fn string(s: &str) -> Op {
        Op::Push(Value::Str(s.to_string()))
    }

    fn null() -> Op {
        Op::Push(Value::Null)
    }

    #[test]
    fn test_empty_main() {
        assert_eq!(main_ops("void main() {}"), vec![null(), Op::Ret]);
    }

    #[test]
    fn test_one_template_per_function() {
        let templates = compile_src("int f() { return 1 } void main() { f() }");
        let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["f", "main"]);
    }

    #[test]
    fn test_for_loop_layout() {
        assert_eq!(
            main_ops("void main() { for i from 0 to 4 { print(i) } }"),
            vec![
                int(0),
                Op::Store(0),
                Op::Load(0),
                int(4),
                Op::CmpLe,
                Op::Jmpf(13),
                Op::Load(0),
                Op::Write,
                Op::Load(0),
                int(1),
                Op::Add,
                Op::Store(0),
                Op::Jmp(2),
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_while_loop_layout() {
        assert_eq!(
            main_ops("void main() { var x = 0 while x < 3 { x = x + 1 } }"),
            vec![
                int(0),
                Op::Store(0),
                Op::Load(0),
                int(3),
                Op::CmpLt,
                Op::Jmpf(11),
                Op::Load(0),
                int(1),
                Op::Add,
                Op::Store(0),
                Op::Jmp(2),
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_if_else_if_else_layout() {
        let source = r#"
            void main() {
                var x = 1
                if x < 0 { print("neg") }
                else if x == 0 { print("zero") }
                else { print("pos") }
            }
        "#;
        assert_eq!(
            main_ops(source),
            vec![
                int(1),
                Op::Store(0),
                Op::Load(0),
                int(0),
                Op::CmpLt,
                Op::Jmpf(9),
                string("neg"),
                Op::Write,
                Op::Jmp(18),
                Op::Load(0),
                int(0),
                Op::CmpEq,
                Op::Jmpf(16),
                string("zero"),
                Op::Write,
                Op::Jmp(18),
                string("pos"),
                Op::Write,
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_if_without_else_falls_through() {
        assert_eq!(
            main_ops("void main() { if true { print(1) } }"),
            vec![
                Op::Push(Value::Bool(true)),
                Op::Jmpf(5),
                int(1),
                Op::Write,
                Op::Jmp(5),
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_returning_branches_keep_end_target_valid() {
        let templates =
            compile_src("int f(x: int) { if x < 0 { return 0 } else { return 1 } } void main() {}");
        assert_eq!(
            ops_of(&templates, "f"),
            vec![
                Op::Store(0),
                Op::Load(0),
                int(0),
                Op::CmpLt,
                Op::Jmpf(8),
                int(0),
                Op::Ret,
                Op::Jmp(10),
                int(1),
                Op::Ret,
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_params_and_call_order() {
        let templates =
            compile_src("int add(a: int, b: int) { return a + b } void main() { print(add(1, 2)) }");
        assert_eq!(
            ops_of(&templates, "add"),
            vec![
                Op::Store(0),
                Op::Store(1),
                Op::Load(0),
                Op::Load(1),
                Op::Add,
                Op::Ret,
            ]
        );
        assert_eq!(
            ops_of(&templates, "main"),
            vec![
                int(2),
                int(1),
                Op::Call("add".to_string()),
                Op::Write,
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_call_statements_discard_results() {
        let source = r#"
            int f() { return 1 }
            void main() { f() println("a") print(1) }
        "#;
        assert_eq!(
            main_ops(source),
            vec![
                Op::Call("f".to_string()),
                Op::Pop,
                string("a"),
                Op::Write,
                string("\n"),
                Op::Write,
                null(),
                Op::Pop,
                int(1),
                Op::Write,
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_print_in_expression_position_pushes_null() {
        let source = "void g(a: int) {} void main() { g(print(7)) }";
        assert_eq!(
            main_ops(source),
            vec![
                int(7),
                Op::Write,
                null(),
                Op::Call("g".to_string()),
                Op::Pop,
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_greater_swaps_operands() {
        assert_eq!(
            main_ops("void main() { var b = 1 > 2 var c = 3 >= 4 }"),
            vec![
                int(2),
                int(1),
                Op::CmpLt,
                Op::Store(0),
                int(4),
                int(3),
                Op::CmpLe,
                Op::Store(1),
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_builtins() {
        let source = r#"
            void main() {
                var c = get(0, "ab")
                var n = size("ab")
                var s = str_val(1)
                var i = int_val("2")
                var d = dbl_val(3)
                var r = readln()
            }
        "#;
        assert_eq!(
            main_ops(source),
            vec![
                string("ab"),
                int(0),
                Op::Getc,
                Op::Store(0),
                string("ab"),
                Op::Len,
                Op::Store(1),
                int(1),
                Op::ToStr,
                Op::Store(2),
                string("2"),
                Op::ToInt,
                Op::Store(3),
                int(3),
                Op::ToDbl,
                Op::Store(4),
                Op::Read,
                Op::Store(5),
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_struct_construction_and_fields() {
        let source = r#"
            struct P { x: int, y: int }
            void main() { var p = new P(1, 2) p.y = 5 print(p.x) }
        "#;
        assert_eq!(
            main_ops(source),
            vec![
                Op::Allocs,
                Op::Dup,
                int(1),
                Op::Setf("x".to_string()),
                Op::Dup,
                int(2),
                Op::Setf("y".to_string()),
                Op::Store(0),
                Op::Load(0),
                int(5),
                Op::Setf("y".to_string()),
                Op::Load(0),
                Op::Getf("x".to_string()),
                Op::Write,
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_array_element_assignment_and_load() {
        assert_eq!(
            main_ops("void main() { var a = new int[3] a[1] = 9 print(a[1]) }"),
            vec![
                int(3),
                Op::Alloca,
                Op::Store(0),
                Op::Load(0),
                int(1),
                int(9),
                Op::Seti,
                Op::Load(0),
                int(1),
                Op::Geti,
                Op::Write,
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_multi_segment_paths() {
        let source = r#"
            struct Q { v: int }
            struct S { qs: [Q] }
            void set(s: S) { s.qs[1].v = 3 }
            void put(s: S) { s.qs[1] = null }
            int read(s: S) { return s.qs[1].v }
            void main() {}
        "#;
        let templates = compile_src(source);
        let qs = || Op::Getf("qs".to_string());
        let v = || Op::Getf("v".to_string());
        assert_eq!(
            ops_of(&templates, "set"),
            vec![
                Op::Store(0),
                Op::Load(0),
                qs(),
                int(1),
                Op::Geti,
                int(3),
                Op::Setf("v".to_string()),
                null(),
                Op::Ret,
            ]
        );
        assert_eq!(
            ops_of(&templates, "put"),
            vec![
                Op::Store(0),
                Op::Load(0),
                qs(),
                int(1),
                null(),
                Op::Seti,
                null(),
                Op::Ret,
            ]
        );
        assert_eq!(
            ops_of(&templates, "read"),
            vec![
                Op::Store(0),
                Op::Load(0),
                qs(),
                int(1),
                Op::Geti,
                v(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_scope_slots_are_reused() {
        assert_eq!(
            main_ops("void main() { if true { var a = 1 } var b = 2 }"),
            vec![
                Op::Push(Value::Bool(true)),
                Op::Jmpf(5),
                int(1),
                Op::Store(0),
                Op::Jmp(5),
                int(2),
                Op::Store(0),
                null(),
                Op::Ret,
            ]
        );
    }

    #[test]
    fn test_shadowing_initializer_reads_outer_slot() {
        let ops = main_ops("void main() { var x = 1 while true { var x = x + 1 } }");
        assert_eq!(&ops[4..8], &[Op::Load(0), int(1), Op::Add, Op::Store(1)]);
    }

    #[test]
    fn test_for_variable_slot_is_freed_after_loop() {
        // The loop variable lives in its own slot and is gone after the loop.
        let ops = main_ops("void main() { for i from 1 to 2 { var j = i } var k = 0 }");
        assert_eq!(ops[1], Op::Store(0));
        assert!(ops.contains(&Op::Store(1)));
        let tail = &ops[ops.len() - 4..];
        assert_eq!(tail, &[int(0), Op::Store(0), null(), Op::Ret]);
    }

    #[test]
    fn test_comments_name_constructs() {
        let templates = compile_src("void main() { var total = 0 }");
        let main = &templates[0];
        assert_eq!(main.instrs[1].comment.as_deref(), Some("var total"));
        assert_eq!(main.instrs[2].comment.as_deref(), Some("implicit return"));
    }

    #[test]
    fn test_undeclared_variable_error() {
        let program = parse_src("void main() { x = 1 }");
        let err = compile_program(&program).unwrap_err();
        assert!(matches!(err, CompileError::UndeclaredVariable { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_unknown_struct_error() {
        let program = parse_src("void main() { var p = new Z() }");
        let err = compile_program(&program).unwrap_err();
        assert!(matches!(err, CompileError::UnknownStruct { ref name, .. } if name == "Z"));
    }

    #[test]
    fn test_builtin_arity_error() {
        let program = parse_src("void main() { print() }");
        let err = compile_program(&program).unwrap_err();
        assert!(matches!(
            err,
            CompileError::BuiltinArity {
                expected: 1,
                found: 0,
                ..
            }
        ));
    }
}
