//! Prints a syntax tree back as Cinder source.
//!
//! Expressions get the fewest parentheses that keep the tree shape, so the
//! output of `--ast` parses back to the same program. Negative literals
//! (which only the optimizer produces) are written as `(0 - n)`.

use std::fmt;

use super::ast::{
    CallExpr, Expr, FunDef, IfStmt, Literal, PathSegment, Program, RValue, Stmt, StructDef,
    UnaryOp, VarPath,
};

const INDENT: &str = "  ";

/// Renders whole programs with two-space indentation.
pub struct Printer {
    out: String,
    depth: usize,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Printer {
            out: String::new(),
            depth: 0,
        }
    }

    pub fn print(mut self, program: &Program) -> String {
        let mut first = true;
        for def in &program.structs {
            self.separate(&mut first);
            self.struct_def(def);
        }
        for fun in &program.functions {
            self.separate(&mut first);
            self.fun_def(fun);
        }
        self.out
    }

    fn separate(&mut self, first: &mut bool) {
        if !*first {
            self.out.push('\n');
        }
        *first = false;
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    fn struct_def(&mut self, def: &StructDef) {
        self.line(&format!("struct {} {{", def.name.name));
        self.depth += 1;
        let last = def.fields.len().saturating_sub(1);
        for (i, field) in def.fields.iter().enumerate() {
            let sep = if i < last { "," } else { "" };
            self.line(&format!("{}: {}{}", field.name.name, field.ty, sep));
        }
        self.depth -= 1;
        self.line("}");
    }

    fn fun_def(&mut self, fun: &FunDef) {
        let params = fun
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name.name, p.ty))
            .collect::<Vec<_>>()
            .join(", ");
        self.line(&format!(
            "{} {}({}) {{",
            fun.return_type, fun.name.name, params
        ));
        self.body(&fun.body);
        self.line("}");
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn body(&mut self, stmts: &[Stmt]) {
        self.depth += 1;
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.depth -= 1;
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(var) => {
                let mut text = format!("var {}", var.name.name);
                if let Some(ty) = &var.ty {
                    text.push_str(&format!(": {}", ty));
                }
                if let Some(init) = &var.init {
                    text.push_str(&format!(" = {}", init));
                }
                self.line(&text);
            }
            Stmt::Assign(assign) => {
                self.line(&format!("{} = {}", assign.target, assign.value));
            }
            Stmt::Return(ret) => self.line(&format!("return {}", ret.value)),
            Stmt::While(w) => {
                self.line(&format!("while {} {{", w.cond));
                self.body(&w.body);
                self.line("}");
            }
            Stmt::For(f) => {
                self.line(&format!(
                    "for {} from {} to {} {{",
                    f.var.name, f.from, f.to
                ));
                self.body(&f.body);
                self.line("}");
            }
            Stmt::If(if_stmt) => self.if_stmt(if_stmt),
            Stmt::Call(call) => self.line(&call.to_string()),
        }
    }

    fn if_stmt(&mut self, if_stmt: &IfStmt) {
        for (i, branch) in if_stmt.branches.iter().enumerate() {
            let opener = if i == 0 { "if" } else { "} else if" };
            self.line(&format!("{} {} {{", opener, branch.cond));
            self.body(&branch.body);
        }
        if let Some(else_body) = &if_stmt.else_body {
            self.line("} else {");
            self.body(else_body);
        }
        self.line("}");
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Printer::new().print(self))
    }
}

// =============================================================================
// Expressions
// =============================================================================

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Basic(rvalue) => write!(f, "{}", rvalue),
            Expr::Unary {
                op: UnaryOp::Not,
                expr,
                ..
            } => match &**expr {
                Expr::Basic(_) => write!(f, "not {}", expr),
                _ => write!(f, "not ({})", expr),
            },
            Expr::Binary { op, lhs, rhs, .. } => {
                // Every operator is left associative.
                write_operand(f, lhs, op.precedence())?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, rhs, op.precedence() + 1)
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min_prec: u8) -> fmt::Result {
    match expr {
        Expr::Binary { op, .. } if op.precedence() < min_prec => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

impl fmt::Display for RValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RValue::Literal { value, .. } => write!(f, "{}", value),
            RValue::Var(path) => write!(f, "{}", path),
            RValue::Call(call) => write!(f, "{}", call),
            RValue::NewStruct { name, args } => {
                write!(f, "new {}(", name.name)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            RValue::NewArray { elem, size } => write!(f, "new {}[{}]", elem.name, size),
        }
    }
}

impl fmt::Display for CallExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name.name)?;
        write_args(f, &self.args)?;
        write!(f, ")")
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl fmt::Display for VarPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments().iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.name)?;
        if let Some(index) = &self.index {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i32::MIN) => write!(f, "(0 - 2147483647 - 1)"),
            Literal::Int(n) if *n < 0 => write!(f, "(0 - {})", n.unsigned_abs()),
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Double(d) if d.is_nan() => write!(f, "(0.0 / 0.0)"),
            Literal::Double(d) if d.is_infinite() && *d > 0.0 => write!(f, "(1.0 / 0.0)"),
            Literal::Double(d) if d.is_infinite() => write!(f, "(0.0 - 1.0 / 0.0)"),
            Literal::Double(d) if d.is_sign_negative() && *d != 0.0 => {
                write!(f, "(0.0 - {})", source_double(-d))
            }
            Literal::Double(d) => write!(f, "{}", source_double(*d)),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Str(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        '\\' => write!(f, "\\\\")?,
                        '"' => write!(f, "\\\"")?,
                        _ => write!(f, "{}", ch)?,
                    }
                }
                write!(f, "\"")
            }
            Literal::Null => write!(f, "null"),
        }
    }
}

/// Plain decimal with a fractional part, which is the only double form the
/// lexer accepts.
fn source_double(d: f64) -> String {
    let plain = format!("{}", d.abs());
    if plain.contains('.') {
        plain
    } else {
        plain + ".0"
    }
}
