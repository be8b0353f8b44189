//! Static type checking.
//!
//! [`check`] walks a parsed [`Program`] once, keeping a stack of lexical
//! scopes, and rejects the first ill-typed construct it meets. A program that
//! passes never trips the code generator's internal errors.

use std::collections::{HashMap, HashSet};

use crate::lang::ast::{
    AssignStmt, BinOp, CallExpr, DataType, Expr, ForStmt, FunDef, IfStmt, Literal, PathSegment,
    Program, RValue, ReturnStmt, Stmt, StructDef, TypeName, UnaryOp, VarPath, VarStmt,
};
use crate::lang::span::Span;

/// Names reserved for built-in functions.
pub const BUILTINS: &[&str] = &[
    "print", "println", "readln", "size", "get", "int_val", "dbl_val", "str_val",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}{message}", location(.span))]
pub struct StaticError {
    pub message: String,
    pub span: Option<Span>,
}

fn location(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!("{}: ", span),
        None => String::new(),
    }
}

impl StaticError {
    fn at(message: impl Into<String>, span: Span) -> Self {
        StaticError {
            message: message.into(),
            span: Some(span),
        }
    }

    fn global(message: impl Into<String>) -> Self {
        StaticError {
            message: message.into(),
            span: None,
        }
    }
}

type CheckResult<T> = Result<T, StaticError>;

/// Static type of an expression. `Null` is the type of `null` and of calls
/// to void functions; it is compatible with every declared type.
#[derive(Debug, Clone, PartialEq)]
enum Ty {
    Null,
    Of { name: TypeName, is_array: bool },
}

impl Ty {
    fn base(name: TypeName) -> Self {
        Ty::Of {
            name,
            is_array: false,
        }
    }

    fn from_data_type(ty: &DataType) -> Self {
        Ty::Of {
            name: ty.name.clone(),
            is_array: ty.is_array,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Ty::Null)
    }

    fn is_array(&self) -> bool {
        matches!(self, Ty::Of { is_array: true, .. })
    }

    /// True for a non-array value of exactly `name`.
    fn is(&self, name: &TypeName) -> bool {
        matches!(self, Ty::Of { name: n, is_array: false } if n == name)
    }

    fn is_struct(&self) -> bool {
        matches!(
            self,
            Ty::Of {
                name: TypeName::Struct(_),
                is_array: false
            }
        )
    }

    /// A value of type `self` may be stored where `expected` is declared.
    fn assignable_to(&self, expected: &Ty) -> bool {
        self.is_null() || self == expected
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Null => write!(f, "null"),
            Ty::Of {
                name,
                is_array: true,
            } => write!(f, "[{}]", name),
            Ty::Of { name, .. } => write!(f, "{}", name),
        }
    }
}

/// Checks a whole program.
pub fn check(program: &Program) -> CheckResult<()> {
    Checker::new(program)?.check_program(program)
}

struct Checker<'a> {
    structs: HashMap<&'a str, &'a StructDef>,
    functions: HashMap<&'a str, &'a FunDef>,
    scopes: Vec<HashMap<String, Ty>>,
    /// Declared return type of the function being checked.
    return_type: Option<&'a DataType>,
}

impl<'a> Checker<'a> {
    /// Records every struct and function name before any body is checked.
    fn new(program: &'a Program) -> CheckResult<Self> {
        let mut structs = HashMap::new();
        for def in &program.structs {
            if structs.insert(def.name.name.as_str(), def).is_some() {
                return Err(StaticError::at(
                    format!("struct name already used: {}", def.name.name),
                    def.name.span,
                ));
            }
        }

        let mut functions = HashMap::new();
        for def in &program.functions {
            if is_builtin(&def.name.name) {
                return Err(StaticError::at(
                    format!("cannot use the name of a built-in: {}", def.name.name),
                    def.name.span,
                ));
            }
            if functions.insert(def.name.name.as_str(), def).is_some() {
                return Err(StaticError::at(
                    format!("function name already used: {}", def.name.name),
                    def.name.span,
                ));
            }
        }

        if !functions.contains_key("main") {
            return Err(StaticError::global("no main function defined"));
        }

        Ok(Checker {
            structs,
            functions,
            scopes: Vec::new(),
            return_type: None,
        })
    }

    fn check_program(&mut self, program: &'a Program) -> CheckResult<()> {
        for def in &program.structs {
            self.check_struct(def)?;
        }
        for def in &program.functions {
            self.check_function(def)?;
        }
        Ok(())
    }

    // =========================================================================
    // Scopes
    // =========================================================================

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, ty: Ty) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn declared_in_current(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.contains_key(name))
    }

    fn lookup(&self, name: &str) -> Option<&Ty> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn with_scope<F>(&mut self, f: F) -> CheckResult<()>
    where
        F: FnOnce(&mut Self) -> CheckResult<()>,
    {
        self.push_scope();
        let result = f(self);
        self.pop_scope();
        result
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    /// Base types and known structs. `void` is never a valid value type.
    fn is_value_type(&self, name: &TypeName) -> bool {
        match name {
            TypeName::Struct(s) => self.structs.contains_key(s.as_str()),
            other => other.is_base(),
        }
    }

    fn check_value_type(&self, ty: &DataType, what: &str) -> CheckResult<()> {
        if self.is_value_type(&ty.name) {
            Ok(())
        } else {
            Err(StaticError::at(format!("invalid {} type: {}", what, ty), ty.span))
        }
    }

    fn check_struct(&self, def: &StructDef) -> CheckResult<()> {
        let mut seen = HashSet::new();
        for field in &def.fields {
            if !seen.insert(field.name.name.as_str()) {
                return Err(StaticError::at(
                    format!("field name already used: {}", field.name.name),
                    field.name.span,
                ));
            }
            self.check_value_type(&field.ty, "field")?;
        }
        Ok(())
    }

    fn check_function(&mut self, def: &'a FunDef) -> CheckResult<()> {
        if def.return_type.name != TypeName::Void {
            self.check_value_type(&def.return_type, "return")?;
        }

        if def.name.name == "main" {
            if def.return_type.name != TypeName::Void {
                return Err(StaticError::at(
                    "main function must return void",
                    def.name.span,
                ));
            }
            if !def.params.is_empty() {
                return Err(StaticError::at(
                    "main function cannot have parameters",
                    def.name.span,
                ));
            }
        }

        self.return_type = Some(&def.return_type);
        let result = self.with_scope(|this| {
            for param in &def.params {
                this.check_value_type(&param.ty, "parameter")?;
                if this.declared_in_current(&param.name.name) {
                    return Err(StaticError::at(
                        format!("parameter name already used: {}", param.name.name),
                        param.name.span,
                    ));
                }
                this.declare(&param.name.name, Ty::from_data_type(&param.ty));
            }
            this.check_block(&def.body)
        });
        self.return_type = None;
        result
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn check_block(&mut self, stmts: &[Stmt]) -> CheckResult<()> {
        for stmt in stmts {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> CheckResult<()> {
        match stmt {
            Stmt::Var(var) => self.check_var(var),
            Stmt::Assign(assign) => self.check_assign(assign),
            Stmt::Return(ret) => self.check_return(ret),
            Stmt::While(w) => {
                self.check_condition(&w.cond)?;
                self.with_scope(|this| this.check_block(&w.body))
            }
            Stmt::For(f) => self.check_for(f),
            Stmt::If(stmt) => self.check_if(stmt),
            Stmt::Call(call) => self.check_call(call).map(|_| ()),
        }
    }

    fn check_var(&mut self, var: &VarStmt) -> CheckResult<()> {
        if self.declared_in_current(&var.name.name) {
            return Err(StaticError::at(
                format!("variable already declared in this scope: {}", var.name.name),
                var.name.span,
            ));
        }

        let ty = match (&var.ty, &var.init) {
            (Some(declared), init) => {
                self.check_value_type(declared, "variable")?;
                let declared_ty = Ty::from_data_type(declared);
                if let Some(init) = init {
                    let init_ty = self.check_expr(init)?;
                    if !init_ty.assignable_to(&declared_ty) {
                        return Err(StaticError::at(
                            format!(
                                "variable type mismatch: expected {} but found {}",
                                declared_ty, init_ty
                            ),
                            init.span(),
                        ));
                    }
                }
                declared_ty
            }
            (None, Some(init)) => {
                let init_ty = self.check_expr(init)?;
                if init_ty.is_null() {
                    return Err(StaticError::at(
                        format!("cannot infer the type of '{}' from null", var.name.name),
                        var.name.span,
                    ));
                }
                init_ty
            }
            (None, None) => {
                return Err(StaticError::at(
                    format!("variable '{}' needs a type or an initializer", var.name.name),
                    var.name.span,
                ));
            }
        };

        self.declare(&var.name.name, ty);
        Ok(())
    }

    fn check_assign(&mut self, assign: &AssignStmt) -> CheckResult<()> {
        let target = self.check_path(&assign.target)?;
        let value = self.check_expr(&assign.value)?;
        if !value.assignable_to(&target) {
            return Err(StaticError::at(
                format!("type mismatch: expected {} but found {}", target, value),
                assign.value.span(),
            ));
        }
        Ok(())
    }

    fn check_return(&mut self, ret: &ReturnStmt) -> CheckResult<()> {
        let Some(declared) = self.return_type else {
            return Err(StaticError::at("return outside of a function", ret.span));
        };

        let ty = self.check_expr(&ret.value)?;
        if ty.is_null() {
            return Ok(());
        }
        if declared.name == TypeName::Void {
            return Err(StaticError::at(
                "void function cannot return a value",
                ret.span,
            ));
        }
        let expected = Ty::from_data_type(declared);
        if ty != expected {
            return Err(StaticError::at(
                format!("return type mismatch: expected {} but found {}", expected, ty),
                ret.span,
            ));
        }
        Ok(())
    }

    fn check_condition(&mut self, cond: &Expr) -> CheckResult<()> {
        let ty = self.check_expr(cond)?;
        if !ty.is(&TypeName::Bool) {
            return Err(StaticError::at(
                format!("condition must be a bool, found {}", ty),
                cond.span(),
            ));
        }
        Ok(())
    }

    fn check_for(&mut self, stmt: &ForStmt) -> CheckResult<()> {
        // The start bound is evaluated before the loop variable exists; the
        // end bound is re-evaluated on every iteration and can see it.
        self.with_scope(|this| {
            this.check_for_bound(&stmt.from, "start")?;
            this.declare(&stmt.var.name, Ty::base(TypeName::Int));
            this.check_for_bound(&stmt.to, "end")?;
            this.check_block(&stmt.body)
        })
    }

    fn check_for_bound(&mut self, bound: &Expr, what: &str) -> CheckResult<()> {
        let ty = self.check_expr(bound)?;
        if !ty.is(&TypeName::Int) {
            return Err(StaticError::at(
                format!("for loop {} must be an int, found {}", what, ty),
                bound.span(),
            ));
        }
        Ok(())
    }

    fn check_if(&mut self, stmt: &IfStmt) -> CheckResult<()> {
        for branch in &stmt.branches {
            self.check_condition(&branch.cond)?;
            self.with_scope(|this| this.check_block(&branch.body))?;
        }
        if let Some(body) = &stmt.else_body {
            self.with_scope(|this| this.check_block(body))?;
        }
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn check_expr(&mut self, expr: &Expr) -> CheckResult<Ty> {
        match expr {
            Expr::Basic(rvalue) => self.check_rvalue(rvalue),
            Expr::Unary {
                op: UnaryOp::Not,
                span,
                expr,
            } => {
                let ty = self.check_expr(expr)?;
                if !ty.is(&TypeName::Bool) {
                    return Err(StaticError::at(
                        format!("'not' requires a bool operand, found {}", ty),
                        *span,
                    ));
                }
                Ok(Ty::base(TypeName::Bool))
            }
            Expr::Binary { op, span, lhs, rhs } => {
                let lhs = self.check_expr(lhs)?;
                let rhs = self.check_expr(rhs)?;
                self.check_binary(*op, *span, &lhs, &rhs)
            }
        }
    }

    fn check_binary(&self, op: BinOp, span: Span, lhs: &Ty, rhs: &Ty) -> CheckResult<Ty> {
        let symbol = op.symbol();

        if op.is_logical() {
            if !lhs.is(&TypeName::Bool) || !rhs.is(&TypeName::Bool) {
                return Err(StaticError::at(
                    format!("logical operator '{}' requires bool operands", symbol),
                    span,
                ));
            }
            return Ok(Ty::base(TypeName::Bool));
        }

        if op.is_equality() {
            if lhs != rhs && !lhs.is_null() && !rhs.is_null() {
                return Err(StaticError::at(
                    format!(
                        "equality operator '{}' requires matching types or null, found {} and {}",
                        symbol, lhs, rhs
                    ),
                    span,
                ));
            }
            return Ok(Ty::base(TypeName::Bool));
        }

        if lhs.is_array() || rhs.is_array() {
            return Err(StaticError::at(
                format!("operator '{}' cannot be applied to arrays", symbol),
                span,
            ));
        }
        if lhs != rhs {
            return Err(StaticError::at(
                format!("type mismatch for operator '{}': {} vs {}", symbol, lhs, rhs),
                span,
            ));
        }

        let operand = match lhs {
            Ty::Of { name, .. } => name.clone(),
            Ty::Null => {
                return Err(StaticError::at(
                    format!("operator '{}' cannot be applied to null", symbol),
                    span,
                ));
            }
        };

        if op.is_relational() {
            return match operand {
                TypeName::Int | TypeName::Double | TypeName::String => {
                    Ok(Ty::base(TypeName::Bool))
                }
                other => Err(StaticError::at(
                    format!("relational operator '{}' cannot be applied to {}", symbol, other),
                    span,
                )),
            };
        }

        match operand {
            TypeName::Int => Ok(Ty::base(TypeName::Int)),
            TypeName::Double => Ok(Ty::base(TypeName::Double)),
            TypeName::String if op == BinOp::Add => Ok(Ty::base(TypeName::String)),
            other => Err(StaticError::at(
                format!("arithmetic operator '{}' cannot be applied to {}", symbol, other),
                span,
            )),
        }
    }

    fn check_rvalue(&mut self, rvalue: &RValue) -> CheckResult<Ty> {
        match rvalue {
            RValue::Literal { value, .. } => Ok(match value {
                Literal::Int(_) => Ty::base(TypeName::Int),
                Literal::Double(_) => Ty::base(TypeName::Double),
                Literal::Bool(_) => Ty::base(TypeName::Bool),
                Literal::Str(_) => Ty::base(TypeName::String),
                Literal::Null => Ty::Null,
            }),
            RValue::Var(path) => self.check_path(path),
            RValue::Call(call) => self.check_call(call),
            RValue::NewStruct { name, args } => {
                let def = *self.structs.get(name.name.as_str()).ok_or_else(|| {
                    StaticError::at(format!("unknown struct: {}", name.name), name.span)
                })?;
                if args.len() != def.fields.len() {
                    return Err(StaticError::at(
                        format!(
                            "struct '{}' expects {} values, found {}",
                            name.name,
                            def.fields.len(),
                            args.len()
                        ),
                        name.span,
                    ));
                }
                for (arg, field) in args.iter().zip(&def.fields) {
                    let ty = self.check_expr(arg)?;
                    let expected = Ty::from_data_type(&field.ty);
                    if !ty.assignable_to(&expected) {
                        return Err(StaticError::at(
                            format!(
                                "field '{}' of '{}' expects {} but found {}",
                                field.name.name, name.name, expected, ty
                            ),
                            arg.span(),
                        ));
                    }
                }
                Ok(Ty::base(TypeName::Struct(name.name.clone())))
            }
            RValue::NewArray { elem, size } => {
                self.check_value_type(elem, "array element")?;
                let size_ty = self.check_expr(size)?;
                if !size_ty.is(&TypeName::Int) {
                    return Err(StaticError::at(
                        format!("array size must be an int, found {}", size_ty),
                        size.span(),
                    ));
                }
                Ok(Ty::Of {
                    name: elem.name.clone(),
                    is_array: true,
                })
            }
        }
    }

    /// Resolves `a[i].b.c[j]`: field access first, then the segment's index.
    fn check_path(&mut self, path: &VarPath) -> CheckResult<Ty> {
        let root = path.root();
        let mut ty = self.lookup(&root.name.name).cloned().ok_or_else(|| {
            StaticError::at(
                format!("undeclared variable: {}", root.name.name),
                root.name.span,
            )
        })?;
        ty = self.check_index(ty, root)?;

        for segment in &path.segments()[1..] {
            let struct_name = match &ty {
                Ty::Of {
                    name: TypeName::Struct(s),
                    is_array: false,
                } => s.clone(),
                other => {
                    return Err(StaticError::at(
                        format!(
                            "cannot access field '{}' on a value of type {}",
                            segment.name.name, other
                        ),
                        segment.name.span,
                    ));
                }
            };
            let def = self.structs.get(struct_name.as_str()).ok_or_else(|| {
                StaticError::at(format!("unknown struct: {}", struct_name), segment.name.span)
            })?;
            let field = def
                .fields
                .iter()
                .find(|f| f.name.name == segment.name.name)
                .ok_or_else(|| {
                    StaticError::at(
                        format!("struct '{}' has no field '{}'", struct_name, segment.name.name),
                        segment.name.span,
                    )
                })?;
            ty = Ty::from_data_type(&field.ty);
            ty = self.check_index(ty, segment)?;
        }

        Ok(ty)
    }

    fn check_index(&mut self, ty: Ty, segment: &PathSegment) -> CheckResult<Ty> {
        let Some(index) = &segment.index else {
            return Ok(ty);
        };
        let name = match ty {
            Ty::Of {
                name,
                is_array: true,
            } => name,
            other => {
                return Err(StaticError::at(
                    format!("'{}' is not an array (type {})", segment.name.name, other),
                    segment.name.span,
                ));
            }
        };
        let index_ty = self.check_expr(index)?;
        if !index_ty.is(&TypeName::Int) {
            return Err(StaticError::at(
                format!("array index must be an int, found {}", index_ty),
                index.span(),
            ));
        }
        Ok(Ty::base(name))
    }

    fn check_arity(call: &CallExpr, expected: usize) -> CheckResult<()> {
        if call.args.len() != expected {
            return Err(StaticError::at(
                format!(
                    "function '{}' expects {} argument{}, found {}",
                    call.name.name,
                    expected,
                    if expected == 1 { "" } else { "s" },
                    call.args.len()
                ),
                call.name.span,
            ));
        }
        Ok(())
    }

    fn check_call(&mut self, call: &CallExpr) -> CheckResult<Ty> {
        let name = call.name.name.as_str();
        let span = call.name.span;

        match name {
            "print" | "println" => {
                Self::check_arity(call, 1)?;
                let ty = self.check_expr(&call.args[0])?;
                if ty.is_array() || ty.is_struct() {
                    return Err(StaticError::at(
                        format!("cannot {} a value of type {}", name, ty),
                        span,
                    ));
                }
                Ok(Ty::Null)
            }
            "readln" => {
                Self::check_arity(call, 0)?;
                Ok(Ty::base(TypeName::String))
            }
            "str_val" | "int_val" | "dbl_val" => {
                Self::check_arity(call, 1)?;
                let target = match name {
                    "str_val" => TypeName::String,
                    "int_val" => TypeName::Int,
                    _ => TypeName::Double,
                };
                let ty = self.check_expr(&call.args[0])?;
                if ty.is(&target) || ty.is_array() || ty.is_struct() {
                    return Err(StaticError::at(
                        format!("{} cannot convert a value of type {}", name, ty),
                        span,
                    ));
                }
                Ok(Ty::base(target))
            }
            "size" => {
                Self::check_arity(call, 1)?;
                let ty = self.check_expr(&call.args[0])?;
                if !ty.is_array() && !ty.is(&TypeName::String) {
                    return Err(StaticError::at(
                        format!("size expects a string or an array, found {}", ty),
                        span,
                    ));
                }
                Ok(Ty::base(TypeName::Int))
            }
            "get" => {
                Self::check_arity(call, 2)?;
                let index = self.check_expr(&call.args[0])?;
                if !index.is(&TypeName::Int) {
                    return Err(StaticError::at(
                        format!("first argument to get must be an int, found {}", index),
                        span,
                    ));
                }
                match self.check_expr(&call.args[1])? {
                    Ty::Of {
                        name,
                        is_array: true,
                    } => Ok(Ty::base(name)),
                    ty if ty.is(&TypeName::String) => Ok(Ty::base(TypeName::String)),
                    other => Err(StaticError::at(
                        format!(
                            "second argument to get must be a string or an array, found {}",
                            other
                        ),
                        span,
                    )),
                }
            }
            _ => {
                let def = *self.functions.get(name).ok_or_else(|| {
                    StaticError::at(format!("undefined function: {}", name), span)
                })?;
                Self::check_arity(call, def.params.len())?;
                for (i, (arg, param)) in call.args.iter().zip(&def.params).enumerate() {
                    let ty = self.check_expr(arg)?;
                    let expected = Ty::from_data_type(&param.ty);
                    if !ty.assignable_to(&expected) {
                        return Err(StaticError::at(
                            format!(
                                "argument {} of '{}' expects {} but found {}",
                                i + 1,
                                name,
                                expected,
                                ty
                            ),
                            arg.span(),
                        ));
                    }
                }
                if def.return_type.name == TypeName::Void {
                    Ok(Ty::Null)
                } else {
                    Ok(Ty::from_data_type(&def.return_type))
                }
            }
        }
    }
}
