//! Tree-to-tree peephole optimizer.
//!
//! Every function here consumes a node and returns its rewritten form.
//! Children are rewritten before their parent, so a fold at one level can
//! enable a fold one level up (`(1 + 2) * 4` becomes `12`).
//!
//! Rewrites performed on binary expressions whose operands are both literals:
//!
//! - **Strength reduction** for `int * 2^k` and `int / 2^k` (the latter only
//!   for a non-negative dividend): the result is computed with a shift.
//! - **Constant folding** by literal type: int and double arithmetic and
//!   comparison, bool `and`/`or`/equality, string concatenation and
//!   comparison, and `null` equality by type tag.
//!
//! A division by a literal zero is never folded; the expression is left for
//! the runtime to fault on. `not` on a bool literal folds too.

use crate::lang::ast::{
    AssignStmt, BinOp, Branch, CallExpr, Expr, ForStmt, FunDef, IfStmt, Literal, PathSegment,
    Program, RValue, ReturnStmt, Stmt, UnaryOp, VarPath, VarStmt, WhileStmt,
};
use crate::lang::span::Span;

/// Rewrites every expression position in the program.
pub fn optimize_program(program: Program) -> Program {
    Program {
        structs: program.structs,
        functions: program
            .functions
            .into_iter()
            .map(optimize_function)
            .collect(),
    }
}

fn optimize_function(fun: FunDef) -> FunDef {
    tracing::trace!(function = %fun.name.name, "optimizing");
    FunDef {
        body: optimize_block(fun.body),
        ..fun
    }
}

fn optimize_block(stmts: Vec<Stmt>) -> Vec<Stmt> {
    stmts.into_iter().map(optimize_stmt).collect()
}

fn optimize_stmt(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::Var(VarStmt { name, ty, init }) => Stmt::Var(VarStmt {
            name,
            ty,
            init: init.map(optimize_expr),
        }),
        Stmt::Assign(AssignStmt { target, value }) => Stmt::Assign(AssignStmt {
            target: optimize_path(target),
            value: optimize_expr(value),
        }),
        Stmt::Return(ReturnStmt { value, span }) => Stmt::Return(ReturnStmt {
            value: optimize_expr(value),
            span,
        }),
        Stmt::While(WhileStmt { cond, body }) => Stmt::While(WhileStmt {
            cond: optimize_expr(cond),
            body: optimize_block(body),
        }),
        Stmt::For(ForStmt {
            var,
            from,
            to,
            body,
        }) => Stmt::For(ForStmt {
            var,
            from: optimize_expr(from),
            to: optimize_expr(to),
            body: optimize_block(body),
        }),
        Stmt::If(IfStmt {
            branches,
            else_body,
        }) => Stmt::If(IfStmt {
            branches: branches
                .into_iter()
                .map(|Branch { cond, body }| Branch {
                    cond: optimize_expr(cond),
                    body: optimize_block(body),
                })
                .collect(),
            else_body: else_body.map(optimize_block),
        }),
        Stmt::Call(call) => Stmt::Call(optimize_call(call)),
    }
}

fn optimize_call(call: CallExpr) -> CallExpr {
    CallExpr {
        name: call.name,
        args: call.args.into_iter().map(optimize_expr).collect(),
    }
}

fn optimize_path(path: VarPath) -> VarPath {
    path.map_segments(|PathSegment { name, index }| PathSegment {
        name,
        index: index.map(optimize_expr),
    })
}

fn optimize_rvalue(rvalue: RValue) -> RValue {
    match rvalue {
        RValue::Literal { .. } => rvalue,
        RValue::Var(path) => RValue::Var(optimize_path(path)),
        RValue::Call(call) => RValue::Call(optimize_call(call)),
        RValue::NewStruct { name, args } => RValue::NewStruct {
            name,
            args: args.into_iter().map(optimize_expr).collect(),
        },
        RValue::NewArray { elem, size } => RValue::NewArray {
            elem,
            size: Box::new(optimize_expr(*size)),
        },
    }
}

/// Rewrites one expression bottom-up.
pub fn optimize_expr(expr: Expr) -> Expr {
    match expr {
        Expr::Basic(rvalue) => Expr::Basic(optimize_rvalue(rvalue)),
        Expr::Unary { op, span, expr } => {
            let expr = optimize_expr(*expr);
            match (op, expr.as_literal()) {
                (UnaryOp::Not, Some(Literal::Bool(b))) => {
                    let folded = Literal::Bool(!b);
                    tracing::trace!(%span, "folded not");
                    Expr::literal(folded, expr.span())
                }
                _ => Expr::Unary {
                    op,
                    span,
                    expr: Box::new(expr),
                },
            }
        }
        Expr::Binary { op, span, lhs, rhs } => {
            let lhs = optimize_expr(*lhs);
            let rhs = optimize_expr(*rhs);

            let folded = match (lhs.as_literal(), rhs.as_literal()) {
                (Some(l), Some(r)) => fold_binary(op, l, r),
                _ => None,
            };

            match folded {
                Some(value) => {
                    let at: Span = lhs.span();
                    tracing::trace!(op = op.symbol(), span = %at, result = ?value, "folded");
                    Expr::literal(value, at)
                }
                None => Expr::binary(op, span, lhs, rhs),
            }
        }
    }
}

/// Evaluates `l op r` at compile time, or `None` when the pair does not fold.
pub fn fold_binary(op: BinOp, l: &Literal, r: &Literal) -> Option<Literal> {
    if let Some(reduced) = strength_reduce(op, l, r) {
        return Some(reduced);
    }

    match (l, r) {
        (Literal::Int(a), Literal::Int(b)) => fold_int(op, *a, *b),
        (Literal::Double(a), Literal::Double(b)) => fold_double(op, *a, *b),
        (Literal::Bool(a), Literal::Bool(b)) => fold_bool(op, *a, *b),
        (Literal::Str(a), Literal::Str(b)) => fold_str(op, a, b),
        (Literal::Null, _) | (_, Literal::Null) => {
            let same = l.type_name() == r.type_name();
            match op {
                BinOp::Eq => Some(Literal::Bool(same)),
                BinOp::Ne => Some(Literal::Bool(!same)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// `a * 2^k` as `a << k`; `a / 2^k` as `a >> k` for `a >= 0`.
fn strength_reduce(op: BinOp, l: &Literal, r: &Literal) -> Option<Literal> {
    let (Literal::Int(a), Literal::Int(b)) = (l, r) else {
        return None;
    };
    let k = power_of_two(*b)?;
    match op {
        BinOp::Mul => Some(Literal::Int(a.wrapping_shl(k))),
        BinOp::Div if *a >= 0 => Some(Literal::Int(a >> k)),
        _ => None,
    }
}

/// `Some(k)` when `n == 2^k`.
fn power_of_two(n: i32) -> Option<u32> {
    if n > 0 && n & (n - 1) == 0 {
        Some(n.trailing_zeros())
    } else {
        None
    }
}

fn fold_int(op: BinOp, a: i32, b: i32) -> Option<Literal> {
    Some(match op {
        BinOp::Add => Literal::Int(a.wrapping_add(b)),
        BinOp::Sub => Literal::Int(a.wrapping_sub(b)),
        BinOp::Mul => Literal::Int(a.wrapping_mul(b)),
        BinOp::Div if b == 0 => return None,
        BinOp::Div => Literal::Int(a.wrapping_div(b)),
        BinOp::Eq => Literal::Bool(a == b),
        BinOp::Ne => Literal::Bool(a != b),
        BinOp::Lt => Literal::Bool(a < b),
        BinOp::Le => Literal::Bool(a <= b),
        BinOp::Gt => Literal::Bool(a > b),
        BinOp::Ge => Literal::Bool(a >= b),
        BinOp::And | BinOp::Or => return None,
    })
}

fn fold_double(op: BinOp, a: f64, b: f64) -> Option<Literal> {
    Some(match op {
        BinOp::Add => Literal::Double(a + b),
        BinOp::Sub => Literal::Double(a - b),
        BinOp::Mul => Literal::Double(a * b),
        BinOp::Div if b == 0.0 => return None,
        BinOp::Div => Literal::Double(a / b),
        BinOp::Eq => Literal::Bool(a == b),
        BinOp::Ne => Literal::Bool(a != b),
        BinOp::Lt => Literal::Bool(a < b),
        BinOp::Le => Literal::Bool(a <= b),
        BinOp::Gt => Literal::Bool(a > b),
        BinOp::Ge => Literal::Bool(a >= b),
        BinOp::And | BinOp::Or => return None,
    })
}

fn fold_bool(op: BinOp, a: bool, b: bool) -> Option<Literal> {
    Some(Literal::Bool(match op {
        BinOp::And => a && b,
        BinOp::Or => a || b,
        BinOp::Eq => a == b,
        BinOp::Ne => a != b,
        _ => return None,
    }))
}

fn fold_str(op: BinOp, a: &str, b: &str) -> Option<Literal> {
    Some(match op {
        BinOp::Add => Literal::Str(format!("{}{}", a, b)),
        BinOp::Eq => Literal::Bool(a == b),
        BinOp::Ne => Literal::Bool(a != b),
        BinOp::Lt => Literal::Bool(a < b),
        BinOp::Le => Literal::Bool(a <= b),
        BinOp::Gt => Literal::Bool(a > b),
        BinOp::Ge => Literal::Bool(a >= b),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::{Parser, parse};
    use pretty_assertions::assert_eq;

    fn expr(source: &str) -> Expr {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse_expr().unwrap()
    }

    fn folded(source: &str) -> Option<Literal> {
        optimize_expr(expr(source)).as_literal().cloned()
    }

    fn first_init(source: &str) -> Expr {
        let program = parse(Lexer::new(source).tokenize().unwrap()).unwrap();
        let program = optimize_program(program);
        match &program.functions[0].body[0] {
            Stmt::Var(VarStmt { init: Some(e), .. }) => e.clone(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_fold_precedence_example() {
        assert_eq!(folded("2 + 3 * 4"), Some(Literal::Int(14)));
    }

    #[test]
    fn test_strength_reduction_examples() {
        assert_eq!(folded("5 * 2"), Some(Literal::Int(10)));
        assert_eq!(folded("20 / 2"), Some(Literal::Int(10)));
        assert_eq!(folded("5 * 3"), Some(Literal::Int(15)));
        assert_eq!(folded("3 * 8"), Some(Literal::Int(24)));
        assert_eq!(folded("7 * 1024"), Some(Literal::Int(7168)));
        assert_eq!(folded("256 / 16"), Some(Literal::Int(16)));
        assert_eq!(folded("10 / 3"), Some(Literal::Int(3)));
        assert_eq!(folded("42 * 0"), Some(Literal::Int(0)));
        assert_eq!(folded("100 / 1"), Some(Literal::Int(100)));
    }

    #[test]
    fn test_shift_matches_arithmetic_for_non_negative() {
        for a in [0, 1, 7, 99, 12345, i32::MAX] {
            for k in 0..31 {
                let b = 1i32 << k;
                assert_eq!(
                    strength_reduce(BinOp::Mul, &Literal::Int(a), &Literal::Int(b)),
                    Some(Literal::Int(a.wrapping_mul(b)))
                );
                assert_eq!(
                    strength_reduce(BinOp::Div, &Literal::Int(a), &Literal::Int(b)),
                    Some(Literal::Int(a / b))
                );
            }
        }
    }

    #[test]
    fn test_negative_dividend_uses_truncating_division() {
        // -7 >> 1 would be -4; truncation gives -3.
        assert_eq!(
            fold_binary(BinOp::Div, &Literal::Int(-7), &Literal::Int(2)),
            Some(Literal::Int(-3))
        );
    }

    #[test]
    fn test_division_by_zero_is_not_folded() {
        let e = optimize_expr(expr("1 / 0"));
        assert!(matches!(e, Expr::Binary { op: BinOp::Div, .. }));
        let e = optimize_expr(expr("1.0 / 0.0"));
        assert!(matches!(e, Expr::Binary { op: BinOp::Div, .. }));
    }

    #[test]
    fn test_division_by_zero_inside_larger_expression() {
        // The inner division stays; the outer addition can no longer fold.
        let e = optimize_expr(expr("(4 / 0) + (1 + 1)"));
        match e {
            Expr::Binary { op: BinOp::Add, lhs, rhs, .. } => {
                assert!(matches!(*lhs, Expr::Binary { op: BinOp::Div, .. }));
                assert_eq!(rhs.as_literal(), Some(&Literal::Int(2)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_int_overflow_wraps() {
        assert_eq!(folded("2147483647 + 1"), Some(Literal::Int(i32::MIN)));
        assert_eq!(folded("1073741824 * 4"), Some(Literal::Int(0)));
    }

    #[test]
    fn test_double_folding() {
        assert_eq!(folded("1.5 + 2.25"), Some(Literal::Double(3.75)));
        assert_eq!(folded("1.0 / 4.0"), Some(Literal::Double(0.25)));
        assert_eq!(folded("2.5 >= 2.5"), Some(Literal::Bool(true)));
    }

    #[test]
    fn test_relational_and_equality_folding() {
        assert_eq!(folded("3 < 4"), Some(Literal::Bool(true)));
        assert_eq!(folded("3 >= 4"), Some(Literal::Bool(false)));
        assert_eq!(folded("5 != 5"), Some(Literal::Bool(false)));
    }

    #[test]
    fn test_bool_folding() {
        assert_eq!(folded("true and false"), Some(Literal::Bool(false)));
        assert_eq!(folded("false or true"), Some(Literal::Bool(true)));
        assert_eq!(folded("true == true"), Some(Literal::Bool(true)));
        assert_eq!(folded("not true"), Some(Literal::Bool(false)));
        assert_eq!(folded("not (1 < 2)"), Some(Literal::Bool(false)));
    }

    #[test]
    fn test_string_folding() {
        assert_eq!(
            folded("\"ab\" + \"cd\""),
            Some(Literal::Str("abcd".to_string()))
        );
        assert_eq!(folded("\"abc\" < \"abd\""), Some(Literal::Bool(true)));
        assert_eq!(folded("\"x\" == \"y\""), Some(Literal::Bool(false)));
    }

    #[test]
    fn test_null_equality_by_type_tag() {
        assert_eq!(folded("null == null"), Some(Literal::Bool(true)));
        assert_eq!(folded("null == 3"), Some(Literal::Bool(false)));
        assert_eq!(folded("\"a\" != null"), Some(Literal::Bool(true)));
    }

    #[test]
    fn test_variables_block_folding() {
        let e = optimize_expr(expr("x + 2 * 3"));
        match e {
            Expr::Binary { op: BinOp::Add, rhs, .. } => {
                assert_eq!(rhs.as_literal(), Some(&Literal::Int(6)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_folded_literal_keeps_lhs_span() {
        let e = optimize_expr(expr("  7 + 1"));
        assert_eq!(e.span(), Span::new(1, 3));
    }

    #[test]
    fn test_idempotent() {
        for source in ["2 + 3 * 4", "x * (4 / 0) + 1 * 2", "f(1 + 1, y[2 * 2])", "not a or 1 < 2"] {
            let once = optimize_expr(expr(source));
            let twice = optimize_expr(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_sub_expressions_of_opaque_nodes() {
        let e = optimize_expr(expr("f(1 + 1, a[2 * 3].b)"));
        match e {
            Expr::Basic(RValue::Call(call)) => {
                assert_eq!(call.args[0].as_literal(), Some(&Literal::Int(2)));
                match &call.args[1] {
                    Expr::Basic(RValue::Var(path)) => {
                        let index = path.root().index.as_ref().unwrap();
                        assert_eq!(index.as_literal(), Some(&Literal::Int(6)));
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_program_positions() {
        assert_eq!(
            first_init("void main() { var x = new int[2 + 2] }"),
            Expr::Basic(RValue::NewArray {
                elem: crate::lang::ast::DataType {
                    name: crate::lang::ast::TypeName::Int,
                    is_array: false,
                    span: Span::new(1, 27),
                },
                size: Box::new(Expr::literal(Literal::Int(4), Span::new(1, 31))),
            })
        );

        let program = parse(
            Lexer::new("void main() { while 1 < 2 { x[1 + 1] = 3 * 2 } }")
                .tokenize()
                .unwrap(),
        )
        .unwrap();
        let program = optimize_program(program);
        match &program.functions[0].body[0] {
            Stmt::While(w) => {
                assert_eq!(w.cond.as_literal(), Some(&Literal::Bool(true)));
                match &w.body[0] {
                    Stmt::Assign(a) => {
                        assert_eq!(a.value.as_literal(), Some(&Literal::Int(6)));
                        let index = a.target.root().index.as_ref().unwrap();
                        assert_eq!(index.as_literal(), Some(&Literal::Int(2)));
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
