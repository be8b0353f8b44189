use crate::frontend::lexer::Spanned;
use crate::frontend::token::Token;
use crate::lang::ast::{
    AssignStmt, BinOp, Branch, CallExpr, DataType, Expr, ForStmt, FunDef, Ident, IfStmt, Literal,
    PathSegment, Program, RValue, ReturnStmt, Stmt, StructDef, TypeName, UnaryOp, VarDef,
    VarPath, VarStmt, WhileStmt,
};
use crate::lang::span::Span;

/// Deepest nesting of blocks and parenthesized or prefixed expressions the
/// parser accepts. Later passes recurse on the same structure.
pub const MAX_NESTING: usize = 128;

/// A parsing error with source location.
///
/// `line` and `col` are 1-based positions coming from the lexer spans.
/// For errors at end of input (a missing `}` or `)`), the parser uses the
/// last consumed token's span so locations are never `0:0`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{line}:{col}: {message}")]
pub struct ParserError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl ParserError {
    pub fn span(&self) -> Span {
        Span::new(self.line, self.col)
    }
}

/// Recursive-descent parser for Cinder.
///
/// Consumes lexed `Spanned` tokens and produces a [`Program`] of struct and
/// function definitions. Binary operators are parsed by precedence climbing
/// over [`BinOp::precedence`].
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Span of the most recently consumed token.
    last_span: Option<Span>,
    /// Current block and primary-expression nesting.
    depth: usize,
}

impl Parser {
    /// Creates a new parser from lexer output. Comments are dropped here.
    pub fn new(tokens: Vec<Spanned>) -> Self {
        let tokens: Vec<Spanned> = tokens
            .into_iter()
            .filter(|t| !matches!(t.token, Token::Comment(_)))
            .collect();
        Parser {
            tokens,
            pos: 0,
            last_span: None,
            depth: 0,
        }
    }

    fn current(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if let Some(s) = &token {
            self.last_span = Some(s.span);
        }
        self.pos += 1;
        token
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    /// Span of the current token, falling back to the last consumed one.
    fn span(&self) -> Span {
        self.current()
            .map(|s| s.span)
            .or(self.last_span)
            .unwrap_or(Span::new(1, 1))
    }

    /// Constructs a `ParserError` at the most relevant location.
    ///
    /// Priority:
    /// 1. If `current()` exists, use its span.
    /// 2. Else, use `last_span` (after falling off the end).
    /// 3. Else, default to (1,1) for truly empty input.
    fn error(&self, message: &str) -> ParserError {
        let span = self.span();
        ParserError {
            message: message.to_string(),
            line: span.line,
            col: span.col,
        }
    }

    fn unexpected(&self, expected: &str) -> ParserError {
        let found = self
            .peek()
            .map(|t| t.describe())
            .unwrap_or_else(|| "end of input".to_string());
        self.error(&format!("expected {}, found '{}'", expected, found))
    }

    fn eat(&mut self, expected: Token) -> Result<Span, ParserError> {
        if self.check(&expected) {
            let span = self.span();
            self.advance();
            Ok(span)
        } else {
            Err(self.unexpected(&format!("'{}'", expected.describe())))
        }
    }

    fn eat_ident(&mut self, what: &str) -> Result<Ident, ParserError> {
        match self.current() {
            Some(Spanned {
                token: Token::Ident(name),
                span,
            }) => {
                let ident = Ident::new(name.clone(), *span);
                self.advance();
                Ok(ident)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Runs `f` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParserError>,
    ) -> Result<T, ParserError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(&format!("nesting deeper than {} levels", MAX_NESTING)));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Parses a complete program. Stops at `Token::Eof`.
    pub fn parse(&mut self) -> Result<Program, ParserError> {
        let mut program = Program::default();

        loop {
            match self.peek() {
                None | Some(Token::Eof) => break,
                Some(Token::Struct) => program.structs.push(self.parse_struct()?),
                _ => program.functions.push(self.parse_function()?),
            }
        }

        Ok(program)
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    fn parse_struct(&mut self) -> Result<StructDef, ParserError> {
        self.eat(Token::Struct)?;
        let name = self.eat_ident("struct name")?;
        self.eat(Token::LBrace)?;

        let mut fields = Vec::new();
        if !self.check(&Token::RBrace) {
            fields.push(self.parse_var_def()?);
            while self.check(&Token::Comma) {
                self.advance();
                fields.push(self.parse_var_def()?);
            }
        }
        self.eat(Token::RBrace)?;

        Ok(StructDef { name, fields })
    }

    fn parse_function(&mut self) -> Result<FunDef, ParserError> {
        let return_type = if self.check(&Token::Void) {
            let span = self.eat(Token::Void)?;
            DataType {
                name: TypeName::Void,
                is_array: false,
                span,
            }
        } else {
            self.parse_data_type()
                .map_err(|_| self.unexpected("'struct' or a function return type"))?
        };

        let name = self.eat_ident("function name")?;
        self.eat(Token::LParen)?;

        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            params.push(self.parse_var_def()?);
            while self.check(&Token::Comma) {
                self.advance();
                params.push(self.parse_var_def()?);
            }
        }
        self.eat(Token::RParen)?;

        let body = self.parse_block()?;
        Ok(FunDef {
            name,
            return_type,
            params,
            body,
        })
    }

    /// `name: type`
    fn parse_var_def(&mut self) -> Result<VarDef, ParserError> {
        let name = self.eat_ident("identifier")?;
        self.eat(Token::Colon)?;
        let ty = self.parse_data_type()?;
        Ok(VarDef { name, ty })
    }

    fn parse_base_type(&mut self) -> Result<TypeName, ParserError> {
        let name = match self.peek() {
            Some(Token::IntType) => TypeName::Int,
            Some(Token::DoubleType) => TypeName::Double,
            Some(Token::BoolType) => TypeName::Bool,
            Some(Token::StringType) => TypeName::String,
            Some(Token::Ident(name)) => TypeName::Struct(name.clone()),
            _ => return Err(self.unexpected("a type")),
        };
        self.advance();
        Ok(name)
    }

    fn parse_data_type(&mut self) -> Result<DataType, ParserError> {
        let span = self.span();
        if self.check(&Token::LBracket) {
            self.advance();
            let name = self.parse_base_type()?;
            self.eat(Token::RBracket)?;
            Ok(DataType {
                name,
                is_array: true,
                span,
            })
        } else {
            let name = self.parse_base_type()?;
            Ok(DataType {
                name,
                is_array: false,
                span,
            })
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParserError> {
        self.nested(Self::parse_block_inner)
    }

    fn parse_block_inner(&mut self) -> Result<Vec<Stmt>, ParserError> {
        self.eat(Token::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) {
            if matches!(self.peek(), None | Some(Token::Eof)) {
                return Err(self.unexpected("'}'"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.eat(Token::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParserError> {
        match self.peek() {
            Some(Token::Var) => self.parse_var_stmt(),
            Some(Token::While) => self.parse_while(),
            Some(Token::If) => self.parse_if().map(Stmt::If),
            Some(Token::For) => self.parse_for(),
            Some(Token::Return) => self.parse_return(),
            Some(Token::Ident(_)) => {
                if self.peek_next() == Some(&Token::LParen) {
                    let name = self.eat_ident("function name")?;
                    Ok(Stmt::Call(self.parse_call(name)?))
                } else {
                    let name = self.eat_ident("variable name")?;
                    let target = self.parse_var_path(name)?;
                    self.eat(Token::Assign)?;
                    let value = self.parse_expr()?;
                    Ok(Stmt::Assign(AssignStmt { target, value }))
                }
            }
            _ => Err(self.unexpected("a statement")),
        }
    }

    fn parse_var_stmt(&mut self) -> Result<Stmt, ParserError> {
        self.eat(Token::Var)?;
        let name = self.eat_ident("variable name")?;

        let (ty, init) = if self.check(&Token::Assign) {
            self.advance();
            (None, Some(self.parse_expr()?))
        } else if self.check(&Token::Colon) {
            self.advance();
            let ty = self.parse_data_type()?;
            let init = if self.check(&Token::Assign) {
                self.advance();
                Some(self.parse_expr()?)
            } else {
                None
            };
            (Some(ty), init)
        } else {
            return Err(self.unexpected("'=' or ':'"));
        };

        Ok(Stmt::Var(VarStmt { name, ty, init }))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParserError> {
        self.eat(Token::While)?;
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While(WhileStmt { cond, body }))
    }

    /// Flattens `if ... else if ... else` into one branch list.
    fn parse_if(&mut self) -> Result<IfStmt, ParserError> {
        let mut branches = Vec::new();
        let mut else_body = None;

        loop {
            self.eat(Token::If)?;
            let cond = self.parse_expr()?;
            let body = self.parse_block()?;
            branches.push(Branch { cond, body });

            if !self.check(&Token::Else) {
                break;
            }
            self.advance();
            if self.check(&Token::LBrace) {
                else_body = Some(self.parse_block()?);
                break;
            }
            if !self.check(&Token::If) {
                return Err(self.unexpected("'if' or '{' after 'else'"));
            }
        }

        Ok(IfStmt {
            branches,
            else_body,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParserError> {
        self.eat(Token::For)?;
        let var = self.eat_ident("loop variable")?;
        self.eat(Token::From)?;
        let from = self.parse_expr()?;
        self.eat(Token::To)?;
        let to = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::For(ForStmt {
            var,
            from,
            to,
            body,
        }))
    }

    fn parse_return(&mut self) -> Result<Stmt, ParserError> {
        let span = self.eat(Token::Return)?;
        let value = self.parse_expr()?;
        Ok(Stmt::Return(ReturnStmt { value, span }))
    }

    fn parse_call(&mut self, name: Ident) -> Result<CallExpr, ParserError> {
        let args = self.parse_args()?;
        Ok(CallExpr { name, args })
    }

    /// `( [expr ("," expr)*] )`
    fn parse_args(&mut self) -> Result<Vec<Expr>, ParserError> {
        self.eat(Token::LParen)?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args.push(self.parse_expr()?);
            while self.check(&Token::Comma) {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        self.eat(Token::RParen)?;
        Ok(args)
    }

    /// Parses the rest of a path whose root name was already consumed.
    fn parse_var_path(&mut self, root: Ident) -> Result<VarPath, ParserError> {
        let index = self.parse_index()?;
        let mut path = VarPath::new(PathSegment { name: root, index });

        while self.check(&Token::Dot) {
            self.advance();
            let name = self.eat_ident("field name")?;
            let index = self.parse_index()?;
            path.push(PathSegment { name, index });
        }

        Ok(path)
    }

    fn parse_index(&mut self) -> Result<Option<Expr>, ParserError> {
        if !self.check(&Token::LBracket) {
            return Ok(None);
        }
        self.advance();
        let index = self.parse_expr()?;
        self.eat(Token::RBracket)?;
        Ok(Some(index))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn parse_expr(&mut self) -> Result<Expr, ParserError> {
        self.parse_binary(0)
    }

    fn binary_op(&self) -> Option<BinOp> {
        Some(match self.peek()? {
            Token::Plus => BinOp::Add,
            Token::Minus => BinOp::Sub,
            Token::Star => BinOp::Mul,
            Token::Slash => BinOp::Div,
            Token::And => BinOp::And,
            Token::Or => BinOp::Or,
            Token::Eq => BinOp::Eq,
            Token::NotEq => BinOp::Ne,
            Token::Lt => BinOp::Lt,
            Token::LtEq => BinOp::Le,
            Token::Gt => BinOp::Gt,
            Token::GtEq => BinOp::Ge,
            _ => return None,
        })
    }

    /// Precedence climbing; every operator is left associative.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParserError> {
        let mut lhs = self.parse_primary()?;

        while let Some(op) = self.binary_op() {
            if op.precedence() < min_prec {
                break;
            }
            let span = self.span();
            self.advance();
            let rhs = self.parse_binary(op.precedence() + 1)?;
            lhs = Expr::binary(op, span, lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        self.nested(Self::parse_primary_inner)
    }

    fn parse_primary_inner(&mut self) -> Result<Expr, ParserError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.eat(Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Not) => {
                let span = self.eat(Token::Not)?;
                let expr = self.parse_primary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    span,
                    expr: Box::new(expr),
                })
            }
            _ => self.parse_rvalue().map(Expr::Basic),
        }
    }

    fn parse_rvalue(&mut self) -> Result<RValue, ParserError> {
        let span = self.span();
        let literal = match self.peek() {
            Some(Token::Int(n)) => Some(Literal::Int(*n)),
            Some(Token::Double(d)) => Some(Literal::Double(*d)),
            Some(Token::String(s)) => Some(Literal::Str(s.clone())),
            Some(Token::Bool(b)) => Some(Literal::Bool(*b)),
            Some(Token::Null) => Some(Literal::Null),
            _ => None,
        };
        if let Some(value) = literal {
            self.advance();
            return Ok(RValue::Literal { value, span });
        }

        match self.peek() {
            Some(Token::New) => self.parse_new(),
            Some(Token::Ident(_)) => {
                let name = self.eat_ident("identifier")?;
                if self.check(&Token::LParen) {
                    Ok(RValue::Call(self.parse_call(name)?))
                } else {
                    Ok(RValue::Var(self.parse_var_path(name)?))
                }
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// `new S(args)`, `new S[n]` or `new T[n]` for a base type `T`.
    fn parse_new(&mut self) -> Result<RValue, ParserError> {
        self.eat(Token::New)?;
        let span = self.span();

        if let Some(Token::Ident(_)) = self.peek() {
            let name = self.eat_ident("struct name")?;
            if self.check(&Token::LParen) {
                let args = self.parse_args()?;
                return Ok(RValue::NewStruct { name, args });
            }
            if !self.check(&Token::LBracket) {
                return Err(self.unexpected("'(' or '['"));
            }
            let size = self.parse_array_size()?;
            return Ok(RValue::NewArray {
                elem: DataType {
                    name: TypeName::Struct(name.name),
                    is_array: false,
                    span,
                },
                size: Box::new(size),
            });
        }

        if !self.peek().is_some_and(Token::is_base_type) {
            return Err(self.unexpected("a type after 'new'"));
        }
        let name = self.parse_base_type()?;
        let size = self.parse_array_size()?;
        Ok(RValue::NewArray {
            elem: DataType {
                name,
                is_array: false,
                span,
            },
            size: Box::new(size),
        })
    }

    fn parse_array_size(&mut self) -> Result<Expr, ParserError> {
        self.eat(Token::LBracket)?;
        let size = self.parse_expr()?;
        self.eat(Token::RBracket)?;
        Ok(size)
    }
}

/// Convenience wrapper: parses a token stream into a [`Program`].
pub fn parse(tokens: Vec<Spanned>) -> Result<Program, ParserError> {
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn parse_src(source: &str) -> Result<Program, ParserError> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        parse(tokens)
    }

    fn parse_expr_src(source: &str) -> Expr {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse_expr().unwrap()
    }

    fn int(n: i32, line: usize, col: usize) -> Expr {
        Expr::literal(Literal::Int(n), Span::new(line, col))
    }

    #[test]
    fn test_empty_program() {
        let program = parse_src("").unwrap();
        assert!(program.structs.is_empty());
        assert!(program.functions.is_empty());
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expr_src("2 + 3 * 4");
        let expected = Expr::binary(
            BinOp::Add,
            Span::new(1, 3),
            int(2, 1, 1),
            Expr::binary(BinOp::Mul, Span::new(1, 7), int(3, 1, 5), int(4, 1, 9)),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_left_associative() {
        let expr = parse_expr_src("8 - 4 - 2");
        let expected = Expr::binary(
            BinOp::Sub,
            Span::new(1, 7),
            Expr::binary(BinOp::Sub, Span::new(1, 3), int(8, 1, 1), int(4, 1, 5)),
            int(2, 1, 9),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse_expr_src("(2 + 3) * 4");
        match expr {
            Expr::Binary { op: BinOp::Mul, lhs, .. } => {
                assert!(matches!(*lhs, Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_logical_precedence() {
        // `or` binds loosest, comparisons tighter than `and`.
        let expr = parse_expr_src("a < 1 and b or c");
        match expr {
            Expr::Binary { op: BinOp::Or, lhs, .. } => match *lhs {
                Expr::Binary { op: BinOp::And, lhs, .. } => {
                    assert!(matches!(*lhs, Expr::Binary { op: BinOp::Lt, .. }));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_applies_to_primary() {
        let expr = parse_expr_src("not a and b");
        match expr {
            Expr::Binary { op: BinOp::And, lhs, .. } => {
                assert!(matches!(*lhs, Expr::Unary { op: UnaryOp::Not, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_struct_and_function() {
        let program = parse_src(
            "struct Node { val: int, next: Node }\n\
             int sum(xs: [int], n: int) { return 0 }",
        )
        .unwrap();

        assert_eq!(program.structs.len(), 1);
        let node = &program.structs[0];
        assert_eq!(node.name.name, "Node");
        assert_eq!(node.fields[1].ty.name, TypeName::Struct("Node".to_string()));

        let sum = &program.functions[0];
        assert_eq!(sum.name.name, "sum");
        assert_eq!(sum.return_type.name, TypeName::Int);
        assert!(sum.params[0].ty.is_array);
        assert!(matches!(sum.body[0], Stmt::Return(_)));
    }

    #[test]
    fn test_var_forms() {
        let program = parse_src(
            "void main() { var a = 1 var b: double var c: [string] = new string[2] }",
        )
        .unwrap();
        let body = &program.functions[0].body;

        match &body[0] {
            Stmt::Var(v) => {
                assert!(v.ty.is_none());
                assert!(v.init.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
        match &body[1] {
            Stmt::Var(v) => {
                assert_eq!(v.ty.as_ref().map(|t| t.name.clone()), Some(TypeName::Double));
                assert!(v.init.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        match &body[2] {
            Stmt::Var(v) => {
                assert!(v.ty.as_ref().is_some_and(|t| t.is_array));
                assert!(matches!(
                    v.init,
                    Some(Expr::Basic(RValue::NewArray { .. }))
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_if_chain_is_flattened() {
        let program = parse_src(
            "void main() { if a { } else if b { } else if c { } else { print(1) } }",
        )
        .unwrap();
        match &program.functions[0].body[0] {
            Stmt::If(stmt) => {
                assert_eq!(stmt.branches.len(), 3);
                assert_eq!(stmt.else_body.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_paths_and_calls() {
        let program = parse_src("void main() { a.b[i + 1].c = f(x, y[0]) g() }").unwrap();
        let body = &program.functions[0].body;
        match &body[0] {
            Stmt::Assign(assign) => {
                let names: Vec<&str> = assign
                    .target
                    .segments()
                    .iter()
                    .map(|s| s.name.name.as_str())
                    .collect();
                assert_eq!(names, vec!["a", "b", "c"]);
                assert!(assign.target.segments()[1].index.is_some());
                assert!(matches!(assign.value, Expr::Basic(RValue::Call(_))));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&body[1], Stmt::Call(c) if c.name.name == "g" && c.args.is_empty()));
    }

    #[test]
    fn test_new_forms() {
        match parse_expr_src("new Node(1, null)") {
            Expr::Basic(RValue::NewStruct { name, args }) => {
                assert_eq!(name.name, "Node");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        match parse_expr_src("new Node[4]") {
            Expr::Basic(RValue::NewArray { elem, .. }) => {
                assert_eq!(elem.name, TypeName::Struct("Node".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_for_loop() {
        let program = parse_src("void main() { for i from 0 to 4 { print(i) } }").unwrap();
        match &program.functions[0].body[0] {
            Stmt::For(f) => {
                assert_eq!(f.var.name, "i");
                assert_eq!(f.body.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_missing_brace() {
        let err = parse_src("void main() { print(1)").unwrap_err();
        assert!(err.message.contains("'}'"), "{}", err.message);
    }

    #[test]
    fn test_error_position() {
        let err = parse_src("void main() {\n  var = 3\n}").unwrap_err();
        assert_eq!((err.line, err.col), (2, 7));
        assert!(err.message.contains("variable name"));
    }

    #[test]
    fn test_error_bad_statement() {
        let err = parse_src("void main() { 3 }").unwrap_err();
        assert!(err.message.contains("statement"));
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let depth = 100_000;
        let source = format!(
            "void main() {{ print({}1{}) }}",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let err = parse_src(&source).unwrap_err();
        assert!(err.message.contains("nesting deeper than"), "{}", err.message);

        let source = format!("void main() {{ var x = {}true }}", "not ".repeat(depth));
        assert!(parse_src(&source).is_err());

        let blocks = format!(
            "void main() {{ {} }}",
            "while true { ".repeat(depth) + &"}".repeat(depth)
        );
        assert!(parse_src(&blocks).is_err());
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let source = format!("void main() {{ print({}1{}) }}", "(".repeat(50), ")".repeat(50));
        assert!(parse_src(&source).is_ok());
    }

    #[test]
    fn test_error_new_without_type() {
        let err = parse_src("void main() { var x = new 3 }").unwrap_err();
        assert!(err.message.contains("after 'new'"));
    }
}
