use std::fmt::Write as _;

use crate::frontend::lexer::Spanned;
use crate::frontend::token::Token;

/// Formats lexer output for `cinder --tokens`.
pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the source spelling of tokens
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        print!("{}", self.render(tokens));
    }

    /// One line per token: `[line:col] KIND token`.
    pub fn render(&self, tokens: &[Spanned]) -> String {
        let mut out = String::new();
        for s in tokens {
            self.render_one(&mut out, s);
        }
        out
    }

    fn render_one(&self, out: &mut String, s: &Spanned) {
        let line = s.span.line;
        let col = s.span.col;

        let kind = self.kind(&s.token);
        let colr = if self.color { self.color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        let text = if self.show_debug_repr {
            format!("{:?}", s.token)
        } else {
            match &s.token {
                Token::Comment(c) => format!("# {}", c),
                other => other.describe(),
            }
        };

        let _ = writeln!(
            out,
            "[{:02}:{:02}] {}{:<8} {}{}",
            line, col, colr, kind, text, reset
        );
    }

    fn kind(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Comment(_) => "COMMENT",
            Eof => "EOF",

            // literals
            Int(_) => "INT",
            Double(_) => "DOUBLE",
            String(_) => "STRING",
            Bool(_) => "BOOL",
            Null => "NULL",

            Ident(_) => "IDENT",

            // structure
            LParen | RParen => "PAREN",
            LBracket | RBracket => "BRACKET",
            LBrace | RBrace => "BRACE",
            Dot | Comma | Colon => "PUNCT",

            Plus | Minus | Star | Slash | Assign => "OP",
            Eq | NotEq | Lt | LtEq | Gt | GtEq => "CMP",
            And | Or | Not => "LOGIC",

            Void | IntType | DoubleType | BoolType | StringType => "TYPE",

            _ => "KEYWORD",
        }
    }

    fn color(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Comment(_) | Eof => Self::DIM,
            String(_) => Self::GRN,
            Int(_) | Double(_) | Bool(_) | Null => Self::CYN,
            Ident(_) => Self::YEL,
            Plus | Minus | Star | Slash | Assign => Self::MAG,
            Eq | NotEq | Lt | LtEq | Gt | GtEq | And | Or | Not => Self::MAG,
            Void | IntType | DoubleType | BoolType | StringType => Self::BLU,
            _ => Self::RESET,
        }
    }
}
