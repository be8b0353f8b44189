use crate::frontend::token::{Token, keyword};
use crate::lang::span::Span;

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{line}:{col}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl LexerError {
    pub fn span(&self) -> Span {
        Span::new(self.line, self.col)
    }
}

/// Character-level tokenizer.
///
/// The lexer is also an [`Iterator`] over `Result<Spanned, LexerError>`: it
/// yields tokens lazily, ends with a single `Token::Eof`, and stops for good
/// after the first error. It cannot be rewound.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    done: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            done: false,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn error(&self, message: impl Into<String>, span: Span) -> LexerError {
        LexerError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_comment(&mut self) -> Token {
        self.advance();
        let mut comment = String::new();
        while let Some(ch) = self.current() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            comment.push(ch);
            self.advance();
        }
        Token::Comment(comment.trim().to_string())
    }

    fn read_string(&mut self) -> Result<Token, LexerError> {
        let start = self.span();
        self.advance();

        let mut string = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::String(string));
                }
                Some('\\') => {
                    let escape_span = self.span();
                    self.advance();
                    match self.current() {
                        Some('n') => string.push('\n'),
                        Some('t') => string.push('\t'),
                        Some('r') => string.push('\r'),
                        Some('\\') => string.push('\\'),
                        Some('"') => string.push('"'),
                        Some(ch) => {
                            return Err(
                                self.error(format!("unknown escape sequence: \\{}", ch), escape_span)
                            );
                        }
                        None => {
                            return Err(self.error("unexpected EOF in escape sequence", escape_span));
                        }
                    }
                    self.advance();
                }
                Some('\n') | Some('\r') => {
                    return Err(self.error(
                        "unterminated string (newline before closing quote)",
                        start,
                    ));
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
                None => {
                    return Err(self.error("unterminated string literal", start));
                }
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start = self.span();

        if self.current() == Some('0') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Err(self.error("leading zero in number", start));
        }

        let mut digits = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot {
                if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    let dot = self.span();
                    return Err(self.error(
                        "missing digit after decimal point",
                        Span::new(dot.line, dot.col + 1),
                    ));
                }
                has_dot = true;
                digits.push('.');
                self.advance();
            } else {
                break;
            }
        }

        if has_dot {
            let value: f64 = digits
                .parse()
                .map_err(|_| self.error(format!("invalid double: {}", digits), start))?;
            Ok(Token::Double(value))
        } else {
            let value: i32 = digits
                .parse()
                .map_err(|_| self.error(format!("integer literal out of range: {}", digits), start))?;
            Ok(Token::Int(value))
        }
    }

    fn read_word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        keyword(&word).unwrap_or(Token::Ident(word))
    }

    fn read_operator(&mut self) -> Result<Token, LexerError> {
        let span = self.span();
        let ch = match self.advance() {
            Some(ch) => ch,
            None => return Err(self.error("unexpected end of input", span)),
        };
        let followed_by_eq = self.current() == Some('=');

        let token = match ch {
            '.' => Token::Dot,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '=' if followed_by_eq => {
                self.advance();
                Token::Eq
            }
            '=' => Token::Assign,
            '!' if followed_by_eq => {
                self.advance();
                Token::NotEq
            }
            '!' => return Err(self.error("expected '=' after '!'", span)),
            '<' if followed_by_eq => {
                self.advance();
                Token::LtEq
            }
            '<' => Token::Lt,
            '>' if followed_by_eq => {
                self.advance();
                Token::GtEq
            }
            '>' => Token::Gt,
            other => return Err(self.error(format!("unexpected character: '{}'", other), span)),
        };

        Ok(token)
    }

    /// Reads the next token, including comments.
    pub fn next_token(&mut self) -> Result<Spanned, LexerError> {
        self.skip_whitespace();
        let span = self.span();

        let token = match self.current() {
            None => Token::Eof,
            Some('#') => self.read_comment(),
            Some('"') => self.read_string()?,
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) if ch.is_alphabetic() => self.read_word(),
            Some(_) => self.read_operator()?,
        };

        Ok(Spanned { token, span })
    }

    /// Tokenizes the whole input, ending with `Token::Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexerError> {
        self.collect()
    }

    /// Like [`Lexer::tokenize`] but without comments.
    pub fn tokenize_clean(&mut self) -> Result<Vec<Spanned>, LexerError> {
        let tokens = self.tokenize()?;
        Ok(tokens
            .into_iter()
            .filter(|t| !matches!(t.token, Token::Comment(_)))
            .collect())
    }
}

impl Iterator for Lexer {
    type Item = Result<Spanned, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.next_token();
        if matches!(result, Err(_) | Ok(Spanned { token: Token::Eof, .. })) {
            self.done = true;
        }
        Some(result)
    }
}
