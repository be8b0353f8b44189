#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i32),
    Double(f64),
    String(std::string::String),
    Bool(bool),
    Null,

    Ident(std::string::String),

    // Punctuation
    Dot,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,

    // Assignment and comparison
    Assign,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Logic
    And,
    Or,
    Not,

    // Declarations
    Struct,
    Var,
    New,
    Return,

    // Control flow
    If,
    Else,
    While,
    For,
    From,
    To,

    // Type names
    Void,
    IntType,
    DoubleType,
    BoolType,
    StringType,

    // Trivia
    Comment(std::string::String),

    Eof,
}

impl Token {
    /// Text used when reporting this token in an error.
    pub fn describe(&self) -> std::string::String {
        match self {
            Token::Int(n) => n.to_string(),
            Token::Double(d) => d.to_string(),
            Token::String(s) => format!("\"{}\"", s),
            Token::Bool(b) => b.to_string(),
            Token::Null => "null".to_string(),
            Token::Ident(name) => name.clone(),
            Token::Comment(_) => "comment".to_string(),
            Token::Eof => "end of input".to_string(),
            other => other.symbol().to_string(),
        }
    }

    /// Fixed spelling of punctuation, operator and keyword tokens.
    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Assign => "=",
            Token::Eq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::LtEq => "<=",
            Token::GtEq => ">=",
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
            Token::Struct => "struct",
            Token::Var => "var",
            Token::New => "new",
            Token::Return => "return",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::For => "for",
            Token::From => "from",
            Token::To => "to",
            Token::Void => "void",
            Token::IntType => "int",
            Token::DoubleType => "double",
            Token::BoolType => "bool",
            Token::StringType => "string",
            _ => "",
        }
    }

    /// True for `int`, `double`, `bool` and `string`.
    pub fn is_base_type(&self) -> bool {
        matches!(
            self,
            Token::IntType | Token::DoubleType | Token::BoolType | Token::StringType
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Token::Int(_) | Token::Double(_) | Token::String(_) | Token::Bool(_) | Token::Null
        )
    }
}

/// Maps a reserved word to its token.
pub fn keyword(word: &str) -> Option<Token> {
    Some(match word {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "struct" => Token::Struct,
        "var" => Token::Var,
        "if" => Token::If,
        "else" => Token::Else,
        "while" => Token::While,
        "for" => Token::For,
        "from" => Token::From,
        "to" => Token::To,
        "new" => Token::New,
        "return" => Token::Return,
        "true" => Token::Bool(true),
        "false" => Token::Bool(false),
        "null" => Token::Null,
        "void" => Token::Void,
        "int" => Token::IntType,
        "double" => Token::DoubleType,
        "bool" => Token::BoolType,
        "string" => Token::StringType,
        _ => return None,
    })
}
