use serde::{Deserialize, Serialize};

use crate::lang::value::{Value, format_double};

/// Target of a jump that has been emitted but not yet backpatched.
pub const UNPATCHED: i32 = -1;

// =============================================================================
// OP - Bytecode instructions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    // literals and slots
    Push(Value),
    Pop,
    Load(usize),
    Store(usize),

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,

    // logic
    And,
    Or,
    Not,

    // comparison
    CmpLt,
    CmpLe,
    CmpEq,
    CmpNe,

    // ==========================================================================
    // Control flow - absolute jump targets within the current template
    // ==========================================================================
    /// Unconditional jump.
    Jmp(i32),

    /// Pop a bool, jump if false.
    Jmpf(i32),

    /// Call the template with this name.
    Call(String),
    Ret,

    // ==========================================================================
    // Heap
    // ==========================================================================
    /// Allocate an empty struct and push its oid.
    Allocs,
    /// ( oid value -- ) store a field.
    Setf(String),
    /// ( oid -- value ) load a field.
    Getf(String),
    /// ( size -- oid ) allocate a null-filled array.
    Alloca,
    /// ( oid index value -- )
    Seti,
    /// ( oid index -- value )
    Geti,

    // I/O and built-ins
    Write,
    Read,
    Len,
    Getc,
    ToInt,
    ToDbl,
    ToStr,

    Dup,
    Nop,
}

impl Op {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Push(_) => "PUSH",
            Op::Pop => "POP",
            Op::Load(_) => "LOAD",
            Op::Store(_) => "STORE",
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::And => "AND",
            Op::Or => "OR",
            Op::Not => "NOT",
            Op::CmpLt => "CMPLT",
            Op::CmpLe => "CMPLE",
            Op::CmpEq => "CMPEQ",
            Op::CmpNe => "CMPNE",
            Op::Jmp(_) => "JMP",
            Op::Jmpf(_) => "JMPF",
            Op::Call(_) => "CALL",
            Op::Ret => "RET",
            Op::Allocs => "ALLOCS",
            Op::Setf(_) => "SETF",
            Op::Getf(_) => "GETF",
            Op::Alloca => "ALLOCA",
            Op::Seti => "SETI",
            Op::Geti => "GETI",
            Op::Write => "WRITE",
            Op::Read => "READ",
            Op::Len => "LEN",
            Op::Getc => "GETC",
            Op::ToInt => "TOINT",
            Op::ToDbl => "TODBL",
            Op::ToStr => "TOSTR",
            Op::Dup => "DUP",
            Op::Nop => "NOP",
        }
    }

    /// Operand text, if the op carries one. Strings are quoted and escaped.
    pub fn operand(&self) -> Option<String> {
        match self {
            Op::Push(value) => Some(match value {
                Value::Str(s) => format!("{:?}", s),
                Value::Double(d) => format_double(*d),
                Value::Ref(oid) => format!("#{}", oid),
                other => other.to_string(),
            }),
            Op::Load(slot) | Op::Store(slot) => Some(slot.to_string()),
            Op::Jmp(target) | Op::Jmpf(target) => Some(target.to_string()),
            Op::Call(name) | Op::Setf(name) | Op::Getf(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// The target of a `Jmp`/`Jmpf`.
    pub fn jump_target(&self) -> Option<i32> {
        match self {
            Op::Jmp(target) | Op::Jmpf(target) => Some(*target),
            _ => None,
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operand() {
            Some(operand) => write!(f, "{} {}", self.mnemonic(), operand),
            None => write!(f, "{}", self.mnemonic()),
        }
    }
}

/// An op plus an optional note naming the source construct it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instr {
    pub op: Op,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
}

impl Instr {
    pub fn new(op: Op) -> Self {
        Instr { op, comment: None }
    }

    pub fn with_comment(op: Op, comment: impl Into<String>) -> Self {
        Instr {
            op,
            comment: Some(comment.into()),
        }
    }
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.op)?;
        if let Some(comment) = &self.comment {
            write!(f, " ; {}", comment)?;
        }
        Ok(())
    }
}

impl From<Op> for Instr {
    fn from(op: Op) -> Self {
        Instr::new(op)
    }
}
