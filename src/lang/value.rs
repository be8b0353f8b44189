use super::ast::Literal;
use serde::{Deserialize, Serialize};

/// Opaque handle to a heap-allocated struct or array.
///
/// Handles are only ever compared for identity; they are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Oid(pub u32);

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runtime value in the Cinder VM.
///
/// Values are the only data that can live on the operand stack, in frame
/// slots, or inside heap objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The null sentinel. Distinct from every other value.
    Null,

    /// 32-bit signed integer with wrapping arithmetic.
    Int(i32),

    /// 64-bit floating-point number.
    Double(f64),

    Bool(bool),

    /// UTF-8 string value.
    Str(String),

    /// Reference to a struct or array on the heap.
    Ref(Oid),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Ref(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Int(n) => Value::Int(*n),
            Literal::Double(d) => Value::Double(*d),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::Null => Value::Null,
        }
    }
}

impl std::fmt::Display for Value {
    /// The text `print` writes for a value.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(d) => write!(f, "{}", format_double(*d)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Ref(oid) => write!(f, "{}", oid),
        }
    }
}

/// Formats a double the way `print` shows it: plain decimal with at least one
/// fractional digit inside `[1e-3, 1e7)`, scientific (`1.0E20`, `2.5E-4`)
/// outside it.
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_string();
    }
    if d.is_infinite() {
        return if d > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = d.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let plain = format!("{}", d);
        return if plain.contains('.') { plain } else { plain + ".0" };
    }

    let sci = format!("{:e}", d);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    if mantissa.contains('.') {
        format!("{}E{}", mantissa, exponent)
    } else {
        format!("{}.0E{}", mantissa, exponent)
    }
}
