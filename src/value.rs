//! The tagged cell value and evaluation-time errors.

use std::fmt;

use thiserror::Error;

/// An error produced while evaluating a formula.
///
/// These are values, not exceptions: they are cached like any other result
/// and surface through [`Value::Error`]. `Display` renders the error code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum FormulaError {
    /// A reference that cannot be resolved.
    #[error("#REF!")]
    Ref,
    /// A referenced cell holds text that does not convert to a number.
    #[error("#VALUE!")]
    Value,
    /// Division by zero.
    #[error("#DIV/0!")]
    Div0,
    /// A computation left the representable range (overflow, NaN).
    #[error("#NUM!")]
    Num,
}

/// What a cell is worth: a number, a piece of text, or an evaluation error.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl Default for Value {
    /// The value of an empty (or absent) cell.
    fn default() -> Self {
        Value::Number(0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64's Display is the shortest decimal that round-trips.
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(t) => f.write_str(t),
            Value::Error(e) => write!(f, "{}", e),
        }
    }
}
