// Formula parsing and evaluation.

pub mod parser;

pub(crate) mod eval;

use crate::position::Position;
use crate::value::Value;

pub use parser::ParseError;

/// A parsed formula: the expression plus its precomputed reference list.
#[derive(Debug, Clone)]
pub struct Formula {
    expr: parser::Expr,
    refs: Vec<Position>,
}

impl Formula {
    /// Parse an expression string (without the leading `=`).
    ///
    /// On failure nothing is constructed, so callers can treat a parse error
    /// as a rejected edit with no state to roll back.
    pub fn parse(expression: &str) -> Result<Self, ParseError> {
        let expr = parser::parse(expression)?;
        let mut refs = Vec::new();
        eval::collect_refs(&expr, &mut refs);
        refs.sort();
        refs.dedup();
        Ok(Self { expr, refs })
    }

    /// Evaluate against a sheet view. Evaluation errors come back as
    /// [`Value::Error`], never as a Rust error.
    pub fn evaluate(&self, source: &dyn ValueSource) -> Value {
        match eval::evaluate(&self.expr, source) {
            Ok(n) => Value::Number(n),
            Err(e) => Value::Error(e),
        }
    }

    /// Canonical expression text (no `=` prefix, no whitespace, minimal
    /// parentheses, uppercase references).
    pub fn expression_text(&self) -> String {
        let mut out = String::new();
        eval::write_expr(&self.expr, &mut out);
        out
    }

    /// The cells this formula reads, ascending and deduplicated.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.refs
    }
}

/// Read-only view of a sheet, sufficient for evaluation.
///
/// Absent cells must report the empty-cell value (`Number(0.0)`).
pub trait ValueSource {
    fn value_at(&self, pos: Position) -> Value;
}
