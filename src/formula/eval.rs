// Formula evaluation, canonical printing, and reference extraction.

use crate::position::Position;
use crate::value::{FormulaError, Value};

use super::parser::{Expr, Op, UnaryOp};
use super::ValueSource;

/// Evaluate an expression to a number.
///
/// Errors propagate outward; callers fold them back into [`Value::Error`].
pub(crate) fn evaluate(expr: &Expr, source: &dyn ValueSource) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(*n),

        Expr::CellRef(pos) => referent_number(source.value_at(*pos)),

        Expr::UnaryOp { op, operand } => {
            let value = evaluate(operand, source)?;
            Ok(match op {
                UnaryOp::Plus => value,
                UnaryOp::Minus => -value,
            })
        }

        Expr::BinaryOp { op, left, right } => {
            let lhs = evaluate(left, source)?;
            let rhs = evaluate(right, source)?;
            let result = match op {
                Op::Add => lhs + rhs,
                Op::Sub => lhs - rhs,
                Op::Mul => lhs * rhs,
                Op::Div => {
                    if rhs == 0.0 {
                        return Err(FormulaError::Div0);
                    }
                    lhs / rhs
                }
            };
            if result.is_finite() {
                Ok(result)
            } else {
                Err(FormulaError::Num)
            }
        }
    }
}

/// Coerce a referent's value to a number.
///
/// Empty text counts as zero; other text must parse fully as f64; errors
/// stored in the referent propagate unchanged.
fn referent_number(value: Value) -> Result<f64, FormulaError> {
    match value {
        Value::Number(n) => Ok(n),
        Value::Text(t) => {
            if t.is_empty() {
                Ok(0.0)
            } else {
                t.parse().map_err(|_| FormulaError::Value)
            }
        }
        Value::Error(e) => Err(e),
    }
}

/// Append every cell reference in the expression to `out` (unordered, dups kept).
pub(crate) fn collect_refs(expr: &Expr, out: &mut Vec<Position>) {
    match expr {
        Expr::Number(_) => {}
        Expr::CellRef(pos) => out.push(*pos),
        Expr::UnaryOp { operand, .. } => collect_refs(operand, out),
        Expr::BinaryOp { left, right, .. } => {
            collect_refs(left, out);
            collect_refs(right, out);
        }
    }
}

// Precedence levels for printing: atoms bind tightest, +/- loosest.
const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_UNARY: u8 = 3;
const PREC_ATOM: u8 = 4;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Number(_) | Expr::CellRef(_) => PREC_ATOM,
        Expr::UnaryOp { .. } => PREC_UNARY,
        Expr::BinaryOp { op: Op::Mul | Op::Div, .. } => PREC_MUL,
        Expr::BinaryOp { op: Op::Add | Op::Sub, .. } => PREC_ADD,
    }
}

/// Write the canonical text of an expression: no whitespace, parentheses only
/// where the grouping differs from what precedence alone would give.
///
/// Reparsing the output reproduces the same AST, so the text is stable under
/// parse/print round-trips.
pub(crate) fn write_expr(expr: &Expr, out: &mut String) {
    match expr {
        Expr::Number(n) => out.push_str(&n.to_string()),
        Expr::CellRef(pos) => out.push_str(&pos.to_string()),

        Expr::UnaryOp { op, operand } => {
            out.push(match op {
                UnaryOp::Plus => '+',
                UnaryOp::Minus => '-',
            });
            write_child(operand, precedence(operand) < PREC_UNARY, out);
        }

        Expr::BinaryOp { op, left, right } => {
            let prec = match op {
                Op::Add | Op::Sub => PREC_ADD,
                Op::Mul | Op::Div => PREC_MUL,
            };
            write_child(left, precedence(left) < prec, out);
            out.push(match op {
                Op::Add => '+',
                Op::Sub => '-',
                Op::Mul => '*',
                Op::Div => '/',
            });
            // Equal precedence on the right needs parens to keep grouping:
            // 1-(2-3) must not print as 1-2-3.
            write_child(right, precedence(right) <= prec, out);
        }
    }
}

fn write_child(expr: &Expr, parens: bool, out: &mut String) {
    if parens {
        out.push('(');
        write_expr(expr, out);
        out.push(')');
    } else {
        write_expr(expr, out);
    }
}
