//! Engine-surface errors.
//!
//! Every mutation path is rollback-safe: when one of these is returned, the
//! cell keeps its prior representation and the reference graph is untouched.
//! Evaluation errors are *not* represented here — they travel as
//! [`crate::value::FormulaError`] values.

use thiserror::Error;

use crate::formula::ParseError;
use crate::position::Position;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The position lies outside the grid bounds.
    #[error("invalid position: {0}")]
    InvalidPosition(Position),

    /// The proposed formula text failed to parse.
    #[error("formula error: {0}")]
    Formula(#[from] ParseError),

    /// The proposed edit would close a reference cycle. The message carries
    /// the offending path, e.g. `Find cycle: A3->A1->A2->A3`.
    #[error("Find cycle: {0}")]
    CircularDependency(String),
}
