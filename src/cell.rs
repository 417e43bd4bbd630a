//! The per-cell state machine: empty, literal text, or formula.

use std::cell::RefCell;

use rustc_hash::FxHashSet;

use crate::formula::{Formula, ParseError, ValueSource};
use crate::position::Position;
use crate::value::Value;

/// A literal starting with this sign displays in full but values as the rest.
pub const ESCAPE_SIGN: char = '\'';
/// Text starting with this sign (and longer than it) is parsed as a formula.
pub const FORMULA_SIGN: char = '=';

/// One of the three cell representations.
///
/// The cache on the formula variant is interior-mutable so evaluation can
/// memoize through the shared borrows the sheet hands out.
#[derive(Debug)]
pub(crate) enum Repr {
    Empty,
    Literal(String),
    Formula {
        formula: Formula,
        cache: RefCell<Option<Value>>,
    },
}

impl Repr {
    /// Build the candidate representation for `text` without touching any
    /// existing state. A parse failure aborts the edit here.
    pub(crate) fn build(text: &str) -> Result<Self, ParseError> {
        if text.is_empty() {
            return Ok(Repr::Empty);
        }
        match text.strip_prefix(FORMULA_SIGN) {
            Some(body) if !body.is_empty() => {
                let formula = Formula::parse(body)?;
                Ok(Repr::Formula {
                    formula,
                    cache: RefCell::new(None),
                })
            }
            // A bare "=" is a literal.
            _ => Ok(Repr::Literal(text.to_string())),
        }
    }

    pub(crate) fn referenced_cells(&self) -> &[Position] {
        match self {
            Repr::Formula { formula, .. } => formula.referenced_cells(),
            Repr::Empty | Repr::Literal(_) => &[],
        }
    }
}

/// A single grid entry, owned by the sheet.
///
/// The reverse-reference set is a relation maintained by the sheet across
/// every edit: it names the formula cells whose formulas currently read this
/// cell. It survives representation changes untouched.
#[derive(Debug)]
pub struct Cell {
    pos: Position,
    repr: Repr,
    reverse_refs: FxHashSet<Position>,
}

impl Cell {
    pub(crate) fn new(pos: Position) -> Self {
        Self {
            pos,
            repr: Repr::Empty,
            reverse_refs: FxHashSet::default(),
        }
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    /// The cell's textual form: `""` for empty, the stored text for literals,
    /// `"=" + canonical expression` for formulas.
    pub fn text(&self) -> String {
        match &self.repr {
            Repr::Empty => String::new(),
            Repr::Literal(text) => text.clone(),
            Repr::Formula { formula, .. } => format!("{}{}", FORMULA_SIGN, formula.expression_text()),
        }
    }

    /// The cell's current value, evaluating and caching for formulas.
    pub fn value(&self, source: &dyn ValueSource) -> Value {
        match &self.repr {
            Repr::Empty => Value::default(),
            Repr::Literal(text) => match text.strip_prefix(ESCAPE_SIGN) {
                Some(rest) => Value::Text(rest.to_string()),
                None => Value::Text(text.clone()),
            },
            Repr::Formula { formula, cache } => {
                if let Some(value) = cache.borrow().as_ref() {
                    return value.clone();
                }
                // Not borrowed across the evaluation: referents may recurse
                // back through the sheet into their own caches.
                let value = formula.evaluate(source);
                *cache.borrow_mut() = Some(value.clone());
                value
            }
        }
    }

    /// Forward references of the current representation. Empty for
    /// non-formula cells.
    pub fn referenced_cells(&self) -> &[Position] {
        self.repr.referenced_cells()
    }

    /// True if some formula cell currently reads this cell.
    pub fn is_referenced(&self) -> bool {
        !self.reverse_refs.is_empty()
    }

    /// The formula cells that read this cell.
    pub fn dependents(&self) -> impl Iterator<Item = Position> + '_ {
        self.reverse_refs.iter().copied()
    }

    /// The memoized value, if any. `None` for non-formula cells and for
    /// formula cells that have been invalidated and not yet re-read.
    pub fn cached_value(&self) -> Option<Value> {
        match &self.repr {
            Repr::Formula { cache, .. } => cache.borrow().clone(),
            Repr::Empty | Repr::Literal(_) => None,
        }
    }

    /// Swap in a new representation. The reverse-reference set is sheet-owned
    /// bookkeeping and is deliberately left alone.
    pub(crate) fn install(&mut self, repr: Repr) {
        self.repr = repr;
    }

    /// Drop the memoized value. No-op for non-formula cells.
    pub(crate) fn invalidate(&self) {
        if let Repr::Formula { cache, .. } = &self.repr {
            cache.borrow_mut().take();
        }
    }

    pub(crate) fn add_dependent(&mut self, pos: Position) {
        self.reverse_refs.insert(pos);
    }

    pub(crate) fn remove_dependent(&mut self, pos: Position) {
        self.reverse_refs.remove(&pos);
    }
}
