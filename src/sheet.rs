//! The sheet: a sparse map of owned cells plus printable-size counters.
//!
//! All edits flow through the sheet, which keeps four things in lockstep:
//! the cell representations, the bidirectional reference relation, the value
//! caches, and the row/column occupancy counters. Failed edits (parse errors,
//! cycles) leave everything observable untouched.

use std::io;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell::{Cell, Repr};
use crate::cycle;
use crate::error::EngineError;
use crate::formula::ValueSource;
use crate::position::{Position, Size};
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Sheet {
    cells: FxHashMap<Position, Cell>,
    /// Occupancy per row/column; no trailing zeros. The vector lengths are
    /// the printable size.
    counter_in_row: Vec<u32>,
    counter_in_col: Vec<u32>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of the cell at `pos`, creating it if absent.
    ///
    /// Setting the same text twice is a no-op (the second call does not
    /// reparse or invalidate anything). Parse failures and would-be cycles
    /// reject the edit with the cell's prior contents intact; the cell may
    /// remain materialized as Empty if this call created it.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), EngineError> {
        self.check_pos(pos)?;
        if !self.cells.contains_key(&pos) {
            self.cells.insert(pos, Cell::new(pos));
            self.update_size(pos, 1);
        }
        self.write_cell(pos, text)
    }

    /// Read handle for the cell at `pos`, or `None` if it was never
    /// materialized.
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>, EngineError> {
        self.check_pos(pos)?;
        Ok(self.cells.get(&pos))
    }

    /// The cell's current value; absent cells read as `Number(0.0)`.
    pub fn get_value(&self, pos: Position) -> Result<Value, EngineError> {
        self.check_pos(pos)?;
        Ok(self.value_at(pos))
    }

    /// The cell's textual form; absent cells read as `""`.
    pub fn get_text(&self, pos: Position) -> Result<String, EngineError> {
        self.check_pos(pos)?;
        Ok(self.cells.get(&pos).map(Cell::text).unwrap_or_default())
    }

    /// Empty the cell at `pos`, and remove it from the map unless another
    /// formula still references it (those referents must stay materialized).
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), EngineError> {
        self.check_pos(pos)?;
        if !self.cells.contains_key(&pos) {
            return Ok(());
        }
        self.write_cell(pos, "")?;

        let referenced = self.cells.get(&pos).map_or(false, Cell::is_referenced);
        if !referenced {
            self.cells.remove(&pos);
            self.update_size(pos, -1);
            log::debug!("removed cell {}", pos);
        }
        Ok(())
    }

    /// The tight bounding box covering every materialized cell.
    pub fn printable_size(&self) -> Size {
        Size::new(self.counter_in_row.len(), self.counter_in_col.len())
    }

    /// Write the printable region's values, tab-separated, one row per line.
    pub fn print_values<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |cell| cell.value(self).to_string())
    }

    /// Write the printable region's texts, tab-separated, one row per line.
    pub fn print_texts<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, Cell::text)
    }

    /// Iterate over every materialized cell.
    pub fn cells(&self) -> impl Iterator<Item = (Position, &Cell)> {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    fn check_pos(&self, pos: Position) -> Result<(), EngineError> {
        if pos.is_valid() {
            Ok(())
        } else {
            Err(EngineError::InvalidPosition(pos))
        }
    }

    /// The transactional edit: validate the candidate, then commit, rewire
    /// back-edges, and invalidate — in that order, so the reference relation
    /// is consistent by the time invalidation walks it.
    fn write_cell(&mut self, pos: Position, text: &str) -> Result<(), EngineError> {
        let cell = &self.cells[&pos];
        if cell.text() == text {
            return Ok(());
        }
        let old_refs: Vec<Position> = cell.referenced_cells().to_vec();

        // Candidate construction; a parse failure mutates nothing.
        let repr = Repr::build(text)?;

        // Cycle check against the candidate's edges; everything else reads
        // the graph as it stands.
        let candidate_refs = repr.referenced_cells();
        if !candidate_refs.is_empty() {
            let found = cycle::find_cycle(pos, candidate_refs, |p| match self.cells.get(&p) {
                Some(c) => c.referenced_cells(),
                None => &[],
            });
            if let Some(path) = found {
                log::debug!("rejected edit at {}: cycle {}", pos, path);
                return Err(EngineError::CircularDependency(path));
            }
        }

        // Commit.
        let cell = self
            .cells
            .get_mut(&pos)
            .expect("pos materialized by caller");
        cell.install(repr);
        let new_refs: Vec<Position> = cell.referenced_cells().to_vec();

        // Unhook the old forward references, then hook the new ones,
        // materializing referents that do not exist yet.
        for referent in old_refs {
            if let Some(cell) = self.cells.get_mut(&referent) {
                cell.remove_dependent(pos);
            }
        }
        for referent in &new_refs {
            if !self.cells.contains_key(referent) {
                self.cells.insert(*referent, Cell::new(*referent));
                self.update_size(*referent, 1);
            }
            if let Some(cell) = self.cells.get_mut(referent) {
                cell.add_dependent(pos);
            }
        }

        self.invalidate_from(pos);
        log::debug!("set {} ({} refs)", pos, new_refs.len());
        Ok(())
    }

    /// Drop the cache of `start` and of everything transitively depending on
    /// it, walking the reverse references with a visited set.
    fn invalidate_from(&self, start: Position) {
        let mut seen = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(pos) = stack.pop() {
            if !seen.insert(pos) {
                continue;
            }
            if let Some(cell) = self.cells.get(&pos) {
                cell.invalidate();
                stack.extend(cell.dependents());
            }
        }
        log::trace!("invalidated {} cells from {}", seen.len(), start);
    }

    /// Apply an occupancy delta at `pos`, growing the counter vectors as
    /// needed and re-trimming trailing zeros after removals.
    fn update_size(&mut self, pos: Position, delta: i32) {
        if pos.row >= self.counter_in_row.len() {
            self.counter_in_row.resize(pos.row + 1, 0);
        }
        if pos.col >= self.counter_in_col.len() {
            self.counter_in_col.resize(pos.col + 1, 0);
        }
        self.counter_in_row[pos.row] = self.counter_in_row[pos.row].saturating_add_signed(delta);
        self.counter_in_col[pos.col] = self.counter_in_col[pos.col].saturating_add_signed(delta);

        if delta < 0 {
            while self.counter_in_row.last() == Some(&0) {
                self.counter_in_row.pop();
            }
            while self.counter_in_col.last() == Some(&0) {
                self.counter_in_col.pop();
            }
        }
    }

    fn print_with<W: io::Write>(
        &self,
        out: &mut W,
        render: impl Fn(&Cell) -> String,
    ) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    out.write_all(b"\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    out.write_all(render(cell).as_bytes())?;
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Check every structural invariant. Panics on violation.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        // Forward references exist and are mirrored by reverse references.
        for (pos, cell) in &self.cells {
            for referent in cell.referenced_cells() {
                let target = self
                    .cells
                    .get(referent)
                    .unwrap_or_else(|| panic!("{} references unmaterialized {}", pos, referent));
                assert!(
                    target.dependents().any(|d| d == *pos),
                    "missing back-edge: {} should list {} as dependent",
                    referent,
                    pos
                );
            }
        }

        // Reverse references are mirrored by forward references.
        for (pos, cell) in &self.cells {
            for dependent in cell.dependents() {
                let source = self
                    .cells
                    .get(&dependent)
                    .unwrap_or_else(|| panic!("dangling dependent {} on {}", dependent, pos));
                assert!(
                    source.referenced_cells().contains(pos),
                    "stale back-edge: {} lists {} but it does not reference it",
                    pos,
                    dependent
                );
            }
        }

        // No cell reaches itself through forward references.
        for (pos, cell) in &self.cells {
            let found = cycle::find_cycle(*pos, cell.referenced_cells(), |p| {
                match self.cells.get(&p) {
                    Some(c) => c.referenced_cells(),
                    None => &[],
                }
            });
            assert!(found.is_none(), "cycle in committed graph: {:?}", found);
        }

        // Counters match occupancy exactly, with no trailing zeros.
        let mut rows = vec![0u32; self.counter_in_row.len()];
        let mut cols = vec![0u32; self.counter_in_col.len()];
        for pos in self.cells.keys() {
            rows[pos.row] += 1;
            cols[pos.col] += 1;
        }
        assert_eq!(rows, self.counter_in_row, "row counters out of sync");
        assert_eq!(cols, self.counter_in_col, "column counters out of sync");
        assert_ne!(self.counter_in_row.last(), Some(&0), "trailing zero row");
        assert_ne!(self.counter_in_col.last(), Some(&0), "trailing zero column");
    }
}

impl ValueSource for Sheet {
    fn value_at(&self, pos: Position) -> Value {
        self.cells
            .get(&pos)
            .map(|cell| cell.value(self))
            .unwrap_or_default()
    }
}
