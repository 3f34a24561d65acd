//! FILENAME: core/engine/src/grid.rs
//! PURPOSE: Manages the collection of cells (The Spreadsheet Grid).
//! CONTEXT: This file defines the `CellStore` trait through which the engine
//! reads and writes cell data, and `Grid`, the default sparse implementation.
//! Hosts that keep cells elsewhere implement `CellStore` themselves.

use std::collections::HashMap;

use cellcalc_parser::{shift_address, Axis, CellKey};

use crate::cell::Cell;

/// Storage seam between the engine and whoever owns the cells.
/// Coordinates are 0-based (col, row).
pub trait CellStore {
    /// Returns the stored cell, or None when the position is empty.
    fn get_cell(&self, col: u32, row: u32) -> Option<&Cell>;

    /// Creates or replaces the cell at a position.
    fn write_cell(&mut self, col: u32, row: u32, cell: Cell);

    /// Removes a cell, returning what was stored.
    fn remove_cell(&mut self, col: u32, row: u32) -> Option<Cell>;

    /// Every occupied position, in no particular order.
    fn positions(&self) -> Vec<CellKey>;

    /// Moves stored cells for a structural edit. Cells inside a deleted
    /// span are dropped; cells at or past `pivot` move by `delta`.
    fn shift(&mut self, axis: Axis, pivot: u32, delta: i64);

    /// Positions of cells that hold a formula.
    fn formula_positions(&self) -> Vec<CellKey> {
        self.positions()
            .into_iter()
            .filter(|key| {
                self.get_cell(key.col, key.row)
                    .map_or(false, |cell| cell.is_formula())
            })
            .collect()
    }
}

/// The Grid struct holds the state of the spreadsheet data.
/// It uses a sparse representation (HashMap) mapping positions to Cells.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    /// Sparse storage: only non-empty cells are stored.
    pub cells: HashMap<CellKey, Cell>,

    /// Tracks the highest row index currently in use.
    pub max_row: u32,

    /// Tracks the highest column index currently in use.
    pub max_col: u32,
}

impl Grid {
    /// Creates a new, empty Grid.
    pub fn new() -> Self {
        Grid::default()
    }

    /// Sets a cell at the specified coordinates.
    /// Updates max_row/max_col boundaries automatically.
    pub fn set_cell(&mut self, col: u32, row: u32, cell: Cell) {
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        self.cells.insert(CellKey::new(col, row), cell);
    }

    /// Removes a cell from the grid (clearing it).
    /// If the cell was at a boundary (max_row or max_col), recalculates bounds.
    pub fn clear_cell(&mut self, col: u32, row: u32) -> Option<Cell> {
        let was_at_boundary = row == self.max_row || col == self.max_col;
        let removed = self.cells.remove(&CellKey::new(col, row));

        if was_at_boundary {
            self.recalculate_bounds();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Recalculates max_row and max_col by scanning all cells.
    /// This is O(n) where n is the number of non-empty cells.
    pub fn recalculate_bounds(&mut self) {
        self.max_row = self.cells.keys().map(|k| k.row).max().unwrap_or(0);
        self.max_col = self.cells.keys().map(|k| k.col).max().unwrap_or(0);
    }
}

impl CellStore for Grid {
    fn get_cell(&self, col: u32, row: u32) -> Option<&Cell> {
        self.cells.get(&CellKey::new(col, row))
    }

    fn write_cell(&mut self, col: u32, row: u32, cell: Cell) {
        self.set_cell(col, row, cell);
    }

    fn remove_cell(&mut self, col: u32, row: u32) -> Option<Cell> {
        self.clear_cell(col, row)
    }

    fn positions(&self) -> Vec<CellKey> {
        self.cells.keys().copied().collect()
    }

    fn shift(&mut self, axis: Axis, pivot: u32, delta: i64) {
        if delta == 0 {
            return;
        }
        // Positions move exactly like relative references do.
        let cells = std::mem::take(&mut self.cells);
        for (key, cell) in cells {
            if let Some(moved) = shift_address(&key.address(), axis, pivot, delta) {
                self.cells.insert(moved.key(), cell);
            }
        }
        self.recalculate_bounds();
    }
}
