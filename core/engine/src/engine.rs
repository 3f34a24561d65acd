//! FILENAME: core/engine/src/engine.rs
//! PURPOSE: The formula engine. Owns the cell store, the dependency graph
//! and the function registry, and keeps every formula cell consistent as
//! inputs change.
//! CONTEXT: All mutation funnels through `FormulaEngine`. A cell moves between
//! four states, always via `set_cell`:
//! - Literal: no formula, the typed value is stored as-is.
//! - Formula-OK: parsed, dependencies registered, last result stored.
//! - Formula-Error: the text did not parse; `#VALUE!` is stored and the
//!   cell has no dependencies.
//! - Formula-Circular: the cell reaches a cycle; `#CIRC!` is stored.
//!
//! After every edit in automatic mode the transitive dependents of the
//! edited cell are re-evaluated in dependency order (the cascade).

use std::collections::{HashMap, HashSet};

use cellcalc_parser::{parse, Axis, CellKey, Expression};
use log::{debug, info, warn};

use crate::cell::{parse_cell_input, Cell, CellError, CellValue};
use crate::config::{CalculationMode, EngineConfig};
use crate::dependency_extractor::extract_references;
use crate::dependency_graph::DependencyGraph;
use crate::evaluator::Evaluator;
use crate::functions::FunctionRegistry;
use crate::grid::{CellStore, Grid};
use crate::reference_rewrite::shift_formula_references;

/// What a host needs to repaint an edited cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub display_value: String,
    pub is_error: bool,
}

impl CellUpdate {
    fn from_cell(cell: Option<&Cell>) -> Self {
        match cell {
            Some(cell) => CellUpdate {
                display_value: cell.display_value(),
                is_error: cell.error.is_some(),
            },
            None => CellUpdate {
                display_value: String::new(),
                is_error: false,
            },
        }
    }
}

/// Formula calculation engine over a `CellStore` (an in-memory `Grid` by default).
///
/// Not internally synchronized. Multi-threaded hosts wrap the whole engine
/// in one lock held for the duration of each call.
#[derive(Debug)]
pub struct FormulaEngine<S: CellStore = Grid> {
    store: S,
    graph: DependencyGraph,
    registry: FunctionRegistry,
    config: EngineConfig,
    /// Parsed formulas, reused by the cascade instead of re-parsing.
    ast_cache: HashMap<CellKey, Expression>,
}

impl FormulaEngine<Grid> {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_store_and_config(Grid::new(), config)
    }
}

impl Default for FormulaEngine<Grid> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CellStore> FormulaEngine<S> {
    pub fn with_store(store: S) -> Self {
        Self::with_store_and_config(store, EngineConfig::default())
    }

    pub fn with_store_and_config(store: S, config: EngineConfig) -> Self {
        FormulaEngine {
            store,
            graph: DependencyGraph::with_range_limit(config.max_range_cells),
            registry: FunctionRegistry::new(),
            config,
            ast_cache: HashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct access to the cell store. Cells written this way are not
    /// tracked until `initialize_formulas()` or `recalculate_all()` runs.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Lets hosts register their own functions.
    pub fn registry_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn calculation_mode(&self) -> CalculationMode {
        self.config.calculation_mode
    }

    /// Switching to manual defers cascades until `recalculate_all()`.
    pub fn set_calculation_mode(&mut self, mode: CalculationMode) {
        info!("Calculation mode set to {}", mode);
        self.config.calculation_mode = mode;
    }

    /// Sets the mode from a host-supplied name (`"automatic"`, `"auto"`,
    /// `"manual"`). Unknown names select automatic. Returns the mode applied.
    pub fn set_calculation_mode_str(&mut self, mode: &str) -> CalculationMode {
        let mode = CalculationMode::parse_lenient(mode);
        self.set_calculation_mode(mode);
        mode
    }

    // ========================================================================
    // CELL EDITS
    // ========================================================================

    /// Sets a cell from user input. Text starting with `=` is a formula;
    /// anything else is typed as a literal. Blank input clears the cell.
    pub fn set_cell(&mut self, col: u32, row: u32, text: &str) -> CellUpdate {
        let key = CellKey::new(col, row);
        let trimmed = text.trim();

        if trimmed.starts_with('=') {
            self.set_formula(key, trimmed.to_string());
        } else {
            self.set_literal(key, text);
        }

        if self.config.calculation_mode == CalculationMode::Automatic {
            self.recalculate_dependents(key);
        }

        CellUpdate::from_cell(self.store.get_cell(col, row))
    }

    /// Empties a cell; formulas that read it see an empty value.
    pub fn clear_cell(&mut self, col: u32, row: u32) -> CellUpdate {
        self.set_cell(col, row, "")
    }

    pub fn get_cell(&self, col: u32, row: u32) -> Option<&Cell> {
        self.store.get_cell(col, row)
    }

    /// The stored value, or `Empty` for an unset cell.
    pub fn get_value(&self, col: u32, row: u32) -> CellValue {
        self.store
            .get_cell(col, row)
            .map(|cell| cell.value.clone())
            .unwrap_or_default()
    }

    /// The text a user would edit: the formula if the cell has one, else the
    /// raw value. An unset cell gives an empty string.
    pub fn get_formula(&self, col: u32, row: u32) -> String {
        self.store
            .get_cell(col, row)
            .map(Cell::input_text)
            .unwrap_or_default()
    }

    fn set_literal(&mut self, key: CellKey, text: &str) {
        self.graph.remove_dependencies(key);
        self.ast_cache.remove(&key);

        let cell = parse_cell_input(text);
        if cell.value.is_empty() {
            self.store.remove_cell(key.col, key.row);
            debug!("{} cleared", key.address());
        } else {
            debug!("{} set to literal {}", key.address(), cell.display_value());
            self.store.write_cell(key.col, key.row, cell);
        }
    }

    fn set_formula(&mut self, key: CellKey, formula: String) {
        let parsed = parse(&formula);
        let mut cell = Cell::new_formula(formula);

        let ast = match parsed {
            Ok(ast) => ast,
            Err(e) => {
                // A formula that does not parse reads nothing
                debug!("{} has a syntax error: {}", key.address(), e);
                self.graph.remove_dependencies(key);
                self.ast_cache.remove(&key);
                cell.set_result(CellValue::Error(CellError::Value));
                self.store.write_cell(key.col, key.row, cell);
                return;
            }
        };

        self.graph.set_dependencies(key, &extract_references(&ast));

        if self.graph.has_circular_reference(key) {
            warn!("Circular reference involving {}", key.address());
            cell.set_result(CellValue::Error(CellError::Circular));
        } else {
            let value = self.evaluate_ast(&ast);
            debug!("{} = {}", key.address(), value.display());
            cell.set_result(value);
        }

        self.store.write_cell(key.col, key.row, cell);
        self.ast_cache.insert(key, ast);
    }

    // ========================================================================
    // RECALCULATION
    // ========================================================================

    fn evaluate_ast(&self, ast: &Expression) -> CellValue {
        Evaluator::new(&self.store, &self.registry)
            .with_range_limit(self.config.max_range_cells)
            .evaluate(ast)
            .to_cell_value()
    }

    /// Re-evaluates one formula cell from its cached AST (parsing the stored
    /// text on a cache miss).
    fn evaluate_cell(&mut self, key: CellKey) {
        let Some(formula) = self
            .store
            .get_cell(key.col, key.row)
            .and_then(|cell| cell.formula.clone())
        else {
            return;
        };

        let value = match self.ast_cache.get(&key) {
            Some(ast) => self.evaluate_ast(ast),
            None => match parse(&formula) {
                Ok(ast) => {
                    let value = self.evaluate_ast(&ast);
                    self.ast_cache.insert(key, ast);
                    value
                }
                Err(_) => CellValue::Error(CellError::Value),
            },
        };

        self.store_result(key, value);
    }

    fn store_result(&mut self, key: CellKey, value: CellValue) {
        let Some(mut cell) = self.store.get_cell(key.col, key.row).cloned() else {
            return;
        };
        if !cell.is_formula() {
            return;
        }
        cell.set_result(value);
        self.store.write_cell(key.col, key.row, cell);
    }

    /// The cascade: re-evaluates everything downstream of `key`, upstream
    /// cells first. If the affected cells reach a cycle, they all become `#CIRC!`.
    fn recalculate_dependents(&mut self, key: CellKey) {
        let dependents = self.graph.get_dependents(key);
        if dependents.is_empty() {
            return;
        }

        match self.graph.get_calculation_order(&dependents) {
            Ok(order) => {
                debug!("Cascade from {}: {} cells", key.address(), order.len());
                for cell in order {
                    self.evaluate_cell(cell);
                }
            }
            Err(_) => {
                for cell in dependents {
                    self.store_result(cell, CellValue::Error(CellError::Circular));
                }
            }
        }
    }

    /// Re-evaluates every formula cell in one global dependency order.
    /// If the sheet contains any cycle, every formula cell becomes `#CIRC!`.
    pub fn recalculate_all(&mut self) {
        let formulas: HashSet<CellKey> = self.store.formula_positions().into_iter().collect();
        info!("Recalculating {} formula cells", formulas.len());

        match self.graph.get_calculation_order(&formulas) {
            Ok(order) => {
                for cell in order {
                    self.evaluate_cell(cell);
                }
            }
            Err(_) => {
                for cell in formulas {
                    self.store_result(cell, CellValue::Error(CellError::Circular));
                }
            }
        }
    }

    /// Bulk load: registers every formula already in the store, then
    /// evaluates them all. Forward references resolve because evaluation
    /// only starts once every dependency is known. Text values starting
    /// with `=` are promoted to formulas.
    pub fn initialize_formulas(&mut self) {
        self.graph.clear();
        self.ast_cache.clear();

        let mut positions = self.store.positions();
        positions.sort_unstable();

        let mut count = 0usize;
        for key in positions {
            let Some(mut cell) = self.store.get_cell(key.col, key.row).cloned() else {
                continue;
            };

            let formula = match (&cell.formula, &cell.value) {
                (Some(formula), _) => formula.clone(),
                (None, CellValue::Text(text)) if text.trim_start().starts_with('=') => {
                    let formula = text.trim().to_string();
                    cell = Cell::new_formula(formula.clone());
                    self.store.write_cell(key.col, key.row, cell);
                    formula
                }
                _ => continue,
            };

            if let Ok(ast) = parse(&formula) {
                self.graph.set_dependencies(key, &extract_references(&ast));
                self.ast_cache.insert(key, ast);
            }
            count += 1;
        }

        info!("Initialized {} formulas", count);
        self.recalculate_all();
    }

    // ========================================================================
    // STRUCTURAL EDITS
    // ========================================================================

    /// Applies a row/column insert (`delta > 0`) or delete (`delta < 0`) at
    /// `position` to the graph and to every formula's text, then recalculates
    /// the whole sheet.
    ///
    /// The cells themselves must already be at their new positions; the
    /// `insert_*` / `delete_*` helpers do that first.
    pub fn update_references(&mut self, axis: Axis, position: u32, delta: i64) {
        if delta == 0 {
            return;
        }
        info!("Updating references: {:?} {} by {}", axis, position, delta);

        self.graph.update_references(axis, position, delta);
        self.ast_cache.clear();

        let mut formulas = self.store.formula_positions();
        formulas.sort_unstable();

        for key in formulas {
            let Some(mut cell) = self.store.get_cell(key.col, key.row).cloned() else {
                continue;
            };
            let Some(formula) = cell.formula.as_deref() else {
                continue;
            };

            let rewritten = shift_formula_references(formula, axis, position, delta);
            if rewritten != formula {
                debug!("{}: {} -> {}", key.address(), formula, rewritten);
            }

            match parse(&rewritten) {
                Ok(ast) => {
                    self.graph.set_dependencies(key, &extract_references(&ast));
                    self.ast_cache.insert(key, ast);
                }
                Err(_) => self.graph.remove_dependencies(key),
            }

            cell.formula = Some(rewritten);
            self.store.write_cell(key.col, key.row, cell);
        }

        self.recalculate_all();
    }

    /// Inserts `count` rows before row index `at`.
    pub fn insert_rows(&mut self, at: u32, count: u32) {
        self.shift(Axis::Row, at, i64::from(count));
    }

    /// Deletes `count` rows starting at row index `at`.
    pub fn delete_rows(&mut self, at: u32, count: u32) {
        self.shift(Axis::Row, at, -i64::from(count));
    }

    /// Inserts `count` columns before column index `at`.
    pub fn insert_columns(&mut self, at: u32, count: u32) {
        self.shift(Axis::Col, at, i64::from(count));
    }

    /// Deletes `count` columns starting at column index `at`.
    pub fn delete_columns(&mut self, at: u32, count: u32) {
        self.shift(Axis::Col, at, -i64::from(count));
    }

    fn shift(&mut self, axis: Axis, at: u32, delta: i64) {
        if delta == 0 {
            return;
        }
        self.store.shift(axis, at, delta);
        self.update_references(axis, at, delta);
    }

    // ========================================================================
    // AUDITING
    // ========================================================================

    /// Cells the formula at (col, row) reads directly, sorted.
    pub fn trace_precedents(&self, col: u32, row: u32) -> Vec<CellKey> {
        let mut cells: Vec<CellKey> = self
            .graph
            .get_precedents(CellKey::new(col, row))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        cells.sort_unstable();
        cells
    }

    /// Formula cells that read (col, row) directly, sorted.
    pub fn trace_dependents(&self, col: u32, row: u32) -> Vec<CellKey> {
        let mut cells: Vec<CellKey> = self
            .graph
            .get_direct_dependents(CellKey::new(col, row))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        cells.sort_unstable();
        cells
    }
}
