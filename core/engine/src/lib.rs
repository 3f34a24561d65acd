//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the formula calculation engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.
//! Most hosts only need `FormulaEngine`; the lower layers (evaluator,
//! dependency graph, function registry) are public for hosts that drive
//! recalculation themselves.

pub mod cell;
pub mod config;
pub mod dependency_extractor;
pub mod dependency_graph;
pub mod engine;
pub mod evaluator;
pub mod functions;
pub mod grid;
pub mod reference_rewrite;

// Re-export commonly used types at the crate root
pub use cell::{format_number, parse_cell_input, Cell, CellError, CellValue};
pub use config::{CalculationMode, EngineConfig, DEFAULT_MAX_RANGE_CELLS};
pub use dependency_extractor::{expand_references, extract_dependencies, extract_references};
pub use dependency_graph::{CycleError, DependencyGraph};
pub use engine::{CellUpdate, FormulaEngine};
pub use evaluator::{CellAccessor, EvalResult, Evaluator};
pub use functions::{FunctionDef, FunctionRegistry, NativeFunction};
pub use grid::{CellStore, Grid};
pub use reference_rewrite::shift_formula_references;

pub use cellcalc_parser::{
    column_to_letters, expand_range, format_address, format_range, parse, parse_address,
    parse_range, shift_address, shift_range, toggle_absolute, Axis, CellAddress, CellKey,
    CellRange, Expression, ParseError, Reference,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_creates_cells() {
        let cell = Cell::new_number(42.0);
        assert_eq!(cell.value, CellValue::Number(42.0));
    }

    #[test]
    fn it_manages_grid() {
        let mut grid = Grid::new();
        grid.set_cell(0, 0, Cell::new_text("Hello".to_string()));

        let retrieved = grid.get_cell(0, 0);
        assert!(retrieved.is_some());
        if let Some(c) = retrieved {
            assert_eq!(c.value, CellValue::Text("Hello".to_string()));
        }
    }

    #[test]
    fn integration_test_dependency_workflow() {
        let registry = FunctionRegistry::new();
        let mut graph = DependencyGraph::new();
        let mut grid = Grid::new();

        // A1 = 10, A2 = 20, A3 = A1 + A2
        grid.set_cell(0, 0, Cell::new_number(10.0));
        grid.set_cell(0, 1, Cell::new_number(20.0));
        let a3 = parse("=A1+A2").unwrap();
        graph.set_dependencies(CellKey::new(0, 2), &extract_references(&a3));

        let result = Evaluator::new(&grid, &registry).evaluate(&a3);
        assert_eq!(result, EvalResult::Number(30.0));

        // Changing A1 requires recalculating A3
        let dirty = graph.get_dependents(CellKey::new(0, 0));
        let order = graph.get_calculation_order(&dirty).unwrap();
        assert_eq!(order, vec![CellKey::new(0, 2)]);

        grid.set_cell(0, 0, Cell::new_number(5.0));
        let result = Evaluator::new(&grid, &registry).evaluate(&a3);
        assert_eq!(result, EvalResult::Number(25.0));
    }
}
