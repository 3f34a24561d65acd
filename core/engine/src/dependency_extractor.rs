//! FILENAME: core/engine/src/dependency_extractor.rs
//! PURPOSE: Extracts cell references from parsed AST expressions.
//! CONTEXT: After a formula is parsed into an AST, this module walks the tree
//! to find all cell references. These references are then used to build
//! the dependency graph. Ranges (e.g., A1:B10) are expanded to include
//! all cells within the range, up to a size limit.

use std::collections::HashSet;

use cellcalc_parser::{expand_range, CellKey, Expression, Reference};
use log::warn;

/// References a formula reads, in the order they appear.
pub fn extract_references(expr: &Expression) -> Vec<Reference> {
    expr.references()
}

/// Expands references into the individual cells they cover.
/// A range over `max_range_cells` contributes no cells.
pub fn expand_references(references: &[Reference], max_range_cells: usize) -> HashSet<CellKey> {
    let mut cells = HashSet::new();
    for reference in references {
        match reference {
            Reference::Cell(address) => {
                cells.insert(address.key());
            }
            Reference::Range(range) => {
                if range.cell_count() > max_range_cells as u64 {
                    warn!(
                        "Range {} has {} cells; not tracking it as a dependency",
                        range,
                        range.cell_count()
                    );
                    continue;
                }
                cells.extend(expand_range(range).iter().map(|address| address.key()));
            }
        }
    }
    cells
}

/// Extracts and expands in one step.
pub fn extract_dependencies(expr: &Expression, max_range_cells: usize) -> HashSet<CellKey> {
    expand_references(&extract_references(expr), max_range_cells)
}
