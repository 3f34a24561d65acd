//! FILENAME: core/engine/src/dependency_graph.rs
//! PURPOSE: Implements the directed graph that tracks cell dependencies.
//! CONTEXT: This module is the heart of the recalculation engine.
//! It tracks which cells depend on which other cells (precedents/dependents),
//! detects circular references, and computes the correct evaluation order
//! using a depth-first topological sort.
//!
//! TERMINOLOGY:
//! - Precedents: Cells that a formula cell references (its inputs).
//!   If A3 = A1 + A2, then A1 and A2 are precedents of A3.
//! - Dependents: Cells that reference a given cell (reverse lookup).
//!   If A3 = A1 + A2, then A3 is a dependent of A1 and A2.
//!
//! USAGE:
//! 1. When a cell's formula is set/changed, call `set_dependencies()` with the
//!    references extracted from its AST.
//! 2. When a cell value changes, collect `get_dependents()` and pass them to
//!    `get_calculation_order()` to get the order to re-evaluate them in.
//! 3. Rows/columns inserted or deleted: call `update_references()`.

use std::collections::{HashMap, HashSet, VecDeque};

use cellcalc_parser::{shift_address, Axis, CellKey, Reference};
use log::warn;
use thiserror::Error;

use crate::config::DEFAULT_MAX_RANGE_CELLS;
use crate::dependency_extractor::expand_references;

/// Returned when an ordering is requested over a graph that contains a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circular reference detected at {}: {}", .cell.address(), format_path(.cycle_path))]
pub struct CycleError {
    /// The cell that was reached a second time while still being visited.
    pub cell: CellKey,
    /// The cells on the cycle, following precedent edges, starting and
    /// ending with `cell`.
    pub cycle_path: Vec<CellKey>,
}

fn format_path(path: &[CellKey]) -> String {
    path.iter()
        .map(|key| key.address().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Done,
}

enum Frame {
    Enter(CellKey),
    Exit(CellKey),
}

/// The Dependency Graph tracks relationships between cells.
/// It maintains both forward (dependencies) and reverse (dependents) mappings
/// for efficient lookups in either direction. Every mutation updates both.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// For each formula cell, the cells it reads.
    /// If A3 = A1 + A2, then dependencies[A3] = {A1, A2}.
    dependencies: HashMap<CellKey, HashSet<CellKey>>,

    /// For each cell, the formula cells that read it.
    /// If A3 = A1 + A2, then dependents[A1] contains A3.
    dependents: HashMap<CellKey, HashSet<CellKey>>,

    /// Ranges covering more cells than this get no edges.
    max_range_cells: usize,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    /// Creates a new, empty dependency graph.
    pub fn new() -> Self {
        Self::with_range_limit(DEFAULT_MAX_RANGE_CELLS)
    }

    pub fn with_range_limit(max_range_cells: usize) -> Self {
        DependencyGraph {
            dependencies: HashMap::new(),
            dependents: HashMap::new(),
            max_range_cells,
        }
    }

    pub fn max_range_cells(&self) -> usize {
        self.max_range_cells
    }

    /// Replaces the dependencies of `cell` with the cells its references cover.
    /// Ranges are expanded; a range over the size limit contributes nothing.
    ///
    /// # Note
    /// This does NOT check for cycles. Use `has_circular_reference()` after.
    pub fn set_dependencies(&mut self, cell: CellKey, references: &[Reference]) {
        let precedents = expand_references(references, self.max_range_cells);
        self.set_precedents(cell, precedents);
    }

    /// Replaces the dependencies of `cell` with an already expanded set.
    pub fn set_precedents(&mut self, cell: CellKey, precedents: HashSet<CellKey>) {
        self.remove_dependencies(cell);

        for precedent in &precedents {
            self.dependents.entry(*precedent).or_default().insert(cell);
        }

        if !precedents.is_empty() {
            self.dependencies.insert(cell, precedents);
        }
    }

    /// Removes every edge out of `cell`. Edges into it (other formulas that
    /// read `cell`) are kept.
    pub fn remove_dependencies(&mut self, cell: CellKey) {
        let Some(old) = self.dependencies.remove(&cell) else {
            return;
        };

        for precedent in old {
            if let Some(deps) = self.dependents.get_mut(&precedent) {
                deps.remove(&cell);
                if deps.is_empty() {
                    self.dependents.remove(&precedent);
                }
            }
        }
    }

    /// Cells that `cell` reads directly.
    pub fn get_precedents(&self, cell: CellKey) -> Option<&HashSet<CellKey>> {
        self.dependencies.get(&cell)
    }

    /// Formula cells that read `cell` directly.
    pub fn get_direct_dependents(&self, cell: CellKey) -> Option<&HashSet<CellKey>> {
        self.dependents.get(&cell)
    }

    /// Every cell that transitively depends on `cell`. Includes `cell`
    /// itself only when it sits on a cycle.
    pub fn get_dependents(&self, cell: CellKey) -> HashSet<CellKey> {
        let mut result = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(cell);

        while let Some(current) = queue.pop_front() {
            if let Some(deps) = self.dependents.get(&current) {
                for dep in deps {
                    if result.insert(*dep) {
                        queue.push_back(*dep);
                    }
                }
            }
        }

        result
    }

    /// True if a depth-first walk over the precedents of `cell` finds a
    /// back edge, i.e. the cell can reach a cycle (usually one through itself).
    pub fn has_circular_reference(&self, cell: CellKey) -> bool {
        let mut state = HashMap::new();
        let mut order = Vec::new();
        self.visit(cell, &HashSet::new(), &mut state, &mut order)
            .is_err()
    }

    /// Orders `cells` so every cell comes after the cells it reads.
    ///
    /// The walk follows precedent edges through the whole graph, including
    /// cells outside `cells`, but only members are emitted. Starting points
    /// are taken in sorted order so the result is deterministic.
    pub fn get_calculation_order(
        &self,
        cells: &HashSet<CellKey>,
    ) -> Result<Vec<CellKey>, CycleError> {
        let mut starts: Vec<CellKey> = cells.iter().copied().collect();
        starts.sort_unstable();

        let mut state = HashMap::new();
        let mut order = Vec::with_capacity(cells.len());

        for start in starts {
            if state.contains_key(&start) {
                continue;
            }
            if let Err(e) = self.visit(start, cells, &mut state, &mut order) {
                warn!("{}", e);
                return Err(e);
            }
        }

        Ok(order)
    }

    /// Iterative post-order DFS over precedent edges from `start`.
    fn visit(
        &self,
        start: CellKey,
        members: &HashSet<CellKey>,
        state: &mut HashMap<CellKey, VisitState>,
        order: &mut Vec<CellKey>,
    ) -> Result<(), CycleError> {
        let mut stack = vec![Frame::Enter(start)];
        let mut path: Vec<CellKey> = Vec::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(cell) => {
                    match state.get(&cell) {
                        Some(VisitState::Done) => continue,
                        Some(VisitState::Visiting) => {
                            let from = path.iter().position(|c| *c == cell).unwrap_or(0);
                            let mut cycle_path = path[from..].to_vec();
                            cycle_path.push(cell);
                            return Err(CycleError { cell, cycle_path });
                        }
                        None => {}
                    }

                    state.insert(cell, VisitState::Visiting);
                    path.push(cell);
                    stack.push(Frame::Exit(cell));

                    if let Some(precedents) = self.dependencies.get(&cell) {
                        let mut next: Vec<CellKey> = precedents
                            .iter()
                            .copied()
                            .filter(|p| state.get(p) != Some(&VisitState::Done))
                            .collect();
                        // Reverse-sorted so the smallest key is popped first
                        next.sort_unstable_by(|a, b| b.cmp(a));
                        stack.extend(next.into_iter().map(Frame::Enter));
                    }
                }
                Frame::Exit(cell) => {
                    state.insert(cell, VisitState::Done);
                    path.pop();
                    if members.contains(&cell) {
                        order.push(cell);
                    }
                }
            }
        }

        Ok(())
    }

    /// Moves every edge for a row/column insert (`delta > 0`) or delete
    /// (`delta < 0`) at `pivot`. Edges with an endpoint inside a deleted
    /// span are dropped. Both maps are rebuilt from the surviving edges.
    pub fn update_references(&mut self, axis: Axis, pivot: u32, delta: i64) {
        if delta == 0 {
            return;
        }

        let shift = |key: &CellKey| shift_address(&key.address(), axis, pivot, delta).map(|a| a.key());

        let mut edges = Vec::with_capacity(self.dependency_count());
        for (cell, precedents) in &self.dependencies {
            let Some(cell) = shift(cell) else {
                continue;
            };
            for precedent in precedents {
                if let Some(precedent) = shift(precedent) {
                    edges.push((cell, precedent));
                }
            }
        }

        self.clear();
        for (cell, precedent) in edges {
            self.dependencies.entry(cell).or_default().insert(precedent);
            self.dependents.entry(precedent).or_default().insert(cell);
        }
    }

    /// Number of cells with at least one dependency.
    pub fn formula_cell_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Total number of edges.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.values().map(HashSet::len).sum()
    }

    pub fn clear(&mut self) {
        self.dependencies.clear();
        self.dependents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellcalc_parser::{parse, parse_address, CellAddress};

    fn key(a1: &str) -> CellKey {
        parse_address(a1).unwrap().key()
    }

    fn set_of(cells: &[&str]) -> HashSet<CellKey> {
        cells.iter().map(|c| key(c)).collect()
    }

    fn refs(formula: &str) -> Vec<Reference> {
        parse(formula).unwrap().references()
    }

    fn cell_ref(a1: &str) -> Reference {
        Reference::Cell(parse_address(a1).unwrap())
    }

    #[test]
    fn test_set_and_get_dependencies() {
        let mut graph = DependencyGraph::new();

        // A3 = A1 + A2
        graph.set_dependencies(key("A3"), &refs("=A1+A2"));

        let precs = graph.get_precedents(key("A3")).unwrap();
        assert_eq!(precs, &set_of(&["A1", "A2"]));

        assert!(graph.get_direct_dependents(key("A1")).unwrap().contains(&key("A3")));
        assert!(graph.get_direct_dependents(key("A2")).unwrap().contains(&key("A3")));
    }

    #[test]
    fn test_range_registers_every_cell() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("D1"), &refs("=SUM(A1:C1)"));

        assert_eq!(graph.dependency_count(), 3);
        assert_eq!(graph.get_precedents(key("D1")).unwrap(), &set_of(&["A1", "B1", "C1"]));
    }

    #[test]
    fn test_oversized_range_has_no_edges() {
        let mut graph = DependencyGraph::with_range_limit(4);
        graph.set_dependencies(key("D1"), &refs("=SUM(A1:A10)+B1"));

        assert_eq!(graph.get_precedents(key("D1")).unwrap(), &set_of(&["B1"]));
    }

    #[test]
    fn test_remove_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("A3"), &refs("=A1+A2"));
        graph.remove_dependencies(key("A3"));

        assert!(graph.get_precedents(key("A3")).is_none());
        assert!(graph.get_direct_dependents(key("A1")).is_none());
        assert!(graph.get_direct_dependents(key("A2")).is_none());
    }

    #[test]
    fn test_update_dependencies() {
        let mut graph = DependencyGraph::new();

        // Initially A3 = A1 + A2, then A3 = B1
        graph.set_dependencies(key("A3"), &refs("=A1+A2"));
        graph.set_dependencies(key("A3"), &[cell_ref("B1")]);

        assert_eq!(graph.get_precedents(key("A3")).unwrap(), &set_of(&["B1"]));
        assert!(graph.get_direct_dependents(key("A1")).is_none());
        assert!(graph.get_direct_dependents(key("A2")).is_none());
        assert!(graph.get_direct_dependents(key("B1")).unwrap().contains(&key("A3")));
    }

    #[test]
    fn test_empty_references_leave_no_entry() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("A1"), &[]);
        assert_eq!(graph.formula_cell_count(), 0);
    }

    #[test]
    fn test_transitive_dependents() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("B1"), &[cell_ref("A1")]);
        graph.set_dependencies(key("C1"), &[cell_ref("B1")]);
        graph.set_dependencies(key("D1"), &[cell_ref("Z9")]);

        assert_eq!(graph.get_dependents(key("A1")), set_of(&["B1", "C1"]));
        assert!(graph.get_dependents(key("C1")).is_empty());
    }

    // ========================================================================
    // CYCLE DETECTION
    // ========================================================================

    #[test]
    fn test_cycle_self_reference() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("A1"), &[cell_ref("A1")]);
        assert!(graph.has_circular_reference(key("A1")));
        assert!(graph.get_dependents(key("A1")).contains(&key("A1")));
    }

    #[test]
    fn test_cycle_two_cells() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("A1"), &[cell_ref("B1")]);
        assert!(!graph.has_circular_reference(key("A1")));

        graph.set_dependencies(key("B1"), &[cell_ref("A1")]);
        assert!(graph.has_circular_reference(key("B1")));
        assert!(graph.has_circular_reference(key("A1")));
    }

    #[test]
    fn test_cycle_transitive() {
        let mut graph = DependencyGraph::new();
        // A1 -> B1 -> C1 -> A1
        graph.set_dependencies(key("A1"), &[cell_ref("B1")]);
        graph.set_dependencies(key("B1"), &[cell_ref("C1")]);
        graph.set_dependencies(key("C1"), &[cell_ref("A1")]);
        assert!(graph.has_circular_reference(key("C1")));
    }

    #[test]
    fn test_no_false_positive_cycle() {
        let mut graph = DependencyGraph::new();
        // Diamond: D1 reads B1 and C1, both read A1
        graph.set_dependencies(key("B1"), &[cell_ref("A1")]);
        graph.set_dependencies(key("C1"), &[cell_ref("A1")]);
        graph.set_dependencies(key("D1"), &refs("=B1+C1"));
        assert!(!graph.has_circular_reference(key("D1")));
    }

    // ========================================================================
    // CALCULATION ORDER
    // ========================================================================

    #[test]
    fn test_order_chain() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("C1"), &[cell_ref("B1")]);
        graph.set_dependencies(key("B1"), &[cell_ref("A1")]);

        let order = graph.get_calculation_order(&graph.get_dependents(key("A1"))).unwrap();
        assert_eq!(order, vec![key("B1"), key("C1")]);
    }

    #[test]
    fn test_order_diamond() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("B1"), &[cell_ref("A1")]);
        graph.set_dependencies(key("C1"), &[cell_ref("A1")]);
        graph.set_dependencies(key("D1"), &refs("=B1+C1"));

        let order = graph.get_calculation_order(&graph.get_dependents(key("A1"))).unwrap();
        assert_eq!(order.len(), 3);
        let pos = |a1: &str| order.iter().position(|c| *c == key(a1)).unwrap();
        assert!(pos("B1") < pos("D1"));
        assert!(pos("C1") < pos("D1"));
    }

    #[test]
    fn test_order_walks_through_non_members() {
        let mut graph = DependencyGraph::new();
        // C1 reads B1 reads A1; only A1 and C1 are requested
        graph.set_dependencies(key("B1"), &[cell_ref("A1")]);
        graph.set_dependencies(key("C1"), &[cell_ref("B1")]);
        graph.set_dependencies(key("A1"), &[cell_ref("Z1")]);

        let order = graph.get_calculation_order(&set_of(&["C1", "A1"])).unwrap();
        assert_eq!(order, vec![key("A1"), key("C1")]);
    }

    #[test]
    fn test_order_empty() {
        let graph = DependencyGraph::new();
        assert_eq!(graph.get_calculation_order(&HashSet::new()).unwrap(), vec![]);
    }

    #[test]
    fn test_order_independent_cells_once() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("B1"), &[cell_ref("A1")]);
        graph.set_dependencies(key("B2"), &[cell_ref("A2")]);

        let order = graph.get_calculation_order(&set_of(&["B1", "B2"])).unwrap();
        assert_eq!(order.len(), 2);
        assert!(order.contains(&key("B1")));
        assert!(order.contains(&key("B2")));
    }

    #[test]
    fn test_order_cycle_error() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("A1"), &[cell_ref("B1")]);
        graph.set_dependencies(key("B1"), &[cell_ref("A1")]);

        let err = graph.get_calculation_order(&set_of(&["A1", "B1"])).unwrap_err();
        assert_eq!(err.cycle_path.first(), err.cycle_path.last());
        assert_eq!(err.cycle_path.len(), 3);
        assert!(err.to_string().starts_with("Circular reference detected at"));
    }

    // ========================================================================
    // STRUCTURAL EDITS
    // ========================================================================

    #[test]
    fn test_update_references_row_insert() {
        let mut graph = DependencyGraph::new();
        // B2 = A2; insert one row at row index 1 (before row 2)
        graph.set_dependencies(key("B2"), &[cell_ref("A2")]);
        graph.update_references(Axis::Row, 1, 1);

        assert!(graph.get_precedents(key("B2")).is_none());
        assert_eq!(graph.get_precedents(key("B3")).unwrap(), &set_of(&["A3"]));
        assert!(graph.get_direct_dependents(key("A3")).unwrap().contains(&key("B3")));
        assert!(graph.get_direct_dependents(key("A2")).is_none());
    }

    #[test]
    fn test_update_references_column_delete() {
        let mut graph = DependencyGraph::new();
        // D1 = A1 + B1 + C1; delete column B
        graph.set_dependencies(key("D1"), &refs("=A1+B1+C1"));
        graph.update_references(Axis::Col, 1, -1);

        assert_eq!(graph.get_precedents(key("C1")).unwrap(), &set_of(&["A1", "B1"]));
        assert_eq!(graph.dependency_count(), 2);
    }

    #[test]
    fn test_update_references_drops_deleted_dependent() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("A2"), &[cell_ref("A1")]);
        graph.update_references(Axis::Row, 1, -1);

        assert_eq!(graph.formula_cell_count(), 0);
        assert!(graph.get_direct_dependents(key("A1")).is_none());
    }

    #[test]
    fn test_update_references_ignores_absolute_flags() {
        // Graph keys carry no absolute flags, so every edge moves
        let mut graph = DependencyGraph::new();
        let absolute = CellAddress::new(0, 4).with_absolute(true, true);
        graph.set_dependencies(key("B5"), &[Reference::Cell(absolute)]);
        graph.update_references(Axis::Row, 0, 2);

        assert_eq!(graph.get_precedents(key("B7")).unwrap(), &set_of(&["A7"]));
    }

    #[test]
    fn test_counts() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(key("A3"), &refs("=A1+A2"));
        graph.set_dependencies(key("B3"), &refs("=B1+B2+A3"));

        assert_eq!(graph.formula_cell_count(), 2);
        assert_eq!(graph.dependency_count(), 5);

        graph.clear();
        assert_eq!(graph.formula_cell_count(), 0);
        assert_eq!(graph.dependency_count(), 0);
    }
}
