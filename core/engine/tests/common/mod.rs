//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for formula engine integration tests.
//! Cells are addressed in A1 notation to keep tests readable.

#![allow(dead_code)]

use cellcalc_engine::{parse_address, CellError, CellKey, CellUpdate, CellValue, FormulaEngine};

/// Test harness wrapping an engine over the in-memory grid.
pub struct TestHarness {
    pub engine: FormulaEngine,
}

impl TestHarness {
    /// Create a new test harness with an empty sheet.
    pub fn new() -> Self {
        TestHarness {
            engine: FormulaEngine::new(),
        }
    }

    /// A1 = 5, B1 = A1*2, C1 = B1+5
    pub fn with_chain() -> Self {
        let mut harness = Self::new();
        harness.set("A1", "5");
        harness.set("B1", "=A1*2");
        harness.set("C1", "=B1+5");
        harness
    }

    /// Numbers 10..50 in A1:A5, 5..25 in B1:B5.
    pub fn with_sample_data() -> Self {
        let mut harness = Self::new();
        for i in 1..=5u32 {
            harness.set(&format!("A{}", i), &(i * 10).to_string());
            harness.set(&format!("B{}", i), &(i * 5).to_string());
        }
        harness
    }

    pub fn set(&mut self, a1: &str, text: &str) -> CellUpdate {
        let key = key(a1);
        self.engine.set_cell(key.col, key.row, text)
    }

    pub fn value(&self, a1: &str) -> CellValue {
        let key = key(a1);
        self.engine.get_value(key.col, key.row)
    }

    pub fn formula(&self, a1: &str) -> String {
        let key = key(a1);
        self.engine.get_formula(key.col, key.row)
    }

    pub fn precedents(&self, a1: &str) -> Vec<CellKey> {
        let key = key(a1);
        self.engine.trace_precedents(key.col, key.row)
    }

    pub fn dependents(&self, a1: &str) -> Vec<CellKey> {
        let key = key(a1);
        self.engine.trace_dependents(key.col, key.row)
    }
}

/// Parses an A1 address into a cell key, panicking on bad test input.
pub fn key(a1: &str) -> CellKey {
    parse_address(a1)
        .unwrap_or_else(|| panic!("bad test address {}", a1))
        .key()
}

pub fn keys(list: &[&str]) -> Vec<CellKey> {
    let mut keys: Vec<CellKey> = list.iter().map(|a1| key(a1)).collect();
    keys.sort_unstable();
    keys
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub fn assert_cell_number(harness: &TestHarness, a1: &str, expected: f64) {
    match harness.value(a1) {
        CellValue::Number(n) => {
            assert!(
                (n - expected).abs() < 1e-9,
                "Cell {} expected {} but got {}",
                a1, expected, n
            );
        }
        other => panic!("Cell {} expected Number({}) but got {:?}", a1, expected, other),
    }
}

pub fn assert_cell_text(harness: &TestHarness, a1: &str, expected: &str) {
    match harness.value(a1) {
        CellValue::Text(s) => assert_eq!(s, expected, "Cell {}", a1),
        other => panic!("Cell {} expected Text({:?}) but got {:?}", a1, expected, other),
    }
}

pub fn assert_cell_boolean(harness: &TestHarness, a1: &str, expected: bool) {
    assert_eq!(harness.value(a1), CellValue::Boolean(expected), "Cell {}", a1);
}

pub fn assert_cell_error(harness: &TestHarness, a1: &str, expected: CellError) {
    assert_eq!(harness.value(a1), CellValue::Error(expected), "Cell {}", a1);
}

pub fn assert_cell_empty(harness: &TestHarness, a1: &str) {
    assert_eq!(harness.value(a1), CellValue::Empty, "Cell {}", a1);
}
