//! FILENAME: tests/test_formulas.rs
//! Integration tests for formula evaluation through `set_cell`:
//! operator precedence, error sentinels, and built-in functions.

mod common;

use cellcalc_engine::CellError;
use common::{
    assert_cell_boolean, assert_cell_error, assert_cell_number, assert_cell_text, TestHarness,
};

// ============================================================================
// OPERATORS
// ============================================================================

#[test]
fn test_precedence() {
    let mut harness = TestHarness::new();
    harness.set("A1", "=1+2*3");
    harness.set("A2", "=(1+2)*3");
    harness.set("A3", "=2^3^2");
    harness.set("A4", "=10-4-3");

    assert_cell_number(&harness, "A1", 7.0);
    assert_cell_number(&harness, "A2", 9.0);
    assert_cell_number(&harness, "A3", 512.0);
    assert_cell_number(&harness, "A4", 3.0);
}

#[test]
fn test_cell_references() {
    let mut harness = TestHarness::with_sample_data();
    harness.set("C1", "=A1+B1");
    harness.set("C2", "=A2*B2");
    harness.set("C3", "=$A$3/B3");

    assert_cell_number(&harness, "C1", 15.0);
    assert_cell_number(&harness, "C2", 200.0);
    assert_cell_number(&harness, "C3", 2.0);
}

#[test]
fn test_empty_reference_is_zero() {
    let mut harness = TestHarness::new();
    harness.set("B1", "=A1");
    harness.set("B2", "=A1+3");
    harness.set("B3", "=A1&\"x\"");

    assert_cell_number(&harness, "B1", 0.0);
    assert_cell_number(&harness, "B2", 3.0);
    assert_cell_text(&harness, "B3", "x");
}

#[test]
fn test_comparison_and_concat() {
    let mut harness = TestHarness::new();
    harness.set("A1", "=\"abc\"=\"ABC\"");
    harness.set("A2", "=2<10");
    harness.set("A3", "=\"2\"<\"10\"");
    harness.set("A4", "=\"Total: \"&1+2");
    harness.set("A5", "=1<>1");

    assert_cell_boolean(&harness, "A1", true);
    assert_cell_boolean(&harness, "A2", true);
    assert_cell_boolean(&harness, "A3", false);
    assert_cell_text(&harness, "A4", "Total: 3");
    assert_cell_boolean(&harness, "A5", false);
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn test_division_by_zero() {
    let mut harness = TestHarness::new();
    let update = harness.set("A1", "=10/0");

    assert_cell_error(&harness, "A1", CellError::Div0);
    assert_eq!(update.display_value, "#DIV/0!");
    assert!(update.is_error);
}

#[test]
fn test_ref_error_propagates() {
    let mut harness = TestHarness::new();
    harness.set("A1", "=#REF!");
    harness.set("A2", "4");
    harness.set("A3", "=A1+A2");
    harness.set("A4", "=A2+A1*2");

    assert_cell_error(&harness, "A3", CellError::Ref);
    assert_cell_error(&harness, "A4", CellError::Ref);
}

#[test]
fn test_left_error_wins() {
    let mut harness = TestHarness::new();
    harness.set("A1", "=1/0+#NUM!");
    assert_cell_error(&harness, "A1", CellError::Div0);
}

#[test]
fn test_syntax_errors_show_value() {
    let mut harness = TestHarness::new();
    for (cell, text) in [("A1", "=1+"), ("A2", "=(1+2"), ("A3", "=1 ~ 2"), ("A4", "=A1 B1")] {
        let update = harness.set(cell, text);
        assert_eq!(update.display_value, "#VALUE!", "{}", text);
        assert_eq!(harness.formula(cell), text);
    }
}

#[test]
fn test_unknown_function_and_arity() {
    let mut harness = TestHarness::new();
    harness.set("A1", "=NOSUCH(1)");
    harness.set("A2", "=ABS(1,2)");
    harness.set("A3", "=ABS()");

    assert_cell_error(&harness, "A1", CellError::Name);
    assert_cell_error(&harness, "A2", CellError::Value);
    assert_cell_error(&harness, "A3", CellError::Value);
}

// ============================================================================
// FUNCTIONS
// ============================================================================

#[test]
fn test_aggregates_over_ranges() {
    let mut harness = TestHarness::with_sample_data();
    harness.set("A6", "total");
    harness.set("C1", "=SUM(A1:A6)");
    harness.set("C2", "=AVERAGE(B1:B5)");
    harness.set("C3", "=MAX(A1:B5)");
    harness.set("C4", "=COUNT(A1:A6)");
    harness.set("C5", "=COUNTA(A1:A6)");

    assert_cell_number(&harness, "C1", 150.0);
    assert_cell_number(&harness, "C2", 15.0);
    assert_cell_number(&harness, "C3", 50.0);
    assert_cell_number(&harness, "C4", 5.0);
    assert_cell_number(&harness, "C5", 6.0);
}

#[test]
fn test_conditionals() {
    let mut harness = TestHarness::with_sample_data();
    harness.set("C1", "=IF(A1>B1,\"more\",\"less\")");
    harness.set("C2", "=IFERROR(1/0,-1)");
    harness.set("C3", "=SUMIF(A1:A5,\">25\")");
    harness.set("C4", "=COUNTIF(B1:B5,\"<=10\")");

    assert_cell_text(&harness, "C1", "more");
    assert_cell_number(&harness, "C2", -1.0);
    assert_cell_number(&harness, "C3", 120.0);
    assert_cell_number(&harness, "C4", 2.0);
}

#[test]
fn test_lookup() {
    let mut harness = TestHarness::new();
    for (row, (id, name)) in [(1, "apple"), (2, "banana"), (3, "cherry")].iter().enumerate() {
        harness.set(&format!("A{}", row + 1), &id.to_string());
        harness.set(&format!("B{}", row + 1), name);
    }
    harness.set("D1", "=VLOOKUP(2,A1:B3,2,FALSE)");
    harness.set("D2", "=VLOOKUP(9,A1:B3,2,FALSE)");
    harness.set("D3", "=INDEX(B1:B3,MATCH(\"CHERRY\",B1:B3,0))");

    assert_cell_text(&harness, "D1", "banana");
    assert_cell_error(&harness, "D2", CellError::NA);
    assert_cell_text(&harness, "D3", "cherry");
}

#[test]
fn test_text_and_dates() {
    let mut harness = TestHarness::new();
    harness.set("A1", "Hello");
    harness.set("B1", "=UPPER(LEFT(A1,3))&LEN(A1)");
    harness.set("B2", "=YEAR(DATE(2024,2,30))");
    harness.set("B3", "=MONTH(DATE(2024,2,30))");

    assert_cell_text(&harness, "B1", "HEL5");
    assert_cell_number(&harness, "B2", 2024.0);
    assert_cell_number(&harness, "B3", 3.0);
}

#[test]
fn test_lowercase_formula_text_is_kept() {
    let mut harness = TestHarness::with_sample_data();
    harness.set("C1", "=sum(a1:a2)");

    assert_cell_number(&harness, "C1", 30.0);
    assert_eq!(harness.formula("C1"), "=sum(a1:a2)");
}

#[test]
fn test_edit_text_round_trips_literals_and_formulas() {
    let mut harness = TestHarness::new();
    harness.set("A1", "42");
    harness.set("A2", "hello");
    harness.set("A3", "false");
    harness.set("A4", "=A1+1");

    assert_eq!(harness.formula("A1"), "42");
    assert_eq!(harness.formula("A2"), "hello");
    assert_eq!(harness.formula("A3"), "FALSE");
    assert_eq!(harness.formula("A4"), "=A1+1");
    assert_eq!(harness.formula("Z99"), "");

    // Re-entering the edit text gives the same value back
    let text = harness.formula("A1");
    harness.set("B1", &text);
    assert_cell_number(&harness, "B1", 42.0);
}

#[test]
fn test_date_with_overflowing_month_is_num_error() {
    let mut harness = TestHarness::new();
    harness.set("A1", "=DATE(2000,4294967297,1)");
    harness.set("A2", "=DATE(2000,1,100000000000000000)");

    assert_cell_error(&harness, "A1", CellError::Num);
    assert_cell_error(&harness, "A2", CellError::Num);
}

// ============================================================================
// PATHOLOGICAL FORMULAS
// ============================================================================

#[test]
fn test_deep_parentheses_are_rejected() {
    let mut harness = TestHarness::new();
    let formula = format!("={}1{}", "(".repeat(500), ")".repeat(500));
    let update = harness.set("A1", &formula);

    assert!(update.is_error);
    assert_cell_error(&harness, "A1", CellError::Value);
    assert_eq!(harness.formula("A1"), formula);
}

#[test]
fn test_deeply_nested_functions_are_rejected() {
    let mut harness = TestHarness::new();
    harness.set("A1", &format!("={}1{}", "ABS(".repeat(200), ")".repeat(200)));
    assert_cell_error(&harness, "A1", CellError::Value);

    harness.set("A2", &format!("={}1{}", "ABS(".repeat(20), ")".repeat(20)));
    assert_cell_number(&harness, "A2", 1.0);
}

#[test]
fn test_long_operator_chains() {
    let mut harness = TestHarness::new();
    harness.set("A1", &format!("=1{}", "+1".repeat(3000)));
    assert_cell_error(&harness, "A1", CellError::Value);

    harness.set("A2", &format!("=1{}", "+1".repeat(500)));
    assert_cell_number(&harness, "A2", 501.0);
}
