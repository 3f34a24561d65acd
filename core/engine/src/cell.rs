//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: This file contains the `Cell` struct and `CellValue` enum.
//! It separates the user's input (formula) from the calculated result (value).
//! It is designed to be lightweight as millions of these instances may exist.

use serde::{Deserialize, Serialize};

pub use cellcalc_parser::CellError;

/// Represents the calculated result or raw data within a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_error(&self) -> Option<CellError> {
        match self {
            CellValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Text shown in the grid for this value.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Error(e) => e.code().to_string(),
        }
    }
}

/// Formats a number without unnecessary decimal places.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// The atomic unit of the spreadsheet.
///
/// For a literal cell `formula` is None and `value` is the entered value.
/// For a formula cell `value` holds the last computed result and `error`
/// mirrors it when that result is an error sentinel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub formula: Option<String>,
    pub value: CellValue,
    pub error: Option<CellError>,
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl Cell {
    pub fn new() -> Self {
        Cell::default()
    }

    pub fn new_number(num: f64) -> Self {
        Cell {
            value: CellValue::Number(num),
            ..Cell::default()
        }
    }

    pub fn new_text(text: String) -> Self {
        Cell {
            value: CellValue::Text(text),
            ..Cell::default()
        }
    }

    pub fn new_boolean(value: bool) -> Self {
        Cell {
            value: CellValue::Boolean(value),
            ..Cell::default()
        }
    }

    /// A formula cell that has not been calculated yet.
    pub fn new_formula(formula: String) -> Self {
        Cell {
            formula: Some(formula),
            ..Cell::default()
        }
    }

    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// Stores a calculated result, keeping `error` in step with it.
    pub fn set_result(&mut self, value: CellValue) {
        self.error = value.as_error();
        self.value = value;
    }

    /// Returns the display value of the cell as a String.
    pub fn display_value(&self) -> String {
        self.value.display()
    }

    /// The text a user would edit: the formula if present, else the raw value.
    pub fn input_text(&self) -> String {
        match &self.formula {
            Some(formula) => formula.clone(),
            None => self.value.display(),
        }
    }
}

/// Converts typed (non-formula) input into a literal cell.
/// TRUE/FALSE become booleans, numbers (including `1,000` and `50%`)
/// become numbers, blank input becomes an empty cell, anything else is text.
pub fn parse_cell_input(input: &str) -> Cell {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Cell::new();
    }
    let upper = trimmed.to_uppercase();
    if upper == "TRUE" {
        return Cell::new_boolean(true);
    }
    if upper == "FALSE" {
        return Cell::new_boolean(false);
    }
    if let Some(num) = parse_number(trimmed) {
        return Cell::new_number(num);
    }
    Cell::new_text(input.to_string())
}

fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.ends_with('%') {
        let num_part = trimmed.trim_end_matches('%').trim();
        return parse_plain_number(num_part).map(|n| n / 100.0);
    }
    parse_plain_number(&trimmed.replace(',', ""))
}

/// Parses decimal notation only; rejects "inf", "NaN" and friends that
/// `f64::from_str` would otherwise accept.
pub(crate) fn parse_plain_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}
