//! FILENAME: core/engine/src/evaluator.rs
//! PURPOSE: Evaluates AST expressions to compute cell values.
//! CONTEXT: After a formula is parsed into an AST, this module traverses
//! the tree and computes the final result. It handles cell lookups,
//! arithmetic operations, comparisons, string concatenation, and
//! dispatch to the function registry.
//!
//! SEMANTICS:
//! - Arithmetic coerces both operands with `to_number` (TRUE -> 1, "" -> 0,
//!   "12" -> 12, "abc" -> 0). Division by zero is #DIV/0!, a non-finite
//!   result is #NUM!.
//! - Comparisons are case-insensitive for text. Values of different kinds
//!   order as number < text < boolean.
//! - `&` stringifies both sides; empty cells become "".
//! - Operators return the first error operand (left before right).
//! - Function arguments are all evaluated left to right before dispatch.
//! - Ranges evaluate to a 2-D array (row-major). Arrays are only meaningful
//!   as function arguments; an operator applied to one yields #VALUE!.

use std::cmp::Ordering;

use cellcalc_parser::{BinaryOperator, CellRange, Expression, UnaryOperator, Value};
use log::warn;

use crate::cell::{format_number, parse_plain_number, CellError, CellValue};
use crate::config::DEFAULT_MAX_RANGE_CELLS;
use crate::functions::FunctionRegistry;
use crate::grid::CellStore;

/// The result of evaluating an expression.
/// This maps directly to CellValue but is separate to allow for
/// intermediate computation states.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    /// An empty cell read through a reference.
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
    /// Rows of values produced by a range reference.
    Array(Vec<Vec<EvalResult>>),
}

impl EvalResult {
    pub fn from_cell_value(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => EvalResult::Empty,
            CellValue::Number(n) => EvalResult::Number(*n),
            CellValue::Text(s) => EvalResult::Text(s.clone()),
            CellValue::Boolean(b) => EvalResult::Boolean(*b),
            CellValue::Error(e) => EvalResult::Error(*e),
        }
    }

    /// Converts the evaluation result to a CellValue for storage.
    /// A formula that yields an empty cell shows 0; arrays collapse to
    /// their top-left value.
    pub fn to_cell_value(&self) -> CellValue {
        match self {
            EvalResult::Empty => CellValue::Number(0.0),
            EvalResult::Number(n) => CellValue::Number(*n),
            EvalResult::Text(s) => CellValue::Text(s.clone()),
            EvalResult::Boolean(b) => CellValue::Boolean(*b),
            EvalResult::Error(e) => CellValue::Error(*e),
            EvalResult::Array(_) => self.scalar().to_cell_value(),
        }
    }

    /// The top-left value of an array, or the value itself.
    pub fn scalar(&self) -> EvalResult {
        match self {
            EvalResult::Array(rows) => rows
                .first()
                .and_then(|row| row.first())
                .map(EvalResult::scalar)
                .unwrap_or(EvalResult::Empty),
            other => other.clone(),
        }
    }

    /// Permissive numeric coercion used by operators. Never fails:
    /// text that is not a number counts as 0.
    pub fn to_number(&self) -> f64 {
        match self {
            EvalResult::Number(n) => *n,
            EvalResult::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            EvalResult::Text(s) => parse_plain_number(s).unwrap_or(0.0),
            EvalResult::Array(_) => self.scalar().to_number(),
            EvalResult::Empty | EvalResult::Error(_) => 0.0,
        }
    }

    /// Strict numeric coercion used by functions.
    /// Returns None for text that does not read as a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EvalResult::Number(n) => Some(*n),
            EvalResult::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            EvalResult::Empty => Some(0.0),
            EvalResult::Text(s) => parse_plain_number(s),
            EvalResult::Array(_) => self.scalar().as_number(),
            EvalResult::Error(_) => None,
        }
    }

    /// Attempts to coerce the result to a boolean.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            EvalResult::Boolean(b) => Some(*b),
            EvalResult::Number(n) => Some(*n != 0.0),
            EvalResult::Empty => Some(false),
            EvalResult::Text(s) => match s.trim().to_uppercase().as_str() {
                "TRUE" => Some(true),
                "FALSE" => Some(false),
                _ => None,
            },
            EvalResult::Array(_) => self.scalar().as_boolean(),
            EvalResult::Error(_) => None,
        }
    }

    /// Converts the result to a string representation.
    pub fn as_text(&self) -> String {
        match self {
            EvalResult::Empty => String::new(),
            EvalResult::Number(n) => format_number(*n),
            EvalResult::Text(s) => s.clone(),
            EvalResult::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            EvalResult::Error(e) => e.code().to_string(),
            EvalResult::Array(_) => self.scalar().as_text(),
        }
    }

    /// Returns true if this result is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, EvalResult::Error(_))
    }

    pub fn error(&self) -> Option<CellError> {
        match self {
            EvalResult::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Flattens an array result into individual values, row by row.
    /// Non-array values return a single-element vector.
    pub fn flatten(&self) -> Vec<EvalResult> {
        match self {
            EvalResult::Array(rows) => rows
                .iter()
                .flat_map(|row| row.iter().flat_map(EvalResult::flatten))
                .collect(),
            other => vec![other.clone()],
        }
    }

    /// Rank used when comparing values of different kinds.
    fn kind_rank(&self) -> u8 {
        match self {
            EvalResult::Number(_) => 0,
            EvalResult::Text(_) => 1,
            EvalResult::Boolean(_) => 2,
            _ => 3,
        }
    }

    /// An empty cell compares as the zero value of the other side's kind.
    fn blank_as(&self, other: &EvalResult) -> EvalResult {
        match (self, other) {
            (EvalResult::Empty, EvalResult::Text(_)) => EvalResult::Text(String::new()),
            (EvalResult::Empty, EvalResult::Boolean(_)) => EvalResult::Boolean(false),
            (EvalResult::Empty, _) => EvalResult::Number(0.0),
            (value, _) => value.clone(),
        }
    }
}

/// Orders two scalar values the way comparison operators do.
pub(crate) fn compare_values(left: &EvalResult, right: &EvalResult) -> Ordering {
    let left = left.blank_as(right);
    let right = right.blank_as(&left);
    match (&left, &right) {
        (EvalResult::Number(l), EvalResult::Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),
        (EvalResult::Text(l), EvalResult::Text(r)) => l.to_lowercase().cmp(&r.to_lowercase()),
        (EvalResult::Boolean(l), EvalResult::Boolean(r)) => l.cmp(r),
        _ => left.kind_rank().cmp(&right.kind_rank()),
    }
}

/// Equality as used by `=`, lookups, and criteria matching.
pub(crate) fn values_equal(left: &EvalResult, right: &EvalResult) -> bool {
    let left_rank = left.blank_as(right).kind_rank();
    let right_rank = right.blank_as(left).kind_rank();
    left_rank == right_rank && left_rank < 3 && compare_values(left, right) == Ordering::Equal
}

/// Read access to cell values during evaluation.
pub trait CellAccessor {
    /// Current value of a cell; `CellValue::Empty` when nothing is stored.
    fn cell_value(&self, col: u32, row: u32) -> CellValue;

    /// Values of every cell in a range, row-major.
    fn range_values(&self, range: &CellRange) -> Vec<Vec<CellValue>> {
        (range.start.row..=range.end.row)
            .map(|row| {
                (range.start.col..=range.end.col)
                    .map(|col| self.cell_value(col, row))
                    .collect()
            })
            .collect()
    }
}

impl<S: CellStore + ?Sized> CellAccessor for S {
    fn cell_value(&self, col: u32, row: u32) -> CellValue {
        self.get_cell(col, row)
            .map(|cell| cell.value.clone())
            .unwrap_or(CellValue::Empty)
    }
}

/// The Evaluator computes the result of an expression against a set of cells.
pub struct Evaluator<'a, A: CellAccessor + ?Sized> {
    cells: &'a A,
    functions: &'a FunctionRegistry,
    max_range_cells: usize,
}

impl<'a, A: CellAccessor + ?Sized> Evaluator<'a, A> {
    pub fn new(cells: &'a A, functions: &'a FunctionRegistry) -> Self {
        Evaluator {
            cells,
            functions,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }

    /// Ranges larger than `limit` cells evaluate to #VALUE!.
    pub fn with_range_limit(mut self, limit: usize) -> Self {
        self.max_range_cells = limit;
        self
    }

    /// Evaluates an expression and returns the result.
    pub fn evaluate(&self, expr: &Expression) -> EvalResult {
        match expr {
            Expression::Literal(value) => self.eval_literal(value),
            Expression::CellRef(address) => {
                EvalResult::from_cell_value(&self.cells.cell_value(address.col, address.row))
            }
            Expression::RangeRef(range) => self.eval_range(range),
            Expression::BinaryOp { left, op, right } => self.eval_binary_op(left, *op, right),
            Expression::UnaryOp { op, operand } => self.eval_unary_op(*op, operand),
            Expression::FunctionCall { name, args } => {
                let values: Vec<EvalResult> = args.iter().map(|arg| self.evaluate(arg)).collect();
                self.functions.call(name, &values)
            }
        }
    }

    fn eval_literal(&self, value: &Value) -> EvalResult {
        match value {
            Value::Number(n) => EvalResult::Number(*n),
            Value::String(s) => EvalResult::Text(s.clone()),
            Value::Boolean(b) => EvalResult::Boolean(*b),
            Value::Error(e) => EvalResult::Error(*e),
        }
    }

    fn eval_range(&self, range: &CellRange) -> EvalResult {
        if range.cell_count() > self.max_range_cells as u64 {
            warn!(
                "Range {} has {} cells, over the limit of {}",
                range,
                range.cell_count(),
                self.max_range_cells
            );
            return EvalResult::Error(CellError::Value);
        }

        let rows = self
            .cells
            .range_values(range)
            .iter()
            .map(|row| row.iter().map(EvalResult::from_cell_value).collect())
            .collect();
        EvalResult::Array(rows)
    }

    /// Evaluates a binary operation.
    fn eval_binary_op(&self, left: &Expression, op: BinaryOperator, right: &Expression) -> EvalResult {
        let left_val = self.evaluate(left);
        let right_val = self.evaluate(right);

        // Propagate errors, left operand first
        if let EvalResult::Error(e) = left_val {
            return EvalResult::Error(e);
        }
        if let EvalResult::Error(e) = right_val {
            return EvalResult::Error(e);
        }
        if matches!(left_val, EvalResult::Array(_)) || matches!(right_val, EvalResult::Array(_)) {
            return EvalResult::Error(CellError::Value);
        }

        match op {
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Power => self.eval_arithmetic(op, &left_val, &right_val),

            BinaryOperator::Concat => {
                EvalResult::Text(format!("{}{}", left_val.as_text(), right_val.as_text()))
            }

            BinaryOperator::Equal => EvalResult::Boolean(values_equal(&left_val, &right_val)),
            BinaryOperator::NotEqual => EvalResult::Boolean(!values_equal(&left_val, &right_val)),
            BinaryOperator::LessThan => {
                EvalResult::Boolean(compare_values(&left_val, &right_val) == Ordering::Less)
            }
            BinaryOperator::GreaterThan => {
                EvalResult::Boolean(compare_values(&left_val, &right_val) == Ordering::Greater)
            }
            BinaryOperator::LessEqual => {
                EvalResult::Boolean(compare_values(&left_val, &right_val) != Ordering::Greater)
            }
            BinaryOperator::GreaterEqual => {
                EvalResult::Boolean(compare_values(&left_val, &right_val) != Ordering::Less)
            }
        }
    }

    fn eval_arithmetic(&self, op: BinaryOperator, left: &EvalResult, right: &EvalResult) -> EvalResult {
        let l = left.to_number();
        let r = right.to_number();

        let result = match op {
            BinaryOperator::Add => l + r,
            BinaryOperator::Subtract => l - r,
            BinaryOperator::Multiply => l * r,
            BinaryOperator::Divide => {
                if r == 0.0 {
                    return EvalResult::Error(CellError::Div0);
                }
                l / r
            }
            BinaryOperator::Power => l.powf(r),
            _ => return EvalResult::Error(CellError::Value),
        };

        if result.is_finite() {
            EvalResult::Number(result)
        } else {
            EvalResult::Error(CellError::Num)
        }
    }

    /// Evaluates a unary operation.
    fn eval_unary_op(&self, op: UnaryOperator, operand: &Expression) -> EvalResult {
        let val = self.evaluate(operand);

        match val {
            EvalResult::Error(e) => EvalResult::Error(e),
            EvalResult::Array(_) => EvalResult::Error(CellError::Value),
            other => match op {
                UnaryOperator::Negate => EvalResult::Number(-other.to_number()),
                UnaryOperator::Plus => other,
            },
        }
    }
}
