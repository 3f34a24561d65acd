//! FILENAME: core/parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for formula expressions.
//! CONTEXT: After the Lexer tokenizes a formula string, the Parser converts
//! those tokens into this tree structure. The Evaluator then traverses
//! this tree to compute the final result, and the dependency extractor walks
//! it to find the cells a formula reads.
//!
//! SUPPORTED EXPRESSIONS:
//! - Literals: Numbers, Strings, Booleans, Error sentinels (#REF! etc.)
//! - Cell references: A1, AA100, $A$1, A$1, $A1
//! - Ranges: A1:B10, $A$1:$B$10
//! - Binary operations: +, -, *, /, ^, &, =, <>, <, >, <=, >=
//! - Unary operations: - (negation), + (identity)
//! - Function calls: SUM(A1:A10), IF(A1>0, "yes", "no")

use crate::reference::{CellAddress, CellRange};
use serde::{Deserialize, Serialize};

/// Error sentinels a cell can hold (e.g., #DIV/0!).
/// These are ordinary values: they flow through operators and functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellError {
    Ref,      // Invalid reference
    Value,    // Wrong type of argument, or unparseable formula
    Div0,     // Division by zero
    Name,     // Unknown function name
    Circular, // Circular dependency detected
    Num,      // Invalid numeric result
    Null,     // Empty intersection
    NA,       // Lookup value not available
}

impl CellError {
    /// Literal spellings recognized in formula text.
    pub const LITERALS: [&'static str; 9] = [
        "#DIV/0!", "#VALUE!", "#NAME?", "#CIRC!", "#NULL!", "#REF!", "#NUM!", "#N/A", "#NA!",
    ];

    /// The code displayed in a cell.
    pub fn code(&self) -> &'static str {
        match self {
            CellError::Ref => "#REF!",
            CellError::Value => "#VALUE!",
            CellError::Div0 => "#DIV/0!",
            CellError::Name => "#NAME?",
            CellError::Circular => "#CIRC!",
            CellError::Num => "#NUM!",
            CellError::Null => "#NULL!",
            CellError::NA => "#N/A",
        }
    }

    /// Parses a displayed code back into a sentinel (case-insensitive).
    pub fn from_code(code: &str) -> Option<CellError> {
        match code.trim().to_ascii_uppercase().as_str() {
            "#REF!" => Some(CellError::Ref),
            "#VALUE!" => Some(CellError::Value),
            "#DIV/0!" => Some(CellError::Div0),
            "#NAME?" => Some(CellError::Name),
            "#CIRC!" => Some(CellError::Circular),
            "#NUM!" => Some(CellError::Num),
            "#NULL!" => Some(CellError::Null),
            "#N/A" | "#NA!" => Some(CellError::NA),
            _ => None,
        }
    }

    /// Human-readable explanation, for tooltips and inspectors.
    pub fn description(&self) -> &'static str {
        match self {
            CellError::Ref => "The formula refers to a cell that no longer exists.",
            CellError::Value => "A value has the wrong type, or the formula could not be parsed.",
            CellError::Div0 => "The formula divides by zero.",
            CellError::Name => "The formula uses an unknown function name.",
            CellError::Circular => "The formula depends on its own result.",
            CellError::Num => "The calculation produced an invalid number.",
            CellError::Null => "The ranges do not intersect.",
            CellError::NA => "The lookup value was not found.",
        }
    }
}

impl std::fmt::Display for CellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Represents a parsed formula expression.
/// This is the core data structure that the evaluator will traverse.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// A literal value: number, string, boolean, or error sentinel.
    Literal(Value),

    /// A single cell reference like A1 or $A$1.
    CellRef(CellAddress),

    /// A normalized range reference like A1:B10.
    RangeRef(CellRange),

    /// A binary operation: left op right (e.g., 5 + 3, A1 > 10).
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// A unary operation: op operand (e.g., -5).
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// A function call like SUM(A1:A10). The name is uppercase.
    FunctionCall { name: String, args: Vec<Expression> },
}

/// Literal values that can appear in formulas.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
}

/// A reference extracted from an expression, before range expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    Cell(CellAddress),
    Range(CellRange),
}

/// Binary operators for expressions.
/// Listed in order of precedence groups (comparison is lowest).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    // Comparison operators (lowest precedence)
    Equal,        // =
    NotEqual,     // <>
    LessThan,     // <
    GreaterThan,  // >
    LessEqual,    // <=
    GreaterEqual, // >=

    // String concatenation
    Concat, // &

    // Arithmetic operators
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Power,    // ^ (highest precedence among binary ops)
}

/// Unary operators.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Negate, // -
    Plus,   // +
}

impl Expression {
    /// Collects every cell and range reference in the tree, left to right.
    pub fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<Reference>) {
        match self {
            Expression::Literal(_) => {}
            Expression::CellRef(address) => out.push(Reference::Cell(*address)),
            Expression::RangeRef(range) => out.push(Reference::Range(*range)),
            Expression::BinaryOp { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            Expression::UnaryOp { operand, .. } => operand.collect_references(out),
            Expression::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_references(out);
                }
            }
        }
    }
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::Power => write!(f, "^"),
            BinaryOperator::Concat => write!(f, "&"),
            BinaryOperator::Equal => write!(f, "="),
            BinaryOperator::NotEqual => write!(f, "<>"),
            BinaryOperator::LessThan => write!(f, "<"),
            BinaryOperator::GreaterThan => write!(f, ">"),
            BinaryOperator::LessEqual => write!(f, "<="),
            BinaryOperator::GreaterEqual => write!(f, ">="),
        }
    }
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Plus => write!(f, "+"),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Error(e) => write!(f, "{}", e),
        }
    }
}
