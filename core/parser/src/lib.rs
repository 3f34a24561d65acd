//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the cellcalc formula parser.
//! CONTEXT: This crate exposes the reference codec, lexer, parser, and AST
//! components needed to convert formula strings into evaluatable expression trees.
//!
//! PIPELINE: Formula String --> Lexer --> Tokens --> Parser --> AST --> Evaluator
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /, ^ (power, right-associative)
//! - Comparison: =, <>, <, >, <=, >=
//! - String concatenation: &
//! - Cell references: A1, AA100, $A$1
//! - Ranges: A1:B10
//! - Function calls: SUM(A1:A10), IF(A1>0, "yes", "no")
//! - Parentheses for grouping
//! - Unary sign: -5, +5
//! - Error literals: #REF!, #DIV/0!, ...

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod reference;
pub mod token;


// Re-export commonly used types for convenience
pub use ast::{BinaryOperator, CellError, Expression, Reference, UnaryOperator, Value};
pub use lexer::Lexer;
pub use parser::{
    parse, ParseError, ParseResult, Parser, MAX_FORMULA_CHARS, MAX_NESTING_DEPTH, MAX_OPERATORS,
};
pub use reference::{
    column_to_letters, expand_range, format_address, format_range, letters_to_column,
    parse_address, parse_range, shift_address, shift_range, toggle_absolute, Axis, CellAddress,
    CellKey, CellRange,
};
pub use token::Token;
