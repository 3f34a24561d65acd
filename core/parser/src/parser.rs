//! FILENAME: core/parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a stream of Tokens into an AST.
//! CONTEXT: This is the second stage of the parsing pipeline. It takes tokens
//! from the Lexer and builds an Expression tree that can be evaluated.
//!
//! GRAMMAR:
//!   formula        --> "=" comparison? EOF
//!   comparison     --> concatenation ( ("=" | "<>" | "<" | ">" | "<=" | ">=") concatenation )*
//!   concatenation  --> additive ( "&" additive )*
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> power ( ("*" | "/") power )*
//!   power          --> unary ( "^" power )?          // right-associative
//!   unary          --> ("-" | "+")? primary
//!   primary        --> NUMBER | STRING | BOOLEAN | ERROR | CELL_REF | RANGE_REF
//!                    | FUNCTION "(" arguments? ")" | "(" comparison ")"
//!   arguments      --> comparison ("," comparison)*

use crate::ast::{BinaryOperator, Expression, UnaryOperator, Value};
use crate::lexer::Lexer;
use crate::reference::{parse_address, parse_range};
use crate::token::Token;
use thiserror::Error;

/// Syntax error with the byte offset of the offending token.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("Parse error at {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Longest formula accepted, in characters.
pub const MAX_FORMULA_CHARS: usize = 8_192;

/// Deepest nesting of parentheses, function calls and `^` chains.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Most unary and binary operators accepted in one formula. Bounds the
/// depth of left-associative chains like `1+1+1+...`.
pub const MAX_OPERATORS: usize = 512;

/// The Parser struct holds the lexer and current token state.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
    /// Byte offset where `current_token` starts.
    current_pos: usize,
    input_chars: usize,
    depth: usize,
    operators: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser from an input string.
    /// Automatically advances to the first token.
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_pos = lexer.token_start();
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
            current_pos,
            input_chars: input.chars().count(),
            depth: 0,
            operators: 0,
        }
    }

    /// Parses a complete formula. The input must start with '='.
    /// `=` on its own parses to an empty string literal.
    pub fn parse(&mut self) -> ParseResult<Expression> {
        if self.input_chars > MAX_FORMULA_CHARS {
            return Err(ParseError::new(
                format!(
                    "Formula is {} characters, over the limit of {}",
                    self.input_chars, MAX_FORMULA_CHARS
                ),
                0,
            ));
        }
        if self.current_token != Token::Equals {
            return Err(self.error("Formula must start with '='"));
        }
        self.advance();

        if self.current_token == Token::EOF {
            return Ok(Expression::Literal(Value::String(String::new())));
        }

        let expr = self.parse_comparison()?;

        // Ensure we consumed all tokens
        if self.current_token != Token::EOF {
            return Err(self.error(format!(
                "Unexpected token after expression: {}",
                self.current_token
            )));
        }

        Ok(expr)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        self.current_pos = self.lexer.token_start();
        self.current_token = self.lexer.next_token();
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current_pos)
    }

    /// Checks if the current token matches the expected token.
    /// If it matches, advances and returns Ok. Otherwise returns an error.
    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "Expected {}, found {}",
                expected, self.current_token
            )))
        }
    }

    /// Opens one nesting level; paired with `leave`.
    fn enter(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error(format!(
                "Formula nests deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn count_operator(&mut self) -> ParseResult<()> {
        if self.operators >= MAX_OPERATORS {
            return Err(self.error(format!(
                "Formula has more than {} operators",
                MAX_OPERATORS
            )));
        }
        self.operators += 1;
        Ok(())
    }

    /// Parses one left-associative precedence level: `next (op next)*`.
    /// `operator` maps the current token to this level's operator, if any.
    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> ParseResult<Expression>,
        operator: fn(&Token) -> Option<BinaryOperator>,
    ) -> ParseResult<Expression> {
        let mut left = next(self)?;

        while let Some(op) = operator(&self.current_token) {
            self.count_operator()?;
            self.advance();
            let right = next(self)?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Lowest precedence: =, <>, <, >, <=, >=.
    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(Self::parse_concatenation, |token| match token {
            Token::Equals => Some(BinaryOperator::Equal),
            Token::NotEqual => Some(BinaryOperator::NotEqual),
            Token::LessThan => Some(BinaryOperator::LessThan),
            Token::GreaterThan => Some(BinaryOperator::GreaterThan),
            Token::LessEqual => Some(BinaryOperator::LessEqual),
            Token::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        })
    }

    fn parse_concatenation(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(Self::parse_additive, |token| match token {
            Token::Ampersand => Some(BinaryOperator::Concat),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(Self::parse_multiplicative, |token| match token {
            Token::Plus => Some(BinaryOperator::Add),
            Token::Minus => Some(BinaryOperator::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        self.parse_binary_level(Self::parse_power, |token| match token {
            Token::Asterisk => Some(BinaryOperator::Multiply),
            Token::Slash => Some(BinaryOperator::Divide),
            _ => None,
        })
    }

    /// Parses power/exponentiation expressions (^), right-associative:
    /// 2^3^2 is 2^(3^2).
    fn parse_power(&mut self) -> ParseResult<Expression> {
        let left = self.parse_unary()?;

        if self.current_token == Token::Caret {
            self.count_operator()?;
            self.advance();
            self.enter()?;
            let right = self.parse_power()?;
            self.leave();

            return Ok(Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Power,
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    /// Parses a single optional sign in front of a primary.
    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let op = match self.current_token {
            Token::Minus => UnaryOperator::Negate,
            Token::Plus => UnaryOperator::Plus,
            _ => return self.parse_primary(),
        };

        self.count_operator()?;
        self.advance();
        let operand = self.parse_primary()?;
        Ok(Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    /// Parses primary expressions (literals, references, function calls, parentheses).
    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match self.current_token.clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expression::Literal(Value::Number(n)))
            }

            Token::String(s) => {
                self.advance();
                Ok(Expression::Literal(Value::String(s)))
            }

            Token::Boolean(b) => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(b)))
            }

            Token::Error(e) => {
                self.advance();
                Ok(Expression::Literal(Value::Error(e)))
            }

            Token::CellRef(text) => {
                let address = parse_address(&text)
                    .ok_or_else(|| self.error(format!("Invalid cell reference: {}", text)))?;
                self.advance();
                Ok(Expression::CellRef(address))
            }

            Token::RangeRef(text) => {
                let range = parse_range(&text)
                    .ok_or_else(|| self.error(format!("Invalid range reference: {}", text)))?;
                self.advance();
                Ok(Expression::RangeRef(range))
            }

            Token::Function(name) => {
                self.advance();
                self.parse_function_call(name)
            }

            // Parenthesized expression
            Token::LParen => {
                self.advance();
                self.enter()?;
                let expr = self.parse_comparison()?;
                self.leave();
                self.expect(Token::RParen)?;
                Ok(expr)
            }

            // Error cases
            Token::EOF => Err(self.error("Unexpected end of expression")),

            Token::Illegal(ch) => Err(self.error(format!("Illegal character: {}", ch))),

            token => Err(self.error(format!("Unexpected token: {}", token))),
        }
    }

    /// Parses a function call like SUM(A1, A2, 10). The current token is '('.
    fn parse_function_call(&mut self, name: String) -> ParseResult<Expression> {
        self.expect(Token::LParen)?;
        self.enter()?;

        let mut args = Vec::new();

        // Handle empty argument list
        if self.current_token == Token::RParen {
            self.leave();
            self.advance();
            return Ok(Expression::FunctionCall { name, args });
        }

        args.push(self.parse_comparison()?);

        while self.current_token == Token::Comma {
            self.advance();
            args.push(self.parse_comparison()?);
        }

        self.leave();
        self.expect(Token::RParen)?;

        Ok(Expression::FunctionCall { name, args })
    }
}

/// Convenience function to parse a formula string directly.
pub fn parse(input: &str) -> ParseResult<Expression> {
    let mut parser = Parser::new(input);
    parser.parse()
}
