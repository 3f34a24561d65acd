//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Scans a raw formula string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, number parsing, string literals, identifier
//! classification, error literals, and multi-character operators like <= and <>.
//!
//! SUPPORTED OPERATORS:
//! - Single char: + - * / ^ & ( ) , = < >
//! - Multi char: <= >= <>
//!
//! IDENTIFIERS:
//! `[A-Z$][A-Z$0-9:]*` (case-insensitive, normalized to uppercase) becomes
//! Function when immediately followed by `(`, RangeRef when it contains `:`,
//! and CellRef otherwise. Bare TRUE/FALSE become booleans.

use crate::ast::CellError;
use crate::token::Token;

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Skips whitespace and returns the byte offset where the next token starts.
    pub fn token_start(&mut self) -> usize {
        self.skip_whitespace();
        self.pos
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;
        match self.bump() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('^') => Token::Caret,
            Some('&') => Token::Ampersand,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some(',') => Token::Comma,
            Some('=') => Token::Equals,

            // Handle < and potentially <= or <>
            Some('<') => self.read_less_than_operator(),

            // Handle > and potentially >=
            Some('>') => self.read_greater_than_operator(),

            Some('"') => self.read_string(),

            Some('#') => self.read_error_literal(start),

            // Numbers start with a digit, or a dot followed by a digit
            Some(ch) if ch.is_ascii_digit() => self.read_number(start),
            Some('.') if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(start),

            Some(ch) if is_identifier_start(ch) => self.read_identifier(start),

            None => Token::EOF,

            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    /// Handles operators starting with '<': <, <=, <>
    fn read_less_than_operator(&mut self) -> Token {
        match self.peek() {
            Some('=') => {
                self.bump();
                Token::LessEqual
            }
            Some('>') => {
                self.bump();
                Token::NotEqual
            }
            _ => Token::LessThan,
        }
    }

    /// Handles operators starting with '>': >, >=
    fn read_greater_than_operator(&mut self) -> Token {
        match self.peek() {
            Some('=') => {
                self.bump();
                Token::GreaterEqual
            }
            _ => Token::GreaterThan,
        }
    }

    /// Reads a double-quoted string. A backslash escapes the next character.
    /// An unterminated string is illegal.
    fn read_string(&mut self) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                '"' => return Token::String(result),
                '\\' => match self.bump() {
                    Some(escaped) => result.push(escaped),
                    None => break,
                },
                other => result.push(other),
            }
        }
        Token::Illegal('"')
    }

    /// Reads an error literal such as `#REF!` or `#DIV/0!`.
    fn read_error_literal(&mut self, start: usize) -> Token {
        let rest = &self.input[start..];
        for code in CellError::LITERALS {
            if rest.len() >= code.len()
                && rest.is_char_boundary(code.len())
                && rest[..code.len()].eq_ignore_ascii_case(code)
            {
                if let Some(error) = CellError::from_code(code) {
                    self.pos = start + code.len();
                    return Token::Error(error);
                }
            }
        }
        Token::Illegal('#')
    }

    fn read_number(&mut self, start: usize) -> Token {
        let mut has_dot = self.input[start..].starts_with('.');

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.bump();
            } else if ch == '.' && !has_dot && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
                has_dot = true;
                self.bump();
            } else {
                break;
            }
        }

        match self.input[start..self.pos].parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Illegal(self.input[start..].chars().next().unwrap_or('.')),
        }
    }

    fn read_identifier(&mut self, start: usize) -> Token {
        while let Some(ch) = self.peek() {
            if is_identifier_continue(ch) {
                self.bump();
            } else {
                break;
            }
        }

        let ident = self.input[start..self.pos].to_uppercase();

        if self.peek() == Some('(') {
            return Token::Function(ident);
        }

        match ident.as_str() {
            "TRUE" => Token::Boolean(true),
            "FALSE" => Token::Boolean(false),
            _ if ident.contains(':') => Token::RangeRef(ident),
            _ => Token::CellRef(ident),
        }
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '$'
}

fn is_identifier_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '$' || ch == ':'
}
