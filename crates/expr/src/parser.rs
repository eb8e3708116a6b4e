//! Expression parser for template bindings.
//!
//! Supports a small scripting subset:
//! - literals: numbers, `'single'`/`"double"` strings, `true`, `false`, `null`, `undefined`
//! - identifiers and member access: `user.name`, `items[0]`, `items[idx].title`
//! - calls on ambient globals: `Math.max(a, b)`, `Date.now()`
//! - array literals: `[a, b, 1]`
//! - unary `!`, `-`, `+`
//! - binary `* / %`, `+ -`, `< <= > >=`, `== != === !==`, `&&`, `||`
//! - ternary `cond ? a : b` and parentheses

use core::fmt;

use weft_core::Value;

use crate::ast::{BinaryOp, Expr, UnaryOp};

/// Deepest nesting accepted, counted both in open groups and in the height
/// of the resulting tree. Evaluation recurses over the tree, so the limit
/// keeps both on the stack.
pub const MAX_DEPTH: usize = 128;

/// Error type for expression parsing.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for weft_core::Error {
    fn from(err: ParseError) -> Self {
        weft_core::Error::Expression {
            message: err.message,
            position: err.position,
        }
    }
}

/// Parses expression text into an AST.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(input);
    let expr = parser.parse_expression()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(expr),
        Some(c) => Err(ParseError::new(
            format!("Unexpected character '{}'", c),
            parser.pos,
        )),
    }
}

/// Parser state.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Consumes `token` if the remaining input starts with it.
    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if self.input[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(ParseError::new(
                format!("Expected '{}', found '{}'", expected, c),
                self.pos,
            )),
            None => Err(ParseError::new(
                format!("Expected '{}', found end of input", expected),
                self.pos,
            )),
        }
    }

    /// Runs `parse` one nesting level down.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new("Expression nested too deeply", self.pos));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn bounded(&self, expr: Expr) -> Result<Expr, ParseError> {
        if expr.depth() > MAX_DEPTH {
            return Err(ParseError::new("Expression nested too deeply", self.pos));
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_conditional)
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.parse_or()?;
        if self.eat("?") {
            let consequent = self.parse_expression()?;
            self.expect(':')?;
            let alternate = self.parse_expression()?;
            return self.bounded(Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            });
        }
        Ok(test)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat("||") {
            let right = self.parse_and()?;
            left = self.bounded(Expr::binary(left, BinaryOp::Or, right))?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat("&&") {
            let right = self.parse_equality()?;
            left = self.bounded(Expr::binary(left, BinaryOp::And, right))?;
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = if self.eat("===") {
                BinaryOp::StrictEq
            } else if self.eat("!==") {
                BinaryOp::StrictNe
            } else if self.eat("==") {
                BinaryOp::Eq
            } else if self.eat("!=") {
                BinaryOp::Ne
            } else {
                break;
            };
            let right = self.parse_relational()?;
            left = self.bounded(Expr::binary(left, op, right))?;
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.eat("<=") {
                BinaryOp::Le
            } else if self.eat(">=") {
                BinaryOp::Ge
            } else if self.eat("<") {
                BinaryOp::Lt
            } else if self.eat(">") {
                BinaryOp::Gt
            } else {
                break;
            };
            let right = self.parse_additive()?;
            left = self.bounded(Expr::binary(left, op, right))?;
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat("+") {
                BinaryOp::Add
            } else if self.eat("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = self.bounded(Expr::binary(left, op, right))?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat("*") {
                BinaryOp::Mul
            } else if self.eat("/") {
                BinaryOp::Div
            } else if self.eat("%") {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = self.bounded(Expr::binary(left, op, right))?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('!') => self.parse_prefixed(UnaryOp::Not),
            Some('-') => self.parse_prefixed(UnaryOp::Neg),
            Some('+') => self.parse_prefixed(UnaryOp::Plus),
            _ => self.parse_postfix(),
        }
    }

    fn parse_prefixed(&mut self, op: UnaryOp) -> Result<Expr, ParseError> {
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        self.bounded(Expr::unary(op, operand))
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('.') => {
                    self.advance();
                    let property = self.parse_property()?;
                    expr = self.bounded(Expr::Member {
                        object: Box::new(expr),
                        property,
                    })?;
                }
                Some('[') => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(']')?;
                    expr = self.bounded(Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    })?;
                }
                Some('(') => {
                    self.advance();
                    let args = self.parse_list(')')?;
                    expr = self.bounded(Expr::Call {
                        callee: Box::new(expr),
                        args,
                    })?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(')')?;
                Ok(expr)
            }
            Some('[') => {
                self.advance();
                let items = self.parse_list(']')?;
                self.bounded(Expr::Array(items))
            }
            Some('\'') | Some('"') => Ok(Expr::Literal(Value::String(
                self.parse_string_literal()?,
            ))),
            Some(c) if c.is_ascii_digit() => Ok(Expr::Literal(Value::Number(self.parse_number()?))),
            Some('.') if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                Ok(Expr::Literal(Value::Number(self.parse_number()?)))
            }
            Some(c) if is_identifier_start(c) => {
                let name = self.parse_identifier()?;
                Ok(match name.as_str() {
                    "true" => Expr::Literal(Value::Bool(true)),
                    "false" => Expr::Literal(Value::Bool(false)),
                    "null" => Expr::Literal(Value::Null),
                    "undefined" => Expr::Literal(Value::Undefined),
                    _ => Expr::Identifier(name),
                })
            }
            Some(c) => Err(ParseError::new(
                format!("Unexpected character '{}'", c),
                self.pos,
            )),
            None => Err(ParseError::new("Unexpected end of input", self.pos)),
        }
    }

    /// Parses a comma-separated list up to and including `close`.
    fn parse_list(&mut self, close: char) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(close) {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.advance(),
                Some(c) if c == close => {
                    self.advance();
                    return Ok(items);
                }
                Some(c) => {
                    return Err(ParseError::new(
                        format!("Expected ',' or '{}', found '{}'", close, c),
                        self.pos,
                    ))
                }
                None => {
                    return Err(ParseError::new(
                        format!("Expected '{}', found end of input", close),
                        self.pos,
                    ))
                }
            }
        }
    }

    /// A member name after `.`: an identifier or an array index (`items.0`).
    fn parse_property(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return self.parse_identifier();
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some(c) if is_identifier_start(c) => self.advance(),
            _ => return Err(ParseError::new("Expected identifier", self.pos)),
        }
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.advance();
            } else {
                break;
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                self.advance();
            } else {
                break;
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| ParseError::new("Invalid number", start))
    }

    fn parse_string_literal(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(ParseError::new("Expected string literal", self.pos)),
        };
        let start = self.pos;
        self.advance();

        let mut result = String::new();
        while let Some(c) = self.peek() {
            self.advance();
            if c == quote {
                return Ok(result);
            }
            if c == '\\' {
                let escaped = self
                    .peek()
                    .ok_or_else(|| ParseError::new("Unterminated string", start))?;
                self.advance();
                result.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            } else {
                result.push(c);
            }
        }
        Err(ParseError::new("Unterminated string", start))
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}
