//! Lambda source parser.

use serde_json::Number;
use thiserror::Error;

use super::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::callable::{FUNCTION_KEYWORD, NATIVE_BODY};
use crate::value::Value;

/// Maximum nesting of sub-expressions in one source text.
const MAX_NESTING: usize = 128;

const RESERVED: &[&str] = &["true", "false", "null", "undefined", "function", "return"];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected character {0:?} at {1}")]
    UnexpectedChar(char, usize),
    #[error("Unexpected end of input")]
    UnexpectedEnd,
    #[error("Expected {0}")]
    Expected(&'static str),
    #[error("Invalid number")]
    InvalidNumber,
    #[error("Invalid escape sequence")]
    InvalidEscape,
    #[error("Unclosed string")]
    UnclosedString,
    #[error("Reserved word {0} cannot be used as a name")]
    ReservedWord(String),
    #[error("Native function {0} has no source")]
    NativeBody(String),
    #[error("Expression nesting too deep")]
    TooDeep,
}

type Result<T> = std::result::Result<T, ParseError>;

/// Parsed `function` declaration. `body` is `None` for `[native code]`.
pub(crate) struct DeclaredParts {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Option<Expr>,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub(crate) struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    /// `x => expr`, `(a, b) => expr` or `(a) => { return expr; }`.
    pub fn parse_arrow(mut self) -> Result<(Vec<String>, Expr)> {
        self.skip_whitespace();
        let params = if self.peek() == Some('(') {
            self.parse_params()?
        } else {
            vec![self.parse_name()?]
        };
        self.skip_whitespace();
        if !self.peek_str("=>") {
            return Err(ParseError::Expected("=>"));
        }
        self.advance_by(2);
        let body = self.parse_body()?;
        self.finish()?;
        Ok((params, body))
    }

    /// `function name(a, b) { return expr; }` or
    /// `function name() { [native code] }`.
    pub fn parse_declared(mut self) -> Result<DeclaredParts> {
        self.skip_whitespace();
        if !self.eat_keyword(FUNCTION_KEYWORD) {
            return Err(ParseError::Expected("function"));
        }
        self.skip_whitespace();
        let name = if self.peek() == Some('(') {
            None
        } else {
            Some(self.parse_name()?)
        };
        self.skip_whitespace();
        let params = self.parse_params()?;
        self.skip_whitespace();
        self.expect('{')?;
        self.skip_whitespace();

        if self.peek_str(NATIVE_BODY) {
            self.advance_by(NATIVE_BODY.len());
            self.skip_whitespace();
            self.expect('}')?;
            self.finish()?;
            return Ok(DeclaredParts {
                name,
                params,
                body: None,
            });
        }

        let body = self.parse_block_tail()?;
        self.finish()?;
        Ok(DeclaredParts {
            name,
            params,
            body: Some(body),
        })
    }

    fn parse_body(&mut self) -> Result<Expr> {
        self.skip_whitespace();
        if self.peek() == Some('{') {
            self.advance();
            self.skip_whitespace();
            return self.parse_block_tail();
        }
        self.parse_expression()
    }

    /// `return expr; }` after the opening brace.
    fn parse_block_tail(&mut self) -> Result<Expr> {
        if !self.eat_keyword("return") {
            return Err(ParseError::Expected("return"));
        }
        let expr = self.parse_expression()?;
        self.skip_whitespace();
        if self.peek() == Some(';') {
            self.advance();
            self.skip_whitespace();
        }
        self.expect('}')?;
        Ok(expr)
    }

    fn parse_params(&mut self) -> Result<Vec<String>> {
        self.expect('(')?;
        let mut params = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.advance();
            return Ok(params);
        }
        loop {
            self.skip_whitespace();
            params.push(self.parse_name()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.advance(),
                Some(')') => {
                    self.advance();
                    break;
                }
                Some(c) => return Err(ParseError::UnexpectedChar(c, self.pos)),
                None => return Err(ParseError::UnexpectedEnd),
            }
        }
        Ok(params)
    }

    // ---------------------------------------------------------- Expressions

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::TooDeep);
        }
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Counts one more level of the tree being built by an operator,
    /// member or call chain. Callers restore `self.depth` once the chain
    /// is complete.
    fn deepen(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::TooDeep);
        }
        Ok(())
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        self.nested(Self::parse_conditional)
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let condition = self.parse_or()?;
        self.skip_whitespace();
        if self.peek() != Some('?') {
            return Ok(condition);
        }
        self.advance();
        let then = self.parse_expression()?;
        self.skip_whitespace();
        self.expect(':')?;
        let otherwise = self.parse_expression()?;
        Ok(Expr::Conditional(
            Box::new(condition),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut left = self.parse_and()?;
        loop {
            self.skip_whitespace();
            if !self.peek_str("||") {
                break;
            }
            self.advance_by(2);
            self.deepen()?;
            let right = self.parse_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut left = self.parse_equality()?;
        loop {
            self.skip_whitespace();
            if !self.peek_str("&&") {
                break;
            }
            self.advance_by(2);
            self.deepen()?;
            let right = self.parse_equality()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut left = self.parse_relational()?;
        loop {
            self.skip_whitespace();
            let (op, len) = if self.peek_str("===") {
                (BinaryOp::StrictEq, 3)
            } else if self.peek_str("!==") {
                (BinaryOp::StrictNe, 3)
            } else if self.peek_str("==") {
                (BinaryOp::Eq, 2)
            } else if self.peek_str("!=") {
                (BinaryOp::Ne, 2)
            } else {
                break;
            };
            self.advance_by(len);
            self.deepen()?;
            let right = self.parse_relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut left = self.parse_additive()?;
        loop {
            self.skip_whitespace();
            let (op, len) = if self.peek_str("<=") {
                (BinaryOp::Le, 2)
            } else if self.peek_str(">=") {
                (BinaryOp::Ge, 2)
            } else if self.peek_str("<") {
                (BinaryOp::Lt, 1)
            } else if self.peek_str(">") {
                (BinaryOp::Gt, 1)
            } else {
                break;
            };
            self.advance_by(len);
            self.deepen()?;
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('+') => BinaryOp::Add,
                Some('-') => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('*') => BinaryOp::Mul,
                Some('/') => BinaryOp::Div,
                Some('%') => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.skip_whitespace();
        let op = match self.peek() {
            Some('!') => UnaryOp::Not,
            Some('-') => UnaryOp::Neg,
            Some('+') => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            self.skip_whitespace();
            if matches!(self.peek(), Some('.' | '[' | '(')) {
                self.deepen()?;
            }
            match self.peek() {
                Some('.') => {
                    self.advance();
                    self.skip_whitespace();
                    let name = self.parse_identifier()?;
                    expr = Expr::Member(Box::new(expr), name);
                }
                Some('[') => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.skip_whitespace();
                    self.expect(']')?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Some('(') => {
                    self.advance();
                    let args = self.parse_list(')')?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                _ => break,
            }
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(ParseError::UnexpectedEnd),
            Some('(') => {
                self.advance();
                let expr = self.parse_expression()?;
                self.skip_whitespace();
                self.expect(')')?;
                Ok(expr)
            }
            Some('[') => {
                self.advance();
                Ok(Expr::Array(self.parse_list(']')?))
            }
            Some('"') | Some('\'') => Ok(Expr::Literal(Value::String(self.parse_string()?))),
            Some('0'..='9') | Some('.') => self.parse_number(),
            Some(c) if is_ident_start(c) => {
                let ident = self.parse_identifier()?;
                match ident.as_str() {
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                    "function" | "return" => Err(ParseError::ReservedWord(ident)),
                    _ => Ok(Expr::Ident(ident)),
                }
            }
            Some(c) => Err(ParseError::UnexpectedChar(c, self.pos)),
        }
    }

    /// Comma-separated expressions up to `close`; the opener is consumed.
    fn parse_list(&mut self, close: char) -> Result<Vec<Expr>> {
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
                    break;
                }
                Some(c) => return Err(ParseError::UnexpectedChar(c, self.pos)),
                None => return Err(ParseError::UnexpectedEnd),
            }
        }
        Ok(items)
    }

    fn parse_number(&mut self) -> Result<Expr> {
        let start = self.pos;
        let mut float = false;
        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }
        if self.peek() == Some('.') {
            float = true;
            self.advance();
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            float = true;
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            if !matches!(self.peek(), Some('0'..='9')) {
                return Err(ParseError::InvalidNumber);
            }
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }

        let text = &self.input[start..self.pos];
        if !float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Expr::Literal(Value::from(n)));
            }
        }
        let n: f64 = text.parse().map_err(|_| ParseError::InvalidNumber)?;
        Number::from_f64(n)
            .map(|n| Expr::Literal(Value::Number(n)))
            .ok_or(ParseError::InvalidNumber)
    }

    fn parse_string(&mut self) -> Result<String> {
        let quote = self.peek().ok_or(ParseError::UnexpectedEnd)?;
        self.advance();

        let mut result = String::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::UnclosedString),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some('"') => '"',
                        Some('u') => {
                            self.advance();
                            result.push(self.parse_unicode_escape()?);
                            continue;
                        }
                        _ => return Err(ParseError::InvalidEscape),
                    };
                    result.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    result.push(c);
                    self.advance();
                }
            }
        }
        Ok(result)
    }

    /// Four hex digits after `\u`. A high surrogate must be followed by
    /// `\u` and a low surrogate; the pair decodes to one character.
    fn parse_unicode_escape(&mut self) -> Result<char> {
        let unit = self.parse_hex4()?;
        if !(0xD800..0xDC00).contains(&unit) {
            return char::from_u32(unit).ok_or(ParseError::InvalidEscape);
        }
        if !self.peek_str("\\u") {
            return Err(ParseError::InvalidEscape);
        }
        self.advance_by(2);
        let low = self.parse_hex4()?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(ParseError::InvalidEscape);
        }
        char::from_u32(0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00))
            .ok_or(ParseError::InvalidEscape)
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let start = self.pos;
        for _ in 0..4 {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => self.advance(),
                _ => return Err(ParseError::InvalidEscape),
            }
        }
        u32::from_str_radix(&self.input[start..self.pos], 16)
            .map_err(|_| ParseError::InvalidEscape)
    }

    // --------------------------------------------------------------- Lexing

    fn parse_name(&mut self) -> Result<String> {
        let ident = self.parse_identifier()?;
        if RESERVED.contains(&ident.as_str()) {
            return Err(ParseError::ReservedWord(ident));
        }
        Ok(ident)
    }

    fn parse_identifier(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_ident_start(c) => self.advance(),
            Some(c) => return Err(ParseError::UnexpectedChar(c, self.pos)),
            None => return Err(ParseError::UnexpectedEnd),
        }
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.advance();
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if !self.peek_str(keyword) {
            return false;
        }
        let rest = &self.input[self.pos + keyword.len()..];
        if rest.starts_with(is_ident_continue) {
            return false;
        }
        self.pos += keyword.len();
        true
    }

    fn finish(&mut self) -> Result<()> {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(()),
            Some(c) => Err(ParseError::UnexpectedChar(c, self.pos)),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(ParseError::UnexpectedChar(c, self.pos)),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }
}
