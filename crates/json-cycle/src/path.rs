//! Reference paths.
//!
//! A path locates a value by walking from the root: `$` followed by any
//! number of `[<index>]` or `["<key>"]` accessors, for example
//! `$["books"][0]["library"]`. Keys are JSON strings. Nothing else is
//! accepted; resolution is a plain accessor walk.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::value::Value;

/// Root marker.
pub const ROOT: &str = "$";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Expected root identifier '$' at start")]
    ExpectedRoot,
    #[error("Unexpected character: {0}")]
    UnexpectedChar(char),
    #[error("Unexpected end of input")]
    UnexpectedEnd,
    #[error("Invalid index")]
    InvalidIndex,
    #[error("Invalid escape sequence")]
    InvalidEscape,
    #[error("Unclosed string")]
    UnclosedString,
    #[error("Control character in key")]
    ControlCharacter,
}

/// One accessor of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Array element: `[0]`
    Index(usize),
    /// Object field: `["name"]`
    Key(String),
}

impl From<usize> for PathStep {
    fn from(index: usize) -> Self {
        PathStep::Index(index)
    }
}

impl From<&str> for PathStep {
    fn from(key: &str) -> Self {
        PathStep::Key(key.to_string())
    }
}

impl From<String> for PathStep {
    fn from(key: String) -> Self {
        PathStep::Key(key)
    }
}

/// Appends the textual form of `step` to `out`.
pub fn write_step(out: &mut String, step: &PathStep) {
    out.push('[');
    match step {
        PathStep::Index(index) => out.push_str(&index.to_string()),
        PathStep::Key(key) => out.push_str(&serde_json::Value::from(key.as_str()).to_string()),
    }
    out.push(']');
}

/// A parsed reference path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    pub fn parse(input: &str) -> Result<Path, PathError> {
        PathParser::parse(input)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, step: impl Into<PathStep>) {
        self.steps.push(step.into());
    }

    pub fn child(&self, step: impl Into<PathStep>) -> Path {
        let mut path = self.clone();
        path.push(step);
        path
    }

    /// Walks `root` along the path's accessors.
    ///
    /// Indexes only address arrays and keys only address objects; any other
    /// combination, or a missing element, yields `None`.
    pub fn resolve(&self, root: &Value) -> Option<Value> {
        let mut current = root.clone();
        for step in &self.steps {
            current = match (step, &current) {
                (PathStep::Index(index), Value::Array(array)) => array.get(*index)?,
                (PathStep::Key(key), Value::Object(object)) => object.get(key)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from(ROOT);
        for step in &self.steps {
            write_step(&mut out, step);
        }
        f.write_str(&out)
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

/// Returns `true` when `input` matches the path grammar.
pub fn is_path(input: &str) -> bool {
    Path::parse(input).is_ok()
}

struct PathParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn parse(input: &'a str) -> Result<Path, PathError> {
        let mut parser = Self { input, pos: 0 };
        parser.parse_path()
    }

    fn parse_path(&mut self) -> Result<Path, PathError> {
        if self.peek() != Some('$') {
            return Err(PathError::ExpectedRoot);
        }
        self.advance();

        let mut steps = Vec::new();
        while !self.is_at_end() {
            self.expect('[')?;
            let step = match self.peek() {
                Some('0'..='9') => PathStep::Index(self.parse_index()?),
                Some('"') => PathStep::Key(self.parse_key()?),
                Some(c) => return Err(PathError::UnexpectedChar(c)),
                None => return Err(PathError::UnexpectedEnd),
            };
            self.expect(']')?;
            steps.push(step);
        }
        Ok(Path { steps })
    }

    fn parse_index(&mut self) -> Result<usize, PathError> {
        let start = self.pos;
        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }
        self.input[start..self.pos]
            .parse::<usize>()
            .map_err(|_| PathError::InvalidIndex)
    }

    /// Scans a JSON string literal and decodes it with `serde_json`.
    fn parse_key(&mut self) -> Result<String, PathError> {
        let start = self.pos;
        self.advance();
        loop {
            match self.peek() {
                None => return Err(PathError::UnclosedString),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => self.advance(),
                        Some('u') => {
                            self.advance();
                            for _ in 0..4 {
                                match self.peek() {
                                    Some(c) if c.is_ascii_hexdigit() => self.advance(),
                                    _ => return Err(PathError::InvalidEscape),
                                }
                            }
                        }
                        _ => return Err(PathError::InvalidEscape),
                    }
                }
                Some(c) if (c as u32) < 0x20 => return Err(PathError::ControlCharacter),
                Some(_) => self.advance(),
            }
        }
        serde_json::from_str::<String>(&self.input[start..self.pos])
            .map_err(|_| PathError::InvalidEscape)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect(&mut self, expected: char) -> Result<(), PathError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(PathError::UnexpectedChar(c)),
            None => Err(PathError::UnexpectedEnd),
        }
    }
}
