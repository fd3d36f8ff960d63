//! A small, closed expression language for callable values.
//!
//! Callables travel as source text, so decoding one means parsing it.
//! Only a fixed grammar is understood: single-expression arrow functions
//! and `function` declarations whose body is one `return` statement.
//! Identifiers resolve to the lambda's own parameters or its own name;
//! there is no access to any ambient scope.
//!
//! ```
//! use json_cycle::{Callable, Value};
//!
//! let double = Callable::parse("(x) => x * 2").unwrap();
//! assert_eq!(double.call(&[Value::from(21)]).unwrap(), Value::from(42));
//! ```

mod ast;
mod eval;
mod parser;

use std::rc::Rc;

pub use ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
pub use parser::ParseError;

use crate::callable::is_declared_function;
use crate::error::CallError;
use crate::value::Value;

use eval::Scope;
use parser::Parser;

/// Maximum nesting of calls and sub-expressions during one evaluation.
pub const MAX_CALL_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaKind {
    /// `(x) => x + 1`
    Arrow,
    /// `function inc(x) { return x + 1; }`
    Declared,
}

/// A parsed lambda together with its source text.
#[derive(Debug)]
pub struct Lambda {
    kind: LambdaKind,
    name: Option<String>,
    params: Vec<String>,
    body: Expr,
    source: String,
}

/// Result of parsing a `function` declaration.
#[derive(Debug)]
pub enum Declaration {
    Lambda(Lambda),
    /// `function name() { [native code] }`
    Native(String),
}

impl Lambda {
    /// Parses either form. Native declarations are rejected here since they
    /// carry no body.
    pub fn parse(source: &str) -> Result<Lambda, ParseError> {
        if !is_declared_function(source.trim_start()) {
            return Lambda::parse_arrow(source);
        }
        match Lambda::parse_declared(source)? {
            Declaration::Lambda(lambda) => Ok(lambda),
            Declaration::Native(name) => Err(ParseError::NativeBody(name)),
        }
    }

    pub fn parse_arrow(source: &str) -> Result<Lambda, ParseError> {
        let (params, body) = Parser::new(source).parse_arrow()?;
        Ok(Lambda {
            kind: LambdaKind::Arrow,
            name: None,
            params,
            body,
            source: source.to_string(),
        })
    }

    pub fn parse_declared(source: &str) -> Result<Declaration, ParseError> {
        let parts = Parser::new(source).parse_declared()?;
        match parts.body {
            Some(body) => Ok(Declaration::Lambda(Lambda {
                kind: LambdaKind::Declared,
                name: parts.name,
                params: parts.params,
                body,
                source: source.to_string(),
            })),
            None => parts
                .name
                .map(Declaration::Native)
                .ok_or(ParseError::NativeBody("<anonymous>".to_string())),
        }
    }

    pub fn kind(&self) -> LambdaKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Missing arguments read as `null`; extra ones are ignored.
    pub(crate) fn invoke(
        lambda: &Rc<Lambda>,
        args: &[Value],
        depth: usize,
    ) -> Result<Value, CallError> {
        let scope = Scope {
            lambda,
            args,
            depth,
        };
        eval::evaluate(&lambda.body, &scope)
    }
}
