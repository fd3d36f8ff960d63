//! Callable values and their string markers.
//!
//! Two kinds of callables exist:
//!
//! - [`Lambda`]: source text in a small expression language, evaluated by
//!   an interpreter. Arrow lambdas are written as `"_NuFrRa_" + source`;
//!   declared functions are written as their source, which starts with the
//!   `function` keyword.
//! - [`NativeFn`]: a Rust closure registered by name. It is written as
//!   `function <name>() { [native code] }` and looked up by name in the
//!   [`Registry`] on decode.
//!
//! No other text is ever turned back into a callable.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{CallError, Error, Result};
use crate::lambda::{Declaration, Lambda, LambdaKind, MAX_CALL_DEPTH};
use crate::registry::Registry;
use crate::value::Value;

/// Prefix of an arrow lambda marker.
pub const ARROW_PREFIX: &str = "_NuFrRa_";

/// Keyword that starts a declared function marker.
pub const FUNCTION_KEYWORD: &str = "function";

/// Body of a native callable marker.
pub const NATIVE_BODY: &str = "[native code]";

/// Signature of a native callable.
pub type NativeFnBody = dyn Fn(&[Value]) -> std::result::Result<Value, CallError> + Send + Sync;

/// A Rust closure that can be encoded by name.
pub struct NativeFn {
    name: String,
    body: Arc<NativeFnBody>,
}

impl NativeFn {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, CallError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> std::result::Result<Value, CallError> {
        (self.body)(args)
    }

    /// Marker text, shaped like the source of a host-provided function.
    pub fn source(&self) -> String {
        format!("{FUNCTION_KEYWORD} {}() {{ {NATIVE_BODY} }}", self.name)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").field("name", &self.name).finish()
    }
}

/// A callable graph value.
#[derive(Clone)]
pub enum Callable {
    Lambda(Rc<Lambda>),
    Native(Arc<NativeFn>),
}

impl Callable {
    /// Parses arrow (`(x) => x + 1`) or declared
    /// (`function inc(x) { return x + 1; }`) lambda source.
    pub fn parse(source: &str) -> Result<Callable> {
        Lambda::parse(source)
            .map(|lambda| Callable::Lambda(Rc::new(lambda)))
            .map_err(|e| Error::CallableReconstruction {
                source_text: source.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn native<F>(name: impl Into<String>, body: F) -> Callable
    where
        F: Fn(&[Value]) -> std::result::Result<Value, CallError> + Send + Sync + 'static,
    {
        Callable::Native(Arc::new(NativeFn::new(name, body)))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Callable::Lambda(lambda) => lambda.name(),
            Callable::Native(native) => Some(native.name()),
        }
    }

    /// Source text as it would be shown by the host language.
    pub fn source(&self) -> String {
        match self {
            Callable::Lambda(lambda) => lambda.source().to_string(),
            Callable::Native(native) => native.source(),
        }
    }

    pub fn call(&self, args: &[Value]) -> std::result::Result<Value, CallError> {
        self.invoke(args, 0)
    }

    pub(crate) fn invoke(&self, args: &[Value], depth: usize) -> std::result::Result<Value, CallError> {
        if depth > MAX_CALL_DEPTH {
            return Err(CallError::DepthExceeded(MAX_CALL_DEPTH));
        }
        match self {
            Callable::Lambda(lambda) => Lambda::invoke(lambda, args, depth),
            Callable::Native(native) => native.call(args),
        }
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Lambda(a), Callable::Lambda(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(a), Callable::Native(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// String marker written in place of the callable.
    pub fn to_marker(&self) -> String {
        match self {
            Callable::Lambda(lambda) => match lambda.kind() {
                LambdaKind::Arrow => format!("{ARROW_PREFIX}{}", lambda.source()),
                LambdaKind::Declared => lambda.source().to_string(),
            },
            Callable::Native(native) => native.source(),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.source())
    }
}

/// Returns `true` when `text` starts with the `function` keyword.
pub fn is_declared_function(text: &str) -> bool {
    match text.strip_prefix(FUNCTION_KEYWORD) {
        Some(rest) => rest.starts_with(|c: char| c.is_whitespace() || c == '('),
        None => false,
    }
}

/// Turns a marker string back into a callable.
///
/// Returns `Ok(None)` for ordinary strings. With `declared_functions` off,
/// only arrow markers are recognized.
pub fn decode_marker(
    text: &str,
    registry: &Registry,
    declared_functions: bool,
) -> Result<Option<Callable>> {
    let failure = |reason: String| Error::CallableReconstruction {
        source_text: text.to_string(),
        reason,
    };

    if let Some(source) = text.strip_prefix(ARROW_PREFIX) {
        let lambda = Lambda::parse_arrow(source).map_err(|e| failure(e.to_string()))?;
        return Ok(Some(Callable::Lambda(Rc::new(lambda))));
    }

    if !declared_functions || !is_declared_function(text) {
        return Ok(None);
    }

    match Lambda::parse_declared(text).map_err(|e| failure(e.to_string()))? {
        Declaration::Lambda(lambda) => Ok(Some(Callable::Lambda(Rc::new(lambda)))),
        Declaration::Native(name) => registry
            .get_callable(&name)
            .map(|native| Some(Callable::Native(native)))
            .ok_or_else(|| failure(format!("no native callable registered as {name:?}"))),
    }
}
