//! Lambda interpreter.
//!
//! Coercions follow the host language the markers come from: `+` joins
//! strings when either side is one, other arithmetic works on numbers,
//! `==` is strict, and reading a member of a non-object yields `null`.

use std::cmp::Ordering;
use std::rc::Rc;

use serde_json::Number;

use super::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use super::{Lambda, MAX_CALL_DEPTH};
use crate::callable::Callable;
use crate::error::CallError;
use crate::value::Value;

/// Largest integer exactly representable as an `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(crate) struct Scope<'a> {
    pub lambda: &'a Rc<Lambda>,
    pub args: &'a [Value],
    pub depth: usize,
}

/// Evaluates the lambda body. Every sub-expression and every call counts
/// one level against [`MAX_CALL_DEPTH`].
pub(crate) fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Value, CallError> {
    eval_at(expr, scope, scope.depth)
}

fn eval_at(expr: &Expr, scope: &Scope<'_>, depth: usize) -> Result<Value, CallError> {
    if depth > MAX_CALL_DEPTH {
        return Err(CallError::DepthExceeded(MAX_CALL_DEPTH));
    }
    let next = depth + 1;
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Array(items) => Ok(Value::from(eval_all(items, scope, next)?)),
        Expr::Ident(name) => lookup(name, scope),
        Expr::Member(target, name) => member(&eval_at(target, scope, next)?, name),
        Expr::Index(target, index) => {
            let target = eval_at(target, scope, next)?;
            let index = eval_at(index, scope, next)?;
            element(&target, &index)
        }
        Expr::Call(callee, args) => call(callee, args, scope, next),
        Expr::Unary(op, operand) => {
            let value = eval_at(operand, scope, next)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!truthy(&value)),
                UnaryOp::Neg => number(-to_number(&value)),
                UnaryOp::Plus => number(to_number(&value)),
            })
        }
        Expr::Binary(op, left, right) => {
            let left = eval_at(left, scope, next)?;
            let right = eval_at(right, scope, next)?;
            Ok(binary(*op, &left, &right))
        }
        Expr::Logical(op, left, right) => {
            let left = eval_at(left, scope, next)?;
            match (op, truthy(&left)) {
                (LogicalOp::And, true) | (LogicalOp::Or, false) => eval_at(right, scope, next),
                _ => Ok(left),
            }
        }
        Expr::Conditional(condition, then, otherwise) => {
            if truthy(&eval_at(condition, scope, next)?) {
                eval_at(then, scope, next)
            } else {
                eval_at(otherwise, scope, next)
            }
        }
    }
}

fn eval_all(exprs: &[Expr], scope: &Scope<'_>, depth: usize) -> Result<Vec<Value>, CallError> {
    exprs.iter().map(|e| eval_at(e, scope, depth)).collect()
}

fn lookup(name: &str, scope: &Scope<'_>) -> Result<Value, CallError> {
    if let Some(i) = scope.lambda.params().iter().position(|p| p == name) {
        return Ok(scope.args.get(i).cloned().unwrap_or_default());
    }
    if scope.lambda.name() == Some(name) {
        return Ok(Value::Callable(Callable::Lambda(Rc::clone(scope.lambda))));
    }
    Err(CallError::UnboundIdentifier(name.to_string()))
}

fn call(callee: &Expr, args: &[Expr], scope: &Scope<'_>, depth: usize) -> Result<Value, CallError> {
    if let Expr::Member(target, name) = callee {
        let receiver = eval_at(target, scope, depth)?;
        let args = eval_all(args, scope, depth)?;
        return match &receiver {
            Value::Object(object) => object.call_method_at(name, &args, depth),
            other => match member(other, name)? {
                Value::Callable(callable) => callable.invoke(&args, depth),
                _ => Err(CallError::NotCallable(format!("{}.{name}", other.type_of()))),
            },
        };
    }
    let function = eval_at(callee, scope, depth)?;
    let args = eval_all(args, scope, depth)?;
    match function {
        Value::Callable(callable) => callable.invoke(&args, depth),
        other => Err(CallError::NotCallable(other.type_of().to_string())),
    }
}

fn member(target: &Value, name: &str) -> Result<Value, CallError> {
    match target {
        Value::Object(object) => Ok(object.get(name).unwrap_or_default()),
        Value::Array(array) if name == "length" => Ok(Value::from(array.len())),
        Value::String(s) if name == "length" => Ok(Value::from(s.encode_utf16().count())),
        Value::Null => Err(CallError::TypeMismatch(format!(
            "Cannot read properties of null (reading '{name}')"
        ))),
        _ => Ok(Value::Null),
    }
}

fn element(target: &Value, index: &Value) -> Result<Value, CallError> {
    match (target, index) {
        (Value::Array(array), Value::Number(n)) => {
            Ok(as_index(n).and_then(|i| array.get(i)).unwrap_or_default())
        }
        (Value::String(s), Value::Number(n)) => Ok(as_index(n)
            .and_then(|i| code_unit_at(s, i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default()),
        (target, index) => member(target, &to_string(index)),
    }
}

/// Character at UTF-16 offset `index`, the unit `.length` counts in. Half
/// of a surrogate pair reads as U+FFFD.
fn code_unit_at(s: &str, index: usize) -> Option<char> {
    let unit = s.encode_utf16().nth(index)?;
    char::decode_utf16([unit])
        .next()
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
}

fn as_index(n: &Number) -> Option<usize> {
    if let Some(i) = n.as_u64() {
        return usize::try_from(i).ok();
    }
    match n.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= MAX_SAFE_INTEGER => Some(f as usize),
        _ => None,
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                Value::String(to_string(left) + &to_string(right))
            } else {
                number(to_number(left) + to_number(right))
            }
        }
        BinaryOp::Sub => number(to_number(left) - to_number(right)),
        BinaryOp::Mul => number(to_number(left) * to_number(right)),
        BinaryOp::Div => number(to_number(left) / to_number(right)),
        BinaryOp::Rem => number(to_number(left) % to_number(right)),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::StrictEq | BinaryOp::Eq => Value::Bool(left == right),
        BinaryOp::StrictNe | BinaryOp::Ne => Value::Bool(left != right),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => to_number(left).partial_cmp(&to_number(right)),
    }
}

/// Numeric result: integral values in the safe range become integers so
/// that `1 + 1` compares equal to the literal `2`. NaN and infinities
/// become `null`.
pub(crate) fn number(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

pub(crate) fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) | Value::Callable(_) => f64::NAN,
    }
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) | Value::Callable(_) => true,
    }
}

pub(crate) fn to_string(value: &Value) -> String {
    to_string_inner(value, &mut Vec::new())
}

fn to_string_inner(value: &Value, ancestors: &mut Vec<usize>) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Callable(c) => c.source(),
        Value::Array(array) => {
            // Cyclic and null elements join as empty strings.
            if ancestors.contains(&array.id()) {
                return String::new();
            }
            ancestors.push(array.id());
            let parts: Vec<String> = array
                .to_vec()
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    other => to_string_inner(other, ancestors),
                })
                .collect();
            ancestors.pop();
            parts.join(",")
        }
    }
}

fn format_number(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
                return (f as i64).to_string();
            }
        }
    }
    n.to_string()
}
