//! Graph values.
//!
//! Arrays and objects are shared handles: cloning an [`Array`] or [`Object`]
//! clones the reference, so two fields can point at the same allocation and
//! an object can (indirectly) contain itself. The allocation address is the
//! value's identity.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Number;

use crate::callable::Callable;
use crate::error::CallError;
use crate::registry::TypeDescriptor;

/// A node of an object graph.
///
/// `PartialEq` is strict equality: primitives compare by value, arrays,
/// objects and callables by identity. Use [`deep_equal`] for structural
/// comparison.
///
/// Arrays and objects are reference counted. A graph containing a cycle
/// keeps itself alive after the last outside handle is dropped; call
/// [`Value::clear_graph`] once such a graph is no longer needed.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Array),
    Object(Object),
    Callable(Callable),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Arrays and objects, the values that carry an identity.
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// Field `key` of an object value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Element `index` of an array value.
    pub fn at(&self, index: usize) -> Option<Value> {
        self.as_array().and_then(|a| a.get(index))
    }

    /// Allocation identity of an array or object.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(a.id()),
            Value::Object(o) => Some(o.id()),
            _ => None,
        }
    }

    /// Name of the value's kind, as reported in error messages.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Callable(_) => "function",
        }
    }

    /// Invokes a callable value.
    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        match self {
            Value::Callable(c) => c.call(args),
            other => Err(CallError::NotCallable(other.type_of().to_string())),
        }
    }

    /// Empties every array and object reachable from this value and unbinds
    /// their types, which breaks all reference cycles in the graph.
    ///
    /// Other handles into the graph see empty containers afterwards.
    pub fn clear_graph(&self) {
        let mut seen = HashSet::new();
        let mut pending = vec![self.clone()];
        while let Some(value) = pending.pop() {
            match value {
                Value::Array(array) => {
                    if seen.insert(array.id()) {
                        pending.extend(std::mem::take(&mut *array.0.borrow_mut()));
                    }
                }
                Value::Object(object) => {
                    if seen.insert(object.id()) {
                        let mut data = object.0.borrow_mut();
                        data.descriptor = None;
                        pending.extend(std::mem::take(&mut data.fields).into_values());
                    }
                }
                _ => {}
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    a == b || matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
}

// ------------------------------------------------------------------ Array

/// A shared, mutable sequence of values.
#[derive(Clone, Default)]
pub struct Array(Rc<RefCell<Vec<Value>>>);

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Array(Rc::new(RefCell::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Replaces element `index`. Returns `false` when out of range.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> bool {
        match self.0.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().push(value.into());
    }

    /// Snapshot of the elements (element handles are shared, not copied).
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Value::Array(self.clone()), f)
    }
}

// ----------------------------------------------------------------- Object

#[derive(Default)]
struct ObjectData {
    descriptor: Option<Arc<TypeDescriptor>>,
    fields: IndexMap<String, Value>,
}

/// A shared, mutable record of named fields with an optional type.
///
/// Fields keep insertion order; that order is the enumeration order used by
/// the encoder and the resolver. An object without a type descriptor is a
/// plain object.
#[derive(Clone, Default)]
pub struct Object(Rc<RefCell<ObjectData>>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty instance of `descriptor`'s type.
    pub fn with_type(descriptor: &Arc<TypeDescriptor>) -> Self {
        Object(Rc::new(RefCell::new(ObjectData {
            descriptor: Some(Arc::clone(descriptor)),
            fields: IndexMap::new(),
        })))
    }

    /// Builder-style [`Object::set`].
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().fields.get(key).cloned()
    }

    /// Sets a field, returning the previous value. New fields go last.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().fields.insert(key.into(), value.into())
    }

    /// Removes a field, keeping the order of the remaining ones.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().fields.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().fields.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().fields.keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().fields.is_empty()
    }

    pub fn descriptor(&self) -> Option<Arc<TypeDescriptor>> {
        self.0.borrow().descriptor.clone()
    }

    pub fn type_name(&self) -> Option<String> {
        self.0.borrow().descriptor.as_ref().map(|d| d.name().to_string())
    }

    /// Rebinds the object's type without touching its fields.
    pub fn set_descriptor(&self, descriptor: Option<Arc<TypeDescriptor>>) {
        self.0.borrow_mut().descriptor = descriptor;
    }

    pub fn is_instance_of(&self, descriptor: &Arc<TypeDescriptor>) -> bool {
        matches!(&self.0.borrow().descriptor, Some(d) if Arc::ptr_eq(d, descriptor))
    }

    /// Calls method `name` with `args`.
    ///
    /// A callable stored in an own field of that name wins over the type
    /// descriptor's method.
    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, CallError> {
        self.call_method_at(name, args, 0)
    }

    pub(crate) fn call_method_at(
        &self,
        name: &str,
        args: &[Value],
        depth: usize,
    ) -> Result<Value, CallError> {
        match self.get(name) {
            Some(Value::Callable(callable)) => return callable.invoke(args, depth),
            Some(other) if !other.is_null() => {
                return Err(CallError::NotCallable(format!("{name} ({})", other.type_of())))
            }
            _ => {}
        }
        let method = self.descriptor().and_then(|d| d.method(name));
        match method {
            Some(method) => method(self, args),
            None => Err(CallError::NoSuchMethod {
                type_name: self.type_name().unwrap_or_else(|| "Object".to_string()),
                name: name.to_string(),
            }),
        }
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Value::Object(self.clone()), f)
    }
}

// ------------------------------------------------------------------ Debug

/// Debug view that prints `<cycle>` instead of re-entering an ancestor.
struct Shown<'a> {
    value: &'a Value,
    ancestors: &'a RefCell<Vec<usize>>,
}

impl Shown<'_> {
    fn enter(&self, id: usize) -> bool {
        let mut ancestors = self.ancestors.borrow_mut();
        if ancestors.contains(&id) {
            return false;
        }
        ancestors.push(id);
        true
    }

    fn leave(&self) {
        self.ancestors.borrow_mut().pop();
    }
}

impl fmt::Debug for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Callable(c) => write!(f, "{c:?}"),
            Value::Array(array) => {
                if !self.enter(array.id()) {
                    return f.write_str("<cycle>");
                }
                let items = array.to_vec();
                let result = f
                    .debug_list()
                    .entries(items.iter().map(|value| Shown {
                        value,
                        ancestors: self.ancestors,
                    }))
                    .finish();
                self.leave();
                result
            }
            Value::Object(object) => {
                if !self.enter(object.id()) {
                    return f.write_str("<cycle>");
                }
                if let Some(name) = object.type_name() {
                    write!(f, "{name} ")?;
                }
                let entries = object.entries();
                let result = f
                    .debug_map()
                    .entries(entries.iter().map(|(key, value)| {
                        (
                            key,
                            Shown {
                                value,
                                ancestors: self.ancestors,
                            },
                        )
                    }))
                    .finish();
                self.leave();
                result
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ancestors = RefCell::new(Vec::new());
        fmt::Debug::fmt(
            &Shown {
                value: self,
                ancestors: &ancestors,
            },
            f,
        )
    }
}

// ------------------------------------------------------------- Deep equal

/// Structural equality of two graphs.
///
/// Objects must have the same type name and the same field set; arrays the
/// same elements in order; callables the same source text. Pairs already
/// under comparison are assumed equal, so cyclic graphs terminate.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    deep_equal_inner(a, b, &mut HashSet::new())
}

fn deep_equal_inner(a: &Value, b: &Value, seen: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Callable(x), Value::Callable(y)) => x.ptr_eq(y) || x.source() == y.source(),

        (Value::Array(x), Value::Array(y)) => {
            if x.ptr_eq(y) || !seen.insert((x.id(), y.id())) {
                return true;
            }
            let (xs, ys) = (x.to_vec(), y.to_vec());
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(x, y)| deep_equal_inner(x, y, seen))
        }

        (Value::Object(x), Value::Object(y)) => {
            if x.ptr_eq(y) || !seen.insert((x.id(), y.id())) {
                return true;
            }
            if x.type_name() != y.type_name() || x.len() != y.len() {
                return false;
            }
            for (key, value) in x.entries() {
                match y.get(&key) {
                    Some(other) => {
                        if !deep_equal_inner(&value, &other, seen) {
                            return false;
                        }
                    }
                    None => return false,
                }
            }
            true
        }

        _ => false,
    }
}

// ------------------------------------------------------------ Conversions

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<f64> for Value {
    /// Non-finite numbers become `null`, as in JSON text.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Callable(c)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Array::from_vec(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    /// Builds a tree with one fresh allocation per array/object.
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(Array::from_vec(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(map) => {
                let object = Object::new();
                for (key, value) in map {
                    object.set(key, Value::from(value));
                }
                Value::Object(object)
            }
        }
    }
}
