//! Type descriptors and the caller-owned registry used on decode.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::callable::NativeFn;
use crate::error::CallError;
use crate::value::{Object, Value};

/// Signature of a type method: receiver and arguments.
pub type MethodFn = dyn Fn(&Object, &[Value]) -> Result<Value, CallError> + Send + Sync;

/// Identity and behavior of a named object type.
///
/// An object bound to a descriptor is encoded with a `$type` tag carrying
/// the descriptor's name; decoding rebinds the tag to whichever descriptor
/// the registry holds under that name.
pub struct TypeDescriptor {
    name: String,
    methods: HashMap<String, Arc<MethodFn>>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    pub fn with_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Object, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<Arc<MethodFn>> {
        self.methods.get(name).cloned()
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Creates an empty instance of this type.
    pub fn instantiate(self: &Arc<Self>) -> Object {
        Object::with_type(self)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("methods", &methods)
            .finish()
    }
}

/// Name → descriptor mapping supplied by the caller on decode.
///
/// Also holds the native callables that `function <name>() { [native code] }`
/// markers resolve to. The registry is read-only during decode and can be
/// shared between threads.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: HashMap<String, Arc<TypeDescriptor>>,
    callables: HashMap<String, Arc<NativeFn>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, descriptor: Arc<TypeDescriptor>) -> Self {
        self.register_type(descriptor);
        self
    }

    /// Registers a descriptor under its name, returning the one it replaces.
    pub fn register_type(&mut self, descriptor: Arc<TypeDescriptor>) -> Option<Arc<TypeDescriptor>> {
        self.types.insert(descriptor.name().to_string(), descriptor)
    }

    pub fn get_type(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(name).cloned()
    }

    pub fn with_callable(mut self, callable: Arc<NativeFn>) -> Self {
        self.register_callable(callable);
        self
    }

    pub fn register_callable(&mut self, callable: Arc<NativeFn>) -> Option<Arc<NativeFn>> {
        self.callables.insert(callable.name().to_string(), callable)
    }

    pub fn get_callable(&self, name: &str) -> Option<Arc<NativeFn>> {
        self.callables.get(name).cloned()
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.callables.is_empty()
    }
}

impl FromIterator<Arc<TypeDescriptor>> for Registry {
    fn from_iter<I: IntoIterator<Item = Arc<TypeDescriptor>>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for descriptor in iter {
            registry.register_type(descriptor);
        }
        registry
    }
}
