//! Type tags and callable markers.
//!
//! After references are resolved, a second walk turns `$type` tags back
//! into type descriptors and callable markers back into callables. The walk
//! visits each array and object once, so it terminates on cyclic graphs and
//! running it twice changes nothing.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::callable::decode_marker;
use crate::error::{Error, Result};
use crate::options::DecodeOptions;
use crate::registry::Registry;
use crate::value::{Array, Object, Value};

/// Field name of a type tag.
pub const TYPE_KEY: &str = "$type";

/// Restores types and callables with default options.
pub fn restore(value: Value, registry: &Registry) -> Result<Value> {
    restore_with(value, registry, &DecodeOptions::default())
}

pub fn restore_with(value: Value, registry: &Registry, options: &DecodeOptions) -> Result<Value> {
    let mut restorer = Restorer {
        registry,
        options,
        visited: HashSet::new(),
        typed: 0,
        callables: 0,
    };
    let value = match restorer.callable(&value)? {
        Some(callable) => callable,
        None => {
            restorer.walk(&value, 0)?;
            value
        }
    };
    debug!(
        visited = restorer.visited.len(),
        typed = restorer.typed,
        callables = restorer.callables,
        "restore complete"
    );
    Ok(value)
}

struct Restorer<'a> {
    registry: &'a Registry,
    options: &'a DecodeOptions,
    visited: HashSet<usize>,
    typed: usize,
    callables: usize,
}

impl Restorer<'_> {
    fn walk(&mut self, value: &Value, depth: usize) -> Result<()> {
        let Some(id) = value.identity() else {
            return Ok(());
        };
        if !self.visited.insert(id) {
            return Ok(());
        }
        if depth > self.options.max_depth {
            return Err(Error::DepthExhaustion {
                limit: self.options.max_depth,
            });
        }
        match value {
            Value::Array(array) => self.walk_array(array, depth),
            Value::Object(object) => self.walk_object(object, depth),
            _ => Ok(()),
        }
    }

    fn walk_array(&mut self, array: &Array, depth: usize) -> Result<()> {
        for (index, item) in array.to_vec().into_iter().enumerate() {
            match self.callable(&item)? {
                Some(callable) => {
                    array.set(index, callable);
                }
                None => self.walk(&item, depth + 1)?,
            }
        }
        Ok(())
    }

    fn walk_object(&mut self, object: &Object, depth: usize) -> Result<()> {
        self.rebind_type(object)?;
        for (key, field) in object.entries() {
            match self.callable(&field)? {
                Some(callable) => {
                    object.set(key, callable);
                }
                None => self.walk(&field, depth + 1)?,
            }
        }
        Ok(())
    }

    fn rebind_type(&mut self, object: &Object) -> Result<()> {
        let Some(Value::String(name)) = object.get(TYPE_KEY) else {
            return Ok(());
        };
        let descriptor = self
            .registry
            .get_type(&name)
            .ok_or(Error::MissingTypeDescriptor { name })?;
        trace!(type_name = descriptor.name(), "rebinding type");
        object.set_descriptor(Some(descriptor));
        object.remove(TYPE_KEY);
        self.typed += 1;
        Ok(())
    }

    fn callable(&mut self, value: &Value) -> Result<Option<Value>> {
        let Value::String(text) = value else {
            return Ok(None);
        };
        let callable = decode_marker(text, self.registry, self.options.declared_functions)?;
        if callable.is_some() {
            self.callables += 1;
        }
        Ok(callable.map(Value::Callable))
    }
}
