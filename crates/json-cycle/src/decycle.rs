//! Path-indexed encoder.
//!
//! Walks a graph depth-first and builds a JSON tree. The first time an
//! array or object is reached it is expanded and its path recorded; every
//! later encounter of the same allocation is written as
//! `{"$ref": "<path>"}` instead.

use std::collections::HashMap;

use serde_json::Map;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::options::EncodeOptions;
use crate::path::{write_step, PathStep, ROOT};
use crate::restore::TYPE_KEY;
use crate::retrocycle::REF_KEY;
use crate::value::Value;

/// Encodes `root` into a JSON tree with reference markers.
///
/// # Example
///
/// ```
/// use json_cycle::{decycle, Array, Value};
///
/// let list = Array::new();
/// list.push(list.clone());
/// let json = decycle(&Value::Array(list)).unwrap();
/// assert_eq!(json.to_string(), r#"[{"$ref":"$"}]"#);
/// ```
pub fn decycle(root: &Value) -> Result<serde_json::Value> {
    decycle_with(root, |value| value, &EncodeOptions::default())
}

/// Like [`decycle`], passing every value through `transform` before it is
/// encoded. The transform sees the value at each position, including the
/// root, and its result is what gets written.
pub fn decycle_with<F>(
    root: &Value,
    transform: F,
    options: &EncodeOptions,
) -> Result<serde_json::Value>
where
    F: FnMut(Value) -> Value,
{
    let mut encoder = Encoder {
        transform,
        seen: HashMap::new(),
        path: String::from(ROOT),
        max_depth: options.max_depth,
    };
    let json = encoder.encode(root.clone(), 0)?;
    debug!(composites = encoder.seen.len(), "decycle complete");
    Ok(json)
}

struct Encoder<F> {
    transform: F,
    /// Identity → (handle, path of first expansion). The handle keeps the
    /// allocation alive so that its address cannot be reused mid-pass.
    seen: HashMap<usize, (Value, String)>,
    path: String,
    max_depth: usize,
}

impl<F> Encoder<F>
where
    F: FnMut(Value) -> Value,
{
    fn encode(&mut self, value: Value, depth: usize) -> Result<serde_json::Value> {
        let value = (self.transform)(value);

        if let Some(id) = value.identity() {
            if let Some((_, path)) = self.seen.get(&id) {
                trace!(at = %self.path, target = %path, "shared reference");
                return Ok(ref_marker(path));
            }
            if depth > self.max_depth {
                return Err(Error::DepthExhaustion {
                    limit: self.max_depth,
                });
            }
            self.seen.insert(id, (value.clone(), self.path.clone()));
        }

        Ok(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Callable(callable) => serde_json::Value::String(callable.to_marker()),
            Value::Array(array) => {
                let items = array.to_vec();
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    out.push(self.encode_child(PathStep::Index(index), item, depth)?);
                }
                serde_json::Value::Array(out)
            }
            Value::Object(object) => {
                let mut out = Map::new();
                if let Some(name) = object.type_name() {
                    out.insert(TYPE_KEY.to_string(), serde_json::Value::String(name));
                }
                for (key, field) in object.entries() {
                    let encoded = self.encode_child(PathStep::Key(key.clone()), field, depth)?;
                    out.insert(key, encoded);
                }
                serde_json::Value::Object(out)
            }
        })
    }

    fn encode_child(
        &mut self,
        step: PathStep,
        value: Value,
        depth: usize,
    ) -> Result<serde_json::Value> {
        let len = self.path.len();
        write_step(&mut self.path, &step);
        let result = self.encode(value, depth + 1);
        self.path.truncate(len);
        result
    }
}

fn ref_marker(path: &str) -> serde_json::Value {
    let mut marker = Map::new();
    marker.insert(REF_KEY.to_string(), serde_json::Value::String(path.to_string()));
    serde_json::Value::Object(marker)
}
