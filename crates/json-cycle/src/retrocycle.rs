//! Reference resolver.
//!
//! Replaces `{"$ref": "<path>"}` markers with the values their paths point
//! at. Each path is walked against the live root, so a marker may point at
//! any container that was expanded earlier in the document, including one of
//! its own ancestors.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::options::DecodeOptions;
use crate::path::Path;
use crate::value::{Array, Object, Value};

/// Field name of a reference marker.
pub const REF_KEY: &str = "$ref";

/// Resolves reference markers in `root` in place and returns it.
///
/// References that point at an ancestor create `Rc` cycles, which outlive
/// the last handle unless broken with [`Value::clear_graph`].
///
/// # Example
///
/// ```
/// use json_cycle::{retrocycle, Value};
///
/// let json: serde_json::Value = serde_json::from_str(r#"{"self":{"$ref":"$"}}"#).unwrap();
/// let root = retrocycle(Value::from(json)).unwrap();
/// assert_eq!(root.get("self"), Some(root.clone()));
/// root.clear_graph();
/// ```
pub fn retrocycle(root: Value) -> Result<Value> {
    retrocycle_with(root, &DecodeOptions::default())
}

pub fn retrocycle_with(root: Value, options: &DecodeOptions) -> Result<Value> {
    let mut resolver = Resolver {
        root: root.clone(),
        options,
        visited: HashSet::new(),
        resolved: 0,
    };
    resolver.walk(&root, 0)?;
    debug!(references = resolver.resolved, "retrocycle complete");
    Ok(root)
}

/// The path of a reference marker: an object whose only field is a string
/// `$ref`.
pub fn ref_path(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    match object.get(REF_KEY)? {
        Value::String(path) => Some(path),
        _ => None,
    }
}

struct Resolver<'a> {
    root: Value,
    options: &'a DecodeOptions,
    visited: HashSet<usize>,
    resolved: usize,
}

impl Resolver<'_> {
    fn walk(&mut self, value: &Value, depth: usize) -> Result<()> {
        let Some(id) = value.identity() else {
            return Ok(());
        };
        if depth > self.options.max_depth {
            return Err(Error::DepthExhaustion {
                limit: self.options.max_depth,
            });
        }
        if !self.visited.insert(id) {
            return Ok(());
        }
        match value {
            Value::Array(array) => self.walk_array(array, depth),
            Value::Object(object) => self.walk_object(object, depth),
            _ => Ok(()),
        }
    }

    fn walk_array(&mut self, array: &Array, depth: usize) -> Result<()> {
        for (index, item) in array.to_vec().into_iter().enumerate() {
            match self.resolve_marker(&item)? {
                Some(target) => {
                    array.set(index, target);
                }
                None => self.walk(&item, depth + 1)?,
            }
        }
        Ok(())
    }

    fn walk_object(&mut self, object: &Object, depth: usize) -> Result<()> {
        for (key, field) in object.entries() {
            match self.resolve_marker(&field)? {
                Some(target) => {
                    object.set(key, target);
                }
                None => self.walk(&field, depth + 1)?,
            }
        }
        Ok(())
    }

    /// `Ok(None)` when `value` is not a marker, or is one with a malformed
    /// path in lenient mode.
    fn resolve_marker(&mut self, value: &Value) -> Result<Option<Value>> {
        let Some(text) = ref_path(value) else {
            return Ok(None);
        };
        let path = match Path::parse(&text) {
            Ok(path) => path,
            Err(reason) if self.options.strict_paths => {
                return Err(Error::MalformedPath { path: text, reason });
            }
            Err(reason) => {
                debug!(path = %text, %reason, "keeping malformed reference as data");
                return Ok(None);
            }
        };
        let target = path
            .resolve(&self.root)
            .ok_or(Error::UnresolvablePath { path: text })?;
        trace!(%path, "resolved reference");
        self.resolved += 1;
        Ok(Some(target))
    }
}
