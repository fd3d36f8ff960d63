//! Cycle-safe JSON for object graphs.
//!
//! Encodes graphs that may contain cycles and shared references into plain
//! JSON, and decodes them back with the same shape:
//!
//! - repeated arrays/objects become `{"$ref": "$[\"path\"][0]"}` markers that
//!   point at the first place the value was written;
//! - objects bound to a [`TypeDescriptor`] carry a `$type` tag, restored on
//!   decode from a caller-supplied [`Registry`];
//! - [`Callable`] values travel as source text and are rebuilt by a small
//!   closed expression language, never by evaluating arbitrary code.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use json_cycle::{parse, stringify, Array, Registry, TypeDescriptor, Value};
//!
//! let book = Arc::new(TypeDescriptor::new("Book"));
//! let library = json_cycle::Object::new().with("name", "City");
//! let dune = book.instantiate().with("title", "Dune").with("library", library.clone());
//! library.set("books", Array::from_vec(vec![Value::Object(dune)]));
//!
//! let text = stringify(&Value::Object(library)).unwrap();
//! assert_eq!(
//!     text,
//!     r#"{"name":"City","books":[{"$type":"Book","title":"Dune","library":{"$ref":"$"}}]}"#
//! );
//!
//! let registry = Registry::new().with_type(book.clone());
//! let decoded = parse(&text, &registry).unwrap();
//! let first = decoded.get("books").unwrap().at(0).unwrap();
//! assert_eq!(first.get("library"), Some(decoded.clone()));
//! assert!(first.as_object().unwrap().is_instance_of(&book));
//! ```

pub mod callable;
pub mod cli;
pub mod decycle;
pub mod error;
pub mod lambda;
pub mod options;
pub mod path;
pub mod registry;
pub mod restore;
pub mod retrocycle;
pub mod value;

pub use callable::{decode_marker, Callable, NativeFn, ARROW_PREFIX};
pub use decycle::{decycle, decycle_with};
pub use error::{CallError, Error, Result};
pub use options::{DecodeOptions, EncodeOptions, DEFAULT_MAX_DEPTH};
pub use path::{is_path, Path, PathError, PathStep};
pub use registry::{MethodFn, Registry, TypeDescriptor};
pub use restore::{restore, restore_with, TYPE_KEY};
pub use retrocycle::{ref_path, retrocycle, retrocycle_with, REF_KEY};
pub use value::{deep_equal, Array, Object, Value};

use tracing::debug;

/// Encodes `value` as compact JSON text.
pub fn stringify(value: &Value) -> Result<String> {
    stringify_with(value, &EncodeOptions::default())
}

pub fn stringify_with(value: &Value, options: &EncodeOptions) -> Result<String> {
    let json = decycle_with(value, |v| v, options)?;
    Ok(serde_json::to_string(&json)?)
}

/// Encodes `value` as indented JSON text.
pub fn stringify_pretty(value: &Value) -> Result<String> {
    let json = decycle(value)?;
    Ok(serde_json::to_string_pretty(&json)?)
}

/// Decodes JSON text: resolves references, then restores type tags and
/// callables using `registry`.
///
/// A decoded graph with cycles is not freed when dropped; release it with
/// [`Value::clear_graph`].
pub fn parse(text: &str, registry: &Registry) -> Result<Value> {
    parse_with(text, registry, &DecodeOptions::default())
}

pub fn parse_with(text: &str, registry: &Registry, options: &DecodeOptions) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    debug!(bytes = text.len(), "parsed JSON text");
    let root = retrocycle_with(Value::from(json), options)?;
    restore_with(root, registry, options)
}
