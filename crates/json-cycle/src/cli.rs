//! Logic behind the command-line tools.
//!
//! - `json-cycle-path`: resolve a reference path in an encoded document
//! - `json-cycle-normalize`: re-encode a document with canonical paths
//!
//! Both read documents that may contain `$ref` markers. Type tags and
//! callable markers are kept as data, since the tools have no registry.

use crate::decycle::decycle;
use crate::error::{Error, Result};
use crate::options::DecodeOptions;
use crate::path::Path;
use crate::retrocycle::retrocycle_with;
use crate::value::Value;

fn resolve_document(json: &str) -> Result<Value> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    retrocycle_with(Value::from(value), &DecodeOptions::default().with_strict_paths(true))
}

/// Looks up `path` in the encoded document `json` and returns the target,
/// encoded on its own.
pub fn lookup_path(json: &str, path: &str) -> Result<String> {
    let parsed = Path::parse(path).map_err(|reason| Error::MalformedPath {
        path: path.to_string(),
        reason,
    })?;
    let root = resolve_document(json)?;
    let target = parsed.resolve(&root).ok_or(Error::UnresolvablePath {
        path: path.to_string(),
    })?;
    Ok(serde_json::to_string(&decycle(&target)?)?)
}

/// Decodes and re-encodes `json`. References then point at the first
/// occurrence of each value in document order.
pub fn normalize(json: &str) -> Result<String> {
    let root = resolve_document(json)?;
    Ok(serde_json::to_string(&decycle(&root)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathError;

    const LIBRARY: &str = r#"{"books":[{"title":"Dune","library":{"$ref":"$"}}],"first":{"$ref":"$[\"books\"][0]"}}"#;

    #[test]
    fn test_lookup_path() {
        let result = lookup_path(LIBRARY, r#"$["first"]["title"]"#).unwrap();
        assert_eq!(result, r#""Dune""#);
    }

    #[test]
    fn test_lookup_path_reencodes_relative_to_target() {
        let result = lookup_path(LIBRARY, r#"$["books"][0]"#).unwrap();
        assert_eq!(
            result,
            r#"{"title":"Dune","library":{"books":[{"$ref":"$"}],"first":{"$ref":"$"}}}"#
        );
    }

    #[test]
    fn test_lookup_path_errors() {
        assert_eq!(
            lookup_path(LIBRARY, "books"),
            Err(Error::MalformedPath {
                path: "books".to_string(),
                reason: PathError::ExpectedRoot,
            })
        );
        assert_eq!(
            lookup_path(LIBRARY, r#"$["nope"]"#),
            Err(Error::UnresolvablePath {
                path: r#"$["nope"]"#.to_string()
            })
        );
        assert!(matches!(lookup_path("{", "$"), Err(Error::Json(_))));
    }

    #[test]
    fn test_normalize_keeps_canonical_document() {
        assert_eq!(normalize(LIBRARY).unwrap(), LIBRARY);
    }

    #[test]
    fn test_normalize_rewrites_paths() {
        let input = r#"{"a":{"$ref":"$[\"b\"]"},"b":{"v":1}}"#;
        assert_eq!(
            normalize(input).unwrap(),
            r#"{"a":{"v":1},"b":{"$ref":"$[\"a\"]"}}"#
        );
    }
}
