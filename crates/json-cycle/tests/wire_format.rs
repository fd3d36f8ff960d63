//! Exact encoded text and decode failures.

use std::sync::Arc;

use json_cycle::{
    parse, parse_with, stringify, stringify_with, Array, Callable, DecodeOptions, EncodeOptions,
    Error, Object, PathError, Registry, TypeDescriptor, Value, DEFAULT_MAX_DEPTH,
};

fn check(value: &Value, expected: &str) {
    let text = stringify(value).unwrap_or_else(|e| panic!("stringify failed: {e}"));
    assert_eq!(text, expected);
}

fn check_err(text: &str) -> Error {
    parse(text, &Registry::new())
        .err()
        .unwrap_or_else(|| panic!("expected error for {text}"))
}

// ----------------------------------------------------------------- Encode

#[test]
fn test_array_containing_itself() {
    let list = Array::new();
    list.push(list.clone());
    check(&Value::Array(list), r#"[{"$ref":"$"}]"#);
}

#[test]
fn test_nested_paths() {
    let leaf = Object::new().with("v", 1);
    let root = Object::new()
        .with("a", Array::from_vec(vec![Value::from(0), Value::Object(leaf.clone())]))
        .with("b", leaf);
    check(
        &Value::Object(root),
        r#"{"a":[0,{"v":1}],"b":{"$ref":"$[\"a\"][1]"}}"#,
    );
}

#[test]
fn test_escaped_keys_in_paths() {
    let leaf = Object::new();
    let root = Object::new()
        .with("we\"ird\nkey", leaf.clone())
        .with("again", leaf);
    check(
        &Value::Object(root),
        r#"{"we\"ird\nkey":{},"again":{"$ref":"$[\"we\\\"ird\\nkey\"]"}}"#,
    );
}

#[test]
fn test_escaped_key_round_trip() {
    let leaf = Object::new().with("x", 1);
    let root = Object::new()
        .with("we\"ird\nkey", leaf.clone())
        .with("again", leaf);
    let text = stringify(&Value::Object(root)).unwrap();
    let decoded = parse(&text, &Registry::new()).unwrap();
    assert_eq!(decoded.get("again"), decoded.get("we\"ird\nkey"));
}

#[test]
fn test_type_tag() {
    let point = Arc::new(TypeDescriptor::new("Point"));
    let value = Value::from(vec![Value::Object(point.instantiate().with("x", 1))]);
    check(&value, r#"[{"$type":"Point","x":1}]"#);
}

#[test]
fn test_plain_objects_are_untagged() {
    check(&Value::Object(Object::new().with("x", 1)), r#"{"x":1}"#);
}

#[test]
fn test_callable_markers() {
    let value = Value::Object(
        Object::new()
            .with("arrow", Callable::parse("(a, b) => a + b").unwrap())
            .with("named", Callable::parse("function twice(x) { return x * 2; }").unwrap())
            .with("native", Callable::native("now", |_| Ok(Value::Null))),
    );
    check(
        &value,
        r#"{"arrow":"_NuFrRa_(a, b) => a + b","named":"function twice(x) { return x * 2; }","native":"function now() { [native code] }"}"#,
    );
}

#[test]
fn test_numbers_keep_integer_form() {
    let value = Value::from(vec![Value::from(1), Value::from(1.0), Value::from(-7i64), Value::from(f64::NAN)]);
    check(&value, "[1,1.0,-7,null]");
}

#[test]
fn test_scalar_root() {
    check(&Value::from("plain"), r#""plain""#);
    check(&Value::from(Callable::parse("x => x").unwrap()), r#""_NuFrRa_x => x""#);
}

// ----------------------------------------------------------------- Decode

#[test]
fn test_unresolvable_path() {
    let err = check_err(r#"{"a":{"$ref":"$[\"b\"][3]"},"b":[]}"#);
    assert_eq!(
        err,
        Error::UnresolvablePath {
            path: r#"$["b"][3]"#.to_string()
        }
    );
}

#[test]
fn test_index_on_object_does_not_resolve() {
    let err = check_err(r#"{"a":{"$ref":"$[0]"}}"#);
    assert!(matches!(err, Error::UnresolvablePath { .. }));
}

#[test]
fn test_malformed_path_lenient() {
    let text = r#"{"a":{"$ref":"$.b; alert(1)"}}"#;
    let decoded = parse(text, &Registry::new()).unwrap();
    let marker = decoded.get("a").unwrap();
    assert_eq!(marker.get("$ref"), Some(Value::from("$.b; alert(1)")));
    assert_eq!(stringify(&decoded).unwrap(), text);
}

#[test]
fn test_malformed_path_strict() {
    let options = DecodeOptions::default().with_strict_paths(true);
    let err = parse_with(r#"[{"$ref":"$['a']"}]"#, &Registry::new(), &options).unwrap_err();
    assert_eq!(
        err,
        Error::MalformedPath {
            path: "$['a']".to_string(),
            reason: PathError::UnexpectedChar('\''),
        }
    );
}

#[test]
fn test_non_string_ref_is_data() {
    let decoded = parse(r#"{"a":{"$ref":7}}"#, &Registry::new()).unwrap();
    assert_eq!(decoded.get("a").unwrap().get("$ref"), Some(Value::from(7)));
}

#[test]
fn test_invalid_json() {
    assert!(matches!(check_err(r#"{"a":"#), Error::Json(_)));
}

#[test]
fn test_missing_type_message() {
    let err = check_err(r#"{"$type":"Book","title":"Dune"}"#);
    assert_eq!(
        err.to_string(),
        "Need type for Book, you should provide it in the registry \
         (e.g. Registry::new().with_type(Arc::new(TypeDescriptor::new(\"Book\"))))"
    );
}

#[test]
fn test_bad_callable_marker() {
    let err = check_err(r#"{"f":"_NuFrRa_x => { while (true) {} }"}"#);
    match err {
        Error::CallableReconstruction { source_text, .. } => {
            assert_eq!(source_text, "_NuFrRa_x => { while (true) {} }");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_function_like_text_is_kept_when_disabled() {
    let options = DecodeOptions::default().with_declared_functions(false);
    let text = r#"["function is a keyword"]"#;
    let decoded = parse_with(text, &Registry::new(), &options).unwrap();
    assert_eq!(decoded.at(0), Some(Value::from("function is a keyword")));
}

// ------------------------------------------------------------------ Depth

fn nested(depth: usize) -> Value {
    let mut value = Value::Null;
    for _ in 0..depth {
        value = Value::from(vec![value]);
    }
    value
}

#[test]
fn test_encode_depth_exhaustion() {
    let err = stringify(&nested(DEFAULT_MAX_DEPTH + 2)).unwrap_err();
    assert_eq!(
        err,
        Error::DepthExhaustion {
            limit: DEFAULT_MAX_DEPTH
        }
    );
    assert!(stringify(&nested(DEFAULT_MAX_DEPTH + 1)).is_ok());
}

#[test]
fn test_decode_depth_exhaustion() {
    let text = stringify_with(&nested(20), &EncodeOptions::default()).unwrap();
    let options = DecodeOptions::default().with_max_depth(10);
    let err = parse_with(&text, &Registry::new(), &options).unwrap_err();
    assert_eq!(err, Error::DepthExhaustion { limit: 10 });
    assert!(parse(&text, &Registry::new()).is_ok());
}

// ----------------------------------------------------------------- Limits

#[test]
fn test_long_operator_chain_in_callable_is_rejected() {
    let text = format!(r#"{{"f":"_NuFrRa_x => 1{}"}}"#, "+1".repeat(200_000));
    assert!(matches!(check_err(&text), Error::CallableReconstruction { .. }));
    let text = format!(r#"{{"f":"_NuFrRa_x => x{}"}}"#, ".x".repeat(200_000));
    assert!(matches!(check_err(&text), Error::CallableReconstruction { .. }));
}

#[test]
fn test_surrogate_escapes_in_callable() {
    let decoded = parse(
        r#"{"f":"_NuFrRa_s => s[s.length - 1] + '\\uD83D\\uDE00'"}"#,
        &Registry::new(),
    )
    .unwrap();
    let f = decoded.get("f").unwrap();
    assert_eq!(f.call(&[Value::from("\u{1F600}a")]).unwrap(), Value::from("a\u{1F600}"));
}
