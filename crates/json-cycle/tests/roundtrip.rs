//! Encode/decode round trips over cyclic, shared and typed graphs.

use std::sync::Arc;

use json_cycle::{
    deep_equal, parse, restore, stringify, Array, CallError, Callable, Error, NativeFn, Object,
    Registry, TypeDescriptor, Value,
};

fn round_trip(value: &Value, registry: &Registry) -> Value {
    let text = stringify(value).unwrap_or_else(|e| panic!("stringify failed: {e}"));
    parse(&text, registry).unwrap_or_else(|e| panic!("parse({text}) failed: {e}"))
}

fn book_type() -> Arc<TypeDescriptor> {
    Arc::new(
        TypeDescriptor::new("Book").with_method("describe", |this, _| {
            let title = this.get("title").unwrap_or_default();
            let library = this.get("library").and_then(|l| l.get("name"));
            match (title, library) {
                (Value::String(t), Some(Value::String(l))) => Ok(Value::from(format!("{t} @ {l}"))),
                _ => Err(CallError::TypeMismatch("book without title or library".into())),
            }
        }),
    )
}

fn library_type() -> Arc<TypeDescriptor> {
    Arc::new(TypeDescriptor::new("Library").with_method("count", |this, _| {
        let books = this.get("books").unwrap_or_default();
        match books.as_array() {
            Some(books) => Ok(Value::from(books.len())),
            None => Err(CallError::TypeMismatch("books is not an array".into())),
        }
    }))
}

/// A library holding two books, each pointing back at the library, with a
/// lambda that finds the first book.
fn library_graph(library_type: &Arc<TypeDescriptor>, book_type: &Arc<TypeDescriptor>) -> Object {
    let library = library_type.instantiate().with("name", "City");
    let books = Array::new();
    for title in ["Dune", "Emma"] {
        let book = book_type
            .instantiate()
            .with("title", title)
            .with("library", library.clone());
        books.push(book);
    }
    library.set("books", books);
    library.set(
        "findMethod",
        Callable::parse("library => library.books[0]").unwrap(),
    );
    library
}

// -------------------------------------------------------------- Structure

#[test]
fn test_acyclic_round_trip() {
    let value = Value::Object(
        Object::new()
            .with("a", 1)
            .with("b", vec![Value::from(true), Value::Null, Value::from("s")])
            .with("c", Object::new().with("d", -2.25)),
    );
    let decoded = round_trip(&value, &Registry::new());
    assert!(deep_equal(&value, &decoded));
}

#[test]
fn test_self_cycle() {
    let a = Object::new().with("name", "a");
    a.set("self", a.clone());
    let decoded = round_trip(&Value::Object(a), &Registry::new());
    assert_eq!(decoded.get("self"), Some(decoded.clone()));
    assert_eq!(decoded.get("name"), Some(Value::from("a")));
}

#[test]
fn test_mutual_cycle() {
    let a = Object::new();
    let b = Object::new().with("a", a.clone());
    a.set("b", b);
    let decoded = round_trip(&Value::Object(a), &Registry::new());
    let b = decoded.get("b").unwrap();
    assert_eq!(b.get("a"), Some(decoded));
}

#[test]
fn test_shared_reference() {
    let shared = Object::new().with("v", 1);
    let root = Object::new()
        .with("x", shared.clone())
        .with("y", shared);
    let decoded = round_trip(&Value::Object(root), &Registry::new());
    let x = decoded.get("x").unwrap();
    let y = decoded.get("y").unwrap();
    assert_eq!(x, y);
    x.as_object().unwrap().set("v", 2);
    assert_eq!(y.get("v"), Some(Value::from(2)));
}

#[test]
fn test_shared_array_inside_array() {
    let inner = Array::from_vec(vec![Value::from(1)]);
    let root = Array::from_vec(vec![Value::Array(inner.clone()), Value::Array(inner)]);
    let decoded = round_trip(&Value::Array(root), &Registry::new());
    assert_eq!(decoded.at(0), decoded.at(1));
    assert!(decoded.at(0).unwrap().is_composite());
}

#[test]
fn test_equal_content_stays_distinct() {
    let root = Array::from_vec(vec![
        Value::Object(Object::new().with("v", 1)),
        Value::Object(Object::new().with("v", 1)),
    ]);
    let decoded = round_trip(&Value::Array(root), &Registry::new());
    assert_ne!(decoded.at(0), decoded.at(1));
    assert!(deep_equal(&decoded.at(0).unwrap(), &decoded.at(1).unwrap()));
}

// ------------------------------------------------------------------ Types

#[test]
fn test_library_scenario() {
    let (library_type, book_type) = (library_type(), book_type());
    let library = library_graph(&library_type, &book_type);
    let registry = Registry::new()
        .with_type(library_type.clone())
        .with_type(book_type.clone());

    let decoded = round_trip(&Value::Object(library), &registry);
    let library = decoded.as_object().unwrap();
    assert!(library.is_instance_of(&library_type));
    assert_eq!(library.call_method("count", &[]).unwrap(), Value::from(2));

    let books = library.get("books").unwrap();
    for index in 0..2 {
        let book = books.at(index).unwrap();
        let book = book.as_object().unwrap();
        assert!(book.is_instance_of(&book_type));
        assert_eq!(book.get("library"), Some(decoded.clone()));
    }

    let first = library.call_method("findMethod", &[decoded.clone()]).unwrap();
    assert_eq!(first, books.at(0).unwrap());
    assert_eq!(
        first.as_object().unwrap().call_method("describe", &[]).unwrap(),
        Value::from("Dune @ City")
    );
}

#[test]
fn test_missing_registry_entry() {
    let (library_type, book_type) = (library_type(), book_type());
    let library = library_graph(&library_type, &book_type);
    let text = stringify(&Value::Object(library)).unwrap();

    let registry = Registry::new().with_type(library_type);
    let err = parse(&text, &registry).unwrap_err();
    assert_eq!(
        err,
        Error::MissingTypeDescriptor {
            name: "Book".to_string()
        }
    );
    assert!(err.to_string().contains("Book"));
}

#[test]
fn test_registry_rebinds_by_name() {
    let encoded_type = Arc::new(TypeDescriptor::new("Point"));
    let decoding_type = Arc::new(TypeDescriptor::new("Point").with_method("sum", |this, _| {
        let x = this.get("x").and_then(|v| v.as_i64()).unwrap_or(0);
        let y = this.get("y").and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(Value::from(x + y))
    }));
    let point = encoded_type.instantiate().with("x", 3).with("y", 4);

    let decoded = round_trip(&Value::Object(point), &Registry::new().with_type(decoding_type.clone()));
    let point = decoded.as_object().unwrap();
    assert!(point.is_instance_of(&decoding_type));
    assert!(!point.is_instance_of(&encoded_type));
    assert_eq!(point.call_method("sum", &[]).unwrap(), Value::from(7));
}

#[test]
fn test_unknown_method() {
    let decoded = round_trip(&Value::Object(Object::new()), &Registry::new());
    let err = decoded.as_object().unwrap().call_method("nope", &[]).unwrap_err();
    assert_eq!(
        err,
        CallError::NoSuchMethod {
            type_name: "Object".to_string(),
            name: "nope".to_string()
        }
    );
}

// -------------------------------------------------------------- Callables

#[test]
fn test_arrow_round_trip() {
    let value = Value::Object(Object::new().with("inc", Callable::parse("(x) => x + 1").unwrap()));
    let decoded = round_trip(&value, &Registry::new());
    let inc = decoded.get("inc").unwrap();
    assert_eq!(inc.call(&[Value::from(1)]).unwrap(), Value::from(2));
}

#[test]
fn test_declared_round_trip() {
    let source = "function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }";
    let value = Value::from(vec![Value::from(Callable::parse(source).unwrap())]);
    let decoded = round_trip(&value, &Registry::new());
    let fib = decoded.at(0).unwrap();
    assert_eq!(fib.as_callable().unwrap().name(), Some("fib"));
    assert_eq!(fib.call(&[Value::from(10)]).unwrap(), Value::from(55));
}

#[test]
fn test_native_round_trip() {
    let greet = Arc::new(NativeFn::new("greet", |args| {
        let name = args.first().and_then(|v| v.as_str()).unwrap_or("stranger");
        Ok(Value::from(format!("hello {name}")))
    }));
    let value = Value::Object(Object::new().with("greet", Callable::Native(greet.clone())));
    let registry = Registry::new().with_callable(greet);

    let decoded = round_trip(&value, &registry);
    let result = decoded.get("greet").unwrap().call(&[Value::from("Ada")]).unwrap();
    assert_eq!(result, Value::from("hello Ada"));

    let text = stringify(&value).unwrap();
    let err = parse(&text, &Registry::new()).unwrap_err();
    assert!(matches!(err, Error::CallableReconstruction { .. }));
}

#[test]
fn test_lambda_calls_type_method() {
    let value = Value::Object(
        Object::new()
            .with("book", book_type().instantiate().with("title", "Dune").with(
                "library",
                Object::new().with("name", "City"),
            ))
            .with("show", Callable::parse("(root) => root.book.describe()").unwrap()),
    );
    let decoded = round_trip(&value, &Registry::new().with_type(book_type()));
    let result = decoded
        .as_object()
        .unwrap()
        .call_method("show", &[decoded.clone()])
        .unwrap();
    assert_eq!(result, Value::from("Dune @ City"));
}

// ------------------------------------------------------------ Idempotence

#[test]
fn test_restore_is_idempotent() {
    let (library_type, book_type) = (library_type(), book_type());
    let registry = Registry::new()
        .with_type(library_type.clone())
        .with_type(book_type.clone());
    let decoded = round_trip(&Value::Object(library_graph(&library_type, &book_type)), &registry);
    let before = stringify(&decoded).unwrap();
    let again = restore(decoded.clone(), &registry).unwrap();
    assert_eq!(again, decoded);
    assert_eq!(stringify(&again).unwrap(), before);
}

#[test]
fn test_reencoding_is_stable() {
    let (library_type, book_type) = (library_type(), book_type());
    let registry = Registry::new()
        .with_type(library_type.clone())
        .with_type(book_type.clone());
    let text = stringify(&Value::Object(library_graph(&library_type, &book_type))).unwrap();
    let decoded = parse(&text, &registry).unwrap();
    assert_eq!(stringify(&decoded).unwrap(), text);
}

// ----------------------------------------------------------------- Memory

#[test]
fn test_clear_graph_releases_decoded_cycles() {
    let book = book_type();
    let registry = Registry::new().with_type(Arc::clone(&book));
    let baseline = Arc::strong_count(&book);

    for _ in 0..10 {
        let decoded = parse(
            r#"{"$type":"Book","title":"Dune","self":{"$ref":"$"},"shelf":[{"$ref":"$"}]}"#,
            &registry,
        )
        .unwrap();
        assert_eq!(Arc::strong_count(&book), baseline + 1);
        decoded.clear_graph();
        assert_eq!(decoded.get("self"), None);
    }
    assert_eq!(Arc::strong_count(&book), baseline);
}

#[test]
fn test_clear_graph_releases_library() {
    let (library, book) = (library_type(), book_type());
    let root = Value::Object(library_graph(&library, &book));
    let registry = Registry::new()
        .with_type(Arc::clone(&library))
        .with_type(Arc::clone(&book));
    let decoded = round_trip(&root, &registry);
    assert!(Arc::strong_count(&book) > 2);

    decoded.clear_graph();
    root.clear_graph();
    drop((decoded, root));
    assert_eq!(Arc::strong_count(&library), 2);
    assert_eq!(Arc::strong_count(&book), 2);
}
