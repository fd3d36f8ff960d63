use thiserror::Error;

use crate::path::PathError;

/// Errors raised while encoding or decoding a graph.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(
        "Need type for {name}, you should provide it in the registry \
         (e.g. Registry::new().with_type(Arc::new(TypeDescriptor::new(\"{name}\"))))"
    )]
    MissingTypeDescriptor { name: String },

    #[error("Malformed reference path {path:?}: {reason}")]
    MalformedPath { path: String, reason: PathError },

    #[error("Reference path {path} does not resolve")]
    UnresolvablePath { path: String },

    #[error("Cannot reconstruct callable from {source_text:?}: {reason}")]
    CallableReconstruction { source_text: String, reason: String },

    #[error("Graph depth exceeds the limit of {limit}")]
    DepthExhaustion { limit: usize },

    #[error("JSON: {0}")]
    Json(String),

    #[error(transparent)]
    Call(#[from] CallError),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

/// Errors raised while invoking a callable or a type method.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallError {
    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("{0} is not defined")]
    UnboundIdentifier(String),

    #[error("{type_name} has no method {name}")]
    NoSuchMethod { type_name: String, name: String },

    #[error("{0}")]
    TypeMismatch(String),

    #[error("Maximum call depth of {0} exceeded")]
    DepthExceeded(usize),

    #[error("{0}")]
    Thrown(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
