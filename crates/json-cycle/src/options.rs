//! Encode and decode options.

/// Default nesting limit for encode, resolve and restore passes.
///
/// Kept below the 128-level nesting limit of the `serde_json` reader so that
/// anything the encoder accepts can be read back.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Options for [`crate::decycle_with`] and [`crate::stringify_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Maximum number of nested arrays/objects below the root.
    pub max_depth: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EncodeOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Options for [`crate::parse_with`], [`crate::retrocycle_with`] and
/// [`crate::restore_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum number of nested arrays/objects below the root.
    pub max_depth: usize,
    /// Fail on a `$ref` marker whose path does not match the path grammar.
    ///
    /// When `false` such markers are kept as ordinary objects.
    pub strict_paths: bool,
    /// Recognize strings starting with the `function` keyword as declared
    /// functions. Arrow markers are always recognized.
    pub declared_functions: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_paths: false,
            declared_functions: true,
        }
    }
}

impl DecodeOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_strict_paths(mut self, strict_paths: bool) -> Self {
        self.strict_paths = strict_paths;
        self
    }

    pub fn with_declared_functions(mut self, declared_functions: bool) -> Self {
        self.declared_functions = declared_functions;
        self
    }
}
