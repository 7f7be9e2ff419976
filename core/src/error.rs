//! Compile-time error type for schema compilation.
//!
//! All failures raised while resolving type expressions, defining composite
//! types, or compiling a schema tree are fatal and abort compilation with the
//! offending expression, name, or path identified.

use thiserror::Error;

/// Errors raised during schema compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An identifier matched neither a primitive alias nor a registered
    /// composite or enum name.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A type expression could not be parsed (unbalanced brackets,
    /// non-terminal `?`, invalid dict key kind, and so on).
    #[error("malformed type expression: {0}")]
    MalformedExpression(String),

    /// The schema tree used a reserved root key.
    #[error("reserved path segment: {0}")]
    ReservedPath(String),

    /// A named composite type referenced itself, directly or transitively.
    /// The payload is the full reference path (e.g. `Pet -> Owner -> Pet`).
    #[error("cyclic type reference: {0}")]
    CyclicType(String),

    /// Two composite types were defined with the same name.
    #[error("duplicate type definition: {0}")]
    DuplicateType(String),

    /// An enumerated set repeated a literal.
    #[error("duplicate item {item:?} in enum set {name}")]
    DuplicateEnumItem { name: String, item: String },

    /// A field resolved to `Enum.<Name>` but no items source can supply
    /// `<Name>` at emission time.
    #[error("no enum items available for Enum.{0}")]
    MissingEnumItems(String),

    /// A leaf had neither a type annotation on any ancestor nor an
    /// inferable literal default.
    #[error("cannot infer a type for untyped leaf at {0}")]
    UntypedLeaf(String),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
