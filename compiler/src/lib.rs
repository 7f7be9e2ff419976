//! Schema tree compilation for fieldtree.
//!
//! This crate turns a declarative [`SchemaDocument`] into the compiled
//! artifacts the codec synthesizer, runtime, and external emitter consume:
//!
//! - [`FieldDescriptor`] — path, resolved type, default, and indexing flag
//!   for every schema leaf.
//! - [`PathTree`] — the parallel constructor and declared-type trees
//!   mirroring the schema tree's shape.
//! - [`CompiledSchema`] — descriptors, trees, resolved [`TypeRegistry`] and
//!   verbatim write metadata.
//!
//! [`TypeRegistry`]: fieldtree_core::TypeRegistry
//!
//! # Example
//!
//! ```
//! use fieldtree_compiler::{SchemaDocument, compile};
//!
//! let doc = SchemaDocument::from_yaml(r#"
//! tree:
//!   stats:
//!     coins::Integer: 100
//! "#).unwrap();
//!
//! let compiled = compile(&doc).unwrap();
//! assert_eq!(compiled.fields.len(), 1);
//! assert_eq!(compiled.fields[0].joined_path(), "stats/coins");
//! ```

mod compile;
mod document;
mod error;

pub use compile::{
    CompiledSchema, ConstructorSpec, FieldDescriptor, HandlerKind, PathTree,
    TYPE_ANNOTATION_MARKER, compile, compile_with, split_annotation,
};
pub use document::{BuildConfig, LeafDefault, RESERVED_ROOT_KEY, SchemaDocument, SchemaNode};
pub use error::{DocumentError, Result};
