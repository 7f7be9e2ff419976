//! Core types for fieldtree schema compilation.
//!
//! This crate defines the foundational pieces shared by the compiler, codec
//! synthesizer, and runtime:
//!
//! - [`TypeDescriptor`] — the normalized, closed-variant type of a schema
//!   field, produced by [`resolve`] from a type-expression string and
//!   rendered back canonically by [`render`].
//! - [`TypeRegistry`] — named composite definitions ([`CompositeDef`]:
//!   structs and enum sets) with eager member resolution and cycle
//!   detection.
//! - [`Value`] — the decoded in-memory value model handlers cache.
//! - [`ConfigError`] — the fatal compile-time error type.
//!
//! # Example
//!
//! ```
//! use fieldtree_core::*;
//! use indexmap::IndexMap;
//!
//! let mut registry = TypeRegistry::new();
//! let mut members = IndexMap::new();
//! members.insert("Name".to_string(), "string".to_string());
//! members.insert("Position".to_string(), "Vector3Integer".to_string());
//! registry.define("Spawn", &RawCompositeDef::Struct(members)).unwrap();
//!
//! let ty = resolve("List[Spawn]?", &registry).unwrap();
//! assert_eq!(render(&ty), "List[Spawn]?");
//! ```

mod error;
mod expr;
mod registry;
mod value;

pub use error::{ConfigError, Result};
pub use expr::{KeyKind, PrimitiveKind, Rounding, TypeDescriptor, render, resolve};
pub use registry::{
    CompositeDef, EnumItemsSource, RawCompositeDef, StaticEnumItems, TypeRegistry,
};
pub use value::Value;
