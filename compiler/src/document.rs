//! The declarative schema document.
//!
//! A document is a YAML file with four sections: the schema `tree` (nested
//! mapping whose keys may carry `::TypeExpression` annotations and whose
//! leaves are literal defaults), the `types` mapping of named composite
//! definitions, an optional `enums` mapping supplying platform enumeration
//! items, free-form `metadata` propagated verbatim into store writes, and
//! `build` output paths consumed by the external emitter.
//!
//! # Example YAML
//!
//! ```yaml
//! tree:
//!   stats:
//!     coins::Integer: 100
//!     nickname: "newcomer"
//!   inventory::Dict[string, Pet]: null
//! types:
//!   Rarity:
//!     - Common
//!     - Rare
//!   Pet:
//!     Name: string
//!     Rarity: Rarity
//! metadata:
//!   schema_rev: "3"
//! build:
//!   server_path: out/ServerData.luau
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use fieldtree_core::{PrimitiveKind, RawCompositeDef, Value};

use crate::error::Result;

/// Root key reserved for generated bootstrap accessors; the schema tree may
/// not use it.
pub const RESERVED_ROOT_KEY: &str = "init";

/// Literal default carried by a schema leaf.
///
/// `null` means no default: the value is resolved at first access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeafDefault {
    /// No default.
    Nil,
    /// Boolean literal; inferred type `boolean`.
    Boolean(bool),
    /// Integral literal; inferred type `Integer`.
    Integer(i64),
    /// Fractional literal; inferred type `Double`.
    Float(f64),
    /// String literal; inferred type `string`.
    String(String),
}

impl LeafDefault {
    /// Converts the literal into a decoded [`Value`], or `None` for
    /// [`LeafDefault::Nil`].
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::Nil => None,
            Self::Boolean(b) => Some(Value::Boolean(*b)),
            Self::Integer(n) => Some(Value::Number(*n as f64)),
            Self::Float(n) => Some(Value::Number(*n)),
            Self::String(s) => Some(Value::String(s.clone())),
        }
    }

    /// Infers the primitive kind from the literal's native representation.
    pub fn infer_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Nil => None,
            Self::Boolean(_) => Some(PrimitiveKind::Boolean),
            Self::Integer(_) => Some(PrimitiveKind::Integer),
            Self::Float(_) => Some(PrimitiveKind::Double),
            Self::String(_) => Some(PrimitiveKind::String),
        }
    }
}

/// One node of the schema tree: an inner mapping or a leaf default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaNode {
    /// Nested mapping of key → child node.
    Branch(IndexMap<String, SchemaNode>),
    /// Leaf with a literal default.
    Leaf(LeafDefault),
}

/// Output paths for the external emitter.
///
/// Opaque to the compiler; carried through so a build front end can hand
/// them to the module writer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Read-only client accessor module path.
    #[serde(default)]
    pub client_path: Option<String>,
    /// Read/write server persistence module path.
    #[serde(default)]
    pub server_path: Option<String>,
    /// Shared type-declaration module path.
    #[serde(default)]
    pub shared_path: Option<String>,
}

/// A complete schema document.
///
/// Loaded from YAML with [`SchemaDocument::load`], mirrored back with
/// [`SchemaDocument::save`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// The schema tree; keys may carry `::TypeExpression` annotations.
    pub tree: IndexMap<String, SchemaNode>,
    /// Named composite type definitions, in definition order.
    #[serde(default)]
    pub types: IndexMap<String, RawCompositeDef>,
    /// Platform enumeration items, in ordinal order.
    #[serde(default)]
    pub enums: IndexMap<String, Vec<String>>,
    /// Free-form pairs propagated verbatim into store write metadata.
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
    /// Emitter output paths.
    #[serde(default)]
    pub build: BuildConfig,
}

impl SchemaDocument {
    /// Loads a document from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::DocumentError::Io) if the file cannot be read,
    /// or [`Yaml`](crate::DocumentError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let document = serde_yaml::from_reader(reader)?;
        Ok(document)
    }

    /// Saves the document as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::DocumentError::Io) if the file cannot be
    /// written, or [`Yaml`](crate::DocumentError::Yaml) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Parses a document from a YAML string.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}
