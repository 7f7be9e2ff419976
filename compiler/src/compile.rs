//! The schema tree compiler.
//!
//! Walks every root-to-leaf path of a [`SchemaDocument`], strips key
//! annotations, resolves each leaf's effective type, and produces one
//! [`FieldDescriptor`] per leaf plus two parallel emitter-facing trees: a
//! constructor tree (one handler-construction spec per leaf) and a
//! declared-type tree (one canonical type string per leaf), each mirroring
//! the schema tree's shape.
//!
//! The effective type of a leaf is fixed by the *shallowest* annotated
//! ancestor along its path; annotations on deeper keys are stripped from the
//! raw path but ignored for typing. Unannotated leaves infer their type from
//! the literal default.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use fieldtree_core::{
    ConfigError, EnumItemsSource, PrimitiveKind, StaticEnumItems, TypeDescriptor, TypeRegistry,
    Value, render, resolve,
};

use crate::document::{LeafDefault, RESERVED_ROOT_KEY, SchemaDocument, SchemaNode};

/// Marker separating a raw key name from its type annotation.
pub const TYPE_ANNOTATION_MARKER: &str = "::";

/// Splits a schema key into its raw name and optional type expression.
///
/// # Examples
///
/// ```
/// use fieldtree_compiler::split_annotation;
///
/// assert_eq!(split_annotation("coins::Integer"), ("coins", Some("Integer")));
/// assert_eq!(split_annotation("coins"), ("coins", None));
/// ```
pub fn split_annotation(key: &str) -> (&str, Option<&str>) {
    match key.split_once(TYPE_ANNOTATION_MARKER) {
        Some((raw, expr)) => (raw, Some(expr)),
        None => (key, None),
    }
}

/// Compiled record for one leaf of the schema tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    /// Raw path segments, annotations stripped.
    pub path: Vec<String>,
    /// Resolved effective type.
    pub ty: TypeDescriptor,
    /// Literal default, if the leaf declared one.
    pub default: Option<Value>,
    /// `true` if any path segment is numeric, signaling repeated/array
    /// membership.
    pub positional: bool,
}

impl FieldDescriptor {
    /// The path joined with `/`, used as the handler scope and store
    /// addressing component.
    pub fn joined_path(&self) -> String {
        self.path.join("/")
    }

    /// Returns `true` for fields whose type supports increments and ordered
    /// indexes.
    pub fn is_numeric(&self) -> bool {
        self.ty.is_numeric()
    }
}

/// A tree mirroring the schema tree's shape with one payload per leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PathTree<T> {
    /// Inner node.
    Branch(IndexMap<String, PathTree<T>>),
    /// Leaf payload.
    Leaf(T),
}

impl<T> PathTree<T> {
    /// Creates an empty branch.
    pub fn new() -> Self {
        Self::Branch(IndexMap::new())
    }

    /// Inserts `value` at `path`, creating intermediate branches. A leaf
    /// occupying an intermediate position is replaced; the last write wins.
    pub fn insert(&mut self, path: &[String], value: T) {
        if matches!(self, Self::Leaf(_)) {
            *self = Self::new();
        }
        let Self::Branch(children) = self else {
            return;
        };
        match path {
            [] => {}
            [last] => {
                children.insert(last.clone(), Self::Leaf(value));
            }
            [head, rest @ ..] => {
                children
                    .entry(head.clone())
                    .or_insert_with(Self::new)
                    .insert(rest, value);
            }
        }
    }

    /// Returns the payload at `path`, if present.
    pub fn get(&self, path: &[&str]) -> Option<&T> {
        match (self, path) {
            (Self::Leaf(value), []) => Some(value),
            (Self::Branch(children), [head, rest @ ..]) => children.get(*head)?.get(rest),
            _ => None,
        }
    }
}

impl<T> Default for PathTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which handler family a field's accessor is constructed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HandlerKind {
    /// Plain field handler.
    Plain,
    /// Numeric handler with increment and sorted-list support.
    Numeric,
}

/// Handler-construction spec for one leaf, consumed by the emitter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstructorSpec {
    /// Joined field path used as the handler scope.
    pub path: String,
    /// Handler family.
    pub kind: HandlerKind,
    /// Hoisted default value; absent for positional fields, where one
    /// default cannot apply across all repetitions.
    pub default: Option<Value>,
}

/// The compiler's complete output.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    /// One descriptor per schema leaf, in walk order.
    pub fields: Vec<FieldDescriptor>,
    /// Handler-construction tree mirroring the schema tree.
    pub constructors: PathTree<ConstructorSpec>,
    /// Canonical declared-type tree mirroring the schema tree.
    pub declared: PathTree<String>,
    /// Resolved composite type registry.
    pub registry: TypeRegistry,
    /// Write metadata propagated verbatim from the document.
    pub metadata: IndexMap<String, String>,
}

impl CompiledSchema {
    /// Finds a field descriptor by joined path.
    pub fn field(&self, path: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.joined_path() == path)
    }
}

/// Compiles a schema document using its own `enums` section as the items
/// source.
///
/// # Errors
///
/// Any [`ConfigError`] raised while defining composite types or walking the
/// tree.
pub fn compile(document: &SchemaDocument) -> Result<CompiledSchema, ConfigError> {
    let enums = StaticEnumItems::from_map(document.enums.clone());
    compile_with(document, &enums)
}

/// Compiles a schema document against an external enum-items collaborator.
pub fn compile_with(
    document: &SchemaDocument,
    enums: &dyn EnumItemsSource,
) -> Result<CompiledSchema, ConfigError> {
    let mut registry = TypeRegistry::new();
    registry.define_all(&document.types)?;

    for key in document.tree.keys() {
        let (raw, _) = split_annotation(key);
        if raw == RESERVED_ROOT_KEY {
            return Err(ConfigError::ReservedPath(RESERVED_ROOT_KEY.to_string()));
        }
    }

    let mut walker = Walker {
        registry: &registry,
        enums,
        fields: Vec::new(),
        constructors: PathTree::new(),
        declared: PathTree::new(),
    };
    let mut path = Vec::new();
    for (key, node) in &document.tree {
        walker.walk(key, node, &mut path, None)?;
    }

    Ok(CompiledSchema {
        fields: walker.fields,
        constructors: walker.constructors,
        declared: walker.declared,
        registry,
        metadata: document.metadata.clone(),
    })
}

struct Walker<'a> {
    registry: &'a TypeRegistry,
    enums: &'a dyn EnumItemsSource,
    fields: Vec<FieldDescriptor>,
    constructors: PathTree<ConstructorSpec>,
    declared: PathTree<String>,
}

impl Walker<'_> {
    fn walk(
        &mut self,
        key: &str,
        node: &SchemaNode,
        path: &mut Vec<String>,
        pinned: Option<&TypeDescriptor>,
    ) -> Result<(), ConfigError> {
        let (raw, annotation) = split_annotation(key);
        path.push(raw.to_string());

        // Shallowest annotated ancestor wins; deeper annotations are
        // stripped but ignored for typing.
        let resolved_here = match (pinned, annotation) {
            (None, Some(expr)) => Some(resolve(expr, self.registry)?),
            _ => None,
        };
        let effective = pinned.or(resolved_here.as_ref());

        let result = match node {
            SchemaNode::Branch(children) => {
                for (child_key, child) in children {
                    self.walk(child_key, child, path, effective)?;
                }
                Ok(())
            }
            SchemaNode::Leaf(default) => self.emit(path, effective, default),
        };
        path.pop();
        result
    }

    fn emit(
        &mut self,
        path: &[String],
        effective: Option<&TypeDescriptor>,
        default: &LeafDefault,
    ) -> Result<(), ConfigError> {
        let ty = match effective {
            Some(ty) => ty.clone(),
            None => match default.infer_kind() {
                Some(kind) => TypeDescriptor::Primitive(kind),
                None => return Err(ConfigError::UntypedLeaf(path.join("/"))),
            },
        };

        let mut enum_names = Vec::new();
        ty.enum_refs(&mut enum_names);
        for name in enum_names {
            if self.enums.items(name).is_none() {
                return Err(ConfigError::MissingEnumItems(name.to_string()));
            }
        }

        let positional = path.iter().any(|segment| segment.parse::<u64>().is_ok());
        let descriptor = FieldDescriptor {
            path: path.to_vec(),
            ty,
            default: default.to_value(),
            positional,
        };
        debug!(
            path = %descriptor.joined_path(),
            ty = %render(&descriptor.ty),
            positional,
            "compiled field"
        );

        self.constructors.insert(
            path,
            ConstructorSpec {
                path: descriptor.joined_path(),
                kind: if descriptor.is_numeric() {
                    HandlerKind::Numeric
                } else {
                    HandlerKind::Plain
                },
                default: if positional {
                    None
                } else {
                    descriptor.default.clone()
                },
            },
        );
        self.declared.insert(path, render(&descriptor.ty));
        self.fields.push(descriptor);
        Ok(())
    }
}
