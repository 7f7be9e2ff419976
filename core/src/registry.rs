//! Composite type definitions and the registry that holds them.
//!
//! A composite type is either a *struct* (ordered member names mapped to type
//! expressions) or an *enum set* (ordered distinct string literals encoded as
//! a 1-based ordinal). Definitions are resolved eagerly at [`define`] time —
//! forward references fail fast, and direct or transitive self-reference
//! among struct definitions is rejected before it can recurse infinitely
//! during codec synthesis.
//!
//! [`define`]: TypeRegistry::define
//!
//! # Examples
//!
//! ```
//! use fieldtree_core::{TypeRegistry, RawCompositeDef, CompositeDef};
//! use indexmap::IndexMap;
//!
//! let mut registry = TypeRegistry::new();
//! registry
//!     .define("Rarity", &RawCompositeDef::EnumSet(vec!["Common".into(), "Rare".into()]))
//!     .unwrap();
//!
//! let mut members = IndexMap::new();
//! members.insert("Name".to_string(), "string".to_string());
//! members.insert("Rarity".to_string(), "Rarity".to_string());
//! registry.define("Pet", &RawCompositeDef::Struct(members)).unwrap();
//!
//! assert!(matches!(registry.lookup("Pet").unwrap(), CompositeDef::Struct(_)));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::expr::{self, TypeDescriptor};

/// Unresolved composite definition as written in the type-definitions
/// mapping of a schema document.
///
/// Deserializes from either a YAML sequence of string literals (enum set) or
/// an ordered mapping of member name to type expression (struct).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCompositeDef {
    /// Closed literal domain, in ordinal order.
    EnumSet(Vec<String>),
    /// Ordered member name → type expression.
    Struct(IndexMap<String, String>),
}

/// Resolved composite definition stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositeDef {
    /// Ordered member name → resolved type.
    Struct(IndexMap<String, TypeDescriptor>),
    /// Closed literal domain, in ordinal order.
    EnumSet(Vec<String>),
}

/// Registry of named composite types.
///
/// Names are unique; definition order is preserved, which guarantees that a
/// struct's named dependencies always precede it in iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeRegistry {
    defs: IndexMap<String, CompositeDef>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `name` is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Returns the definition of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownType`] if `name` is not defined.
    pub fn lookup(&self, name: &str) -> Result<&CompositeDef> {
        self.defs
            .get(name)
            .ok_or_else(|| ConfigError::UnknownType(name.to_string()))
    }

    /// Iterates over definitions in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CompositeDef)> {
        self.defs.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Returns the number of defined types.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Returns `true` if nothing is defined.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Defines a composite type, eagerly resolving every member expression.
    ///
    /// The name being defined is visible to its own members, so that
    /// self-reference is *detected* (as [`ConfigError::CyclicType`]) rather
    /// than misreported as an unknown type. References to types not yet
    /// defined fail with [`ConfigError::UnknownType`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateType`] on redefinition,
    /// [`ConfigError::DuplicateEnumItem`] on repeated enum literals,
    /// [`ConfigError::CyclicType`] on direct or transitive self-reference,
    /// plus any member expression resolution failure.
    pub fn define(&mut self, name: &str, raw: &RawCompositeDef) -> Result<()> {
        if self.defs.contains_key(name) {
            return Err(ConfigError::DuplicateType(name.to_string()));
        }

        match raw {
            RawCompositeDef::EnumSet(items) => {
                let mut seen = std::collections::HashSet::new();
                for item in items {
                    if !seen.insert(item.as_str()) {
                        return Err(ConfigError::DuplicateEnumItem {
                            name: name.to_string(),
                            item: item.clone(),
                        });
                    }
                }
                self.defs
                    .insert(name.to_string(), CompositeDef::EnumSet(items.clone()));
            }
            RawCompositeDef::Struct(members) => {
                // Placeholder so members may reference the in-flight name.
                self.defs
                    .insert(name.to_string(), CompositeDef::Struct(IndexMap::new()));

                let mut resolved = IndexMap::new();
                for (member, expr_text) in members {
                    match expr::resolve(expr_text, self) {
                        Ok(descriptor) => {
                            resolved.insert(member.clone(), descriptor);
                        }
                        Err(err) => {
                            self.defs.shift_remove(name);
                            return Err(err);
                        }
                    }
                }
                self.defs
                    .insert(name.to_string(), CompositeDef::Struct(resolved));

                if let Err(err) = self.check_cycles(name) {
                    self.defs.shift_remove(name);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Defines every entry of an ordered type-definitions mapping, in
    /// document order.
    pub fn define_all(&mut self, raw: &IndexMap<String, RawCompositeDef>) -> Result<()> {
        for (name, def) in raw {
            self.define(name, def)?;
        }
        Ok(())
    }

    /// Depth-first walk over named-type dependency edges rooted at `root`,
    /// failing when `root` is reachable from itself.
    fn check_cycles(&self, root: &str) -> Result<()> {
        let mut path = vec![root.to_string()];
        self.visit(root, &mut path)
    }

    fn visit(&self, current: &str, path: &mut Vec<String>) -> Result<()> {
        let Some(CompositeDef::Struct(members)) = self.defs.get(current) else {
            return Ok(());
        };
        let mut names = Vec::new();
        for descriptor in members.values() {
            collect_named(descriptor, &mut names);
        }
        for name in names {
            if path.iter().any(|seen| seen == name) {
                path.push(name.to_string());
                return Err(ConfigError::CyclicType(path.join(" -> ")));
            }
            path.push(name.to_string());
            self.visit(name, path)?;
            path.pop();
        }
        Ok(())
    }
}

fn collect_named<'a>(descriptor: &'a TypeDescriptor, out: &mut Vec<&'a str>) {
    match descriptor {
        TypeDescriptor::Named(name) => out.push(name),
        TypeDescriptor::Optional(inner)
        | TypeDescriptor::List(inner)
        | TypeDescriptor::Dict(_, inner) => collect_named(inner, out),
        TypeDescriptor::Primitive(_) | TypeDescriptor::EnumRef(_) => {}
    }
}

/// Collaborator supplying the items of a platform enumeration
/// (`Enum.<Name>`), in ordinal order.
pub trait EnumItemsSource {
    /// Returns the items of `name`, or `None` if the enumeration is unknown.
    fn items(&self, name: &str) -> Option<&[String]>;
}

/// Map-backed [`EnumItemsSource`] for configurations and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticEnumItems {
    items: IndexMap<String, Vec<String>>,
}

impl StaticEnumItems {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source from an ordered name → items mapping.
    pub fn from_map(items: IndexMap<String, Vec<String>>) -> Self {
        Self { items }
    }

    /// Adds an enumeration, replacing any previous items for `name`.
    pub fn with(mut self, name: &str, items: &[&str]) -> Self {
        self.items.insert(
            name.to_string(),
            items.iter().map(|s| s.to_string()).collect(),
        );
        self
    }
}

impl EnumItemsSource for StaticEnumItems {
    fn items(&self, name: &str) -> Option<&[String]> {
        self.items.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn struct_def(members: &[(&str, &str)]) -> RawCompositeDef {
        RawCompositeDef::Struct(
            members
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_define_and_lookup() {
        let mut registry = TypeRegistry::new();
        registry
            .define("Pet", &struct_def(&[("Name", "string"), ("Level", "int")]))
            .unwrap();

        let CompositeDef::Struct(members) = registry.lookup("Pet").unwrap() else {
            panic!("expected struct");
        };
        assert_eq!(members.len(), 2);
        assert!(registry.lookup("Unknown").is_err());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = TypeRegistry::new();
        registry
            .define("Pet", &struct_def(&[("Name", "string")]))
            .unwrap();
        assert_eq!(
            registry.define("Pet", &struct_def(&[("Name", "string")])),
            Err(ConfigError::DuplicateType("Pet".to_string()))
        );
    }

    #[test]
    fn test_forward_reference_fails_fast() {
        let mut registry = TypeRegistry::new();
        assert_eq!(
            registry.define("Owner", &struct_def(&[("Pet", "Pet")])),
            Err(ConfigError::UnknownType("Pet".to_string()))
        );
        // The failed definition leaves no residue.
        assert!(registry.is_empty());
    }

    #[test]
    fn test_direct_self_reference_is_cyclic() {
        let mut registry = TypeRegistry::new();
        assert_eq!(
            registry.define("Node", &struct_def(&[("Next", "Node")])),
            Err(ConfigError::CyclicType("Node -> Node".to_string()))
        );
        assert!(!registry.contains("Node"));
    }

    #[test]
    fn test_self_reference_through_container_is_cyclic() {
        let mut registry = TypeRegistry::new();
        assert!(matches!(
            registry.define("Tree", &struct_def(&[("Children", "List[Tree]")])),
            Err(ConfigError::CyclicType(_))
        ));
    }

    #[test]
    fn test_acyclic_named_references_accepted() {
        let mut registry = TypeRegistry::new();
        registry
            .define("Pet", &struct_def(&[("Name", "string")]))
            .unwrap();
        registry
            .define("Owner", &struct_def(&[("Pets", "List[Pet]")]))
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_enum_set_rejects_duplicate_items() {
        let mut registry = TypeRegistry::new();
        let raw = RawCompositeDef::EnumSet(vec!["A".into(), "B".into(), "A".into()]);
        assert_eq!(
            registry.define("Grade", &raw),
            Err(ConfigError::DuplicateEnumItem {
                name: "Grade".to_string(),
                item: "A".to_string(),
            })
        );
    }

    #[test]
    fn test_static_enum_items() {
        let source = StaticEnumItems::new().with("Material", &["Wood", "Stone"]);
        assert_eq!(
            source.items("Material").unwrap(),
            &["Wood".to_string(), "Stone".to_string()]
        );
        assert!(source.items("Missing").is_none());
    }

    #[test]
    fn test_raw_def_deserializes_untagged() {
        let yaml = r#"
Rarity:
  - Common
  - Rare
Pet:
  Name: string
  Rarity: Rarity
"#;
        let raw: IndexMap<String, RawCompositeDef> = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(raw["Rarity"], RawCompositeDef::EnumSet(_)));
        assert!(matches!(raw["Pet"], RawCompositeDef::Struct(_)));
    }
}
