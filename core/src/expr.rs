//! Type-expression parsing and canonical rendering.
//!
//! A type expression is a string such as `Integer`, `List[Vector3]?`,
//! `Dict[string, Enum.Material]`, or the name of a registered composite type.
//! [`resolve`] parses an expression into a normalized [`TypeDescriptor`];
//! [`render`] produces the canonical textual form, such that resolving a
//! rendered descriptor yields the descriptor back.
//!
//! # Examples
//!
//! ```
//! use fieldtree_core::{resolve, render, TypeRegistry, TypeDescriptor, PrimitiveKind};
//!
//! let registry = TypeRegistry::new();
//! let ty = resolve("List[int]?", &registry).unwrap();
//! assert_eq!(render(&ty), "List[Integer]?");
//! assert_eq!(resolve(&render(&ty), &registry).unwrap(), ty);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::registry::TypeRegistry;

/// Write-time rounding policy baked into a primitive kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    /// No rounding; the value is stored as-is.
    None,
    /// Round to the nearest whole number.
    Whole,
    /// Round to two decimal places.
    Hundredths,
}

/// Primitive field kinds with their rounding policy.
///
/// Scalar numeric kinds carry a fixed policy (`Integer` rounds to whole,
/// `Double` to two decimal places, `Float` not at all); the compound spatial
/// kinds carry the policy selected by their alias (`Vector3Integer`,
/// `CFrameDouble`, ...), applied component-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// Whole number, rounded to nearest on write.
    Integer,
    /// Number rounded to two decimal places on write.
    Double,
    /// Number stored without rounding.
    Float,
    /// UTF-8 string.
    String,
    /// Boolean.
    Boolean,
    /// Point in time, encoded as unix milliseconds.
    DateTime,
    /// RGB color with unit-interval components.
    Color,
    /// 2-component vector.
    Vector2(Rounding),
    /// 3-component vector.
    Vector3(Rounding),
    /// Position plus orientation.
    Pose(Rounding),
}

impl PrimitiveKind {
    /// Returns the rounding policy applied when values of this kind are
    /// encoded for storage.
    pub fn rounding(&self) -> Rounding {
        match self {
            Self::Integer => Rounding::Whole,
            Self::Double => Rounding::Hundredths,
            Self::Float | Self::String | Self::Boolean | Self::DateTime | Self::Color => {
                Rounding::None
            }
            Self::Vector2(r) | Self::Vector3(r) | Self::Pose(r) => *r,
        }
    }

    /// Returns `true` for the scalar numeric kinds, which support
    /// increment operations and ordered indexes.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Double | Self::Float)
    }
}

/// Permitted key kinds for `Dict[K, V]` expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    /// String keys, stored verbatim.
    String,
    /// Integer keys, rendered as decimal strings in the encoded form.
    Integer,
}

/// Normalized type of a schema field.
///
/// Produced once at compile time by [`resolve`]; all runtime dispatch is a
/// match over this closed set of variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// A primitive kind.
    Primitive(PrimitiveKind),
    /// Absent-or-present wrapper; only valid as the outermost layer.
    Optional(Box<TypeDescriptor>),
    /// Homogeneous ordered sequence.
    List(Box<TypeDescriptor>),
    /// Homogeneous keyed mapping.
    Dict(KeyKind, Box<TypeDescriptor>),
    /// Reference to a platform enumeration (`Enum.<Name>`).
    EnumRef(String),
    /// Reference to a registered composite type.
    Named(String),
}

impl TypeDescriptor {
    /// Returns `true` if the outermost layer (ignoring `Optional`) is a
    /// scalar numeric primitive.
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Primitive(kind) => kind.is_numeric(),
            Self::Optional(inner) => inner.is_numeric(),
            _ => false,
        }
    }

    /// Visits every `EnumRef` name reachable from this descriptor.
    pub fn enum_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::EnumRef(name) => out.push(name),
            Self::Optional(inner) | Self::List(inner) | Self::Dict(_, inner) => {
                inner.enum_refs(out);
            }
            Self::Primitive(_) | Self::Named(_) => {}
        }
    }
}

fn primitive_alias(name: &str) -> Option<PrimitiveKind> {
    let kind = match name {
        "Integer" | "int" => PrimitiveKind::Integer,
        "Double" | "double" => PrimitiveKind::Double,
        "Float" | "float" | "number" => PrimitiveKind::Float,
        "string" => PrimitiveKind::String,
        "boolean" => PrimitiveKind::Boolean,
        "DateTime" => PrimitiveKind::DateTime,
        "Color3" => PrimitiveKind::Color,
        "Vector2" => PrimitiveKind::Vector2(Rounding::None),
        "Vector2Integer" => PrimitiveKind::Vector2(Rounding::Whole),
        "Vector2Double" => PrimitiveKind::Vector2(Rounding::Hundredths),
        "Vector3" => PrimitiveKind::Vector3(Rounding::None),
        "Vector3Integer" => PrimitiveKind::Vector3(Rounding::Whole),
        "Vector3Double" => PrimitiveKind::Vector3(Rounding::Hundredths),
        "CFrame" => PrimitiveKind::Pose(Rounding::None),
        "CFrameInteger" => PrimitiveKind::Pose(Rounding::Whole),
        "CFrameDouble" => PrimitiveKind::Pose(Rounding::Hundredths),
        _ => return None,
    };
    Some(kind)
}

fn canonical_name(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Integer => "Integer",
        PrimitiveKind::Double => "Double",
        PrimitiveKind::Float => "Float",
        PrimitiveKind::String => "string",
        PrimitiveKind::Boolean => "boolean",
        PrimitiveKind::DateTime => "DateTime",
        PrimitiveKind::Color => "Color3",
        PrimitiveKind::Vector2(Rounding::None) => "Vector2",
        PrimitiveKind::Vector2(Rounding::Whole) => "Vector2Integer",
        PrimitiveKind::Vector2(Rounding::Hundredths) => "Vector2Double",
        PrimitiveKind::Vector3(Rounding::None) => "Vector3",
        PrimitiveKind::Vector3(Rounding::Whole) => "Vector3Integer",
        PrimitiveKind::Vector3(Rounding::Hundredths) => "Vector3Double",
        PrimitiveKind::Pose(Rounding::None) => "CFrame",
        PrimitiveKind::Pose(Rounding::Whole) => "CFrameInteger",
        PrimitiveKind::Pose(Rounding::Hundredths) => "CFrameDouble",
    }
}

/// Parses a type expression into a [`TypeDescriptor`].
///
/// The grammar accepts an optional trailing `?` (outermost only), the
/// containers `List[T]` and `Dict[K, V]`, platform enum references
/// `Enum.<Name>`, bare identifiers naming a registered composite, and the
/// fixed primitive aliases.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownType`] for unrecognized identifiers and
/// [`ConfigError::MalformedExpression`] for unbalanced brackets, a
/// non-terminal `?`, or an invalid dict key kind.
///
/// # Examples
///
/// ```
/// use fieldtree_core::{resolve, TypeRegistry, TypeDescriptor, PrimitiveKind};
///
/// let registry = TypeRegistry::new();
/// assert_eq!(
///     resolve("int", &registry).unwrap(),
///     TypeDescriptor::Primitive(PrimitiveKind::Integer),
/// );
/// assert!(resolve("List[Integer", &registry).is_err());
/// assert!(resolve("Integer??", &registry).is_err());
/// ```
pub fn resolve(expr: &str, registry: &TypeRegistry) -> Result<TypeDescriptor> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MalformedExpression(expr.to_string()));
    }
    if let Some(inner) = trimmed.strip_suffix('?') {
        let descriptor = resolve_required(inner.trim_end(), registry)?;
        return Ok(TypeDescriptor::Optional(Box::new(descriptor)));
    }
    resolve_required(trimmed, registry)
}

fn resolve_required(expr: &str, registry: &TypeRegistry) -> Result<TypeDescriptor> {
    if expr.is_empty() || expr.contains('?') {
        return Err(ConfigError::MalformedExpression(expr.to_string()));
    }

    if let Some(body) = container_body(expr, "List")? {
        let element = resolve_required(body.trim(), registry)?;
        return Ok(TypeDescriptor::List(Box::new(element)));
    }

    if let Some(body) = container_body(expr, "Dict")? {
        let (key_expr, value_expr) = split_dict_body(body)
            .ok_or_else(|| ConfigError::MalformedExpression(expr.to_string()))?;
        let key = dict_key_kind(key_expr.trim())
            .ok_or_else(|| ConfigError::MalformedExpression(expr.to_string()))?;
        let element = resolve_required(value_expr.trim(), registry)?;
        return Ok(TypeDescriptor::Dict(key, Box::new(element)));
    }

    if let Some(name) = expr.strip_prefix("Enum.") {
        if name.is_empty() || !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(ConfigError::MalformedExpression(expr.to_string()));
        }
        return Ok(TypeDescriptor::EnumRef(name.to_string()));
    }

    if let Some(kind) = primitive_alias(expr) {
        return Ok(TypeDescriptor::Primitive(kind));
    }

    if registry.contains(expr) {
        return Ok(TypeDescriptor::Named(expr.to_string()));
    }

    Err(ConfigError::UnknownType(expr.to_string()))
}

/// Returns the bracket body if `expr` is `<name>[...]`, `None` if it does
/// not start with `<name>[`, and an error on unbalanced brackets.
fn container_body<'a>(expr: &'a str, name: &str) -> Result<Option<&'a str>> {
    let Some(rest) = expr.strip_prefix(name) else {
        return Ok(None);
    };
    let Some(body_and_close) = rest.strip_prefix('[') else {
        return Ok(None);
    };
    let Some(body) = body_and_close.strip_suffix(']') else {
        return Err(ConfigError::MalformedExpression(expr.to_string()));
    };
    let mut depth = 0i32;
    for ch in body.chars() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ConfigError::MalformedExpression(expr.to_string()));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ConfigError::MalformedExpression(expr.to_string()));
    }
    Ok(Some(body))
}

/// Splits a `Dict` body at its single top-level comma.
fn split_dict_body(body: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    for (idx, ch) in body.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth -= 1,
            ',' if depth == 0 => return Some((&body[..idx], &body[idx + 1..])),
            _ => {}
        }
    }
    None
}

fn dict_key_kind(expr: &str) -> Option<KeyKind> {
    match expr {
        "string" => Some(KeyKind::String),
        "Integer" | "int" => Some(KeyKind::Integer),
        _ => None,
    }
}

/// Renders a descriptor back to its canonical type expression.
///
/// The output is stable and re-resolvable: for every resolvable expression
/// `e`, `resolve(&render(&resolve(e)?))? == resolve(e)?`.
pub fn render(descriptor: &TypeDescriptor) -> String {
    match descriptor {
        TypeDescriptor::Primitive(kind) => canonical_name(*kind).to_string(),
        TypeDescriptor::Optional(inner) => format!("{}?", render(inner)),
        TypeDescriptor::List(element) => format!("List[{}]", render(element)),
        TypeDescriptor::Dict(key, element) => {
            let key_name = match key {
                KeyKind::String => "string",
                KeyKind::Integer => "Integer",
            };
            format!("Dict[{}, {}]", key_name, render(element))
        }
        TypeDescriptor::EnumRef(name) => format!("Enum.{name}"),
        TypeDescriptor::Named(name) => name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RawCompositeDef;

    fn registry_with_pet() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        let mut members = indexmap::IndexMap::new();
        members.insert("Name".to_string(), "string".to_string());
        registry
            .define("Pet", &RawCompositeDef::Struct(members))
            .unwrap();
        registry
    }

    #[test]
    fn test_primitive_aliases_canonicalize() {
        let registry = TypeRegistry::new();
        for (alias, canonical) in [
            ("int", "Integer"),
            ("Integer", "Integer"),
            ("double", "Double"),
            ("float", "Float"),
            ("number", "Float"),
            ("Vector3Integer", "Vector3Integer"),
            ("CFrameDouble", "CFrameDouble"),
        ] {
            let ty = resolve(alias, &registry).unwrap();
            assert_eq!(render(&ty), canonical, "alias {alias}");
        }
    }

    #[test]
    fn test_rounding_baked_into_kind() {
        let registry = TypeRegistry::new();
        let TypeDescriptor::Primitive(kind) = resolve("Vector2Integer", &registry).unwrap() else {
            panic!("expected primitive");
        };
        assert_eq!(kind.rounding(), Rounding::Whole);
        let TypeDescriptor::Primitive(kind) = resolve("Double", &registry).unwrap() else {
            panic!("expected primitive");
        };
        assert_eq!(kind.rounding(), Rounding::Hundredths);
    }

    #[test]
    fn test_optional_is_outermost_wrapper() {
        let registry = TypeRegistry::new();
        let ty = resolve("List[Integer]?", &registry).unwrap();
        assert!(matches!(ty, TypeDescriptor::Optional(_)));
        assert!(resolve("Integer??", &registry).is_err());
        assert!(resolve("List[Integer?]", &registry).is_err());
    }

    #[test]
    fn test_nested_containers() {
        let registry = TypeRegistry::new();
        let ty = resolve("Dict[string, List[Vector3]]", &registry).unwrap();
        assert_eq!(render(&ty), "Dict[string, List[Vector3]]");
    }

    #[test]
    fn test_dict_key_kinds() {
        let registry = TypeRegistry::new();
        assert!(resolve("Dict[Integer, string]", &registry).is_ok());
        assert_eq!(
            resolve("Dict[Vector3, string]", &registry),
            Err(ConfigError::MalformedExpression(
                "Dict[Vector3, string]".to_string()
            ))
        );
    }

    #[test]
    fn test_enum_reference() {
        let registry = TypeRegistry::new();
        assert_eq!(
            resolve("Enum.Material", &registry).unwrap(),
            TypeDescriptor::EnumRef("Material".to_string())
        );
        assert!(resolve("Enum.", &registry).is_err());
    }

    #[test]
    fn test_registered_composite_name() {
        let registry = registry_with_pet();
        assert_eq!(
            resolve("Pet", &registry).unwrap(),
            TypeDescriptor::Named("Pet".to_string())
        );
        assert_eq!(
            resolve("Owner", &registry),
            Err(ConfigError::UnknownType("Owner".to_string()))
        );
    }

    #[test]
    fn test_unbalanced_brackets_are_malformed() {
        let registry = TypeRegistry::new();
        assert!(matches!(
            resolve("List[Integer", &registry),
            Err(ConfigError::MalformedExpression(_))
        ));
        assert!(matches!(
            resolve("Dict[string, List[Integer]", &registry),
            Err(ConfigError::MalformedExpression(_))
        ));
    }

    #[test]
    fn test_resolve_render_resolve_is_idempotent() {
        let registry = registry_with_pet();
        for expr in [
            "int",
            "Double?",
            "List[List[Color3]]",
            "Dict[Integer, Pet]",
            "Dict[string, List[Enum.Material]]?",
            "CFrameInteger",
            "Pet",
        ] {
            let once = resolve(expr, &registry).unwrap();
            let twice = resolve(&render(&once), &registry).unwrap();
            assert_eq!(once, twice, "expression {expr}");
        }
    }
}
