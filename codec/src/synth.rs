//! Codec synthesis: matched encode/decode pairs per type.
//!
//! [`CodecSet::synthesize`] walks a [`TypeRegistry`] and builds one matched
//! [`Codec`] pair per named composite type by recursively composing member
//! codecs: named references reuse the referenced type's pair, containers
//! wrap their element's pair in an element-wise mapper, enum references go
//! through 1-based ordinals, and primitives use the canonical scalar pair.
//! Registry acyclicity (checked at define time) guarantees the composition
//! terminates.
//!
//! The synthesized pairs obey the round-trip law: for every well-formed
//! value `v`, `decode(encode(v)) == v`, and for every payload `e` produced
//! by `encode`, `encode(decode(e)) == e`.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Value as Json, json};

use fieldtree_core::{
    CompositeDef, ConfigError, EnumItemsSource, KeyKind, TypeDescriptor, TypeRegistry, Value,
};

use crate::error::{CodecError, Result};
use crate::scalar;

type EncodeFn = Arc<dyn Fn(&Value) -> Result<Json> + Send + Sync>;
type DecodeFn = Arc<dyn Fn(&Json) -> Result<Value> + Send + Sync>;

/// A matched serialize/deserialize pair for one type.
#[derive(Clone)]
pub struct Codec {
    encode_fn: EncodeFn,
    decode_fn: DecodeFn,
}

impl Codec {
    fn new(encode_fn: EncodeFn, decode_fn: DecodeFn) -> Self {
        Self {
            encode_fn,
            decode_fn,
        }
    }

    /// Encodes a decoded value into its canonical payload.
    pub fn encode(&self, value: &Value) -> Result<Json> {
        (self.encode_fn)(value)
    }

    /// Decodes a payload back into a value.
    pub fn decode(&self, payload: &Json) -> Result<Value> {
        (self.decode_fn)(payload)
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Codec")
    }
}

/// Synthesized codecs for every named composite type in a registry.
#[derive(Debug, Clone, Default)]
pub struct CodecSet {
    by_name: IndexMap<String, Codec>,
}

impl CodecSet {
    /// Builds one codec pair per named type.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingEnumItems`] when a member references a platform
    /// enumeration the items source cannot supply.
    pub fn synthesize(
        registry: &TypeRegistry,
        enums: &dyn EnumItemsSource,
    ) -> std::result::Result<Self, ConfigError> {
        let mut set = Self::default();
        for (name, def) in registry.iter() {
            let codec = match def {
                CompositeDef::EnumSet(items) => enum_set_codec(name, items),
                CompositeDef::Struct(members) => {
                    let mut fields = Vec::with_capacity(members.len());
                    for (member, descriptor) in members {
                        fields.push((member.clone(), set.build(name, descriptor, enums)?));
                    }
                    struct_codec(name, fields)
                }
            };
            set.by_name.insert(name.to_string(), codec);
        }
        Ok(set)
    }

    /// Returns the codec for a named composite type.
    pub fn get(&self, name: &str) -> Option<&Codec> {
        self.by_name.get(name)
    }

    /// Composes a codec for an arbitrary field descriptor, reusing the
    /// synthesized pairs for named references.
    pub fn codec_for(
        &self,
        descriptor: &TypeDescriptor,
        enums: &dyn EnumItemsSource,
    ) -> std::result::Result<Codec, ConfigError> {
        self.build("<field>", descriptor, enums)
    }

    fn build(
        &self,
        context: &str,
        descriptor: &TypeDescriptor,
        enums: &dyn EnumItemsSource,
    ) -> std::result::Result<Codec, ConfigError> {
        match descriptor {
            TypeDescriptor::Primitive(kind) => {
                let kind = *kind;
                let decode_kind = kind;
                Ok(Codec::new(
                    Arc::new(move |value| scalar::encode_scalar(kind, value)),
                    Arc::new(move |payload| scalar::decode_scalar(decode_kind, payload)),
                ))
            }
            TypeDescriptor::Optional(inner) => {
                let inner = self.build(context, inner, enums)?;
                Ok(optional_codec(inner))
            }
            TypeDescriptor::List(element) => {
                let element = self.build(context, element, enums)?;
                Ok(list_codec(element))
            }
            TypeDescriptor::Dict(key, element) => {
                let element = self.build(context, element, enums)?;
                Ok(dict_codec(*key, element))
            }
            TypeDescriptor::EnumRef(name) => {
                let items = enums
                    .items(name)
                    .ok_or_else(|| ConfigError::MissingEnumItems(name.clone()))?
                    .to_vec();
                Ok(enum_ref_codec(name, items))
            }
            TypeDescriptor::Named(name) => self
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownType(format!("{name} (in {context})"))),
        }
    }
}

/// Returns `true` if values of this type encode to a structural (object or
/// array) payload, which a text-only channel cannot carry directly.
pub fn encodes_structurally(descriptor: &TypeDescriptor, registry: &TypeRegistry) -> bool {
    match descriptor {
        TypeDescriptor::Primitive(kind) => {
            use fieldtree_core::PrimitiveKind as P;
            matches!(kind, P::Color | P::Vector2(_) | P::Vector3(_) | P::Pose(_))
        }
        TypeDescriptor::Optional(inner) => encodes_structurally(inner, registry),
        TypeDescriptor::List(_) | TypeDescriptor::Dict(_, _) => true,
        TypeDescriptor::EnumRef(_) => false,
        TypeDescriptor::Named(name) => matches!(
            registry.lookup(name),
            Ok(CompositeDef::Struct(_))
        ),
    }
}

fn optional_codec(inner: Codec) -> Codec {
    let encode_inner = inner.clone();
    Codec::new(
        Arc::new(move |value| match value {
            Value::Nil => Ok(Json::Null),
            present => encode_inner.encode(present),
        }),
        Arc::new(move |payload| match payload {
            Json::Null => Ok(Value::Nil),
            present => inner.decode(present),
        }),
    )
}

fn list_codec(element: Codec) -> Codec {
    let encode_element = element.clone();
    Codec::new(
        Arc::new(move |value| {
            let Value::List(items) = value else {
                return Err(CodecError::mismatch("list", value.kind_name()));
            };
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(encode_element.encode(item)?);
            }
            Ok(Json::Array(out))
        }),
        Arc::new(move |payload| {
            let Json::Array(items) = payload else {
                return Err(CodecError::mismatch("array", payload));
            };
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(element.decode(item)?);
            }
            Ok(Value::List(out))
        }),
    )
}

fn dict_codec(key: KeyKind, element: Codec) -> Codec {
    let encode_element = element.clone();
    let decode_key = key;
    Codec::new(
        Arc::new(move |value| {
            let Value::Dict(entries) = value else {
                return Err(CodecError::mismatch("dict", value.kind_name()));
            };
            let mut out = serde_json::Map::with_capacity(entries.len());
            for (entry_key, entry) in entries {
                check_key(key, entry_key)?;
                out.insert(entry_key.clone(), encode_element.encode(entry)?);
            }
            Ok(Json::Object(out))
        }),
        Arc::new(move |payload| {
            let Json::Object(entries) = payload else {
                return Err(CodecError::mismatch("object", payload));
            };
            let mut out = IndexMap::with_capacity(entries.len());
            for (entry_key, entry) in entries {
                check_key(decode_key, entry_key)?;
                out.insert(entry_key.clone(), element.decode(entry)?);
            }
            Ok(Value::Dict(out))
        }),
    )
}

/// Integer dict keys travel as decimal strings; both directions reject keys
/// that do not parse back.
fn check_key(kind: KeyKind, key: &str) -> Result<()> {
    match kind {
        KeyKind::String => Ok(()),
        KeyKind::Integer => {
            if key.parse::<i64>().is_ok() {
                Ok(())
            } else {
                Err(CodecError::MalformedPayload(format!(
                    "non-integer dict key {key:?}"
                )))
            }
        }
    }
}

fn enum_ref_codec(name: &str, items: Vec<String>) -> Codec {
    let name = name.to_string();
    let decode_name = name.clone();
    let decode_items = items.clone();
    Codec::new(
        Arc::new(move |value| {
            let Value::String(literal) = value else {
                return Err(CodecError::mismatch("enum literal", value.kind_name()));
            };
            match items.iter().position(|item| item == literal) {
                Some(index) => Ok(json!(index as i64 + 1)),
                None => Err(CodecError::InvalidEnumMember {
                    name: name.clone(),
                    value: literal.clone(),
                }),
            }
        }),
        Arc::new(move |payload| {
            let ordinal = payload
                .as_i64()
                .ok_or_else(|| CodecError::mismatch("ordinal", payload))?;
            let index = ordinal
                .checked_sub(1)
                .and_then(|i| usize::try_from(i).ok());
            match index.and_then(|i| decode_items.get(i)) {
                Some(literal) => Ok(Value::String(literal.clone())),
                None => Err(CodecError::UnknownEnumValue {
                    name: decode_name.clone(),
                    ordinal,
                }),
            }
        }),
    )
}

fn enum_set_codec(name: &str, items: &[String]) -> Codec {
    let name = name.to_string();
    let decode_name = name.clone();
    let items = items.to_vec();
    let decode_items = items.clone();
    Codec::new(
        Arc::new(move |value| {
            let Value::String(literal) = value else {
                return Err(CodecError::mismatch("enum literal", value.kind_name()));
            };
            match items.iter().position(|item| item == literal) {
                Some(index) => Ok(json!(index as i64 + 1)),
                None => Err(CodecError::InvalidEnumMember {
                    name: name.clone(),
                    value: literal.clone(),
                }),
            }
        }),
        Arc::new(move |payload| {
            let index = payload
                .as_i64()
                .ok_or_else(|| CodecError::mismatch("index", payload))?;
            let slot = index
                .checked_sub(1)
                .and_then(|i| usize::try_from(i).ok());
            match slot.and_then(|i| decode_items.get(i)) {
                Some(literal) => Ok(Value::String(literal.clone())),
                None => Err(CodecError::IndexOutOfRange {
                    name: decode_name.clone(),
                    index,
                }),
            }
        }),
    )
}

fn struct_codec(name: &str, fields: Vec<(String, Codec)>) -> Codec {
    let name = name.to_string();
    let decode_name = name.clone();
    let decode_fields: Vec<(String, Codec)> = fields.clone();
    Codec::new(
        Arc::new(move |value| {
            let Value::Dict(members) = value else {
                return Err(CodecError::mismatch("struct", value.kind_name()));
            };
            let mut out = serde_json::Map::with_capacity(fields.len());
            for (member, codec) in &fields {
                let member_value =
                    members
                        .get(member)
                        .ok_or_else(|| CodecError::MissingMember {
                            name: name.clone(),
                            member: member.clone(),
                        })?;
                out.insert(member.clone(), codec.encode(member_value)?);
            }
            Ok(Json::Object(out))
        }),
        Arc::new(move |payload| {
            let Json::Object(members) = payload else {
                return Err(CodecError::mismatch("object", payload));
            };
            let mut out = IndexMap::with_capacity(decode_fields.len());
            for (member, codec) in &decode_fields {
                let member_payload =
                    members
                        .get(member)
                        .ok_or_else(|| CodecError::MissingMember {
                            name: decode_name.clone(),
                            member: member.clone(),
                        })?;
                out.insert(member.clone(), codec.decode(member_payload)?);
            }
            Ok(Value::Dict(out))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldtree_core::{RawCompositeDef, StaticEnumItems, resolve};

    fn pet_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .define(
                "Rarity",
                &RawCompositeDef::EnumSet(vec!["Common".into(), "Rare".into(), "Legendary".into()]),
            )
            .unwrap();
        let mut members = IndexMap::new();
        members.insert("Name".to_string(), "string".to_string());
        members.insert("Rarity".to_string(), "Rarity".to_string());
        members.insert("Position".to_string(), "Vector3Integer?".to_string());
        registry
            .define("Pet", &RawCompositeDef::Struct(members))
            .unwrap();
        registry
    }

    fn pet(name: &str, rarity: &str, position: Value) -> Value {
        let mut members = IndexMap::new();
        members.insert("Name".to_string(), Value::String(name.to_string()));
        members.insert("Rarity".to_string(), Value::String(rarity.to_string()));
        members.insert("Position".to_string(), position);
        Value::Dict(members)
    }

    #[test]
    fn test_enum_set_ordinals() {
        let registry = pet_registry();
        let set = CodecSet::synthesize(&registry, &StaticEnumItems::new()).unwrap();
        let codec = set.get("Rarity").unwrap();

        assert_eq!(codec.encode(&Value::String("Rare".into())).unwrap(), json!(2));
        assert_eq!(codec.decode(&json!(2)).unwrap(), Value::String("Rare".into()));

        assert_eq!(
            codec.encode(&Value::String("Mythic".into())),
            Err(CodecError::InvalidEnumMember {
                name: "Rarity".to_string(),
                value: "Mythic".to_string(),
            })
        );
        assert_eq!(
            codec.decode(&json!(5)),
            Err(CodecError::IndexOutOfRange {
                name: "Rarity".to_string(),
                index: 5,
            })
        );
        assert_eq!(
            codec.decode(&json!(0)),
            Err(CodecError::IndexOutOfRange {
                name: "Rarity".to_string(),
                index: 0,
            })
        );
    }

    #[test]
    fn test_extreme_ordinals_rejected_not_panicking() {
        let registry = pet_registry();
        let enums = StaticEnumItems::new().with("Material", &["Wood", "Stone"]);
        let set = CodecSet::synthesize(&registry, &enums).unwrap();

        let rarity = set.get("Rarity").unwrap();
        for corrupt in [i64::MIN, -1, 0, i64::MAX] {
            assert_eq!(
                rarity.decode(&json!(corrupt)),
                Err(CodecError::IndexOutOfRange {
                    name: "Rarity".to_string(),
                    index: corrupt,
                }),
                "index {corrupt}"
            );
        }

        let descriptor = resolve("Enum.Material", &registry).unwrap();
        let material = set.codec_for(&descriptor, &enums).unwrap();
        for corrupt in [i64::MIN, 0, i64::MAX] {
            assert_eq!(
                material.decode(&json!(corrupt)),
                Err(CodecError::UnknownEnumValue {
                    name: "Material".to_string(),
                    ordinal: corrupt,
                }),
                "ordinal {corrupt}"
            );
        }
    }

    #[test]
    fn test_struct_roundtrip_with_nested_members() {
        let registry = pet_registry();
        let set = CodecSet::synthesize(&registry, &StaticEnumItems::new()).unwrap();
        let codec = set.get("Pet").unwrap();

        let value = pet(
            "Biscuit",
            "Legendary",
            Value::Vector3 {
                x: 1.0,
                y: 2.0,
                z: 3.0,
            },
        );
        let encoded = codec.encode(&value).unwrap();
        assert_eq!(encoded["Rarity"], json!(3));
        assert_eq!(codec.decode(&encoded).unwrap(), value);
        assert_eq!(codec.encode(&codec.decode(&encoded).unwrap()).unwrap(), encoded);
    }

    #[test]
    fn test_optional_member_passes_nil_through() {
        let registry = pet_registry();
        let set = CodecSet::synthesize(&registry, &StaticEnumItems::new()).unwrap();
        let codec = set.get("Pet").unwrap();

        let value = pet("Biscuit", "Common", Value::Nil);
        let encoded = codec.encode(&value).unwrap();
        assert_eq!(encoded["Position"], Json::Null);
        assert_eq!(codec.decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_containers_preserve_order_and_keys() {
        let registry = pet_registry();
        let set = CodecSet::synthesize(&registry, &StaticEnumItems::new()).unwrap();
        let descriptor = resolve("Dict[string, List[Pet]]", &registry).unwrap();
        let codec = set.codec_for(&descriptor, &StaticEnumItems::new()).unwrap();

        let mut dict = IndexMap::new();
        dict.insert(
            "zulu".to_string(),
            Value::List(vec![pet("A", "Common", Value::Nil)]),
        );
        dict.insert(
            "alpha".to_string(),
            Value::List(vec![pet("B", "Rare", Value::Nil)]),
        );
        let value = Value::Dict(dict);

        let encoded = codec.encode(&value).unwrap();
        let keys: Vec<&String> = encoded.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zulu", "alpha"]);
        assert_eq!(codec.decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_integer_dict_keys_validated() {
        let registry = TypeRegistry::new();
        let set = CodecSet::synthesize(&registry, &StaticEnumItems::new()).unwrap();
        let descriptor = resolve("Dict[Integer, string]", &registry).unwrap();
        let codec = set.codec_for(&descriptor, &StaticEnumItems::new()).unwrap();

        let mut dict = IndexMap::new();
        dict.insert("12".to_string(), Value::String("ok".into()));
        assert!(codec.encode(&Value::Dict(dict.clone())).is_ok());

        dict.insert("twelve".to_string(), Value::String("bad".into()));
        assert!(matches!(
            codec.encode(&Value::Dict(dict)),
            Err(CodecError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_enum_ref_through_items_source() {
        let registry = TypeRegistry::new();
        let enums = StaticEnumItems::new().with("Material", &["Wood", "Stone"]);
        let set = CodecSet::synthesize(&registry, &enums).unwrap();
        let descriptor = resolve("Enum.Material", &registry).unwrap();
        let codec = set.codec_for(&descriptor, &enums).unwrap();

        assert_eq!(codec.encode(&Value::String("Stone".into())).unwrap(), json!(2));
        assert_eq!(
            codec.decode(&json!(1)).unwrap(),
            Value::String("Wood".into())
        );
        assert_eq!(
            codec.decode(&json!(9)),
            Err(CodecError::UnknownEnumValue {
                name: "Material".to_string(),
                ordinal: 9,
            })
        );

        // No items source for the name: synthesis-time config error.
        let err = set
            .codec_for(&descriptor, &StaticEnumItems::new())
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingEnumItems("Material".to_string()));
    }

    #[test]
    fn test_missing_struct_member_reported() {
        let registry = pet_registry();
        let set = CodecSet::synthesize(&registry, &StaticEnumItems::new()).unwrap();
        let codec = set.get("Pet").unwrap();

        let payload = json!({ "Name": "Biscuit", "Rarity": 1 });
        assert_eq!(
            codec.decode(&payload),
            Err(CodecError::MissingMember {
                name: "Pet".to_string(),
                member: "Position".to_string(),
            })
        );
    }

    #[test]
    fn test_structural_encoding_detection() {
        let registry = pet_registry();
        for (expr, expected) in [
            ("Integer", false),
            ("string", false),
            ("Enum.Material", false),
            ("Rarity", false),
            ("Pet", true),
            ("List[Integer]", true),
            ("Dict[string, string]", true),
            ("Vector3", true),
            ("Pet?", true),
        ] {
            let descriptor = resolve(expr, &registry).unwrap();
            assert_eq!(
                encodes_structurally(&descriptor, &registry),
                expected,
                "{expr}"
            );
        }
    }
}
