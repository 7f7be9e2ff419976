//! Canonical scalar (de)serializers.
//!
//! One fixed encode/decode pair per primitive kind, applying that kind's
//! rounding policy on both directions so that every payload a codec produces
//! or accepts is in canonical form.

use serde_json::{Value as Json, json};

use fieldtree_core::{PrimitiveKind, Rounding, Value};

use crate::error::{CodecError, Result};

/// Applies a rounding policy to one component.
pub fn apply_rounding(value: f64, rounding: Rounding) -> f64 {
    match rounding {
        Rounding::None => value,
        Rounding::Whole => value.round(),
        Rounding::Hundredths => (value * 100.0).round() / 100.0,
    }
}

fn number_json(value: f64, rounding: Rounding) -> Result<Json> {
    let rounded = apply_rounding(value, rounding);
    if !rounded.is_finite() {
        return Err(CodecError::MalformedPayload(format!(
            "non-finite number {value}"
        )));
    }
    if rounding == Rounding::Whole {
        // 2^63 and beyond cannot be represented; reject instead of
        // saturating silently.
        if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
            return Err(CodecError::MalformedPayload(format!(
                "whole number {rounded} out of range"
            )));
        }
        Ok(json!(rounded as i64))
    } else {
        Ok(json!(rounded))
    }
}

fn expect_number(payload: &Json) -> Result<f64> {
    payload
        .as_f64()
        .ok_or_else(|| CodecError::mismatch("number", payload))
}

fn member(payload: &Json, key: &str) -> Result<f64> {
    payload
        .get(key)
        .ok_or_else(|| CodecError::MalformedPayload(format!("missing component {key}")))
        .and_then(expect_number)
}

/// Encodes a scalar value of `kind`, applying its rounding policy.
///
/// # Errors
///
/// [`CodecError::TypeMismatch`] when the value's variant does not match the
/// kind.
pub fn encode_scalar(kind: PrimitiveKind, value: &Value) -> Result<Json> {
    let rounding = kind.rounding();
    match (kind, value) {
        (PrimitiveKind::Integer | PrimitiveKind::Double | PrimitiveKind::Float, Value::Number(n)) => {
            number_json(*n, rounding)
        }
        (PrimitiveKind::String, Value::String(s)) => Ok(json!(s)),
        (PrimitiveKind::Boolean, Value::Boolean(b)) => Ok(json!(b)),
        (PrimitiveKind::DateTime, Value::DateTime(millis)) => Ok(json!(millis)),
        (PrimitiveKind::Color, Value::Color { r, g, b }) => Ok(json!({ "r": r, "g": g, "b": b })),
        (PrimitiveKind::Vector2(_), Value::Vector2 { x, y }) => Ok(json!({
            "x": apply_rounding(*x, rounding),
            "y": apply_rounding(*y, rounding),
        })),
        (PrimitiveKind::Vector3(_), Value::Vector3 { x, y, z }) => Ok(json!({
            "x": apply_rounding(*x, rounding),
            "y": apply_rounding(*y, rounding),
            "z": apply_rounding(*z, rounding),
        })),
        (PrimitiveKind::Pose(_), Value::Pose { position, rotation }) => Ok(json!({
            "position": position
                .iter()
                .map(|c| apply_rounding(*c, rounding))
                .collect::<Vec<_>>(),
            "rotation": rotation
                .iter()
                .map(|c| apply_rounding(*c, rounding))
                .collect::<Vec<_>>(),
        })),
        (_, other) => Err(CodecError::mismatch(scalar_name(kind), other.kind_name())),
    }
}

/// Decodes a scalar payload of `kind`, normalizing through the same
/// rounding policy.
///
/// # Errors
///
/// [`CodecError::TypeMismatch`] or [`CodecError::MalformedPayload`] when the
/// payload's shape does not match the kind.
pub fn decode_scalar(kind: PrimitiveKind, payload: &Json) -> Result<Value> {
    let rounding = kind.rounding();
    match kind {
        PrimitiveKind::Integer | PrimitiveKind::Double | PrimitiveKind::Float => {
            Ok(Value::Number(apply_rounding(expect_number(payload)?, rounding)))
        }
        PrimitiveKind::String => payload
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| CodecError::mismatch("string", payload)),
        PrimitiveKind::Boolean => payload
            .as_bool()
            .map(Value::Boolean)
            .ok_or_else(|| CodecError::mismatch("boolean", payload)),
        PrimitiveKind::DateTime => payload
            .as_i64()
            .map(Value::DateTime)
            .ok_or_else(|| CodecError::mismatch("datetime", payload)),
        PrimitiveKind::Color => Ok(Value::Color {
            r: member(payload, "r")?,
            g: member(payload, "g")?,
            b: member(payload, "b")?,
        }),
        PrimitiveKind::Vector2(_) => Ok(Value::Vector2 {
            x: apply_rounding(member(payload, "x")?, rounding),
            y: apply_rounding(member(payload, "y")?, rounding),
        }),
        PrimitiveKind::Vector3(_) => Ok(Value::Vector3 {
            x: apply_rounding(member(payload, "x")?, rounding),
            y: apply_rounding(member(payload, "y")?, rounding),
            z: apply_rounding(member(payload, "z")?, rounding),
        }),
        PrimitiveKind::Pose(_) => Ok(Value::Pose {
            position: triple(payload, "position", rounding)?,
            rotation: triple(payload, "rotation", rounding)?,
        }),
    }
}

fn triple(payload: &Json, key: &str, rounding: Rounding) -> Result<[f64; 3]> {
    let components = payload
        .get(key)
        .and_then(Json::as_array)
        .ok_or_else(|| CodecError::MalformedPayload(format!("missing component {key}")))?;
    if components.len() != 3 {
        return Err(CodecError::MalformedPayload(format!(
            "component {key} has {} elements, expected 3",
            components.len()
        )));
    }
    let mut out = [0.0; 3];
    for (slot, component) in out.iter_mut().zip(components) {
        *slot = apply_rounding(expect_number(component)?, rounding);
    }
    Ok(out)
}

fn scalar_name(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Integer | PrimitiveKind::Double | PrimitiveKind::Float => "number",
        PrimitiveKind::String => "string",
        PrimitiveKind::Boolean => "boolean",
        PrimitiveKind::DateTime => "datetime",
        PrimitiveKind::Color => "color",
        PrimitiveKind::Vector2(_) => "vector2",
        PrimitiveKind::Vector3(_) => "vector3",
        PrimitiveKind::Pose(_) => "pose",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_rounds_to_nearest_whole() {
        let encoded = encode_scalar(PrimitiveKind::Integer, &Value::Number(3.7)).unwrap();
        assert_eq!(encoded, json!(4));
        let encoded = encode_scalar(PrimitiveKind::Integer, &Value::Number(-2.4)).unwrap();
        assert_eq!(encoded, json!(-2));
    }

    #[test]
    fn test_double_rounds_to_two_places() {
        let encoded = encode_scalar(PrimitiveKind::Double, &Value::Number(3.14159)).unwrap();
        assert_eq!(encoded, json!(3.14));
    }

    #[test]
    fn test_float_is_unrounded() {
        let encoded = encode_scalar(PrimitiveKind::Float, &Value::Number(3.14159)).unwrap();
        assert_eq!(encoded, json!(3.14159));
    }

    #[test]
    fn test_vector_rounding_is_component_wise() {
        let value = Value::Vector3 {
            x: 1.4,
            y: 2.6,
            z: -0.5,
        };
        let encoded =
            encode_scalar(PrimitiveKind::Vector3(Rounding::Whole), &value).unwrap();
        assert_eq!(encoded, json!({ "x": 1.0, "y": 3.0, "z": -1.0 }));
    }

    #[test]
    fn test_scalar_roundtrip() {
        for (kind, value) in [
            (PrimitiveKind::Integer, Value::Number(4.0)),
            (PrimitiveKind::Double, Value::Number(3.14)),
            (PrimitiveKind::String, Value::String("hi".into())),
            (PrimitiveKind::Boolean, Value::Boolean(true)),
            (PrimitiveKind::DateTime, Value::DateTime(1_700_000_000_000)),
            (
                PrimitiveKind::Color,
                Value::Color {
                    r: 0.5,
                    g: 0.25,
                    b: 1.0,
                },
            ),
            (
                PrimitiveKind::Pose(Rounding::None),
                Value::Pose {
                    position: [1.0, 2.0, 3.0],
                    rotation: [0.0, 1.5, 0.0],
                },
            ),
        ] {
            let encoded = encode_scalar(kind, &value).unwrap();
            assert_eq!(decode_scalar(kind, &encoded).unwrap(), value, "{kind:?}");
        }
    }

    #[test]
    fn test_extreme_numbers_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                encode_scalar(PrimitiveKind::Float, &Value::Number(bad)),
                Err(CodecError::MalformedPayload(_))
            ));
        }
        // Beyond i64 range a whole-rounded field cannot store the value.
        for bad in [f64::MAX, -f64::MAX, 2.0_f64.powi(63)] {
            assert!(matches!(
                encode_scalar(PrimitiveKind::Integer, &Value::Number(bad)),
                Err(CodecError::MalformedPayload(_))
            ));
        }
        // Large but representable values still encode.
        let encoded = encode_scalar(PrimitiveKind::Integer, &Value::Number(2.0_f64.powi(53))).unwrap();
        assert_eq!(encoded, json!(9_007_199_254_740_992_i64));
    }

    #[test]
    fn test_type_mismatch_reported() {
        let err = encode_scalar(PrimitiveKind::Integer, &Value::String("7".into())).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
        let err = decode_scalar(PrimitiveKind::Boolean, &json!(1)).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }
}
