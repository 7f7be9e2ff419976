//! Decoded value model.
//!
//! [`Value`] is the in-memory representation that field handlers cache and
//! that synthesized codecs translate to and from the encoded store form.
//! Every primitive kind, container, and composite value a schema can describe
//! has a variant here.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A decoded field value.
///
/// # Examples
///
/// ```
/// use fieldtree_core::Value;
///
/// let coins = Value::Number(120.0);
/// assert!(coins.is_numeric());
/// assert_eq!(coins.as_number(), Some(120.0));
/// assert_eq!(Value::Nil.as_number(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value (the optional sentinel).
    Nil,
    /// Boolean.
    Boolean(bool),
    /// Numeric value; write-time rounding belongs to the field's kind, not
    /// to the cached value.
    Number(f64),
    /// String.
    String(String),
    /// Point in time as unix milliseconds.
    DateTime(i64),
    /// RGB color.
    Color { r: f64, g: f64, b: f64 },
    /// 2-component vector.
    Vector2 { x: f64, y: f64 },
    /// 3-component vector.
    Vector3 { x: f64, y: f64, z: f64 },
    /// Position plus orientation (Euler angles, radians).
    Pose {
        position: [f64; 3],
        rotation: [f64; 3],
    },
    /// Ordered sequence.
    List(Vec<Value>),
    /// Keyed mapping; key order is preserved.
    Dict(IndexMap<String, Value>),
}

impl Value {
    /// Returns `true` for [`Value::Nil`].
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns `true` for scalar numeric values.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Returns the scalar numeric value, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Builds a [`Value::DateTime`] from a chrono timestamp.
    pub fn from_datetime(when: chrono::DateTime<chrono::Utc>) -> Self {
        Self::DateTime(when.timestamp_millis())
    }

    /// Converts a [`Value::DateTime`] back to a chrono timestamp.
    pub fn as_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        match self {
            Self::DateTime(millis) => chrono::DateTime::from_timestamp_millis(*millis),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::DateTime(_) => "datetime",
            Self::Color { .. } => "color",
            Self::Vector2 { .. } => "vector2",
            Self::Vector3 { .. } => "vector3",
            Self::Pose { .. } => "pose",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
        }
    }
}
