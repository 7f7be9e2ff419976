//! Runtime codec error type.
//!
//! Unlike [`ConfigError`](fieldtree_core::ConfigError), these errors occur
//! while encoding or decoding live values. Decode failures are surfaced —
//! never silently replaced by the raw encoded payload.

use thiserror::Error;

/// Errors raised by synthesized codecs and the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A value was not a member of the enumeration it was encoded against.
    #[error("{value:?} is not a member of {name}")]
    InvalidEnumMember { name: String, value: String },

    /// A decoded ordinal matched no item of the referenced enumeration.
    #[error("ordinal {ordinal} matches no item of Enum.{name}")]
    UnknownEnumValue { name: String, ordinal: i64 },

    /// A decoded index fell outside an enum set's literal sequence.
    #[error("index {index} out of range for {name}")]
    IndexOutOfRange { name: String, index: i64 },

    /// A value's shape did not match the type it was encoded against.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    /// A struct payload was missing a member.
    #[error("missing member {member} in {name}")]
    MissingMember { name: String, member: String },

    /// An encoded payload could not be decoded at all.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl CodecError {
    pub(crate) fn mismatch(expected: &'static str, actual: impl std::fmt::Display) -> Self {
        Self::TypeMismatch {
            expected,
            actual: actual.to_string(),
        }
    }
}

/// Convenience alias for results with [`CodecError`].
pub type Result<T> = std::result::Result<T, CodecError>;
