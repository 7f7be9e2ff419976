//! Channel-level payload framing.
//!
//! Some storage channels carry arbitrary JSON-shaped payloads; others carry
//! text and numbers only. [`TransportCodec`] bridges the gap: on a text-only
//! channel, structural payloads (objects and arrays) are serialized and
//! wrapped in base64 so they travel as a single opaque string, and unwrapped
//! on the way back. Scalar payloads always pass through untouched.
//!
//! The caller states whether a payload is structural when decoding, because
//! a bare string payload and a wrapped structural payload are otherwise
//! indistinguishable on a text channel. [`encodes_structurally`] computes
//! that flag from a field's type.
//!
//! [`encodes_structurally`]: crate::synth::encodes_structurally

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value as Json;

use crate::error::{CodecError, Result};

/// Frames codec payloads for a storage channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportCodec {
    text_only: bool,
}

impl TransportCodec {
    /// A transport whose channel carries arbitrary JSON-shaped payloads.
    pub fn passthrough() -> Self {
        Self { text_only: false }
    }

    /// A transport whose channel carries only text and numbers.
    pub fn text_only() -> Self {
        Self { text_only: true }
    }

    /// Returns `true` when structural payloads must be wrapped.
    pub fn is_text_only(&self) -> bool {
        self.text_only
    }

    /// Frames a payload for the channel.
    pub fn encode(&self, payload: &Json) -> Json {
        if self.text_only && matches!(payload, Json::Object(_) | Json::Array(_)) {
            Json::String(STANDARD.encode(payload.to_string()))
        } else {
            payload.clone()
        }
    }

    /// Unframes a payload read from the channel.
    ///
    /// `structural` tells the transport whether the field's type encodes to
    /// an object or array, and therefore whether a string read from a
    /// text-only channel is a wrapper or a plain scalar.
    ///
    /// # Errors
    ///
    /// [`CodecError::MalformedPayload`] when a wrapper is expected but the
    /// payload is not valid base64-wrapped JSON.
    pub fn decode(&self, payload: &Json, structural: bool) -> Result<Json> {
        if !self.text_only || !structural {
            return Ok(payload.clone());
        }
        let wrapped = payload
            .as_str()
            .ok_or_else(|| CodecError::mismatch("wrapped payload", payload))?;
        let bytes = STANDARD
            .decode(wrapped)
            .map_err(|e| CodecError::MalformedPayload(format!("invalid base64 wrapper: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CodecError::MalformedPayload(format!("invalid wrapped payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_passthrough_leaves_everything_alone() {
        let transport = TransportCodec::passthrough();
        let payload = json!({ "Name": "Biscuit", "Rarity": 2 });
        assert_eq!(transport.encode(&payload), payload);
        assert_eq!(transport.decode(&payload, true).unwrap(), payload);
    }

    #[test]
    fn test_text_only_wraps_structural_payloads() {
        let transport = TransportCodec::text_only();
        let payload = json!([1, 2, 3]);

        let framed = transport.encode(&payload);
        assert!(framed.is_string());
        assert_eq!(transport.decode(&framed, true).unwrap(), payload);
    }

    #[test]
    fn test_text_only_passes_scalars_through() {
        let transport = TransportCodec::text_only();
        for payload in [json!(42), json!("plain string"), json!(true)] {
            assert_eq!(transport.encode(&payload), payload);
            assert_eq!(transport.decode(&payload, false).unwrap(), payload);
        }
    }

    #[test]
    fn test_corrupt_wrapper_reported() {
        let transport = TransportCodec::text_only();
        let err = transport
            .decode(&json!("not base64!!"), true)
            .unwrap_err();
        assert!(matches!(err, CodecError::MalformedPayload(_)));

        let err = transport.decode(&json!(17), true).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }
}
