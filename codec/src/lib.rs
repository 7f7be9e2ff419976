//! Synthesized serializer/deserializer pairs for schema fields.
//!
//! A compiled schema describes each field's type; this crate turns those
//! types into runnable codecs. [`CodecSet::synthesize`] builds a matched
//! encode/decode pair for every named composite type in a registry, and
//! [`CodecSet::codec_for`] composes a pair for any field descriptor on top
//! of them. [`TransportCodec`] then frames the resulting payloads for the
//! storage channel, wrapping structural payloads for text-only channels.
//!
//! ```
//! use fieldtree_codec::CodecSet;
//! use fieldtree_core::{StaticEnumItems, TypeRegistry, Value, resolve};
//!
//! let registry = TypeRegistry::new();
//! let enums = StaticEnumItems::new();
//! let set = CodecSet::synthesize(&registry, &enums).unwrap();
//!
//! let descriptor = resolve("List[Integer]", &registry).unwrap();
//! let codec = set.codec_for(&descriptor, &enums).unwrap();
//!
//! let value = Value::List(vec![Value::Number(1.0), Value::Number(2.6)]);
//! let payload = codec.encode(&value).unwrap();
//! assert_eq!(payload.to_string(), "[1,3]");
//! ```

mod error;
mod scalar;
mod synth;
mod transport;

pub use error::{CodecError, Result};
pub use scalar::{apply_rounding, decode_scalar, encode_scalar};
pub use synth::{Codec, CodecSet, encodes_structurally};
pub use transport::TransportCodec;
