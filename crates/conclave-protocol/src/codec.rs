//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The signaling layer doesn't care how frames become wire text — it goes
//! through the [`Codec`] trait. [`JsonCodec`] is the default (and what the
//! browser client speaks); another text format could be slotted in without
//! touching any other crate.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust types to text frames and decodes them back.
///
/// `Send + Sync + 'static` because codecs are shared across connection
/// handler tasks. The methods are generic over the frame type: the same
/// codec serializes [`ClientFrame`](crate::ClientFrame) and
/// [`ServerFrame`](crate::ServerFrame).
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the frame is malformed,
    /// incomplete, or doesn't match the expected type.
    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON via `serde_json`.
///
/// Human-readable, inspectable in browser DevTools, and the only format
/// the reference web client understands.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}
