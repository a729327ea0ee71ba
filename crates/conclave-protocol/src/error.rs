//! Error types for the protocol layer.
//!
//! Each crate in Conclave defines its own error enum, so a
//! `ProtocolError` always means a serialization/framing problem — never
//! networking, never room state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into frame text).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, wrong
    /// types, or a truncated frame.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
