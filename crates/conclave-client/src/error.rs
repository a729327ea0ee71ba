//! Client-side error types.

use conclave_protocol::ProducerId;

/// Errors surfaced while consuming remote media.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server no longer knows this producer.
    #[error("remote resource {0} not available")]
    NotFound(ProducerId),

    /// Local capabilities cannot consume this producer.
    #[error("cannot consume remote resource {0}")]
    Incompatible(ProducerId),

    /// The user refused device permission during local negotiation.
    /// Terminal for the join attempt: the embedding capture layer maps
    /// its permission failure here and calls
    /// [`ClientSession::reset`](crate::ClientSession::reset) to release
    /// everything acquired so far.
    #[error("local media permission denied")]
    MediaDenied,

    /// The signaling round trip itself failed.
    #[error("signaling failed: {0}")]
    Signaling(String),
}

impl ClientError {
    /// NotFound and Incompatible are per-resource conditions: the one
    /// resource is skipped and the rest of the dispatch proceeds.
    pub fn is_isolated(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Incompatible(_))
    }
}
