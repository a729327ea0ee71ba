//! Unified error type for the Conclave server.

use conclave_protocol::ProtocolError;
use conclave_room::RoomError;
use conclave_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ConclaveError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode or decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (capacity, lookups, engine).
    #[error(transparent)]
    Room(#[from] RoomError),
}
