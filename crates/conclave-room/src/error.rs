//! Error types for the room core.

use conclave_protocol::{ParticipantId, ProducerId, TransportId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// All user slots are assigned. Terminal at admission: the
    /// connection is closed.
    #[error("room is full")]
    RoomFull,

    /// All presentation slots are assigned. Recoverable: the
    /// participant stays camera-only.
    #[error("presentation capacity exhausted")]
    PresentationFull,

    /// The participant is not (or no longer) in the room.
    #[error("participant {0} not in room")]
    NotJoined(ParticipantId),

    /// The participant is already admitted.
    #[error("participant {0} already in room")]
    AlreadyJoined(ParticipantId),

    /// Unknown transport id, or a transport owned by someone else.
    #[error("transport {0} not found")]
    TransportNotFound(TransportId),

    /// Unknown producer id.
    #[error("producer {0} not found")]
    ProducerNotFound(ProducerId),

    /// The receiver's capabilities cannot consume this producer.
    #[error("receiver cannot consume producer {0}")]
    Incompatible(ProducerId),

    /// A request parameter that must carry an engine blob was null.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The media engine rejected an operation.
    #[error("media engine: {0}")]
    Engine(#[from] EngineError),

    /// The room actor is gone (channel closed).
    #[error("room is unavailable")]
    Unavailable,
}

impl RoomError {
    /// Maps the error onto the wire-level HTTP-flavored code.
    pub fn code(&self) -> u16 {
        match self {
            Self::RoomFull | Self::PresentationFull => 403,
            Self::NotJoined(_)
            | Self::TransportNotFound(_)
            | Self::ProducerNotFound(_) => 404,
            Self::AlreadyJoined(_) | Self::Incompatible(_) => 409,
            Self::InvalidRequest(_) => 400,
            Self::Engine(_) | Self::Unavailable => 500,
        }
    }
}

/// Errors surfaced by the external media engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine has no such transport/producer.
    #[error("engine: unknown resource {0}")]
    UnknownResource(String),

    /// The engine refused the operation (bad parameters, codec
    /// mismatch, internal failure).
    #[error("engine: {0}")]
    Rejected(String),
}
