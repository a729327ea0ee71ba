//! Signaling protocol for Conclave.
//!
//! This crate defines the "language" that meeting clients and the
//! coordination server speak:
//!
//! - **Types** ([`ClientRequest`], [`ServerEvent`], [`RoomSnapshot`],
//!   resource ids, descriptors) — the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how values become frame
//!   text and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer sits between transport (raw frames) and the room
//! core (slots, registry, directory). It knows nothing about connections,
//! slots, or the media engine — only the shapes of messages.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientFrame, ClientRequest, ConsumerDescriptor, ConsumerId, MediaKind,
    MediaSource, ParticipantId, ParticipantInfo, PresentationInfo, ProducerId,
    ProducerInfo, Recipient, ReplyData, RoomSnapshot, ServerBody, ServerEvent,
    ServerFrame, SlotIndex, TransportDescriptor, TransportDirection, TransportId,
};
