//! Core signaling types for Conclave's wire format.
//!
//! Everything here travels between a meeting client and the coordination
//! server: identifiers, roster entries, resource descriptors, the request
//! enum clients send, and the event/reply enums the server sends back.
//!
//! The media payloads themselves never pass through this layer. Anything
//! the external media engine produces or consumes (RTP parameters, DTLS
//! handshake data, capability documents) is carried as an opaque
//! [`serde_json::Value`] blob — the coordination layer routes it, the
//! engine interprets it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected participant.
///
/// Newtype over `u64` so a participant id can never be confused with a
/// slot index or a raw sequence number. `#[serde(transparent)]` keeps the
/// wire form a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// A recyclable display-position index.
///
/// Both user slots and presentation slots use this type; the two pools are
/// independent, so the same numeric index can be live in each at once.
/// Slots are small, dense, and reused: the server always hands out the
/// smallest free index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SlotIndex(pub u32);

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! resource_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

resource_id!(
    /// Identifier of a send or receive transport, assigned by the media
    /// engine.
    TransportId
);
resource_id!(
    /// Identifier of a producer (one outbound audio or video track),
    /// assigned by the media engine.
    ProducerId
);
resource_id!(
    /// Identifier of a consumer (one receive-side handle on a remote
    /// producer), assigned by the media engine.
    ConsumerId
);

// ---------------------------------------------------------------------------
// Media classification
// ---------------------------------------------------------------------------

/// Whether a track carries audio or video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// Where a producer's media comes from.
///
/// The distinction matters for slot accounting: screen producers occupy a
/// presentation slot and are echoed back to their own owner (the owner must
/// learn its canonical slot number from the server, not invent one), while
/// camera/microphone producers are never echoed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSource {
    Camera,
    Screen,
}

/// Direction of a transport, from the client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportDirection {
    Send,
    Recv,
}

// ---------------------------------------------------------------------------
// Roster and resource descriptions
// ---------------------------------------------------------------------------

/// One entry in the room roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    /// Display name. Empty until the participant's first rename — a
    /// freshly admitted participant is provisional.
    pub name: String,
    pub slot: SlotIndex,
    pub video_enabled: bool,
    pub audio_enabled: bool,
}

/// A live producer as seen by the rest of the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerInfo {
    pub id: ProducerId,
    pub owner: ParticipantId,
    pub kind: MediaKind,
    pub source: MediaSource,
}

/// A live screen-share plus its slot metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationInfo {
    pub producer_id: ProducerId,
    pub owner: ParticipantId,
    pub owner_name: String,
    pub slot: SlotIndex,
}

/// Immutable room state handed to a client at admission.
///
/// Assembled and sent before any later delta can reach the new client, so
/// the client never sees a live event for something that postdates its own
/// join without first having this baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// The user slot assigned to the newly admitted participant.
    pub slot: SlotIndex,
    pub roster: Vec<ParticipantInfo>,
    pub producers: Vec<ProducerInfo>,
    pub presentations: Vec<PresentationInfo>,
}

/// A transport created by the media engine, ready for the client-side
/// handshake. `params` is the engine's connection blob (ICE/DTLS material).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportDescriptor {
    pub id: TransportId,
    pub direction: TransportDirection,
    pub params: Value,
}

/// A consumer created by the media engine for one remote producer.
/// `params` is the engine's receive parameters blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerDescriptor {
    pub id: ConsumerId,
    pub producer_id: ProducerId,
    pub kind: MediaKind,
    pub params: Value,
}

// ---------------------------------------------------------------------------
// Recipient — who should receive a broadcast event?
// ---------------------------------------------------------------------------

/// Addressing for server-side event fanout.
///
/// Every delta the room emits is paired with one of these. The asymmetry
/// between camera and screen producers is expressed entirely through this
/// enum: `All` for presentations, `AllExcept(owner)` for cameras.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every participant in the room, including the event's originator.
    All,
    /// One specific participant.
    Only(ParticipantId),
    /// Everyone except the specified participant.
    AllExcept(ParticipantId),
}

// ---------------------------------------------------------------------------
// ClientRequest — what clients ask the server to do
// ---------------------------------------------------------------------------

/// Requests a client sends over the signaling channel.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, e.g.
/// `{ "type": "Rename", "name": "ada" }` — easy to dispatch on in a
/// browser client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Set (or change) the display name.
    Rename { name: String },

    /// Enable or disable an already-published camera/microphone track.
    ToggleMedia { kind: MediaKind, enabled: bool },

    /// Ask for the media engine's capability document, needed before the
    /// client can negotiate anything.
    Capabilities,

    /// Create a send or receive transport.
    CreateTransport { direction: TransportDirection },

    /// Complete the connection handshake for a previously created
    /// transport. `handshake` is the client's half of the engine's
    /// connection parameters.
    ConnectTransport {
        transport_id: TransportId,
        handshake: Value,
    },

    /// Publish a new track on a send transport.
    CreateProducer {
        transport_id: TransportId,
        kind: MediaKind,
        source: MediaSource,
        rtp_params: Value,
    },

    /// Consume a remote producer on a receive transport. `caps` is the
    /// receiver's capability document.
    Consume {
        transport_id: TransportId,
        producer_id: ProducerId,
        caps: Value,
    },

    /// Voluntarily end this participant's screen-shares without leaving.
    StopScreenShare,

    /// Leave the room. Closing the connection has the same effect.
    Leave,
}

// ---------------------------------------------------------------------------
// ServerEvent — deltas broadcast to room members
// ---------------------------------------------------------------------------

/// Events the server broadcasts so every client's mirror of room state
/// stays consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// A new participant was admitted. Sent to everyone else.
    PeerJoined { participant: ParticipantInfo },

    /// A participant changed its display name. Sent to everyone else.
    PeerRenamed { id: ParticipantId, name: String },

    /// A participant left; its slot and resources are gone. Sent to
    /// everyone else, after the matching `PresentationEnded` events.
    PeerLeft { id: ParticipantId },

    /// A participant muted/unmuted a track. Sent to everyone else.
    MediaToggled {
        id: ParticipantId,
        kind: MediaKind,
        enabled: bool,
    },

    /// A camera/microphone producer appeared. Sent to everyone except
    /// the owner, who already has the local track.
    ProducerAdded { producer: ProducerInfo },

    /// A screen-share started. Sent to everyone *including* the owner:
    /// the slot number in here is canonical.
    PresentationStarted { presentation: PresentationInfo },

    /// A screen-share ended and its slot is free for reuse.
    PresentationEnded {
        producer_id: ProducerId,
        slot: SlotIndex,
    },

    /// Occupancy summary, broadcast after every membership or
    /// presentation change.
    RoomStatus {
        user_count: u32,
        presentation_count: u32,
    },
}

// ---------------------------------------------------------------------------
// Replies and frames
// ---------------------------------------------------------------------------

/// Successful reply payloads, one per request kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReplyData {
    /// Sent once, unsolicited, right after the connection is admitted.
    Admitted { snapshot: RoomSnapshot },
    Renamed,
    Toggled,
    Capabilities { caps: Value },
    TransportCreated { transport: TransportDescriptor },
    TransportConnected,
    ProducerCreated {
        producer_id: ProducerId,
        /// Canonical presentation slot, present only for screen producers.
        slot: Option<SlotIndex>,
    },
    Consumed { consumer: ConsumerDescriptor },
    /// How many screen-shares were ended (zero is a valid answer).
    ScreenShareStopped { ended: u32 },
    Left,
}

/// A request frame: client → server.
///
/// `seq` is a client-chosen correlation number, echoed back in the
/// matching reply frame. Clients increment it per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFrame {
    pub seq: u64,
    pub request: ClientRequest,
}

/// The body of a server frame: a broadcast event, a reply to one request,
/// or an error reply.
///
/// Adjacently tagged (`{ "type": "Event", "data": ... }`) so clients can
/// split event handling from request completion with one tag check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerBody {
    Event(ServerEvent),
    Reply(ReplyData),
    /// `code` follows HTTP conventions: 400 malformed, 403 room or
    /// presentation capacity exhausted, 404 unknown resource,
    /// 409 incompatible consumer.
    Error { code: u16, message: String },
}

/// A server frame. `seq` echoes the request being answered; events and
/// the initial `Admitted` reply use `seq` 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFrame {
    pub seq: u64,
    pub body: ServerBody,
}

// =========================================================================
// Tests
// =========================================================================
