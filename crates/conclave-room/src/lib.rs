//! Room coordination core for Conclave.
//!
//! Each room runs as an isolated Tokio task (actor model) owning the
//! participant registry, the media resource directory, and both slot
//! pools. The media engine itself sits behind a trait.
//!
//! # Key types
//!
//! - [`MediaEngine`] — the seam to the external real-time media engine
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomRegistry`] — participants, user slots, delta fanout
//! - [`MediaResourceDirectory`] — transports/producers/consumers, presentation slots
//! - [`RoomLimits`] — capacity settings

mod config;
mod directory;
mod engine;
mod error;
mod registry;
mod room;
mod slots;

pub use config::{RoomLimits, RoomStatusInfo};
pub use directory::{ClosedResources, MediaResourceDirectory};
pub use engine::{LoopbackEngine, MediaEngine};
pub use error::{EngineError, RoomError};
pub use registry::{EventSender, Participant, RoomRegistry};
pub use room::{RoomHandle, spawn_room};
pub use slots::SlotPool;
