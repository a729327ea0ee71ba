//! Client-side session layer for Conclave.
//!
//! Pure state transitions (mirror, replicator, arrangement) are split
//! from the two injected seams: the signaling round trip ([`ConsumeApi`])
//! and the rendering adapter ([`RenderSurface`]). Everything is testable
//! headlessly through [`HeadlessSurface`].
//!
//! # Key types
//!
//! - [`SessionReplicator`] — delta replication with negotiation-window buffering
//! - [`ConsumptionPipeline`] — idempotent remote-media consumption
//! - [`ArrangementEngine`] — select/select swap gesture
//! - [`ClientSession`] — wiring facade

#![allow(async_fn_in_trait)]

mod arrange;
mod error;
mod mirror;
mod pipeline;
mod render;
mod replicator;
mod session;

pub use arrange::{ArrangeOutcome, ArrangementEngine};
pub use error::ClientError;
pub use mirror::RoomMirror;
pub use pipeline::{ConsumeApi, ConsumptionPipeline, GALLERY, STAGE};
pub use render::{HeadlessSurface, RenderSurface, SemanticId};
pub use replicator::{RemoteMedia, RoomOccupancy, SessionReplicator};
pub use session::ClientSession;
