//! Signaling transport for Conclave.
//!
//! The control plane exchanges JSON text frames over a bidirectional
//! channel. [`SignalListener`] accepts channels; [`SignalChannel`] moves
//! frames. The server facade is generic over both so tests can drive it
//! without sockets.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket signaling via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketChannel, WebSocketListener};

use std::fmt;

/// Opaque identifier for one signaling connection. Doubles as the
/// participant id seed on the server side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts incoming signaling channels.
pub trait SignalListener: Send + 'static {
    type Channel: SignalChannel;
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming channel.
    async fn accept(&mut self) -> Result<Self::Channel, Self::Error>;
}

/// A bidirectional stream of JSON text frames.
pub trait SignalChannel: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one text frame to the peer.
    async fn send(&self, frame: &str) -> Result<(), Self::Error>;

    /// Receives the next text frame.
    ///
    /// Returns `Ok(None)` when the peer closed the channel cleanly.
    async fn recv(&self) -> Result<Option<String>, Self::Error>;

    /// Closes the channel.
    async fn close(&self) -> Result<(), Self::Error>;

    /// The unique identifier for this channel.
    fn id(&self) -> ConnectionId;
}
