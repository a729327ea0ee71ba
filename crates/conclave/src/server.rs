//! `SignalServer` builder and accept loop.
//!
//! The entry point for running a Conclave server: binds the signaling
//! listener, spawns one room actor, and hands every accepted channel to
//! the per-connection handler.

use std::sync::Arc;

use conclave_protocol::{Codec, JsonCodec};
use conclave_room::{MediaEngine, RoomHandle, RoomLimits, spawn_room};
use conclave_transport::{SignalListener, WebSocketListener};

use crate::ConclaveError;
use crate::handler::handle_connection;

/// Command channel depth for the room actor.
const ROOM_CHANNEL_SIZE: usize = 64;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) room: RoomHandle,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Conclave server.
///
/// # Example
///
/// ```rust,ignore
/// use conclave::SignalServer;
/// use conclave_room::{LoopbackEngine, RoomLimits};
///
/// let server = SignalServer::builder()
///     .bind("0.0.0.0:8080")
///     .limits(RoomLimits::default())
///     .build(LoopbackEngine::new())
///     .await?;
/// server.run().await
/// ```
pub struct SignalServerBuilder {
    bind_addr: String,
    limits: RoomLimits,
}

impl SignalServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            limits: RoomLimits::default(),
        }
    }

    /// Sets the address to bind the signaling listener to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room capacity limits.
    pub fn limits(mut self, limits: RoomLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Binds the listener and spawns the room actor over the given
    /// media engine. Uses `JsonCodec` for framing.
    pub async fn build(
        self,
        engine: impl MediaEngine,
    ) -> Result<SignalServer<JsonCodec>, ConclaveError> {
        let listener = WebSocketListener::bind(&self.bind_addr).await?;
        let room = spawn_room(engine, self.limits, ROOM_CHANNEL_SIZE);

        Ok(SignalServer {
            listener,
            state: Arc::new(ServerState {
                room,
                codec: JsonCodec,
            }),
        })
    }
}

impl Default for SignalServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Conclave signaling server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct SignalServer<C: Codec> {
    listener: WebSocketListener,
    state: Arc<ServerState<C>>,
}

impl SignalServer<JsonCodec> {
    /// Starts configuring a server with the default JSON codec.
    ///
    /// Lives on the concrete type so call sites never have to name the
    /// codec parameter.
    pub fn builder() -> SignalServerBuilder {
        SignalServerBuilder::new()
    }
}

impl<C: Codec + Clone + Send + Sync + 'static> SignalServer<C> {
    /// The bound listener address, for `:0` binds.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ConclaveError> {
        Ok(self.listener.local_addr()?)
    }

    /// A handle to the server's room actor.
    pub fn room(&self) -> RoomHandle {
        self.state.room.clone()
    }

    /// Runs the accept loop. Each accepted channel gets its own handler
    /// task; the loop runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ConclaveError> {
        tracing::info!("conclave server running");

        loop {
            match self.listener.accept().await {
                Ok(channel) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(channel, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
