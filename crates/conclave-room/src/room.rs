//! Room actor: an isolated Tokio task that owns one room's state.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. The registry, the directory, and both slot
//! pools live inside the task, so every step executes against a state no
//! other writer can touch. Engine calls are awaited inline; capacity is
//! re-validated after the await because the engine round-trip is the one
//! place another command could have been interleaved.

use conclave_protocol::{
    ConsumerDescriptor, MediaKind, MediaSource, ParticipantId, ProducerId,
    Recipient, RoomSnapshot, ServerEvent, SlotIndex, TransportDescriptor,
    TransportDirection, TransportId,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::{
    EventSender, MediaEngine, MediaResourceDirectory, RoomError, RoomLimits,
    RoomRegistry, RoomStatusInfo, config::params_present,
};

/// Commands sent to a room actor through its channel.
///
/// Each variant carries a `oneshot::Sender` reply channel; the caller
/// sends the command and awaits the response.
pub(crate) enum RoomCommand {
    /// Admit a connection and return its admission snapshot.
    Admit {
        id: ParticipantId,
        sender: EventSender,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },

    /// Set a participant's display name.
    Rename {
        id: ParticipantId,
        name: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Flip a participant's camera or microphone flag.
    ToggleMedia {
        id: ParticipantId,
        kind: MediaKind,
        enabled: bool,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Fetch the engine's capability document.
    Capabilities {
        id: ParticipantId,
        reply: oneshot::Sender<Result<Value, RoomError>>,
    },

    /// Create a send or receive transport for a participant.
    CreateTransport {
        id: ParticipantId,
        direction: TransportDirection,
        reply: oneshot::Sender<Result<TransportDescriptor, RoomError>>,
    },

    /// Complete a transport's connection handshake.
    ConnectTransport {
        id: ParticipantId,
        transport_id: TransportId,
        handshake: Value,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Create a producer on one of the participant's send transports.
    CreateProducer {
        id: ParticipantId,
        transport_id: TransportId,
        kind: MediaKind,
        source: MediaSource,
        rtp_params: Value,
        reply: oneshot::Sender<Result<(ProducerId, Option<SlotIndex>), RoomError>>,
    },

    /// Create a consumer over a remote producer.
    Consume {
        id: ParticipantId,
        transport_id: TransportId,
        producer_id: ProducerId,
        caps: Value,
        reply: oneshot::Sender<Result<ConsumerDescriptor, RoomError>>,
    },

    /// End every screen-share the participant owns.
    StopScreenShare {
        id: ParticipantId,
        reply: oneshot::Sender<Result<u32, RoomError>>,
    },

    /// Remove a participant and destroy all of its resources.
    Leave {
        id: ParticipantId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Request the occupancy summary.
    Status {
        reply: oneshot::Sender<RoomStatusInfo>,
    },

    /// Shut down the room.
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone — it's just an `mpsc::Sender` wrapper. The server holds
/// one and clones it into every connection handler.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Admits a connection, returning the snapshot that seeds the
    /// client's mirror.
    pub async fn admit(
        &self,
        id: ParticipantId,
        sender: EventSender,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Admit { id, sender, reply })
            .await?
    }

    pub async fn rename(&self, id: ParticipantId, name: String) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Rename { id, name, reply })
            .await?
    }

    pub async fn toggle_media(
        &self,
        id: ParticipantId,
        kind: MediaKind,
        enabled: bool,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::ToggleMedia {
            id,
            kind,
            enabled,
            reply,
        })
        .await?
    }

    pub async fn capabilities(&self, id: ParticipantId) -> Result<Value, RoomError> {
        self.request(|reply| RoomCommand::Capabilities { id, reply })
            .await?
    }

    pub async fn create_transport(
        &self,
        id: ParticipantId,
        direction: TransportDirection,
    ) -> Result<TransportDescriptor, RoomError> {
        self.request(|reply| RoomCommand::CreateTransport {
            id,
            direction,
            reply,
        })
        .await?
    }

    pub async fn connect_transport(
        &self,
        id: ParticipantId,
        transport_id: TransportId,
        handshake: Value,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::ConnectTransport {
            id,
            transport_id,
            handshake,
            reply,
        })
        .await?
    }

    /// Creates a producer; for screen sources the returned slot is the
    /// allocated presentation slot.
    pub async fn create_producer(
        &self,
        id: ParticipantId,
        transport_id: TransportId,
        kind: MediaKind,
        source: MediaSource,
        rtp_params: Value,
    ) -> Result<(ProducerId, Option<SlotIndex>), RoomError> {
        self.request(|reply| RoomCommand::CreateProducer {
            id,
            transport_id,
            kind,
            source,
            rtp_params,
            reply,
        })
        .await?
    }

    pub async fn consume(
        &self,
        id: ParticipantId,
        transport_id: TransportId,
        producer_id: ProducerId,
        caps: Value,
    ) -> Result<ConsumerDescriptor, RoomError> {
        self.request(|reply| RoomCommand::Consume {
            id,
            transport_id,
            producer_id,
            caps,
            reply,
        })
        .await?
    }

    /// Ends the participant's screen-shares, returning how many were
    /// ended. Zero is a success, not an error.
    pub async fn stop_screen_share(&self, id: ParticipantId) -> Result<u32, RoomError> {
        self.request(|reply| RoomCommand::StopScreenShare { id, reply })
            .await?
    }

    pub async fn leave(&self, id: ParticipantId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { id, reply }).await?
    }

    pub async fn status(&self) -> Result<RoomStatusInfo, RoomError> {
        self.request(|reply| RoomCommand::Status { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable)?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<E: MediaEngine> {
    limits: RoomLimits,
    engine: E,
    registry: RoomRegistry,
    directory: MediaResourceDirectory,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<E: MediaEngine> RoomActor<E> {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::info!(
            max_users = self.limits.max_users,
            max_presentations = self.limits.max_presentations,
            "room actor started"
        );

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Admit { id, sender, reply } => {
                    let _ = reply.send(self.handle_admit(id, sender));
                }
                RoomCommand::Rename { id, name, reply } => {
                    let _ = reply.send(self.registry.rename(id, name));
                }
                RoomCommand::ToggleMedia {
                    id,
                    kind,
                    enabled,
                    reply,
                } => {
                    let _ = reply.send(self.registry.set_media_enabled(id, kind, enabled));
                }
                RoomCommand::Capabilities { id, reply } => {
                    let result = if self.registry.contains(id) {
                        Ok(self.engine.router_capabilities().await)
                    } else {
                        Err(RoomError::NotJoined(id))
                    };
                    let _ = reply.send(result);
                }
                RoomCommand::CreateTransport {
                    id,
                    direction,
                    reply,
                } => {
                    let _ = reply.send(self.handle_create_transport(id, direction).await);
                }
                RoomCommand::ConnectTransport {
                    id,
                    transport_id,
                    handshake,
                    reply,
                } => {
                    let _ = reply.send(
                        self.handle_connect_transport(id, transport_id, handshake).await,
                    );
                }
                RoomCommand::CreateProducer {
                    id,
                    transport_id,
                    kind,
                    source,
                    rtp_params,
                    reply,
                } => {
                    let _ = reply.send(
                        self.handle_create_producer(id, transport_id, kind, source, rtp_params)
                            .await,
                    );
                }
                RoomCommand::Consume {
                    id,
                    transport_id,
                    producer_id,
                    caps,
                    reply,
                } => {
                    let _ = reply.send(
                        self.handle_consume(id, transport_id, producer_id, caps).await,
                    );
                }
                RoomCommand::StopScreenShare { id, reply } => {
                    let _ = reply.send(self.handle_stop_screen_share(id).await);
                }
                RoomCommand::Leave { id, reply } => {
                    let _ = reply.send(self.handle_leave(id).await);
                }
                RoomCommand::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                RoomCommand::Shutdown => {
                    tracing::info!("room shutting down");
                    break;
                }
            }
        }

        tracing::info!("room actor stopped");
    }

    fn handle_admit(
        &mut self,
        id: ParticipantId,
        sender: EventSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let slot = self.registry.admit(id, sender)?;
        let snapshot = RoomSnapshot {
            slot,
            roster: self.registry.roster(),
            producers: self.directory.producers_info(),
            presentations: self.directory.presentations_info(&self.registry),
        };
        self.broadcast_status();
        Ok(snapshot)
    }

    async fn handle_create_transport(
        &mut self,
        id: ParticipantId,
        direction: TransportDirection,
    ) -> Result<TransportDescriptor, RoomError> {
        if !self.registry.contains(id) {
            return Err(RoomError::NotJoined(id));
        }
        let descriptor = self.engine.create_transport(direction).await?;
        self.directory
            .register_transport(descriptor.id.clone(), id, direction);
        Ok(descriptor)
    }

    async fn handle_connect_transport(
        &mut self,
        id: ParticipantId,
        transport_id: TransportId,
        handshake: Value,
    ) -> Result<(), RoomError> {
        if !self.registry.contains(id) {
            return Err(RoomError::NotJoined(id));
        }
        self.directory.transport_owned_by(&transport_id, id)?;
        if !params_present(&handshake) {
            return Err(RoomError::InvalidRequest("missing handshake parameters".into()));
        }
        self.engine.connect_transport(&transport_id, handshake).await?;
        Ok(())
    }

    async fn handle_create_producer(
        &mut self,
        id: ParticipantId,
        transport_id: TransportId,
        kind: MediaKind,
        source: MediaSource,
        rtp_params: Value,
    ) -> Result<(ProducerId, Option<SlotIndex>), RoomError> {
        if !self.registry.contains(id) {
            return Err(RoomError::NotJoined(id));
        }
        self.directory.transport_owned_by(&transport_id, id)?;
        if !params_present(&rtp_params) {
            return Err(RoomError::InvalidRequest("missing rtp parameters".into()));
        }
        // Fail before touching the engine when no presentation slot is
        // free; the pool and directory stay untouched.
        if source == MediaSource::Screen && !self.directory.has_presentation_capacity() {
            return Err(RoomError::PresentationFull);
        }

        let producer_id = self
            .engine
            .create_producer(&transport_id, kind, rtp_params)
            .await?;

        // Registration is the authoritative capacity check. If it fails
        // the engine producer is orphaned, so close it before reporting.
        match self.directory.register_producer(
            producer_id.clone(),
            id,
            kind,
            source,
            &self.registry,
        ) {
            Ok(slot) => {
                if slot.is_some() {
                    self.broadcast_status();
                }
                Ok((producer_id, slot))
            }
            Err(err) => {
                self.engine.close_producer(&producer_id).await;
                Err(err)
            }
        }
    }

    async fn handle_consume(
        &mut self,
        id: ParticipantId,
        transport_id: TransportId,
        producer_id: ProducerId,
        caps: Value,
    ) -> Result<ConsumerDescriptor, RoomError> {
        if !self.registry.contains(id) {
            return Err(RoomError::NotJoined(id));
        }
        self.directory.transport_owned_by(&transport_id, id)?;
        if !params_present(&caps) {
            return Err(RoomError::InvalidRequest("missing receiver capabilities".into()));
        }
        if !self.directory.contains_producer(&producer_id) {
            return Err(RoomError::ProducerNotFound(producer_id));
        }
        if !self.engine.can_consume(&producer_id, &caps).await {
            return Err(RoomError::Incompatible(producer_id));
        }

        let descriptor = self
            .engine
            .create_consumer(&transport_id, &producer_id, caps)
            .await?;
        self.directory
            .register_consumer(descriptor.id.clone(), id, producer_id);
        Ok(descriptor)
    }

    async fn handle_stop_screen_share(
        &mut self,
        id: ParticipantId,
    ) -> Result<u32, RoomError> {
        if !self.registry.contains(id) {
            return Err(RoomError::NotJoined(id));
        }
        let ended = self.directory.stop_screen_share(id, &self.registry);
        for producer_id in &ended {
            self.engine.close_producer(producer_id).await;
        }
        if !ended.is_empty() {
            self.broadcast_status();
        }
        Ok(ended.len() as u32)
    }

    async fn handle_leave(&mut self, id: ParticipantId) -> Result<(), RoomError> {
        if !self.registry.contains(id) {
            return Err(RoomError::NotJoined(id));
        }
        // End-deltas first, then the leave-delta, then occupancy.
        let closed = self.directory.close_all_for(id, &self.registry);
        for producer_id in &closed.producers {
            self.engine.close_producer(producer_id).await;
        }
        for transport_id in &closed.transports {
            self.engine.close_transport(transport_id).await;
        }
        self.registry.remove(id)?;
        self.broadcast_status();
        Ok(())
    }

    fn status(&self) -> RoomStatusInfo {
        RoomStatusInfo {
            user_count: self.registry.user_count(),
            presentation_count: self.directory.presentation_count(),
            max_users: self.limits.max_users,
            max_presentations: self.limits.max_presentations,
        }
    }

    /// Pushes the occupancy summary to everyone after membership or
    /// presentation changes.
    fn broadcast_status(&self) {
        self.registry.broadcast(
            Recipient::All,
            ServerEvent::RoomStatus {
                user_count: self.registry.user_count(),
                presentation_count: self.directory.presentation_count(),
            },
        );
    }
}

/// Spawns a room actor task and returns a handle to communicate with it.
///
/// `channel_size` bounds the command channel; when it fills, callers wait.
pub fn spawn_room<E: MediaEngine>(
    engine: E,
    limits: RoomLimits,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        registry: RoomRegistry::new(limits.max_users),
        directory: MediaResourceDirectory::new(limits.max_presentations),
        limits,
        engine,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { sender: tx }
}
