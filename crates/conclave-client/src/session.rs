//! Client session facade: wires the mirror, replicator, pipeline,
//! arranger, and render surface together and routes server traffic.

use conclave_protocol::{ParticipantId, ProducerId, RoomSnapshot, ServerEvent};

use crate::{
    ArrangeOutcome, ArrangementEngine, ClientError, ConsumeApi, ConsumptionPipeline,
    GALLERY, RemoteMedia, RenderSurface, RoomMirror, SemanticId, SessionReplicator,
};

/// One participant's client-side session.
///
/// Owns the pure state layers and the two injected seams: the signaling
/// round trip (`A`) and the rendering adapter (`S`). All methods run on
/// one cooperative context; the only suspension points are the consume
/// negotiations.
pub struct ClientSession<A: ConsumeApi, S: RenderSurface> {
    replicator: SessionReplicator,
    pipeline: ConsumptionPipeline,
    arranger: ArrangementEngine,
    api: A,
    surface: S,
}

impl<A: ConsumeApi, S: RenderSurface> ClientSession<A, S> {
    pub fn new(api: A, surface: S) -> Self {
        Self {
            replicator: SessionReplicator::new(),
            pipeline: ConsumptionPipeline::new(),
            arranger: ArrangementEngine::new(),
            api,
            surface,
        }
    }

    /// Seeds the session from the admission snapshot and creates the
    /// local preview slot.
    pub fn join(&mut self, own_id: ParticipantId, snapshot: &RoomSnapshot) {
        self.replicator.apply_snapshot(own_id, snapshot);
        self.surface.create_slot(&SemanticId::local(), GALLERY);
    }

    /// Flips readiness after local capability negotiation and consumes
    /// everything buffered during the window.
    pub async fn mark_ready(&mut self) -> Result<(), ClientError> {
        let pending = self.replicator.mark_ready();
        self.consume_all(pending).await
    }

    /// Routes one server event: mirror bookkeeping, render teardown for
    /// departures and ended shares, and consumption of new media.
    pub async fn handle_event(&mut self, event: ServerEvent) -> Result<(), ClientError> {
        match &event {
            ServerEvent::PeerLeft { id } => {
                let id = *id;
                self.replicator.apply_event(event);
                self.pipeline.remove_all_by_owner(
                    id,
                    self.replicator.mirror_mut(),
                    &mut self.surface,
                );
                return Ok(());
            }
            ServerEvent::PresentationEnded { producer_id, .. } => {
                let producer_id = producer_id.clone();
                self.replicator.apply_event(event);
                self.pipeline.remove_by_resource(
                    &producer_id,
                    self.replicator.mirror_mut(),
                    &mut self.surface,
                );
                return Ok(());
            }
            ServerEvent::PeerRenamed { id, name } => {
                self.surface.set_label(&SemanticId::user(*id), name);
            }
            _ => {}
        }

        let dispatches = self.replicator.apply_event(event);
        self.consume_all(dispatches).await
    }

    /// Consumes a batch, skipping isolated per-resource failures.
    async fn consume_all(&mut self, media: Vec<RemoteMedia>) -> Result<(), ClientError> {
        for item in media {
            match self
                .pipeline
                .consume(&item, self.replicator.mirror(), &mut self.api, &mut self.surface)
                .await
            {
                Ok(_) => {}
                Err(err) if err.is_isolated() => {
                    tracing::warn!(%err, "skipping unconsumable resource");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// One tap of the swap gesture.
    pub fn select_for_swap(&mut self, id: SemanticId, label: String) -> ArrangeOutcome {
        self.arranger.select(id, label, &mut self.surface)
    }

    pub fn cancel_swap(&mut self) -> ArrangeOutcome {
        self.arranger.cancel(&mut self.surface)
    }

    /// Tears down every rendered resource and returns to the pristine
    /// pre-join state. Called on disconnect; rejoin after a reset is
    /// indistinguishable from a first join.
    pub fn reset(&mut self) {
        self.pipeline.reset(&mut self.surface);
        self.surface.remove_slot(&SemanticId::local());
        self.arranger.cancel(&mut self.surface);
        self.replicator.reset();
    }

    pub fn mirror(&self) -> &RoomMirror {
        self.replicator.mirror()
    }

    pub fn is_ready(&self) -> bool {
        self.replicator.is_ready()
    }

    pub fn is_rendered(&self, producer_id: &ProducerId) -> bool {
        self.pipeline.is_rendered(producer_id)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
