//! Turns remote resource descriptors into rendered media, exactly once.
//!
//! The pipeline is the dedup point of the client: the replicator may hand
//! it the same resource twice (snapshot plus live event), and `consume`
//! collapses the pair by producer id. Failures are all-or-nothing per
//! resource; a rejected negotiation leaves no slot and no bookkeeping.

use std::collections::HashMap;

use conclave_protocol::{ConsumerDescriptor, ParticipantId, ProducerId};

use crate::{ClientError, RemoteMedia, RenderSurface, RoomMirror, SemanticId};

/// Container names the pipeline renders into.
pub const GALLERY: &str = "gallery";
pub const STAGE: &str = "stage";

/// The signaling round trip that negotiates one consumer.
pub trait ConsumeApi {
    async fn consume(
        &mut self,
        producer_id: &ProducerId,
    ) -> Result<ConsumerDescriptor, ClientError>;
}

#[derive(Debug, Clone)]
struct RenderedMedia {
    owner: ParticipantId,
    semantic: SemanticId,
    is_presentation: bool,
}

/// Idempotent consumption of remote media into render slots.
#[derive(Debug, Default)]
pub struct ConsumptionPipeline {
    rendered: HashMap<ProducerId, RenderedMedia>,
}

impl ConsumptionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one remote resource. Returns `false` when the resource
    /// was skipped (already rendered, or the client's own camera track).
    ///
    /// Self-produced presentations are *not* skipped: the owner renders
    /// its own share through the canonical slot like everyone else.
    pub async fn consume(
        &mut self,
        media: &RemoteMedia,
        mirror: &RoomMirror,
        api: &mut impl ConsumeApi,
        surface: &mut impl RenderSurface,
    ) -> Result<bool, ClientError> {
        let (producer_id, owner, is_presentation) = match media {
            RemoteMedia::Producer(p) => (&p.id, p.owner, false),
            RemoteMedia::Presentation(p) => (&p.producer_id, p.owner, true),
        };

        if self.rendered.contains_key(producer_id) {
            tracing::debug!(%producer_id, "already rendered, skipping");
            return Ok(false);
        }
        if !is_presentation && mirror.own_id() == Some(owner) {
            return Ok(false);
        }

        let descriptor = api.consume(producer_id).await?;

        let (semantic, parent, label) = if is_presentation {
            let label = mirror
                .presentation(producer_id)
                .map(|p| p.owner_name.clone())
                .unwrap_or_default();
            (SemanticId::presentation(producer_id), STAGE, label)
        } else {
            let label = mirror.name_of(owner).unwrap_or_default().to_owned();
            (SemanticId::user(owner), GALLERY, label)
        };

        surface.create_slot(&semantic, parent);
        surface.attach(&semantic, &descriptor);
        surface.set_label(&semantic, &label);

        self.rendered.insert(
            producer_id.clone(),
            RenderedMedia {
                owner,
                semantic,
                is_presentation,
            },
        );
        tracing::info!(%producer_id, %owner, is_presentation, "remote media rendered");
        Ok(true)
    }

    /// Tears down the render slot for one resource and, for
    /// presentations, releases the mirror's slot record.
    pub fn remove_by_resource(
        &mut self,
        producer_id: &ProducerId,
        mirror: &mut RoomMirror,
        surface: &mut impl RenderSurface,
    ) {
        let Some(rendered) = self.rendered.remove(producer_id) else {
            return;
        };
        surface.remove_slot(&rendered.semantic);
        if rendered.is_presentation {
            mirror.release_presentation(producer_id);
        }
        tracing::debug!(%producer_id, "rendered media removed");
    }

    /// Tears down everything a departed participant owned.
    pub fn remove_all_by_owner(
        &mut self,
        owner: ParticipantId,
        mirror: &mut RoomMirror,
        surface: &mut impl RenderSurface,
    ) {
        let owned: Vec<ProducerId> = self
            .rendered
            .iter()
            .filter(|(_, r)| r.owner == owner)
            .map(|(id, _)| id.clone())
            .collect();
        for producer_id in owned {
            self.remove_by_resource(&producer_id, mirror, surface);
        }
    }

    pub fn is_rendered(&self, producer_id: &ProducerId) -> bool {
        self.rendered.contains_key(producer_id)
    }

    pub fn rendered_count(&self) -> usize {
        self.rendered.len()
    }

    /// Tears down every render slot and clears the bookkeeping.
    pub fn reset(&mut self, surface: &mut impl RenderSurface) {
        for rendered in self.rendered.values() {
            surface.remove_slot(&rendered.semantic);
        }
        self.rendered.clear();
    }
}
