//! The authoritative media resource directory.
//!
//! Tracks every transport, producer, and consumer the media engine has
//! minted, keyed by id, each with its owning participant. Owns the
//! presentation slot pool: a screen producer cannot exist without a slot,
//! and a slot is released the moment its producer is unregistered —
//! strictly *before* the end-delta fans out, so a registration racing in
//! behind the close can legally reuse the freed index.
//!
//! The directory is pure bookkeeping plus fanout; engine calls happen in
//! the room actor around these methods.

use std::collections::HashMap;

use conclave_protocol::{
    ConsumerId, MediaKind, MediaSource, ParticipantId, PresentationInfo,
    ProducerId, ProducerInfo, Recipient, ServerEvent, SlotIndex, TransportDirection,
    TransportId,
};

use crate::{RoomError, RoomRegistry, SlotPool};

/// A transport registered to an owner.
#[derive(Debug, Clone)]
pub struct TransportRecord {
    pub owner: ParticipantId,
    pub direction: TransportDirection,
}

/// A producer registered to an owner. Screen producers carry their
/// presentation slot.
#[derive(Debug, Clone)]
pub struct ProducerRecord {
    pub owner: ParticipantId,
    pub kind: MediaKind,
    pub source: MediaSource,
    pub slot: Option<SlotIndex>,
}

/// A consumer registered to the receiving participant.
#[derive(Debug, Clone)]
pub struct ConsumerRecord {
    pub owner: ParticipantId,
    pub producer_id: ProducerId,
}

/// Engine resources owned by a departing participant, returned by
/// [`MediaResourceDirectory::close_all_for`] so the room actor can close
/// them engine-side.
#[derive(Debug, Default)]
pub struct ClosedResources {
    pub transports: Vec<TransportId>,
    pub producers: Vec<ProducerId>,
}

/// Server-owned directory of live media resources.
pub struct MediaResourceDirectory {
    presentation_slots: SlotPool,
    transports: HashMap<TransportId, TransportRecord>,
    producers: HashMap<ProducerId, ProducerRecord>,
    consumers: HashMap<ConsumerId, ConsumerRecord>,
}

impl MediaResourceDirectory {
    /// Creates a directory with `max_presentations` presentation slots.
    pub fn new(max_presentations: u32) -> Self {
        Self {
            presentation_slots: SlotPool::new(max_presentations),
            transports: HashMap::new(),
            producers: HashMap::new(),
            consumers: HashMap::new(),
        }
    }

    /// Records a transport the engine just created.
    pub fn register_transport(
        &mut self,
        id: TransportId,
        owner: ParticipantId,
        direction: TransportDirection,
    ) {
        tracing::debug!(%id, %owner, ?direction, "transport registered");
        self.transports.insert(id, TransportRecord { owner, direction });
    }

    /// Validates that `id` exists and belongs to `owner`.
    ///
    /// An existing transport owned by someone else is reported as
    /// not-found: participants cannot probe each other's resources.
    pub fn transport_owned_by(
        &self,
        id: &TransportId,
        owner: ParticipantId,
    ) -> Result<(), RoomError> {
        match self.transports.get(id) {
            Some(record) if record.owner == owner => Ok(()),
            _ => Err(RoomError::TransportNotFound(id.clone())),
        }
    }

    /// Whether a screen producer could currently get a slot. Checked
    /// before asking the engine to produce, and again (authoritatively)
    /// at registration.
    pub fn has_presentation_capacity(&self) -> bool {
        self.presentation_slots.available() > 0
    }

    /// Records a producer the engine just created and fans out the
    /// creation delta.
    ///
    /// Screen producers allocate a presentation slot and are announced to
    /// **everyone including the owner** — the slot number in the event is
    /// the canonical one. Camera/microphone producers are announced to
    /// everyone **except** the owner, who already holds the local track.
    ///
    /// # Errors
    /// [`RoomError::PresentationFull`] if no presentation slot is free;
    /// the directory and pool are left untouched.
    pub fn register_producer(
        &mut self,
        id: ProducerId,
        owner: ParticipantId,
        kind: MediaKind,
        source: MediaSource,
        registry: &RoomRegistry,
    ) -> Result<Option<SlotIndex>, RoomError> {
        let slot = match source {
            MediaSource::Screen => Some(
                self.presentation_slots
                    .acquire()
                    .ok_or(RoomError::PresentationFull)?,
            ),
            MediaSource::Camera => None,
        };

        self.producers.insert(
            id.clone(),
            ProducerRecord {
                owner,
                kind,
                source,
                slot,
            },
        );
        tracing::info!(%id, %owner, ?kind, ?source, "producer registered");

        match slot {
            Some(slot) => {
                let presentation = PresentationInfo {
                    producer_id: id,
                    owner,
                    owner_name: registry.name_of(owner).unwrap_or_default().to_owned(),
                    slot,
                };
                registry.broadcast(
                    Recipient::All,
                    ServerEvent::PresentationStarted { presentation },
                );
            }
            None => {
                let producer = ProducerInfo {
                    id,
                    owner,
                    kind,
                    source,
                };
                registry.broadcast(
                    Recipient::AllExcept(owner),
                    ServerEvent::ProducerAdded { producer },
                );
            }
        }
        Ok(slot)
    }

    /// Whether a producer id is live.
    pub fn contains_producer(&self, id: &ProducerId) -> bool {
        self.producers.contains_key(id)
    }

    /// Records a consumer created for `owner` over `producer_id`.
    pub fn register_consumer(
        &mut self,
        id: ConsumerId,
        owner: ParticipantId,
        producer_id: ProducerId,
    ) {
        self.consumers
            .insert(id, ConsumerRecord { owner, producer_id });
    }

    /// Ends every screen-share owned by `owner` without touching its
    /// other resources — the voluntary "stop sharing" path.
    ///
    /// Returns the closed producer ids so the caller can close them
    /// engine-side. For each one, the slot is released *before* the
    /// end-delta is broadcast.
    pub fn stop_screen_share(
        &mut self,
        owner: ParticipantId,
        registry: &RoomRegistry,
    ) -> Vec<ProducerId> {
        let ended: Vec<ProducerId> = self
            .producers
            .iter()
            .filter(|(_, r)| r.owner == owner && r.source == MediaSource::Screen)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &ended {
            self.unregister_producer(id, registry);
        }
        ended
    }

    /// Destroys every resource owned by `owner` (disconnect path).
    ///
    /// Presentation slots are released and their end-deltas broadcast
    /// before anything else, then consumers and transports are dropped.
    /// Consumers held by *other* participants over this owner's
    /// producers are dropped too; their clients tear down render slots
    /// from the `PeerLeft`/`PresentationEnded` deltas.
    pub fn close_all_for(
        &mut self,
        owner: ParticipantId,
        registry: &RoomRegistry,
    ) -> ClosedResources {
        let producers: Vec<ProducerId> = self
            .producers
            .iter()
            .filter(|(_, r)| r.owner == owner)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &producers {
            self.unregister_producer(id, registry);
        }

        self.consumers
            .retain(|_, r| r.owner != owner && !producers.contains(&r.producer_id));

        let transports: Vec<TransportId> = self
            .transports
            .iter()
            .filter(|(_, r)| r.owner == owner)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &transports {
            self.transports.remove(id);
        }

        tracing::info!(
            %owner,
            producers = producers.len(),
            transports = transports.len(),
            "closed all resources for departing participant"
        );
        ClosedResources {
            transports,
            producers,
        }
    }

    /// Removes one producer record; releases its slot first, then
    /// broadcasts the end-delta for screens.
    fn unregister_producer(&mut self, id: &ProducerId, registry: &RoomRegistry) {
        let Some(record) = self.producers.remove(id) else {
            return;
        };
        self.consumers.retain(|_, r| &r.producer_id != id);
        if let Some(slot) = record.slot {
            // Release before broadcasting: a registration processed after
            // this close may reuse the index without collision.
            self.presentation_slots.release(slot);
            registry.broadcast(
                Recipient::All,
                ServerEvent::PresentationEnded {
                    producer_id: id.clone(),
                    slot,
                },
            );
            tracing::info!(%id, %slot, "presentation ended");
        }
    }

    /// Camera/microphone producers for the admission snapshot.
    pub fn producers_info(&self) -> Vec<ProducerInfo> {
        let mut out: Vec<ProducerInfo> = self
            .producers
            .iter()
            .filter(|(_, r)| r.source == MediaSource::Camera)
            .map(|(id, r)| ProducerInfo {
                id: id.clone(),
                owner: r.owner,
                kind: r.kind,
                source: r.source,
            })
            .collect();
        out.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        out
    }

    /// Live presentations for the admission snapshot, slot-ordered.
    pub fn presentations_info(&self, registry: &RoomRegistry) -> Vec<PresentationInfo> {
        let mut out: Vec<PresentationInfo> = self
            .producers
            .iter()
            .filter_map(|(id, r)| {
                let slot = r.slot?;
                Some(PresentationInfo {
                    producer_id: id.clone(),
                    owner: r.owner,
                    owner_name: registry.name_of(r.owner).unwrap_or_default().to_owned(),
                    slot,
                })
            })
            .collect();
        out.sort_by_key(|p| p.slot);
        out
    }

    pub fn presentation_count(&self) -> u32 {
        self.presentation_slots.in_use()
    }

    pub fn transport_count(&self) -> usize {
        self.transports.len()
    }

    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_protocol::ParticipantId;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    fn pid(id: u64) -> ParticipantId {
        ParticipantId(id)
    }

    fn registry_with(ids: &[u64]) -> (RoomRegistry, Vec<UnboundedReceiver<ServerEvent>>) {
        let mut registry = RoomRegistry::new(8);
        let mut rxs = Vec::new();
        for &id in ids {
            let (tx, rx) = unbounded_channel();
            registry.admit(pid(id), tx).unwrap();
            rxs.push(rx);
        }
        // Clear the join deltas so tests see only directory traffic.
        for rx in &mut rxs {
            while rx.try_recv().is_ok() {}
        }
        (registry, rxs)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[test]
    fn test_screen_producer_gets_smallest_slot_and_is_echoed_to_owner() {
        let (registry, mut rxs) = registry_with(&[1, 2]);
        let mut dir = MediaResourceDirectory::new(2);

        let slot = dir
            .register_producer(
                ProducerId::from("s1"),
                pid(1),
                MediaKind::Video,
                MediaSource::Screen,
                &registry,
            )
            .unwrap();
        assert_eq!(slot, Some(SlotIndex(0)));

        // Both the owner and the peer hear about it.
        for rx in &mut rxs {
            let events = drain(rx);
            assert!(matches!(
                events.as_slice(),
                [ServerEvent::PresentationStarted { presentation }]
                    if presentation.slot == SlotIndex(0) && presentation.owner == pid(1)
            ));
        }
    }

    #[test]
    fn test_camera_producer_not_echoed_to_owner() {
        let (registry, mut rxs) = registry_with(&[1, 2]);
        let mut dir = MediaResourceDirectory::new(2);

        let slot = dir
            .register_producer(
                ProducerId::from("c1"),
                pid(1),
                MediaKind::Video,
                MediaSource::Camera,
                &registry,
            )
            .unwrap();
        assert_eq!(slot, None);

        assert!(drain(&mut rxs[0]).is_empty(), "owner must not hear its own camera");
        assert!(matches!(
            drain(&mut rxs[1]).as_slice(),
            [ServerEvent::ProducerAdded { producer }] if producer.id == ProducerId::from("c1")
        ));
    }

    #[test]
    fn test_presentation_full_leaves_pool_and_directory_unchanged() {
        let (registry, _rxs) = registry_with(&[1]);
        let mut dir = MediaResourceDirectory::new(1);
        dir.register_producer(
            ProducerId::from("s1"),
            pid(1),
            MediaKind::Video,
            MediaSource::Screen,
            &registry,
        )
        .unwrap();

        let before_producers = dir.producer_count();
        let before_in_use = dir.presentation_count();

        let result = dir.register_producer(
            ProducerId::from("s2"),
            pid(1),
            MediaKind::Video,
            MediaSource::Screen,
            &registry,
        );
        assert!(matches!(result, Err(RoomError::PresentationFull)));
        assert_eq!(dir.producer_count(), before_producers);
        assert_eq!(dir.presentation_count(), before_in_use);
        assert!(!dir.contains_producer(&ProducerId::from("s2")));
    }

    #[test]
    fn test_stop_share_frees_slot_for_immediate_reuse() {
        // MaxScreenShares=2: two shares take slots 0,1; a third fails;
        // the first stops; a new attempt succeeds with slot 0.
        let (registry, _rxs) = registry_with(&[1, 2, 3]);
        let mut dir = MediaResourceDirectory::new(2);

        let s1 = dir
            .register_producer(
                ProducerId::from("a"),
                pid(1),
                MediaKind::Video,
                MediaSource::Screen,
                &registry,
            )
            .unwrap();
        let s2 = dir
            .register_producer(
                ProducerId::from("b"),
                pid(2),
                MediaKind::Video,
                MediaSource::Screen,
                &registry,
            )
            .unwrap();
        assert_eq!((s1, s2), (Some(SlotIndex(0)), Some(SlotIndex(1))));

        assert!(matches!(
            dir.register_producer(
                ProducerId::from("c"),
                pid(3),
                MediaKind::Video,
                MediaSource::Screen,
                &registry,
            ),
            Err(RoomError::PresentationFull)
        ));

        let ended = dir.stop_screen_share(pid(1), &registry);
        assert_eq!(ended, vec![ProducerId::from("a")]);

        let s3 = dir
            .register_producer(
                ProducerId::from("c"),
                pid(3),
                MediaKind::Video,
                MediaSource::Screen,
                &registry,
            )
            .unwrap();
        assert_eq!(s3, Some(SlotIndex(0)));
    }

    #[test]
    fn test_stop_share_spares_camera_producers() {
        let (registry, _rxs) = registry_with(&[1]);
        let mut dir = MediaResourceDirectory::new(2);
        dir.register_producer(
            ProducerId::from("cam"),
            pid(1),
            MediaKind::Video,
            MediaSource::Camera,
            &registry,
        )
        .unwrap();
        dir.register_producer(
            ProducerId::from("scr"),
            pid(1),
            MediaKind::Video,
            MediaSource::Screen,
            &registry,
        )
        .unwrap();

        let ended = dir.stop_screen_share(pid(1), &registry);
        assert_eq!(ended, vec![ProducerId::from("scr")]);
        assert!(dir.contains_producer(&ProducerId::from("cam")));
    }

    #[test]
    fn test_stop_share_with_no_share_is_a_noop() {
        let (registry, _rxs) = registry_with(&[1]);
        let mut dir = MediaResourceDirectory::new(2);
        assert!(dir.stop_screen_share(pid(1), &registry).is_empty());
    }

    #[test]
    fn test_close_all_for_returns_engine_resources_and_ends_presentations() {
        let (registry, mut rxs) = registry_with(&[1, 2]);
        let mut dir = MediaResourceDirectory::new(2);

        dir.register_transport(TransportId::from("t1"), pid(1), TransportDirection::Send);
        dir.register_transport(TransportId::from("t2"), pid(2), TransportDirection::Send);
        dir.register_producer(
            ProducerId::from("scr"),
            pid(1),
            MediaKind::Video,
            MediaSource::Screen,
            &registry,
        )
        .unwrap();
        dir.register_consumer(
            ConsumerId::from("x"),
            pid(2),
            ProducerId::from("scr"),
        );
        drain(&mut rxs[1]);

        let closed = dir.close_all_for(pid(1), &registry);
        assert_eq!(closed.transports, vec![TransportId::from("t1")]);
        assert_eq!(closed.producers, vec![ProducerId::from("scr")]);

        // Peer 2's stale consumer over the dead producer is gone, but
        // its own transport survives.
        assert_eq!(dir.transport_count(), 1);
        assert_eq!(dir.producer_count(), 0);
        assert_eq!(dir.presentation_count(), 0);

        assert!(matches!(
            drain(&mut rxs[1]).as_slice(),
            [ServerEvent::PresentationEnded { slot: SlotIndex(0), .. }]
        ));
    }

    #[test]
    fn test_transport_ownership_enforced() {
        let (_registry, _rxs) = registry_with(&[1, 2]);
        let mut dir = MediaResourceDirectory::new(1);
        dir.register_transport(TransportId::from("t1"), pid(1), TransportDirection::Send);

        assert!(dir.transport_owned_by(&TransportId::from("t1"), pid(1)).is_ok());
        assert!(matches!(
            dir.transport_owned_by(&TransportId::from("t1"), pid(2)),
            Err(RoomError::TransportNotFound(_))
        ));
        assert!(matches!(
            dir.transport_owned_by(&TransportId::from("zz"), pid(1)),
            Err(RoomError::TransportNotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_accessors_split_cameras_and_screens() {
        let (registry, _rxs) = registry_with(&[1]);
        let mut dir = MediaResourceDirectory::new(2);
        dir.register_producer(
            ProducerId::from("cam"),
            pid(1),
            MediaKind::Video,
            MediaSource::Camera,
            &registry,
        )
        .unwrap();
        dir.register_producer(
            ProducerId::from("scr"),
            pid(1),
            MediaKind::Video,
            MediaSource::Screen,
            &registry,
        )
        .unwrap();

        let producers = dir.producers_info();
        assert_eq!(producers.len(), 1);
        assert_eq!(producers[0].id, ProducerId::from("cam"));

        let presentations = dir.presentations_info(&registry);
        assert_eq!(presentations.len(), 1);
        assert_eq!(presentations[0].producer_id, ProducerId::from("scr"));
        assert_eq!(presentations[0].slot, SlotIndex(0));
    }
}
