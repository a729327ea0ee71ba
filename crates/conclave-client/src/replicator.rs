//! Replication of server deltas into local state, with buffering across
//! the capability negotiation window.
//!
//! Creation events that arrive before the client can consume anything are
//! parked in two FIFO queues and replayed once readiness flips. The
//! replicator never deduplicates; a resource that shows up both in the
//! snapshot and as a live event is dispatched twice, and the consumption
//! pipeline's idempotency collapses the pair.

use std::collections::VecDeque;

use conclave_protocol::{
    ParticipantId, PresentationInfo, ProducerInfo, RoomSnapshot, ServerEvent,
};

use crate::RoomMirror;

/// One remote resource the consumption pipeline should render.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteMedia {
    Producer(ProducerInfo),
    Presentation(PresentationInfo),
}

/// Last occupancy summary pushed by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomOccupancy {
    pub user_count: u32,
    pub presentation_count: u32,
}

/// Mirrors room state from server deltas and buffers creation events
/// until local capability negotiation completes.
#[derive(Debug, Default)]
pub struct SessionReplicator {
    mirror: RoomMirror,
    ready: bool,
    pending_producers: VecDeque<ProducerInfo>,
    pending_presentations: VecDeque<PresentationInfo>,
    occupancy: RoomOccupancy,
}

impl SessionReplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the admission snapshot: populates the mirror and enqueues
    /// every snapshot resource, unconditionally. There is one code path
    /// regardless of readiness; the drain happens at `mark_ready`.
    pub fn apply_snapshot(&mut self, own_id: ParticipantId, snapshot: &RoomSnapshot) {
        self.mirror.apply_snapshot(own_id, snapshot);
        self.pending_producers.extend(snapshot.producers.iter().cloned());
        self.pending_presentations
            .extend(snapshot.presentations.iter().cloned());
        tracing::debug!(
            producers = self.pending_producers.len(),
            presentations = self.pending_presentations.len(),
            "snapshot applied"
        );
    }

    /// Applies one live delta. Creation events are buffered while not
    /// ready, otherwise returned for immediate dispatch; every other
    /// delta mutates the mirror directly.
    pub fn apply_event(&mut self, event: ServerEvent) -> Vec<RemoteMedia> {
        match event {
            ServerEvent::PeerJoined { participant } => {
                self.mirror.peer_joined(participant);
            }
            ServerEvent::PeerRenamed { id, name } => {
                self.mirror.peer_renamed(id, name);
            }
            ServerEvent::PeerLeft { id } => {
                self.mirror.peer_left(id);
            }
            ServerEvent::MediaToggled { id, kind, enabled } => {
                self.mirror.media_toggled(id, kind, enabled);
            }
            ServerEvent::ProducerAdded { producer } => {
                if self.ready {
                    return vec![RemoteMedia::Producer(producer)];
                }
                self.pending_producers.push_back(producer);
            }
            ServerEvent::PresentationStarted { presentation } => {
                self.mirror.presentation_started(presentation.clone());
                if self.ready {
                    return vec![RemoteMedia::Presentation(presentation)];
                }
                self.pending_presentations.push_back(presentation);
            }
            ServerEvent::PresentationEnded { producer_id, .. } => {
                self.mirror.release_presentation(&producer_id);
                // A share that started and ended inside the negotiation
                // window must not be replayed at readiness.
                self.pending_presentations
                    .retain(|p| p.producer_id != producer_id);
            }
            ServerEvent::RoomStatus {
                user_count,
                presentation_count,
            } => {
                self.occupancy = RoomOccupancy {
                    user_count,
                    presentation_count,
                };
            }
        }
        Vec::new()
    }

    /// Flips readiness and drains both queues: producer events first,
    /// then presentation events, each in arrival order. Every item is
    /// returned exactly once.
    pub fn mark_ready(&mut self) -> Vec<RemoteMedia> {
        self.ready = true;
        let mut dispatches: Vec<RemoteMedia> = self
            .pending_producers
            .drain(..)
            .map(RemoteMedia::Producer)
            .collect();
        dispatches.extend(
            self.pending_presentations
                .drain(..)
                .map(RemoteMedia::Presentation),
        );
        tracing::debug!(count = dispatches.len(), "readiness flipped, queues drained");
        dispatches
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn occupancy(&self) -> RoomOccupancy {
        self.occupancy
    }

    pub fn mirror(&self) -> &RoomMirror {
        &self.mirror
    }

    pub fn mirror_mut(&mut self) -> &mut RoomMirror {
        &mut self.mirror
    }

    /// Back to the pristine pre-join state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_protocol::{
        MediaKind, MediaSource, ParticipantInfo, ProducerId, SlotIndex,
    };

    fn pid(id: u64) -> ParticipantId {
        ParticipantId(id)
    }

    fn producer(id: &str, owner: u64) -> ProducerInfo {
        ProducerInfo {
            id: ProducerId::from(id),
            owner: pid(owner),
            kind: MediaKind::Video,
            source: MediaSource::Camera,
        }
    }

    fn presentation(id: &str, owner: u64, slot: u32) -> PresentationInfo {
        PresentationInfo {
            producer_id: ProducerId::from(id),
            owner: pid(owner),
            owner_name: String::new(),
            slot: SlotIndex(slot),
        }
    }

    fn snapshot_with(
        producers: Vec<ProducerInfo>,
        presentations: Vec<PresentationInfo>,
    ) -> RoomSnapshot {
        RoomSnapshot {
            slot: SlotIndex(0),
            roster: vec![ParticipantInfo {
                id: pid(9),
                name: String::new(),
                slot: SlotIndex(0),
                video_enabled: true,
                audio_enabled: true,
            }],
            producers,
            presentations,
        }
    }

    #[test]
    fn test_snapshot_and_buffered_events_drain_once_in_arrival_order() {
        let mut replicator = SessionReplicator::new();
        replicator.apply_snapshot(
            pid(9),
            &snapshot_with(vec![producer("a", 1)], vec![presentation("p", 1, 0)]),
        );

        // Live events during the negotiation window are buffered.
        assert!(replicator
            .apply_event(ServerEvent::ProducerAdded {
                producer: producer("b", 2),
            })
            .is_empty());
        assert!(replicator
            .apply_event(ServerEvent::PresentationStarted {
                presentation: presentation("q", 2, 1),
            })
            .is_empty());

        let drained = replicator.mark_ready();
        assert_eq!(
            drained,
            vec![
                RemoteMedia::Producer(producer("a", 1)),
                RemoteMedia::Producer(producer("b", 2)),
                RemoteMedia::Presentation(presentation("p", 1, 0)),
                RemoteMedia::Presentation(presentation("q", 2, 1)),
            ]
        );

        // A second drain yields nothing.
        assert!(replicator.mark_ready().is_empty());
    }

    #[test]
    fn test_ready_replicator_dispatches_immediately() {
        let mut replicator = SessionReplicator::new();
        replicator.apply_snapshot(pid(9), &snapshot_with(vec![], vec![]));
        replicator.mark_ready();

        let dispatches = replicator.apply_event(ServerEvent::ProducerAdded {
            producer: producer("a", 1),
        });
        assert_eq!(dispatches, vec![RemoteMedia::Producer(producer("a", 1))]);
    }

    #[test]
    fn test_presentation_ended_during_buffering_cancels_replay() {
        let mut replicator = SessionReplicator::new();
        replicator.apply_snapshot(pid(9), &snapshot_with(vec![], vec![]));

        replicator.apply_event(ServerEvent::PresentationStarted {
            presentation: presentation("p", 1, 0),
        });
        replicator.apply_event(ServerEvent::PresentationEnded {
            producer_id: ProducerId::from("p"),
            slot: SlotIndex(0),
        });

        assert!(replicator.mark_ready().is_empty());
        assert_eq!(replicator.mirror().presentation_count(), 0);
    }

    #[test]
    fn test_update_deltas_bypass_buffering() {
        let mut replicator = SessionReplicator::new();
        replicator.apply_snapshot(pid(9), &snapshot_with(vec![], vec![]));

        replicator.apply_event(ServerEvent::PeerJoined {
            participant: ParticipantInfo {
                id: pid(3),
                name: String::new(),
                slot: SlotIndex(1),
                video_enabled: true,
                audio_enabled: true,
            },
        });
        replicator.apply_event(ServerEvent::PeerRenamed {
            id: pid(3),
            name: "eve".into(),
        });

        // Mirror already reflects the deltas even though not ready.
        assert!(!replicator.is_ready());
        assert_eq!(replicator.mirror().name_of(pid(3)), Some("eve"));
    }

    #[test]
    fn test_room_status_tracked() {
        let mut replicator = SessionReplicator::new();
        replicator.apply_event(ServerEvent::RoomStatus {
            user_count: 4,
            presentation_count: 1,
        });
        assert_eq!(
            replicator.occupancy(),
            RoomOccupancy {
                user_count: 4,
                presentation_count: 1,
            }
        );
    }

    #[test]
    fn test_reset_clears_queues_and_readiness() {
        let mut replicator = SessionReplicator::new();
        replicator.apply_snapshot(pid(9), &snapshot_with(vec![producer("a", 1)], vec![]));
        replicator.mark_ready();
        replicator.reset();

        assert!(!replicator.is_ready());
        assert_eq!(replicator.mirror().own_id(), None);
        assert!(replicator.mark_ready().is_empty());
    }
}
