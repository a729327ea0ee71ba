//! Local mirror of the server's room state.
//!
//! The server's slot pools and directory are authoritative; the mirror
//! only replays the snapshot and subsequent deltas. It never allocates
//! indices itself.

use std::collections::HashMap;

use conclave_protocol::{
    MediaKind, ParticipantId, ParticipantInfo, PresentationInfo, ProducerId,
    RoomSnapshot, SlotIndex,
};

/// Client-side copy of roster and presentation records.
#[derive(Debug, Default)]
pub struct RoomMirror {
    own_id: Option<ParticipantId>,
    own_slot: Option<SlotIndex>,
    roster: HashMap<ParticipantId, ParticipantInfo>,
    presentations: HashMap<ProducerId, PresentationInfo>,
}

impl RoomMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all local state with the admission snapshot.
    pub fn apply_snapshot(&mut self, own_id: ParticipantId, snapshot: &RoomSnapshot) {
        self.own_id = Some(own_id);
        self.own_slot = Some(snapshot.slot);
        self.roster = snapshot
            .roster
            .iter()
            .map(|p| (p.id, p.clone()))
            .collect();
        self.presentations = snapshot
            .presentations
            .iter()
            .map(|p| (p.producer_id.clone(), p.clone()))
            .collect();
    }

    pub fn peer_joined(&mut self, participant: ParticipantInfo) {
        self.roster.insert(participant.id, participant);
    }

    pub fn peer_renamed(&mut self, id: ParticipantId, name: String) {
        if let Some(p) = self.roster.get_mut(&id) {
            p.name = name;
        }
    }

    pub fn peer_left(&mut self, id: ParticipantId) {
        self.roster.remove(&id);
    }

    pub fn media_toggled(&mut self, id: ParticipantId, kind: MediaKind, enabled: bool) {
        if let Some(p) = self.roster.get_mut(&id) {
            match kind {
                MediaKind::Video => p.video_enabled = enabled,
                MediaKind::Audio => p.audio_enabled = enabled,
            }
        }
    }

    pub fn presentation_started(&mut self, presentation: PresentationInfo) {
        self.presentations
            .insert(presentation.producer_id.clone(), presentation);
    }

    /// Drops a presentation record, mirroring the server's slot release.
    pub fn release_presentation(&mut self, producer_id: &ProducerId) -> Option<SlotIndex> {
        self.presentations.remove(producer_id).map(|p| p.slot)
    }

    pub fn own_id(&self) -> Option<ParticipantId> {
        self.own_id
    }

    pub fn own_slot(&self) -> Option<SlotIndex> {
        self.own_slot
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.roster.contains_key(&id)
    }

    pub fn name_of(&self, id: ParticipantId) -> Option<&str> {
        self.roster.get(&id).map(|p| p.name.as_str())
    }

    pub fn presentation(&self, producer_id: &ProducerId) -> Option<&PresentationInfo> {
        self.presentations.get(producer_id)
    }

    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    pub fn presentation_count(&self) -> usize {
        self.presentations.len()
    }

    /// Back to the pristine pre-join state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
