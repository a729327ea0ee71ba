//! Participant registry: lifecycle and delta fanout.
//!
//! The registry owns the user slot pool and the per-participant outbound
//! event channels. A participant moves absent → provisional (slot
//! reserved, empty name) → named (after the first rename) → absent
//! (removed, slot released). All mutations happen inside the room actor,
//! so the registry itself needs no locking — plain maps, single writer.

use std::collections::HashMap;

use conclave_protocol::{
    MediaKind, ParticipantId, ParticipantInfo, Recipient, ServerEvent, SlotIndex,
};
use tokio::sync::mpsc;

use crate::{RoomError, SlotPool};

/// Channel sender for delivering broadcast events to one participant's
/// connection handler.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Server-side state for one admitted participant.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    /// Empty while provisional; set by the first rename.
    pub name: String,
    pub slot: SlotIndex,
    pub video_enabled: bool,
    pub audio_enabled: bool,
}

impl Participant {
    /// The wire-format view of this participant.
    pub fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            id: self.id,
            name: self.name.clone(),
            slot: self.slot,
            video_enabled: self.video_enabled,
            audio_enabled: self.audio_enabled,
        }
    }
}

/// Tracks admitted participants, their slots, and their event channels.
pub struct RoomRegistry {
    slots: SlotPool,
    participants: HashMap<ParticipantId, Participant>,
    senders: HashMap<ParticipantId, EventSender>,
}

impl RoomRegistry {
    /// Creates a registry with `max_users` user slots, all free.
    pub fn new(max_users: u32) -> Self {
        Self {
            slots: SlotPool::new(max_users),
            participants: HashMap::new(),
            senders: HashMap::new(),
        }
    }

    /// Admits a connection: reserves the smallest free user slot, stores
    /// the participant (provisional, media enabled), and emits
    /// `PeerJoined` to everyone else.
    ///
    /// # Errors
    /// [`RoomError::RoomFull`] if the slot pool is exhausted, with no
    /// mutation performed. [`RoomError::AlreadyJoined`] for a duplicate id.
    pub fn admit(
        &mut self,
        id: ParticipantId,
        sender: EventSender,
    ) -> Result<SlotIndex, RoomError> {
        if self.participants.contains_key(&id) {
            return Err(RoomError::AlreadyJoined(id));
        }
        let slot = self.slots.acquire().ok_or(RoomError::RoomFull)?;

        let participant = Participant {
            id,
            name: String::new(),
            slot,
            video_enabled: true,
            audio_enabled: true,
        };
        let info = participant.info();
        self.participants.insert(id, participant);
        self.senders.insert(id, sender);

        tracing::info!(%id, %slot, users = self.participants.len(), "participant admitted");

        self.broadcast(
            Recipient::AllExcept(id),
            ServerEvent::PeerJoined { participant: info },
        );
        Ok(slot)
    }

    /// Sets the display name and emits `PeerRenamed` to everyone else.
    pub fn rename(&mut self, id: ParticipantId, name: String) -> Result<(), RoomError> {
        let participant = self
            .participants
            .get_mut(&id)
            .ok_or(RoomError::NotJoined(id))?;
        participant.name = name.clone();
        tracing::debug!(%id, %name, "participant renamed");
        self.broadcast(
            Recipient::AllExcept(id),
            ServerEvent::PeerRenamed { id, name },
        );
        Ok(())
    }

    /// Flips a media-enabled flag and emits `MediaToggled` to everyone
    /// else.
    pub fn set_media_enabled(
        &mut self,
        id: ParticipantId,
        kind: MediaKind,
        enabled: bool,
    ) -> Result<(), RoomError> {
        let participant = self
            .participants
            .get_mut(&id)
            .ok_or(RoomError::NotJoined(id))?;
        match kind {
            MediaKind::Video => participant.video_enabled = enabled,
            MediaKind::Audio => participant.audio_enabled = enabled,
        }
        self.broadcast(
            Recipient::AllExcept(id),
            ServerEvent::MediaToggled { id, kind, enabled },
        );
        Ok(())
    }

    /// Removes a participant, releases its slot, and emits `PeerLeft` to
    /// everyone else.
    ///
    /// The caller must close the participant's media resources *first*
    /// (the room actor does), so peers see the end-deltas before the
    /// leave-delta.
    pub fn remove(&mut self, id: ParticipantId) -> Result<SlotIndex, RoomError> {
        let participant = self
            .participants
            .remove(&id)
            .ok_or(RoomError::NotJoined(id))?;
        self.senders.remove(&id);
        self.slots.release(participant.slot);

        tracing::info!(%id, slot = %participant.slot, users = self.participants.len(), "participant removed");

        self.broadcast(Recipient::AllExcept(id), ServerEvent::PeerLeft { id });
        Ok(participant.slot)
    }

    /// The roster, ordered by slot for deterministic snapshots.
    pub fn roster(&self) -> Vec<ParticipantInfo> {
        let mut roster: Vec<_> = self.participants.values().map(Participant::info).collect();
        roster.sort_by_key(|p| p.slot);
        roster
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    /// Display name lookup (for presentation records).
    pub fn name_of(&self, id: ParticipantId) -> Option<&str> {
        self.participants.get(&id).map(|p| p.name.as_str())
    }

    pub fn user_count(&self) -> u32 {
        self.participants.len() as u32
    }

    /// Delivers an event to the addressed participants. Send failures
    /// mean the receiver's connection is tearing down; they are dropped
    /// silently, the disconnect path will clean the entry up.
    pub fn broadcast(&self, recipient: Recipient, event: ServerEvent) {
        match recipient {
            Recipient::All => {
                for sender in self.senders.values() {
                    let _ = sender.send(event.clone());
                }
            }
            Recipient::Only(id) => {
                if let Some(sender) = self.senders.get(&id) {
                    let _ = sender.send(event);
                }
            }
            Recipient::AllExcept(excluded) => {
                for (id, sender) in &self.senders {
                    if *id != excluded {
                        let _ = sender.send(event.clone());
                    }
                }
            }
        }
    }
}
