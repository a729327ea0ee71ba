//! The rendering seam.
//!
//! All layout mutation goes through [`RenderSurface`], a thin adapter the
//! state layers call with semantic slot ids. [`HeadlessSurface`] is an
//! ordered in-memory container model: enough structure for the swap and
//! ordering logic to be exercised without any UI attached.

use std::collections::BTreeMap;

use conclave_protocol::{ConsumerDescriptor, ConsumerId, ParticipantId, ProducerId};

/// Stable identity for one render slot, derived from what it shows
/// rather than where it sits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemanticId(String);

impl SemanticId {
    /// The participant's own local preview.
    pub fn local() -> Self {
        Self("local".into())
    }

    /// A remote participant's camera tile.
    pub fn user(id: ParticipantId) -> Self {
        Self(format!("user-{}", id.0))
    }

    /// A presentation tile, keyed by the producing resource.
    pub fn presentation(producer_id: &ProducerId) -> Self {
        Self(format!("presentation-{producer_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SemanticId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Thin adapter the client state layers render through.
///
/// `create_slot` is create-or-reuse: a second call with the same id is a
/// no-op that leaves the existing slot (and its position) alone. `locate`
/// resolves by current label because slots move; position is not
/// identity.
pub trait RenderSurface {
    fn create_slot(&mut self, id: &SemanticId, parent: &str);
    fn remove_slot(&mut self, id: &SemanticId);
    fn attach(&mut self, id: &SemanticId, consumer: &ConsumerDescriptor);
    fn locate(&self, label: &str) -> Option<SemanticId>;
    fn relocate(&mut self, id: &SemanticId, parent: &str);
    fn exchange(&mut self, a: &SemanticId, b: &SemanticId);
    fn set_label(&mut self, id: &SemanticId, label: &str);
    fn set_highlight(&mut self, id: &SemanticId, on: bool);
    fn clear_affordances(&mut self);
    fn parent_of(&self, id: &SemanticId) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
struct SlotState {
    label: String,
    highlighted: bool,
    attached: Option<ConsumerId>,
}

/// In-memory [`RenderSurface`]: named containers holding ordered slots.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    containers: BTreeMap<String, Vec<SemanticId>>,
    slots: BTreeMap<SemanticId, SlotState>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Child order of a container, for assertions and embedding.
    pub fn children(&self, parent: &str) -> Vec<SemanticId> {
        self.containers.get(parent).cloned().unwrap_or_default()
    }

    pub fn contains(&self, id: &SemanticId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn label_of(&self, id: &SemanticId) -> Option<&str> {
        self.slots.get(id).map(|s| s.label.as_str())
    }

    pub fn is_highlighted(&self, id: &SemanticId) -> bool {
        self.slots.get(id).is_some_and(|s| s.highlighted)
    }

    pub fn attached_consumer(&self, id: &SemanticId) -> Option<&ConsumerId> {
        self.slots.get(id).and_then(|s| s.attached.as_ref())
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn detach_from_parent(&mut self, id: &SemanticId) {
        for children in self.containers.values_mut() {
            children.retain(|c| c != id);
        }
    }
}

impl RenderSurface for HeadlessSurface {
    fn create_slot(&mut self, id: &SemanticId, parent: &str) {
        if self.slots.contains_key(id) {
            return;
        }
        self.slots.insert(id.clone(), SlotState::default());
        self.containers
            .entry(parent.to_owned())
            .or_default()
            .push(id.clone());
    }

    fn remove_slot(&mut self, id: &SemanticId) {
        if self.slots.remove(id).is_some() {
            self.detach_from_parent(id);
        }
    }

    fn attach(&mut self, id: &SemanticId, consumer: &ConsumerDescriptor) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.attached = Some(consumer.id.clone());
        }
    }

    fn locate(&self, label: &str) -> Option<SemanticId> {
        self.slots
            .iter()
            .find(|(_, s)| s.label == label)
            .map(|(id, _)| id.clone())
    }

    fn relocate(&mut self, id: &SemanticId, parent: &str) {
        if !self.slots.contains_key(id) {
            return;
        }
        self.detach_from_parent(id);
        self.containers
            .entry(parent.to_owned())
            .or_default()
            .push(id.clone());
    }

    fn exchange(&mut self, a: &SemanticId, b: &SemanticId) {
        for children in self.containers.values_mut() {
            let pa = children.iter().position(|c| c == a);
            let pb = children.iter().position(|c| c == b);
            if let (Some(pa), Some(pb)) = (pa, pb) {
                children.swap(pa, pb);
                return;
            }
        }
    }

    fn set_label(&mut self, id: &SemanticId, label: &str) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.label = label.to_owned();
        }
    }

    fn set_highlight(&mut self, id: &SemanticId, on: bool) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.highlighted = on;
        }
    }

    fn clear_affordances(&mut self) {
        for slot in self.slots.values_mut() {
            slot.highlighted = false;
        }
    }

    fn parent_of(&self, id: &SemanticId) -> Option<String> {
        self.containers
            .iter()
            .find(|(_, children)| children.contains(id))
            .map(|(parent, _)| parent.clone())
    }
}
