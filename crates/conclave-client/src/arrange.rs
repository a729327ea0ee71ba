//! Select-source/select-target swap gesture over rendered slots.
//!
//! The engine is a two-state machine operating purely through the render
//! surface. Slots are resolved by their *current* label at swap time,
//! because positions move while identities stay put.

use crate::{RenderSurface, SemanticId};

/// Outcome of one `select` or `cancel` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrangeOutcome {
    /// First selection armed the gesture.
    Armed,
    /// Re-selecting the armed source; nothing changed, still armed.
    Rejected,
    /// Both slots swapped; back to idle.
    Swapped,
    /// A slot could not be located; nothing mutated, back to idle.
    Aborted,
    /// Explicit cancel; back to idle.
    Cancelled,
}

/// Two-state swap engine. One per client session.
#[derive(Debug, Default)]
pub struct ArrangementEngine {
    state: Option<(SemanticId, String)>,
}

impl ArrangementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.state.is_some()
    }

    /// Handles one slot selection.
    ///
    /// Idle: arms on the given slot and highlights it. Armed: the same
    /// slot is a rejected no-op that stays armed; a different slot
    /// finalizes the swap and returns to idle, clearing every transient
    /// affordance whether the swap landed or aborted.
    pub fn select(
        &mut self,
        id: SemanticId,
        label: String,
        surface: &mut impl RenderSurface,
    ) -> ArrangeOutcome {
        match self.state.take() {
            None => {
                surface.set_highlight(&id, true);
                self.state = Some((id, label));
                ArrangeOutcome::Armed
            }
            Some((source_id, source_label)) if source_id == id => {
                tracing::debug!(%id, "source re-selected, staying armed");
                self.state = Some((source_id, source_label));
                ArrangeOutcome::Rejected
            }
            Some((_, source_label)) => {
                let outcome = swap_by_label(&source_label, &label, surface);
                surface.clear_affordances();
                outcome
            }
        }
    }

    /// Abandons an armed gesture.
    pub fn cancel(&mut self, surface: &mut impl RenderSurface) -> ArrangeOutcome {
        self.state = None;
        surface.clear_affordances();
        ArrangeOutcome::Cancelled
    }
}

/// Locates both slots by current label and swaps their positions. Same
/// parent: in-place pairwise exchange. Different parents: each reattaches
/// into the other's former parent. If either lookup fails, nothing is
/// mutated.
fn swap_by_label(
    source_label: &str,
    target_label: &str,
    surface: &mut impl RenderSurface,
) -> ArrangeOutcome {
    let (Some(source), Some(target)) =
        (surface.locate(source_label), surface.locate(target_label))
    else {
        tracing::debug!(source_label, target_label, "swap aborted, slot missing");
        return ArrangeOutcome::Aborted;
    };
    let (Some(source_parent), Some(target_parent)) =
        (surface.parent_of(&source), surface.parent_of(&target))
    else {
        return ArrangeOutcome::Aborted;
    };

    if source_parent == target_parent {
        surface.exchange(&source, &target);
    } else {
        surface.relocate(&source, &target_parent);
        surface.relocate(&target, &source_parent);
    }
    ArrangeOutcome::Swapped
}
