//! Selection state machine.
//!
//! Focus runs one way: changing the selected stage clears the section and
//! field, changing the section clears the field. The transition selection is
//! independent of the tree.

use tracing::debug;

use formflow_types::draft::{Draft, Selection};
use formflow_types::id::EntityId;

use super::{Missing, Outcome};

pub(super) fn select_stage(draft: &mut Draft, stage_id: Option<EntityId>) -> Outcome {
    if let Some(id) = stage_id {
        if draft.stage(&id).is_none() {
            return Outcome::Missing(Missing::Stage(id));
        }
    }
    let selection = &mut draft.selection;
    selection.stage_id = stage_id;
    selection.section_id = None;
    selection.field_id = None;
    Outcome::Applied
}

/// Select a section of the currently selected stage.
pub(super) fn select_section(draft: &mut Draft, section_id: Option<EntityId>) -> Outcome {
    if let Some(id) = section_id {
        let in_stage = draft
            .selected_stage()
            .is_some_and(|stage| stage.section(&id).is_some());
        if !in_stage {
            return Outcome::Missing(Missing::Section(id));
        }
    }
    draft.selection.section_id = section_id;
    draft.selection.field_id = None;
    Outcome::Applied
}

/// Select a field of the currently selected section.
pub(super) fn select_field(draft: &mut Draft, field_id: Option<EntityId>) -> Outcome {
    if let Some(id) = field_id {
        let in_section = draft
            .selected_section()
            .is_some_and(|section| section.field(&id).is_some());
        if !in_section {
            return Outcome::Missing(Missing::Field(id));
        }
    }
    draft.selection.field_id = field_id;
    Outcome::Applied
}

pub(super) fn select_transition(draft: &mut Draft, transition_id: Option<EntityId>) -> Outcome {
    if let Some(id) = transition_id {
        if draft.transition(&id).is_none() {
            return Outcome::Missing(Missing::Transition(id));
        }
    }
    draft.selection.transition_id = transition_id;
    Outcome::Applied
}

/// Clear any selection that points at an entity that no longer exists,
/// together with its descendants. A section is only valid inside the
/// selected stage and a field only inside the selected section.
pub fn repair(draft: &mut Draft) {
    let selection = draft.selection.clone();

    let stage = selection.stage_id.and_then(|id| draft.stage(&id));
    let section = selection
        .section_id
        .and_then(|id| stage.and_then(|stage| stage.section(&id)));
    let field = selection
        .field_id
        .and_then(|id| section.and_then(|section| section.field(&id)));

    let repaired = Selection {
        stage_id: stage.map(|s| s.id),
        section_id: section.map(|s| s.id),
        field_id: field.map(|f| f.id),
        transition_id: selection
            .transition_id
            .filter(|id| draft.transition(id).is_some()),
    };

    if repaired != selection {
        debug!(?selection, ?repaired, "Cleared dangling selection");
        draft.selection = repaired;
    }
}
