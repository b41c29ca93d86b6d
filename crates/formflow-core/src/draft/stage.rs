use tracing::debug;

use formflow_types::draft::Draft;
use formflow_types::form::{AccessRule, Stage};
use formflow_types::id::EntityId;

use super::{Missing, Outcome};
use crate::builder::defaults::DEFAULT_STAGE_NAME;
use crate::builder::ids::new_temporary_id;

pub(super) fn create(draft: &mut Draft, name: Option<String>) -> Outcome {
    let id = new_temporary_id();
    let first = draft.stages.is_empty();

    draft.stages.push(Stage {
        id,
        name: name.unwrap_or_else(|| DEFAULT_STAGE_NAME.to_string()),
        is_initial: first,
        visibility_condition: None,
        access_rule: AccessRule::default(),
        sections: Vec::new(),
    });

    if first {
        draft.selection.stage_id = Some(id);
        draft.selection.section_id = None;
        draft.selection.field_id = None;
    }
    Outcome::Created(id)
}

/// Replace a stage wholesale. Nested owner ids are forced to match.
pub(super) fn update(draft: &mut Draft, mut stage: Stage) -> Outcome {
    let id = stage.id;
    let Some(index) = draft.stages.iter().position(|s| s.id == id) else {
        return Outcome::Missing(Missing::Stage(id));
    };

    for section in &mut stage.sections {
        section.stage_id = id;
        for field in &mut section.fields {
            field.section_id = section.id;
        }
    }

    let becomes_initial = stage.is_initial;
    draft.stages[index] = stage;

    if becomes_initial {
        for other in draft.stages.iter_mut().filter(|s| s.id != id) {
            other.is_initial = false;
        }
    }
    ensure_single_initial(draft);
    Outcome::Applied
}

pub(super) fn delete(draft: &mut Draft, stage_id: &EntityId) -> Outcome {
    let Some(index) = draft.stages.iter().position(|s| s.id == *stage_id) else {
        return Outcome::Missing(Missing::Stage(*stage_id));
    };
    draft.stages.remove(index);
    ensure_single_initial(draft);
    detach_transitions(draft, stage_id);

    if draft.selection.stage_id == Some(*stage_id) {
        draft.selection.stage_id = draft.stages.first().map(|s| s.id);
        draft.selection.section_id = None;
        draft.selection.field_id = None;
    }
    Outcome::Applied
}

/// Transitions leaving a deleted stage go with it; transitions entering it
/// lose their destination.
fn detach_transitions(draft: &mut Draft, stage_id: &EntityId) {
    let before = draft.transitions.len();
    draft.transitions.retain(|t| t.from_stage_id != *stage_id);
    let removed = before - draft.transitions.len();

    let mut detached = 0;
    for transition in &mut draft.transitions {
        if transition.to_stage_id == Some(*stage_id) {
            transition.to_stage_id = None;
            detached += 1;
        }
    }

    if let Some(selected) = draft.selection.transition_id {
        if draft.transition(&selected).is_none() {
            draft.selection.transition_id = None;
        }
    }

    if removed + detached > 0 {
        debug!(stage_id = %stage_id, removed, detached, "Detached transitions from deleted stage");
    }
}

/// A non-empty draft has exactly one initial stage: the first flagged one
/// wins, and the first stage is promoted when none is flagged.
pub(super) fn ensure_single_initial(draft: &mut Draft) {
    let mut seen = false;
    for stage in &mut draft.stages {
        if stage.is_initial {
            if seen {
                stage.is_initial = false;
            }
            seen = true;
        }
    }
    if !seen {
        if let Some(first) = draft.stages.first_mut() {
            first.is_initial = true;
        }
    }
}
