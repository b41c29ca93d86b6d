//! Adopt backend-assigned ids after a successful save.
//!
//! The backend echoes the accepted request back with real ids filled in. The
//! echo preserves the order of what was sent, so entities are paired by
//! position: stage `i` of the draft with stage `i` of the echo, and so on down
//! the tree. A level whose counts disagree is left alone.

use std::collections::HashMap;

use tracing::{debug, warn};

use formflow_types::draft::Draft;
use formflow_types::form::{Section, Stage};
use formflow_types::id::EntityId;
use formflow_types::wire::{SaveRequest, SectionWire, StageWire};

/// Replace temporary ids in `draft` with the real ids echoed by the backend.
///
/// `sent_transitions` lists the draft transition ids that went out in the
/// request, in request order; dropped transitions are not part of the echo.
/// Returns the number of ids adopted.
pub fn adopt_server_ids(draft: &mut Draft, sent_transitions: &[EntityId], echoed: &SaveRequest) -> usize {
    let ids = server_id_map(draft, sent_transitions, echoed);
    apply_server_ids(draft, &ids)
}

/// Pair the draft that was sent with the echoed request and collect the
/// temporary -> real id assignments.
pub fn server_id_map(
    sent: &Draft,
    sent_transitions: &[EntityId],
    echoed: &SaveRequest,
) -> HashMap<EntityId, EntityId> {
    let mut adopted = HashMap::new();

    if sent.stages.len() == echoed.stages.len() {
        for (stage, wire) in sent.stages.iter().zip(&echoed.stages) {
            collect_stage(stage, wire, &mut adopted);
        }
    } else {
        warn!(
            sent = sent.stages.len(),
            echoed = echoed.stages.len(),
            "Stage count differs from save response, keeping temporary stage ids"
        );
    }

    if sent_transitions.len() == echoed.stage_transitions.len() {
        for (id, wire) in sent_transitions.iter().zip(&echoed.stage_transitions) {
            pair(*id, wire.id, &mut adopted);
        }
    } else {
        warn!(
            sent = sent_transitions.len(),
            echoed = echoed.stage_transitions.len(),
            "Transition count differs from save response, keeping temporary transition ids"
        );
    }

    adopted
}

/// Rewrite every id and id reference found in `ids`: entity ids, owner ids,
/// the access-rule email field, transition endpoints and the selection.
/// Ids absent from the draft (deleted since the request was built) are
/// ignored. Returns the number of assignments applied.
pub fn apply_server_ids(draft: &mut Draft, ids: &HashMap<EntityId, EntityId>) -> usize {
    if ids.is_empty() {
        return 0;
    }
    rewrite(draft, ids);
    debug!(adopted = ids.len(), "Adopted server ids");
    ids.len()
}

fn pair(local: EntityId, echoed: Option<i64>, adopted: &mut HashMap<EntityId, EntityId>) {
    if local.is_temporary() {
        if let Some(real) = echoed {
            adopted.insert(local, EntityId::Real(real));
        }
    }
}

fn collect_stage(stage: &Stage, wire: &StageWire, adopted: &mut HashMap<EntityId, EntityId>) {
    pair(stage.id, wire.id, adopted);

    if stage.sections.len() != wire.sections.len() {
        warn!(stage_id = %stage.id, "Section count differs from save response");
        return;
    }
    for (section, section_wire) in stage.sections.iter().zip(&wire.sections) {
        collect_section(section, section_wire, adopted);
    }
}

fn collect_section(section: &Section, wire: &SectionWire, adopted: &mut HashMap<EntityId, EntityId>) {
    pair(section.id, wire.id, adopted);

    if section.fields.len() != wire.fields.len() {
        warn!(section_id = %section.id, "Field count differs from save response");
        return;
    }
    for (field, field_wire) in section.fields.iter().zip(&wire.fields) {
        pair(field.id, field_wire.id, adopted);
    }
}

fn rewrite(draft: &mut Draft, adopted: &HashMap<EntityId, EntityId>) {
    let swap = |id: &mut EntityId| {
        if let Some(real) = adopted.get(id) {
            *id = *real;
        }
    };

    for stage in &mut draft.stages {
        swap(&mut stage.id);
        if let Some(email_field) = stage.access_rule.email_field_id.as_mut() {
            swap(email_field);
        }
        for section in &mut stage.sections {
            swap(&mut section.id);
            swap(&mut section.stage_id);
            for field in &mut section.fields {
                swap(&mut field.id);
                swap(&mut field.section_id);
            }
        }
    }

    for transition in &mut draft.transitions {
        swap(&mut transition.id);
        swap(&mut transition.from_stage_id);
        if let Some(to) = transition.to_stage_id.as_mut() {
            swap(to);
        }
    }

    let selection = &mut draft.selection;
    for slot in [
        &mut selection.stage_id,
        &mut selection.section_id,
        &mut selection.field_id,
        &mut selection.transition_id,
    ] {
        if let Some(id) = slot.as_mut() {
            swap(id);
        }
    }
}
