use formflow_types::draft::Draft;
use formflow_types::form::{Section, Stage};
use formflow_types::id::EntityId;

use super::{Missing, Outcome};
use crate::builder::defaults::DEFAULT_SECTION_NAME;
use crate::builder::ids::new_temporary_id;

fn stage_mut<'a>(draft: &'a mut Draft, stage_id: &EntityId) -> Result<&'a mut Stage, Outcome> {
    draft
        .stage_mut(stage_id)
        .ok_or(Outcome::Missing(Missing::Stage(*stage_id)))
}

/// Force every nested owner reference to match its parent.
fn adopt(stage_id: EntityId, section: &mut Section) {
    section.stage_id = stage_id;
    for field in &mut section.fields {
        field.section_id = section.id;
    }
}

pub(super) fn create(draft: &mut Draft, stage_id: &EntityId, name: Option<String>) -> Outcome {
    let stage = match stage_mut(draft, stage_id) {
        Ok(stage) => stage,
        Err(missing) => return missing,
    };

    let id = new_temporary_id();
    let order = stage.sections.iter().map(|s| s.order).max().map_or(0, |max| max + 1);
    stage.sections.push(Section {
        id,
        stage_id: *stage_id,
        name: name.unwrap_or_else(|| DEFAULT_SECTION_NAME.to_string()),
        order,
        visibility_condition: None,
        fields: Vec::new(),
    });
    Outcome::Created(id)
}

pub(super) fn update(draft: &mut Draft, stage_id: &EntityId, mut section: Section) -> Outcome {
    let stage = match stage_mut(draft, stage_id) {
        Ok(stage) => stage,
        Err(missing) => return missing,
    };
    let Some(slot) = stage.section_mut(&section.id) else {
        return Outcome::Missing(Missing::Section(section.id));
    };

    adopt(*stage_id, &mut section);
    *slot = section;
    Outcome::Applied
}

pub(super) fn delete(draft: &mut Draft, stage_id: &EntityId, section_id: &EntityId) -> Outcome {
    let stage = match stage_mut(draft, stage_id) {
        Ok(stage) => stage,
        Err(missing) => return missing,
    };
    let Some(index) = stage.sections.iter().position(|s| s.id == *section_id) else {
        return Outcome::Missing(Missing::Section(*section_id));
    };
    stage.sections.remove(index);

    if draft.selection.section_id == Some(*section_id) {
        draft.selection.section_id = None;
        draft.selection.field_id = None;
    }
    Outcome::Applied
}

/// Replace the stage's section list with `sections`, in the given order.
pub(super) fn reorder(draft: &mut Draft, stage_id: &EntityId, mut sections: Vec<Section>) -> Outcome {
    let stage = match stage_mut(draft, stage_id) {
        Ok(stage) => stage,
        Err(missing) => return missing,
    };

    for section in &mut sections {
        adopt(*stage_id, section);
    }
    stage.sections = sections;
    Outcome::Applied
}
