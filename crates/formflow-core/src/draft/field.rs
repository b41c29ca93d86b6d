use std::collections::HashSet;

use tracing::debug;

use formflow_types::draft::Draft;
use formflow_types::form::{Field, Rule, Section};
use formflow_types::id::EntityId;

use super::{Missing, Outcome};
use crate::builder::defaults::{FieldOverrides, FieldTypeRegistry, build_field};
use crate::mapping::inbound::dedupe_rules;

fn section_mut<'a>(
    draft: &'a mut Draft,
    stage_id: &EntityId,
    section_id: &EntityId,
) -> Result<&'a mut Section, Outcome> {
    let stage = draft
        .stage_mut(stage_id)
        .ok_or(Outcome::Missing(Missing::Stage(*stage_id)))?;
    stage
        .section_mut(section_id)
        .ok_or(Outcome::Missing(Missing::Section(*section_id)))
}

fn field_mut<'a>(
    draft: &'a mut Draft,
    stage_id: &EntityId,
    section_id: &EntityId,
    field_id: &EntityId,
) -> Result<&'a mut Field, Outcome> {
    section_mut(draft, stage_id, section_id)?
        .field_mut(field_id)
        .ok_or(Outcome::Missing(Missing::Field(*field_id)))
}

pub(super) fn create(
    draft: &mut Draft,
    registry: &FieldTypeRegistry,
    stage_id: &EntityId,
    section_id: &EntityId,
    field_type_id: i64,
    overrides: FieldOverrides,
) -> Outcome {
    let section = match section_mut(draft, stage_id, section_id) {
        Ok(section) => section,
        Err(missing) => return missing,
    };

    let mut field = build_field(registry, *section_id, field_type_id, overrides);
    field.rules = dedupe_rules(&field.id, field.rules);
    let id = field.id;
    section.fields.push(field);
    Outcome::Created(id)
}

pub(super) fn update(draft: &mut Draft, stage_id: &EntityId, section_id: &EntityId, mut field: Field) -> Outcome {
    let slot = match field_mut(draft, stage_id, section_id, &field.id) {
        Ok(slot) => slot,
        Err(missing) => return missing,
    };

    field.section_id = *section_id;
    field.rules = dedupe_rules(&field.id, field.rules);
    *slot = field;
    Outcome::Applied
}

pub(super) fn delete(draft: &mut Draft, stage_id: &EntityId, section_id: &EntityId, field_id: &EntityId) -> Outcome {
    let section = match section_mut(draft, stage_id, section_id) {
        Ok(section) => section,
        Err(missing) => return missing,
    };
    let Some(index) = section.fields.iter().position(|f| f.id == *field_id) else {
        return Outcome::Missing(Missing::Field(*field_id));
    };
    section.fields.remove(index);

    if draft.selection.field_id == Some(*field_id) {
        draft.selection.field_id = None;
    }
    Outcome::Applied
}

/// Replace the section's field list with `fields`, in the given order.
pub(super) fn reorder(draft: &mut Draft, stage_id: &EntityId, section_id: &EntityId, mut fields: Vec<Field>) -> Outcome {
    let section = match section_mut(draft, stage_id, section_id) {
        Ok(section) => section,
        Err(missing) => return missing,
    };

    for field in &mut fields {
        field.section_id = *section_id;
    }
    section.fields = fields;
    Outcome::Applied
}

/// Insert a rule, replacing any rule with the same `rule_id` in place.
pub(super) fn upsert_rule(
    draft: &mut Draft,
    stage_id: &EntityId,
    section_id: &EntityId,
    field_id: &EntityId,
    rule: Rule,
) -> Outcome {
    let field = match field_mut(draft, stage_id, section_id, field_id) {
        Ok(field) => field,
        Err(missing) => return missing,
    };

    match field.rules.iter_mut().find(|r| r.rule_id == rule.rule_id) {
        Some(existing) => *existing = rule,
        None => field.rules.push(rule),
    }
    Outcome::Applied
}

pub(super) fn remove_rule(
    draft: &mut Draft,
    stage_id: &EntityId,
    section_id: &EntityId,
    field_id: &EntityId,
    rule_id: i64,
) -> Outcome {
    let field = match field_mut(draft, stage_id, section_id, field_id) {
        Ok(field) => field,
        Err(missing) => return missing,
    };

    let before = field.rules.len();
    field.rules.retain(|r| r.rule_id != rule_id);
    if field.rules.len() == before {
        return Outcome::Missing(Missing::Rule {
            field_id: *field_id,
            rule_id,
        });
    }
    Outcome::Applied
}

/// Clear access-rule email references to fields that no longer exist.
pub(super) fn clear_dangling_email_fields(draft: &mut Draft) {
    let field_ids: HashSet<EntityId> = draft
        .stages
        .iter()
        .flat_map(|s| &s.sections)
        .flat_map(|s| &s.fields)
        .map(|f| f.id)
        .collect();

    for stage in &mut draft.stages {
        if let Some(field_id) = stage.access_rule.email_field_id {
            if !field_ids.contains(&field_id) {
                debug!(stage_id = %stage.id, %field_id, "Clearing email field reference to deleted field");
                stage.access_rule.email_field_id = None;
            }
        }
    }
}
