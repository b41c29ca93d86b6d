//! `FormVersion` -> `Draft`.
//!
//! Stage, section and field failures abort the whole mapping: a stage with a
//! corrupt section cannot be partially represented. A transition whose
//! endpoints cannot be resolved is logged and left out; an action that does
//! not fit the catalog never costs its transition, it is kept as-is.

use std::collections::HashSet;

use tracing::{debug, warn};

use formflow_types::draft::Draft;
use formflow_types::error::MappingError;
use formflow_types::form::{AccessRule, Field, Rule, Section, Stage, Transition};
use formflow_types::id::EntityId;
use formflow_types::wire::{AccessRuleWire, FieldWire, FormVersion, SectionWire, StageWire, TransitionWire};

use super::actions::decode_action;
use crate::builder::ids::new_temporary_id;

/// Build a draft from a backend form version.
///
/// `None` yields an empty draft (the "new form" path).
pub fn map_form_version_to_draft(form_version: Option<&FormVersion>) -> Result<Draft, MappingError> {
    let Some(fv) = form_version else {
        return Ok(Draft::empty());
    };

    let mut ids = SeenIds::default();
    let stages = fv
        .stages
        .iter()
        .map(|stage| map_stage(stage, &mut ids))
        .collect::<Result<Vec<_>, _>>()?;

    let stage_ids: HashSet<i64> = stages.iter().filter_map(|s| s.id.real()).collect();

    let mut transitions = Vec::with_capacity(fv.stage_transitions.len());
    for (index, wire) in fv.stage_transitions.iter().enumerate() {
        match map_transition(wire, &stage_ids, &mut ids) {
            Ok(transition) => transitions.push(transition),
            Err(err) => {
                warn!(
                    form_version_id = fv.id,
                    index,
                    transition_id = ?wire.id,
                    error = %err,
                    "Skipping malformed stage transition"
                );
            }
        }
    }

    debug!(
        form_version_id = fv.id,
        stages = stages.len(),
        transitions = transitions.len(),
        "Mapped form version to draft"
    );

    Ok(Draft {
        form_version_id: Some(fv.id),
        stages,
        transitions,
        ..Draft::default()
    })
}

/// Real ids seen so far, per entity kind.
#[derive(Default)]
struct SeenIds {
    stages: HashSet<i64>,
    sections: HashSet<i64>,
    fields: HashSet<i64>,
    transitions: HashSet<i64>,
}

fn claim(seen: &mut HashSet<i64>, kind: &'static str, id: Option<i64>) -> Result<EntityId, MappingError> {
    match id {
        Some(id) => {
            if !seen.insert(id) {
                return Err(MappingError::DuplicateId { kind, id });
            }
            Ok(EntityId::Real(id))
        }
        None => {
            let tmp = new_temporary_id();
            debug!(kind, id = %tmp, "Backend omitted an id, assigned a temporary one");
            Ok(tmp)
        }
    }
}

fn check_owner(
    kind: &'static str,
    id: &EntityId,
    parent: &EntityId,
    claimed: Option<i64>,
) -> Result<(), MappingError> {
    if let (Some(found), Some(expected)) = (claimed, parent.real()) {
        if found != expected {
            return Err(MappingError::OwnerMismatch {
                kind,
                id: id.to_string(),
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// Prefer the current key, fall back to the legacy one.
fn canonical_condition(current: &Option<String>, legacy: &Option<String>) -> Option<String> {
    current.clone().or_else(|| legacy.clone())
}

fn map_stage(wire: &StageWire, ids: &mut SeenIds) -> Result<Stage, MappingError> {
    let id = claim(&mut ids.stages, "stage", wire.id)?;

    let sections = wire
        .sections
        .iter()
        .map(|section| map_section(section, &id, ids))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stage {
        id,
        name: wire.name.clone(),
        is_initial: wire.is_initial,
        visibility_condition: canonical_condition(
            &wire.visibility_condition,
            &wire.visibility_conditions,
        ),
        access_rule: map_access_rule(&wire.access_rule),
        sections,
    })
}

fn map_access_rule(wire: &AccessRuleWire) -> AccessRule {
    AccessRule {
        allowed_users: wire.allowed_users.clone(),
        allowed_roles: wire.allowed_roles.clone(),
        allowed_permissions: wire.allowed_permissions.clone(),
        allow_all_authenticated: wire.allow_all_authenticated,
        email_field_id: wire.email_field_id.map(EntityId::Real),
    }
}

fn map_section(wire: &SectionWire, stage_id: &EntityId, ids: &mut SeenIds) -> Result<Section, MappingError> {
    let id = claim(&mut ids.sections, "section", wire.id)?;
    check_owner("section", &id, stage_id, wire.stage_id)?;

    let fields = wire
        .fields
        .iter()
        .map(|field| map_field(field, &id, ids))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Section {
        id,
        stage_id: *stage_id,
        name: wire.name.clone(),
        order: wire.order,
        visibility_condition: canonical_condition(
            &wire.visibility_condition,
            &wire.visibility_conditions,
        ),
        fields,
    })
}

fn map_field(wire: &FieldWire, section_id: &EntityId, ids: &mut SeenIds) -> Result<Field, MappingError> {
    let id = claim(&mut ids.fields, "field", wire.id)?;
    check_owner("field", &id, section_id, wire.section_id)?;

    Ok(Field {
        id,
        section_id: *section_id,
        field_type_id: wire.field_type_id,
        label: wire.label.clone(),
        placeholder: wire.placeholder.clone(),
        helper_text: wire.helper_text.clone(),
        default_value: wire.default_value.clone(),
        visibility_condition: canonical_condition(
            &wire.visibility_condition,
            &wire.visibility_conditions,
        ),
        rules: dedupe_rules(&id, wire.rules.clone()),
    })
}

/// Keep the first rule per `rule_id`.
pub(crate) fn dedupe_rules(field_id: &EntityId, rules: Vec<Rule>) -> Vec<Rule> {
    let mut seen = HashSet::new();
    let before = rules.len();
    let kept: Vec<Rule> = rules.into_iter().filter(|r| seen.insert(r.rule_id)).collect();
    if kept.len() != before {
        warn!(
            field_id = %field_id,
            dropped = before - kept.len(),
            "Dropped duplicate validation rules"
        );
    }
    kept
}

fn map_transition(
    wire: &TransitionWire,
    stage_ids: &HashSet<i64>,
    ids: &mut SeenIds,
) -> Result<Transition, MappingError> {
    let name = wire.id.map_or_else(|| "(unsaved)".to_string(), |id| id.to_string());
    let invalid = |reason: String| MappingError::InvalidTransition {
        transition: name.clone(),
        reason,
    };

    let from = wire
        .from_stage_id
        .ok_or_else(|| invalid("missing from_stage_id".to_string()))?;
    if !stage_ids.contains(&from) {
        return Err(invalid(format!("unknown source stage {from}")));
    }
    if let Some(to) = wire.to_stage_id {
        if !stage_ids.contains(&to) {
            return Err(invalid(format!("unknown destination stage {to}")));
        }
    }

    let actions = wire.actions.iter().map(decode_action).collect();

    // Claim the id last so a rejected transition does not reserve it.
    let id = claim(&mut ids.transitions, "transition", wire.id)?;

    Ok(Transition {
        id,
        from_stage_id: EntityId::Real(from),
        to_stage_id: wire.to_stage_id.map(EntityId::Real),
        label: wire.label.clone(),
        condition: wire.condition.clone(),
        is_final: wire.is_final,
        actions,
    })
}
