//! `Draft` -> `SaveRequest`.
//!
//! Temporary ids are stripped (the `id` key is omitted, never replaced by a
//! placeholder) so the backend allocates real ones. A transition whose
//! endpoint is unsaved or no longer exists cannot be sent; what happens to it
//! is decided by the [`TransitionPolicy`].

use std::collections::HashSet;

use tracing::{debug, warn};

use formflow_types::config::TransitionPolicy;
use formflow_types::draft::Draft;
use formflow_types::error::{MappingError, UnsendableReason, UnsendableTransition};
use formflow_types::form::{AccessRule, Field, Section, Stage, Transition};
use formflow_types::id::EntityId;
use formflow_types::wire::{AccessRuleWire, FieldWire, SaveRequest, SectionWire, StageWire, TransitionWire};

use super::actions::encode_action;

/// A built request plus the bookkeeping needed after the save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub request: SaveRequest,
    /// Ids of the draft transitions in `request.stage_transitions`, in order.
    pub sent_transitions: Vec<EntityId>,
    /// Transitions left out under [`TransitionPolicy::DropAndWarn`].
    pub dropped: Vec<UnsendableTransition>,
}

/// Build the wire request for a draft.
///
/// Under [`TransitionPolicy::Reject`] any unsendable transition fails the
/// whole request with [`MappingError::UnsendableTransitions`].
pub fn build_save_request(draft: &Draft, policy: TransitionPolicy) -> Result<SaveOutcome, MappingError> {
    let stages: Vec<StageWire> = draft.stages.iter().map(stage_to_wire).collect();
    let stage_ids: HashSet<EntityId> = draft.stages.iter().map(|s| s.id).collect();

    let mut stage_transitions = Vec::with_capacity(draft.transitions.len());
    let mut sent_transitions = Vec::with_capacity(draft.transitions.len());
    let mut dropped = Vec::new();

    for transition in &draft.transitions {
        match transition_to_wire(transition, &stage_ids) {
            Ok(wire) => {
                stage_transitions.push(wire);
                sent_transitions.push(transition.id);
            }
            Err(reason) => dropped.push(UnsendableTransition {
                transition_id: transition.id,
                label: transition.label.clone(),
                reason,
            }),
        }
    }

    if !dropped.is_empty() {
        match policy {
            TransitionPolicy::Reject => return Err(MappingError::UnsendableTransitions(dropped)),
            TransitionPolicy::DropAndWarn => {
                for skipped in &dropped {
                    warn!(
                        transition_id = %skipped.transition_id,
                        label = %skipped.label,
                        reason = %skipped.reason,
                        "Excluding stage transition from save request"
                    );
                }
            }
        }
    }

    Ok(SaveOutcome {
        request: SaveRequest {
            stages,
            stage_transitions,
        },
        sent_transitions,
        dropped,
    })
}

fn stage_to_wire(stage: &Stage) -> StageWire {
    StageWire {
        id: stage.id.real(),
        name: stage.name.clone(),
        is_initial: stage.is_initial,
        visibility_condition: stage.visibility_condition.clone(),
        visibility_conditions: None,
        access_rule: access_rule_to_wire(&stage.id, &stage.access_rule),
        sections: stage.sections.iter().map(section_to_wire).collect(),
    }
}

fn access_rule_to_wire(stage_id: &EntityId, rule: &AccessRule) -> AccessRuleWire {
    let email_field_id = rule.email_field_id.and_then(|field_id| {
        let real = field_id.real();
        if real.is_none() {
            debug!(stage_id = %stage_id, field_id = %field_id, "Omitting email field reference to unsaved field");
        }
        real
    });

    AccessRuleWire {
        allowed_users: rule.allowed_users.clone(),
        allowed_roles: rule.allowed_roles.clone(),
        allowed_permissions: rule.allowed_permissions.clone(),
        allow_all_authenticated: rule.allow_all_authenticated,
        email_field_id,
    }
}

fn section_to_wire(section: &Section) -> SectionWire {
    SectionWire {
        id: section.id.real(),
        stage_id: section.stage_id.real(),
        name: section.name.clone(),
        order: section.order,
        visibility_condition: section.visibility_condition.clone(),
        visibility_conditions: None,
        fields: section.fields.iter().map(field_to_wire).collect(),
    }
}

fn field_to_wire(field: &Field) -> FieldWire {
    FieldWire {
        id: field.id.real(),
        section_id: field.section_id.real(),
        field_type_id: field.field_type_id,
        label: field.label.clone(),
        placeholder: field.placeholder.clone(),
        helper_text: field.helper_text.clone(),
        default_value: field.default_value.clone(),
        visibility_condition: field.visibility_condition.clone(),
        visibility_conditions: None,
        rules: field.rules.clone(),
    }
}

fn transition_to_wire(
    transition: &Transition,
    stage_ids: &HashSet<EntityId>,
) -> Result<TransitionWire, UnsendableReason> {
    let from = transition.from_stage_id;
    if !stage_ids.contains(&from) {
        return Err(UnsendableReason::MissingSource);
    }
    let from_stage_id = from.real().ok_or(UnsendableReason::TemporarySource)?;

    let to_stage_id = match transition.to_stage_id {
        Some(to) if !stage_ids.contains(&to) => return Err(UnsendableReason::MissingDestination),
        Some(to) => Some(to.real().ok_or(UnsendableReason::TemporaryDestination)?),
        None => None,
    };

    let actions = transition
        .actions
        .iter()
        .map(encode_action)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| UnsendableReason::Encoding {
            message: e.to_string(),
        })?;

    Ok(TransitionWire {
        id: transition.id.real(),
        from_stage_id: Some(from_stage_id),
        to_stage_id,
        label: transition.label.clone(),
        condition: transition.condition.clone(),
        is_final: transition.is_final,
        actions,
    })
}
