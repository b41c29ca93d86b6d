//! Draft mutations.
//!
//! Every change to a [`Draft`] is expressed as a [`DraftAction`] and applied
//! by [`reduce`]. Each call is one atomic state transition: cross-entity
//! invariants (exactly one initial stage, the selection focus cascade) are
//! restored before it returns.
//!
//! Addressing an entity that no longer exists is not an error. The reducer
//! logs a warning, leaves the draft untouched and reports
//! [`Outcome::Missing`].

mod action;
mod field;
mod section;
pub mod selection;
mod stage;
pub mod store;
mod transition;

use serde::{Deserialize, Serialize};
use tracing::warn;

use formflow_types::draft::Draft;
use formflow_types::form::{Action, ActionType, Field, Rule, Section, Stage};
use formflow_types::id::EntityId;

use crate::builder::defaults::{FieldOverrides, FieldTypeRegistry};

pub use store::DraftStore;
pub use transition::TransitionPatch;

/// A single editor operation on the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DraftAction {
    // -- stages --------------------------------------------------------------
    CreateStage {
        #[serde(default)]
        name: Option<String>,
    },
    UpdateStage {
        stage: Stage,
    },
    DeleteStage {
        stage_id: EntityId,
    },

    // -- sections ------------------------------------------------------------
    CreateSection {
        stage_id: EntityId,
        #[serde(default)]
        name: Option<String>,
    },
    UpdateSection {
        stage_id: EntityId,
        section: Section,
    },
    DeleteSection {
        stage_id: EntityId,
        section_id: EntityId,
    },
    ReorderSections {
        stage_id: EntityId,
        sections: Vec<Section>,
    },

    // -- fields --------------------------------------------------------------
    CreateField {
        stage_id: EntityId,
        section_id: EntityId,
        field_type_id: i64,
        #[serde(default)]
        overrides: FieldOverrides,
    },
    UpdateField {
        stage_id: EntityId,
        section_id: EntityId,
        field: Field,
    },
    DeleteField {
        stage_id: EntityId,
        section_id: EntityId,
        field_id: EntityId,
    },
    ReorderFields {
        stage_id: EntityId,
        section_id: EntityId,
        fields: Vec<Field>,
    },
    UpsertRule {
        stage_id: EntityId,
        section_id: EntityId,
        field_id: EntityId,
        rule: Rule,
    },
    RemoveRule {
        stage_id: EntityId,
        section_id: EntityId,
        field_id: EntityId,
        rule_id: i64,
    },

    // -- transitions ---------------------------------------------------------
    CreateTransition {
        from_stage_id: EntityId,
        #[serde(default)]
        to_stage_id: Option<EntityId>,
    },
    UpdateTransition {
        transition_id: EntityId,
        patch: TransitionPatch,
    },
    DeleteTransition {
        transition_id: EntityId,
    },

    // -- actions -------------------------------------------------------------
    AddAction {
        transition_id: EntityId,
        action_type: ActionType,
    },
    UpdateAction {
        transition_id: EntityId,
        index: usize,
        action: Action,
    },
    RemoveAction {
        transition_id: EntityId,
        index: usize,
    },
    MoveAction {
        transition_id: EntityId,
        from: usize,
        to: usize,
    },

    // -- selection -----------------------------------------------------------
    SelectStage {
        stage_id: Option<EntityId>,
    },
    SelectSection {
        section_id: Option<EntityId>,
    },
    SelectField {
        field_id: Option<EntityId>,
    },
    SelectTransition {
        transition_id: Option<EntityId>,
    },
}

impl DraftAction {
    /// Selection changes are not content changes: they neither dirty the
    /// draft nor bump its revision.
    pub fn is_selection(&self) -> bool {
        matches!(
            self,
            DraftAction::SelectStage { .. }
                | DraftAction::SelectSection { .. }
                | DraftAction::SelectField { .. }
                | DraftAction::SelectTransition { .. }
        )
    }
}

/// Result of applying a [`DraftAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// A new entity was created with this (temporary) id.
    Created(EntityId),
    /// The addressed entity does not exist; nothing changed.
    Missing(Missing),
}

impl Outcome {
    pub fn is_missing(&self) -> bool {
        matches!(self, Outcome::Missing(_))
    }

    pub fn created_id(&self) -> Option<EntityId> {
        match self {
            Outcome::Created(id) => Some(*id),
            _ => None,
        }
    }
}

/// The entity a failed lookup was looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Stage(EntityId),
    Section(EntityId),
    Field(EntityId),
    Rule { field_id: EntityId, rule_id: i64 },
    Transition(EntityId),
    Action { transition_id: EntityId, index: usize },
}

/// Apply one action to the draft.
pub fn reduce(draft: &mut Draft, action: DraftAction, registry: &FieldTypeRegistry) -> Outcome {
    let content_change = !action.is_selection();

    let outcome = match action {
        DraftAction::CreateStage { name } => stage::create(draft, name),
        DraftAction::UpdateStage { stage } => stage::update(draft, stage),
        DraftAction::DeleteStage { stage_id } => stage::delete(draft, &stage_id),

        DraftAction::CreateSection { stage_id, name } => section::create(draft, &stage_id, name),
        DraftAction::UpdateSection { stage_id, section } => section::update(draft, &stage_id, section),
        DraftAction::DeleteSection { stage_id, section_id } => {
            section::delete(draft, &stage_id, &section_id)
        }
        DraftAction::ReorderSections { stage_id, sections } => {
            section::reorder(draft, &stage_id, sections)
        }

        DraftAction::CreateField {
            stage_id,
            section_id,
            field_type_id,
            overrides,
        } => field::create(draft, registry, &stage_id, &section_id, field_type_id, overrides),
        DraftAction::UpdateField {
            stage_id,
            section_id,
            field,
        } => field::update(draft, &stage_id, &section_id, field),
        DraftAction::DeleteField {
            stage_id,
            section_id,
            field_id,
        } => field::delete(draft, &stage_id, &section_id, &field_id),
        DraftAction::ReorderFields {
            stage_id,
            section_id,
            fields,
        } => field::reorder(draft, &stage_id, &section_id, fields),
        DraftAction::UpsertRule {
            stage_id,
            section_id,
            field_id,
            rule,
        } => field::upsert_rule(draft, &stage_id, &section_id, &field_id, rule),
        DraftAction::RemoveRule {
            stage_id,
            section_id,
            field_id,
            rule_id,
        } => field::remove_rule(draft, &stage_id, &section_id, &field_id, rule_id),

        DraftAction::CreateTransition {
            from_stage_id,
            to_stage_id,
        } => transition::create(draft, from_stage_id, to_stage_id),
        DraftAction::UpdateTransition { transition_id, patch } => {
            transition::update(draft, &transition_id, patch)
        }
        DraftAction::DeleteTransition { transition_id } => transition::delete(draft, &transition_id),

        DraftAction::AddAction {
            transition_id,
            action_type,
        } => action::add(draft, &transition_id, action_type),
        DraftAction::UpdateAction {
            transition_id,
            index,
            action,
        } => action::update(draft, &transition_id, index, action),
        DraftAction::RemoveAction { transition_id, index } => {
            action::remove(draft, &transition_id, index)
        }
        DraftAction::MoveAction {
            transition_id,
            from,
            to,
        } => action::move_to(draft, &transition_id, from, to),

        DraftAction::SelectStage { stage_id } => selection::select_stage(draft, stage_id),
        DraftAction::SelectSection { section_id } => selection::select_section(draft, section_id),
        DraftAction::SelectField { field_id } => selection::select_field(draft, field_id),
        DraftAction::SelectTransition { transition_id } => {
            selection::select_transition(draft, transition_id)
        }
    };

    match &outcome {
        Outcome::Missing(missing) => {
            warn!(?missing, "Draft action addressed an entity that does not exist, ignoring");
        }
        Outcome::Applied | Outcome::Created(_) => {
            if content_change {
                draft.status.dirty = true;
                draft.status.revision += 1;
                field::clear_dangling_email_fields(draft);
            }
            selection::repair(draft);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_types::form::{AccessRule, Transition};
    use serde_json::json;

    fn apply(draft: &mut Draft, action: DraftAction) -> Outcome {
        reduce(draft, action, &FieldTypeRegistry::builtin())
    }

    /// Stage -> section -> field, returning the three ids.
    fn scaffold(draft: &mut Draft) -> (EntityId, EntityId, EntityId) {
        let stage_id = apply(draft, DraftAction::CreateStage { name: Some("A".into()) })
            .created_id()
            .unwrap();
        let section_id = apply(draft, DraftAction::CreateSection { stage_id, name: None })
            .created_id()
            .unwrap();
        let field_id = apply(
            draft,
            DraftAction::CreateField {
                stage_id,
                section_id,
                field_type_id: 1,
                overrides: FieldOverrides::default(),
            },
        )
        .created_id()
        .unwrap();
        (stage_id, section_id, field_id)
    }

    fn initial_count(draft: &Draft) -> usize {
        draft.stages.iter().filter(|s| s.is_initial).count()
    }

    #[test]
    fn test_content_changes_mark_dirty_and_bump_revision() {
        let mut draft = Draft::empty();
        apply(&mut draft, DraftAction::CreateStage { name: None });
        assert!(draft.status.dirty);
        assert_eq!(draft.status.revision, 1);

        draft.status.dirty = false;
        let stage_id = draft.stages[0].id;
        apply(&mut draft, DraftAction::SelectStage { stage_id: Some(stage_id) });
        assert!(!draft.status.dirty);
        assert_eq!(draft.status.revision, 1);
    }

    #[test]
    fn test_missing_entity_is_a_no_op() {
        let mut draft = Draft::empty();
        let (stage_id, _, _) = scaffold(&mut draft);
        let before = draft.clone();

        let ghost = EntityId::Real(404);
        let outcome = apply(&mut draft, DraftAction::DeleteSection { stage_id, section_id: ghost });
        assert_eq!(outcome, Outcome::Missing(Missing::Section(ghost)));
        assert_eq!(draft, before);

        let outcome = apply(&mut draft, DraftAction::DeleteStage { stage_id: ghost });
        assert_eq!(outcome, Outcome::Missing(Missing::Stage(ghost)));
        assert_eq!(draft, before);
    }

    // -- single-initial invariant ------------------------------------------

    #[test]
    fn test_single_initial_across_operation_sequences() {
        let mut draft = Draft::empty();
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(apply(&mut draft, DraftAction::CreateStage { name: None }).created_id().unwrap());
            assert_eq!(initial_count(&draft), 1);
        }

        for &id in &ids[1..3] {
            let mut stage = draft.stage(&id).unwrap().clone();
            stage.is_initial = true;
            apply(&mut draft, DraftAction::UpdateStage { stage });
            assert_eq!(initial_count(&draft), 1);
            assert!(draft.stage(&id).unwrap().is_initial);
        }

        // Clearing the flag on the only initial stage re-establishes one
        let mut stage = draft.stage(&ids[2]).unwrap().clone();
        stage.is_initial = false;
        apply(&mut draft, DraftAction::UpdateStage { stage });
        assert_eq!(initial_count(&draft), 1);

        for id in ids {
            apply(&mut draft, DraftAction::DeleteStage { stage_id: id });
            assert!(initial_count(&draft) <= 1);
            if !draft.stages.is_empty() {
                assert_eq!(initial_count(&draft), 1);
            }
        }
        assert!(draft.stages.is_empty());
    }

    #[test]
    fn test_update_second_stage_to_initial() {
        let mut draft = Draft::empty();
        apply(&mut draft, DraftAction::CreateStage { name: Some("First".into()) });
        apply(&mut draft, DraftAction::CreateStage { name: Some("Second".into()) });
        assert!(draft.stages[0].is_initial);

        let mut second = draft.stages[1].clone();
        second.is_initial = true;
        assert_eq!(apply(&mut draft, DraftAction::UpdateStage { stage: second }), Outcome::Applied);

        assert!(draft.stages[1].is_initial);
        assert!(!draft.stages[0].is_initial);
    }

    // -- selection -----------------------------------------------------------

    #[test]
    fn test_selection_cascade() {
        let mut draft = Draft::empty();
        let (stage_id, section_id, field_id) = scaffold(&mut draft);

        apply(&mut draft, DraftAction::SelectStage { stage_id: Some(stage_id) });
        apply(&mut draft, DraftAction::SelectSection { section_id: Some(section_id) });
        apply(&mut draft, DraftAction::SelectField { field_id: Some(field_id) });
        assert_eq!(draft.selection.field_id, Some(field_id));

        // Selecting a section keeps the stage and clears the field
        apply(&mut draft, DraftAction::SelectSection { section_id: Some(section_id) });
        assert_eq!(draft.selection.stage_id, Some(stage_id));
        assert_eq!(draft.selection.section_id, Some(section_id));
        assert_eq!(draft.selection.field_id, None);

        // Selecting a stage clears section and field
        apply(&mut draft, DraftAction::SelectField { field_id: Some(field_id) });
        apply(&mut draft, DraftAction::SelectStage { stage_id: Some(stage_id) });
        assert_eq!(draft.selection.section_id, None);
        assert_eq!(draft.selection.field_id, None);
    }

    #[test]
    fn test_delete_selected_section_clears_section_and_field() {
        let mut draft = Draft::empty();
        let (stage_id, section_id, field_id) = scaffold(&mut draft);
        apply(&mut draft, DraftAction::SelectStage { stage_id: Some(stage_id) });
        apply(&mut draft, DraftAction::SelectSection { section_id: Some(section_id) });
        apply(&mut draft, DraftAction::SelectField { field_id: Some(field_id) });

        apply(&mut draft, DraftAction::DeleteSection { stage_id, section_id });

        assert_eq!(draft.selection.section_id, None);
        assert_eq!(draft.selection.field_id, None);
        assert_eq!(draft.selection.stage_id, Some(stage_id));
        assert!(draft.find_field(&field_id).is_none());
        assert!(draft.find_section(&section_id).is_none());
    }

    #[test]
    fn test_delete_unselected_entity_leaves_selection() {
        let mut draft = Draft::empty();
        let (stage_id, section_id, field_id) = scaffold(&mut draft);
        let other_section = apply(&mut draft, DraftAction::CreateSection { stage_id, name: None })
            .created_id()
            .unwrap();
        apply(&mut draft, DraftAction::SelectStage { stage_id: Some(stage_id) });
        apply(&mut draft, DraftAction::SelectSection { section_id: Some(section_id) });
        apply(&mut draft, DraftAction::SelectField { field_id: Some(field_id) });
        let selection = draft.selection.clone();

        apply(&mut draft, DraftAction::DeleteSection { stage_id, section_id: other_section });
        assert_eq!(draft.selection, selection);
    }

    #[test]
    fn test_delete_selected_field_clears_field_only() {
        let mut draft = Draft::empty();
        let (stage_id, section_id, field_id) = scaffold(&mut draft);
        apply(&mut draft, DraftAction::SelectStage { stage_id: Some(stage_id) });
        apply(&mut draft, DraftAction::SelectSection { section_id: Some(section_id) });
        apply(&mut draft, DraftAction::SelectField { field_id: Some(field_id) });

        apply(&mut draft, DraftAction::DeleteField { stage_id, section_id, field_id });
        assert_eq!(draft.selection.field_id, None);
        assert_eq!(draft.selection.section_id, Some(section_id));
    }

    #[test]
    fn test_delete_selected_stage_clears_descendants() {
        let mut draft = Draft::empty();
        let (first, section_id, _) = scaffold(&mut draft);
        let second = apply(&mut draft, DraftAction::CreateStage { name: None }).created_id().unwrap();
        apply(&mut draft, DraftAction::SelectStage { stage_id: Some(first) });
        apply(&mut draft, DraftAction::SelectSection { section_id: Some(section_id) });

        apply(&mut draft, DraftAction::DeleteStage { stage_id: first });
        assert_eq!(draft.selection.stage_id, Some(second));
        assert_eq!(draft.selection.section_id, None);
        assert_eq!(draft.selection.field_id, None);
        assert!(draft.stages[0].is_initial);
    }

    // -- reorder -------------------------------------------------------------

    #[test]
    fn test_reorder_in_current_order_is_idempotent() {
        let mut draft = Draft::empty();
        let (stage_id, section_id, _) = scaffold(&mut draft);
        apply(&mut draft, DraftAction::CreateSection { stage_id, name: None });
        apply(
            &mut draft,
            DraftAction::CreateField {
                stage_id,
                section_id,
                field_type_id: 4,
                overrides: FieldOverrides::default(),
            },
        );
        let before = draft.clone();

        let sections = draft.stage(&stage_id).unwrap().sections.clone();
        apply(&mut draft, DraftAction::ReorderSections { stage_id, sections });
        let fields = draft.section(&stage_id, &section_id).unwrap().fields.clone();
        apply(&mut draft, DraftAction::ReorderFields { stage_id, section_id, fields });

        assert!(draft.content_eq(&before));
        assert!(draft.status.dirty);
    }

    // -- transitions ---------------------------------------------------------

    #[test]
    fn test_create_transition_between_temporary_stages() {
        let mut draft = Draft::empty();
        let a = apply(&mut draft, DraftAction::CreateStage { name: Some("A".into()) })
            .created_id()
            .unwrap();
        let b = apply(&mut draft, DraftAction::CreateStage { name: Some("B".into()) })
            .created_id()
            .unwrap();
        assert!(draft.stage(&a).unwrap().is_initial);
        assert_eq!(draft.selection.stage_id, Some(a));

        let t = apply(
            &mut draft,
            DraftAction::CreateTransition {
                from_stage_id: a,
                to_stage_id: Some(b),
            },
        )
        .created_id()
        .unwrap();

        let transition: &Transition = draft.transition(&t).unwrap();
        assert!(t.is_temporary());
        assert!(transition.actions.is_empty());
        assert!(!transition.is_final);
    }

    #[test]
    fn test_actions_deserialize_from_json() {
        let action: DraftAction = serde_json::from_value(json!({
            "op": "update_stage",
            "stage": {
                "id": 3,
                "name": "Review",
                "is_initial": true,
                "access_rule": AccessRule::default(),
                "sections": []
            }
        }))
        .unwrap();
        assert!(matches!(action, DraftAction::UpdateStage { ref stage } if stage.id == EntityId::Real(3)));

        let action: DraftAction = serde_json::from_value(json!({"op": "create_stage"})).unwrap();
        assert_eq!(action, DraftAction::CreateStage { name: None });
        assert!(!action.is_selection());
    }
}
