use serde::{Deserialize, Deserializer, Serialize};

use formflow_types::draft::Draft;
use formflow_types::form::Transition;
use formflow_types::id::EntityId;

use super::{Missing, Outcome};
use crate::builder::defaults::DEFAULT_TRANSITION_LABEL;
use crate::builder::ids::new_temporary_id;

/// Partial change set for a transition. `None` leaves the attribute as is.
///
/// The nullable attributes use a nested option: `Some(None)` clears the
/// value. In JSON an absent key means "unchanged" and `null` means "clear".
/// Id and actions are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_stage_id: Option<EntityId>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub to_stage_id: Option<Option<EntityId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,
}

/// A key that is present (even as `null`) deserializes to `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Create a transition. Either endpoint may be temporary; sendability is
/// checked at save time.
pub(super) fn create(draft: &mut Draft, from_stage_id: EntityId, to_stage_id: Option<EntityId>) -> Outcome {
    if let Some(missing) = missing_stage(draft, Some(from_stage_id), to_stage_id) {
        return missing;
    }

    let id = new_temporary_id();
    draft.transitions.push(Transition {
        id,
        from_stage_id,
        to_stage_id,
        label: DEFAULT_TRANSITION_LABEL.to_string(),
        condition: None,
        is_final: false,
        actions: Vec::new(),
    });
    Outcome::Created(id)
}

pub(super) fn update(draft: &mut Draft, transition_id: &EntityId, patch: TransitionPatch) -> Outcome {
    if draft.transition(transition_id).is_none() {
        return Outcome::Missing(Missing::Transition(*transition_id));
    }
    if let Some(missing) = missing_stage(draft, patch.from_stage_id, patch.to_stage_id.flatten()) {
        return missing;
    }

    let Some(transition) = draft.transition_mut(transition_id) else {
        return Outcome::Missing(Missing::Transition(*transition_id));
    };
    if let Some(from) = patch.from_stage_id {
        transition.from_stage_id = from;
    }
    if let Some(to) = patch.to_stage_id {
        transition.to_stage_id = to;
    }
    if let Some(label) = patch.label {
        transition.label = label;
    }
    if let Some(condition) = patch.condition {
        transition.condition = condition;
    }
    if let Some(is_final) = patch.is_final {
        transition.is_final = is_final;
    }
    Outcome::Applied
}

pub(super) fn delete(draft: &mut Draft, transition_id: &EntityId) -> Outcome {
    let Some(index) = draft.transitions.iter().position(|t| t.id == *transition_id) else {
        return Outcome::Missing(Missing::Transition(*transition_id));
    };
    draft.transitions.remove(index);

    if draft.selection.transition_id == Some(*transition_id) {
        draft.selection.transition_id = None;
    }
    Outcome::Applied
}

fn missing_stage(draft: &Draft, from: Option<EntityId>, to: Option<EntityId>) -> Option<Outcome> {
    [from, to]
        .into_iter()
        .flatten()
        .find(|id| draft.stage(id).is_none())
        .map(|id| Outcome::Missing(Missing::Stage(id)))
}
