use formflow_types::draft::Draft;
use formflow_types::form::{Action, ActionType, Transition};
use formflow_types::id::EntityId;

use super::{Missing, Outcome};
use crate::builder::defaults::default_action;

fn transition_mut<'a>(draft: &'a mut Draft, transition_id: &EntityId) -> Result<&'a mut Transition, Outcome> {
    draft
        .transition_mut(transition_id)
        .ok_or(Outcome::Missing(Missing::Transition(*transition_id)))
}

fn missing_action(transition_id: &EntityId, index: usize) -> Outcome {
    Outcome::Missing(Missing::Action {
        transition_id: *transition_id,
        index,
    })
}

pub(super) fn add(draft: &mut Draft, transition_id: &EntityId, action_type: ActionType) -> Outcome {
    match transition_mut(draft, transition_id) {
        Ok(transition) => {
            transition.actions.push(default_action(action_type));
            Outcome::Applied
        }
        Err(missing) => missing,
    }
}

pub(super) fn update(draft: &mut Draft, transition_id: &EntityId, index: usize, action: Action) -> Outcome {
    let transition = match transition_mut(draft, transition_id) {
        Ok(transition) => transition,
        Err(missing) => return missing,
    };
    match transition.actions.get_mut(index) {
        Some(slot) => {
            *slot = action;
            Outcome::Applied
        }
        None => missing_action(transition_id, index),
    }
}

pub(super) fn remove(draft: &mut Draft, transition_id: &EntityId, index: usize) -> Outcome {
    let transition = match transition_mut(draft, transition_id) {
        Ok(transition) => transition,
        Err(missing) => return missing,
    };
    if index >= transition.actions.len() {
        return missing_action(transition_id, index);
    }
    transition.actions.remove(index);
    Outcome::Applied
}

/// Move the action at `from` so it ends up at position `to`.
pub(super) fn move_to(draft: &mut Draft, transition_id: &EntityId, from: usize, to: usize) -> Outcome {
    let transition = match transition_mut(draft, transition_id) {
        Ok(transition) => transition,
        Err(missing) => return missing,
    };
    let len = transition.actions.len();
    if from >= len {
        return missing_action(transition_id, from);
    }
    if to >= len {
        return missing_action(transition_id, to);
    }

    let action = transition.actions.remove(from);
    transition.actions.insert(to, action);
    Outcome::Applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{stage, transition};
    use formflow_types::form::{HttpMethod, WebhookProps};

    fn draft_with_transition() -> (Draft, EntityId) {
        let mut draft = Draft::empty();
        let a = stage::create(&mut draft, None).created_id().unwrap();
        let t = transition::create(&mut draft, a, None).created_id().unwrap();
        (draft, t)
    }

    fn types(draft: &Draft, t: &EntityId) -> Vec<ActionType> {
        draft
            .transition(t)
            .unwrap()
            .actions
            .iter()
            .filter_map(Action::action_type)
            .collect()
    }

    #[test]
    fn test_add_uses_type_defaults() {
        let (mut draft, t) = draft_with_transition();
        add(&mut draft, &t, ActionType::Webhook);

        match &draft.transition(&t).unwrap().actions[0] {
            Action::Webhook(props) => assert_eq!(props.method, HttpMethod::Post),
            other => panic!("expected webhook, got {other:?}"),
        }
    }

    #[test]
    fn test_update_and_remove() {
        let (mut draft, t) = draft_with_transition();
        add(&mut draft, &t, ActionType::Webhook);

        let replacement = Action::Webhook(WebhookProps {
            url: "https://hooks.example.com/a".into(),
            ..WebhookProps::default()
        });
        assert_eq!(update(&mut draft, &t, 0, replacement.clone()), Outcome::Applied);
        assert_eq!(draft.transition(&t).unwrap().actions[0], replacement);

        assert_eq!(update(&mut draft, &t, 3, replacement), missing_action(&t, 3));
        assert_eq!(remove(&mut draft, &t, 0), Outcome::Applied);
        assert!(draft.transition(&t).unwrap().actions.is_empty());
    }

    #[test]
    fn test_move_reorders() {
        let (mut draft, t) = draft_with_transition();
        add(&mut draft, &t, ActionType::Notify);
        add(&mut draft, &t, ActionType::Email);
        add(&mut draft, &t, ActionType::Webhook);

        move_to(&mut draft, &t, 0, 2);
        assert_eq!(
            types(&draft, &t),
            vec![ActionType::Email, ActionType::Webhook, ActionType::Notify]
        );

        assert_eq!(move_to(&mut draft, &t, 0, 5), missing_action(&t, 5));
    }
}
