//! Action encoding.
//!
//! On the wire an action is `{action_type, action_props}`. Older backend
//! revisions sent the props as a JSON-encoded string; decoding accepts both
//! and typed actions are always encoded with an object. Actions this client
//! cannot model are carried as [`Action::Unknown`] and re-emitted verbatim,
//! so a load/save cycle never rewrites them.

use tracing::debug;

use formflow_types::form::Action;
use formflow_types::wire::ActionWire;

pub(crate) fn decode_action(wire: &ActionWire) -> Action {
    let action = Action::from_wire(wire.clone());
    if action.is_unknown() {
        debug!(
            action_type = %wire.action_type,
            "Keeping action outside the catalog as-is"
        );
    }
    action
}

pub(crate) fn encode_action(action: &Action) -> Result<ActionWire, serde_json::Error> {
    action.to_wire()
}
