//! Translation between the backend wire format and the editable draft.
//!
//! - [`inbound`]: `FormVersion` -> `Draft`, normalizing legacy keys.
//! - [`outbound`]: `Draft` -> `SaveRequest`, stripping temporary ids and
//!   excluding transitions that cannot be sent.
//! - [`reconcile`]: swap temporary ids for the real ids the backend echoed
//!   back after a save.

mod actions;
pub mod inbound;
pub mod outbound;
pub mod reconcile;

pub use inbound::map_form_version_to_draft;
pub use outbound::{SaveOutcome, build_save_request};
pub use reconcile::{adopt_server_ids, apply_server_ids, server_id_map};
