//! Temporary identifier allocation.
//!
//! Entities created in the editor get a temporary id until the backend
//! assigns a real one. Temporary ids are never sent over the wire.

use formflow_types::id::{EntityId, TempId};

/// Mint a fresh temporary identifier.
pub fn new_temporary_id() -> EntityId {
    EntityId::Temporary(TempId::new())
}

/// Whether `id` was minted client-side and is unknown to the backend.
pub fn is_temporary(id: &EntityId) -> bool {
    id.is_temporary()
}
