//! Entity identifiers.
//!
//! Every stage, section, field and transition carries an [`EntityId`]: either
//! a real id assigned by the backend or a temporary id minted client-side for
//! an entity the backend has not seen yet. Temporary ids never leave the
//! client.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client-side placeholder identifier, wrapping a UUID v7.
///
/// UUID v7 combines a millisecond timestamp, a per-process monotonic counter
/// and random bits, so two ids minted in the same process never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(Uuid);

impl TempId {
    /// Mint a fresh temporary id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TempId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tmp:{}", self.0)
    }
}

/// Identifier of a draft entity.
///
/// Serializes untagged: real ids as JSON numbers, temporary ids as UUID
/// strings, so the two can never be confused on round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Assigned by the backend.
    Real(i64),
    /// Minted by the client, not yet persisted.
    Temporary(TempId),
}

impl EntityId {
    pub fn is_temporary(&self) -> bool {
        matches!(self, EntityId::Temporary(_))
    }

    pub fn is_real(&self) -> bool {
        matches!(self, EntityId::Real(_))
    }

    /// The backend id, if this entity has been persisted.
    pub fn real(&self) -> Option<i64> {
        match self {
            EntityId::Real(id) => Some(*id),
            EntityId::Temporary(_) => None,
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Real(id)
    }
}

impl From<TempId> for EntityId {
    fn from(id: TempId) -> Self {
        EntityId::Temporary(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Real(id) => write!(f, "{id}"),
            EntityId::Temporary(tmp) => tmp.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_and_temporary_are_distinguishable() {
        let real = EntityId::Real(7);
        let tmp = EntityId::Temporary(TempId::new());

        assert!(real.is_real());
        assert!(!real.is_temporary());
        assert_eq!(real.real(), Some(7));

        assert!(tmp.is_temporary());
        assert_eq!(tmp.real(), None);
    }

    #[test]
    fn test_serde_untagged_round_trip() {
        let real = EntityId::Real(42);
        assert_eq!(serde_json::to_string(&real).unwrap(), "42");

        let tmp = EntityId::Temporary(TempId::new());
        let json = serde_json::to_string(&tmp).unwrap();
        assert!(json.starts_with('"'));

        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tmp);
        let back: EntityId = serde_json::from_str("42").unwrap();
        assert_eq!(back, real);
    }

    #[test]
    fn test_display() {
        assert_eq!(EntityId::Real(3).to_string(), "3");
        let tmp = TempId::new();
        assert!(EntityId::from(tmp).to_string().starts_with("tmp:"));
    }
}
