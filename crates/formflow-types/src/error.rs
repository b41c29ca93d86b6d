use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::EntityId;

/// Normalized failure of a call to the form-version backend.
///
/// Network-level failures (no response) carry
/// [`ServiceError::NETWORK_FAILURE_STATUS`]; HTTP failures carry the real
/// status; client-side validation failures carry no status.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceError {
    /// Status sentinel for requests that never got a response.
    pub const NETWORK_FAILURE_STATUS: u16 = 0;

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: Some(Self::NETWORK_FAILURE_STATUS),
            details: None,
        }
    }

    pub fn http(status: u16, message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status),
            details,
        }
    }

    pub fn validation(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            details,
        }
    }

    pub fn is_network(&self) -> bool {
        self.status_code == Some(Self::NETWORK_FAILURE_STATUS)
    }
}

impl From<MappingError> for ServiceError {
    fn from(err: MappingError) -> Self {
        let details = match &err {
            MappingError::UnsendableTransitions(list) => serde_json::to_value(list).ok(),
            _ => None,
        };
        ServiceError::validation(err.to_string(), details)
    }
}

/// Errors raised while translating between the wire format and a draft.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: i64 },

    #[error("{kind} {id} claims owner {found} but is nested under {expected}")]
    OwnerMismatch {
        kind: &'static str,
        id: String,
        expected: i64,
        found: i64,
    },

    #[error("transition {transition} is invalid: {reason}")]
    InvalidTransition { transition: String, reason: String },

    #[error("{} transition(s) cannot be sent", .0.len())]
    UnsendableTransitions(Vec<UnsendableTransition>),
}

/// A transition that cannot be represented in an outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsendableTransition {
    pub transition_id: EntityId,
    pub label: String,
    pub reason: UnsendableReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnsendableReason {
    /// Source stage has not been persisted.
    TemporarySource,
    /// Destination stage has not been persisted.
    TemporaryDestination,
    /// Source stage no longer exists in the draft.
    MissingSource,
    /// Destination stage no longer exists in the draft.
    MissingDestination,
    /// An action failed to encode.
    Encoding { message: String },
}

impl UnsendableReason {
    /// The transition becomes sendable once its stages have backend ids.
    pub fn awaits_stage_ids(&self) -> bool {
        matches!(
            self,
            UnsendableReason::TemporarySource | UnsendableReason::TemporaryDestination
        )
    }
}

impl fmt::Display for UnsendableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsendableReason::TemporarySource => write!(f, "source stage is not saved yet"),
            UnsendableReason::TemporaryDestination => {
                write!(f, "destination stage is not saved yet")
            }
            UnsendableReason::MissingSource => write!(f, "source stage was deleted"),
            UnsendableReason::MissingDestination => write!(f, "destination stage was deleted"),
            UnsendableReason::Encoding { message } => write!(f, "action encoding failed: {message}"),
        }
    }
}
