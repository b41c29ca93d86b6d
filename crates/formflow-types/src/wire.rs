//! Backend wire format.
//!
//! These structs mirror the JSON exchanged with the form-version API. Every
//! identifier here is a real backend id; an `id` key is omitted entirely for
//! entities the backend has not persisted yet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::form::Rule;

// ---------------------------------------------------------------------------
// Form version (inbound)
// ---------------------------------------------------------------------------

/// A versioned form definition as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormVersion {
    pub id: i64,
    pub form_id: i64,
    #[serde(default)]
    pub version_number: i32,
    #[serde(default)]
    pub status: VersionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stages: Vec<StageWire>,
    #[serde(default)]
    pub stage_transitions: Vec<TransitionWire>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionStatus::Draft => write!(f, "draft"),
            VersionStatus::Published => write!(f, "published"),
            VersionStatus::Archived => write!(f, "archived"),
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Stage as exchanged with the backend.
///
/// `visibility_conditions` is the legacy spelling of the condition key. It is
/// accepted on input and never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub is_initial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_condition: Option<String>,
    #[serde(default, skip_serializing)]
    pub visibility_conditions: Option<String>,
    #[serde(default)]
    pub access_rule: AccessRuleWire,
    #[serde(default)]
    pub sections: Vec<SectionWire>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRuleWire {
    #[serde(default)]
    pub allowed_users: Vec<i64>,
    #[serde(default)]
    pub allowed_roles: Vec<String>,
    #[serde(default)]
    pub allowed_permissions: Vec<String>,
    #[serde(default)]
    pub allow_all_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_field_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_condition: Option<String>,
    #[serde(default, skip_serializing)]
    pub visibility_conditions: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<i64>,
    pub field_type_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_condition: Option<String>,
    #[serde(default, skip_serializing)]
    pub visibility_conditions: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Stage transition as exchanged with the backend.
///
/// `from_stage_id` is always present in outgoing requests; it is optional
/// here only so a malformed inbound transition can be skipped on its own
/// instead of failing the whole form version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_stage_id: Option<i64>,
    #[serde(default)]
    pub to_stage_id: Option<i64>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub actions: Vec<ActionWire>,
}

/// An action in wire form: a type tag plus its property object.
///
/// Older backend revisions sent `action_props` as a JSON-encoded string and
/// used camelCase keys; both are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionWire {
    #[serde(alias = "actionType")]
    pub action_type: String,
    #[serde(default, alias = "actionProps")]
    pub action_props: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Requests / responses
// ---------------------------------------------------------------------------

/// Body of `update_form_version`. The backend echoes accepted data back in
/// the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub stages: Vec<StageWire>,
    #[serde(default)]
    pub stage_transitions: Vec<TransitionWire>,
}

/// Response of `publish_form_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedVersion {
    pub id: i64,
    pub status: VersionStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub version_number: i32,
}

/// Body of `create_form_version`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVersionOptions {
    #[serde(default)]
    pub copy_from_current: bool,
}
