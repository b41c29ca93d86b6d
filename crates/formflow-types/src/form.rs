//! Draft entity types: the editable tree of a form version.
//!
//! Stages own sections, sections own fields, fields own rules. Transitions
//! live in a flat list next to the stages and reference them by id. Every
//! aggregate carries an [`EntityId`] that may be real or temporary.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::EntityId;
use crate::wire::ActionWire;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// A workflow step containing sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: EntityId,
    pub name: String,
    /// At most one stage per draft is initial.
    #[serde(default)]
    pub is_initial: bool,
    /// Opaque visibility expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_condition: Option<String>,
    #[serde(default)]
    pub access_rule: AccessRule,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Stage {
    /// Sections sorted by `order`, ties broken by array position.
    pub fn sections_in_display_order(&self) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self.sections.iter().collect();
        // sort_by_key is stable, so equal orders keep array position
        sections.sort_by_key(|s| s.order);
        sections
    }

    pub fn section(&self, id: &EntityId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == *id)
    }

    pub fn section_mut(&mut self, id: &EntityId) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == *id)
    }
}

/// Who may fill in a stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    #[serde(default)]
    pub allowed_users: Vec<i64>,
    #[serde(default)]
    pub allowed_roles: Vec<String>,
    #[serde(default)]
    pub allowed_permissions: Vec<String>,
    #[serde(default)]
    pub allow_all_authenticated: bool,
    /// Field whose value names the email address allowed to fill the stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_field_id: Option<EntityId>,
}

// ---------------------------------------------------------------------------
// Section / Field / Rule
// ---------------------------------------------------------------------------

/// A named grouping of fields within a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: EntityId,
    pub stage_id: EntityId,
    pub name: String,
    /// Display position within the stage. Need not be contiguous.
    #[serde(default)]
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_condition: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Section {
    pub fn field(&self, id: &EntityId) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == *id)
    }

    pub fn field_mut(&mut self, id: &EntityId) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id == *id)
    }
}

/// A single input definition within a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: EntityId,
    pub section_id: EntityId,
    /// Key into the field-type registry.
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
    /// At most one entry per `rule_id`.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A validation rule attached to a field. Stored, never executed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Reference into the external rule catalog.
    pub rule_id: i64,
    /// Rule parameters as a JSON-encoded string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    /// Expression deciding whether the rule applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

// ---------------------------------------------------------------------------
// Transition / Action
// ---------------------------------------------------------------------------

/// A directed edge between two stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub id: EntityId,
    pub from_stage_id: EntityId,
    /// `None` together with `is_final` marks a terminal edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_stage_id: Option<EntityId>,
    /// Button text.
    pub label: String,
    /// Guard expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Firing this transition completes the workflow.
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Transition {
    /// Whether the transition touches the given stage at either end.
    pub fn references_stage(&self, stage_id: &EntityId) -> bool {
        self.from_stage_id == *stage_id || self.to_stage_id.as_ref() == Some(stage_id)
    }
}

/// A side effect executed when a transition fires.
///
/// Serializes through [`ActionWire`] as
/// `{"action_type": "webhook", "action_props": {...}}`. Decoding never
/// fails: a type outside the catalog, or props the typed record cannot
/// hold, become [`Action::Unknown`] and are sent back exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ActionWire", into = "ActionWire")]
pub enum Action {
    Notify(NotifyProps),
    Email(EmailProps),
    Webhook(WebhookProps),
    SetFieldValue(SetFieldValueProps),
    Unknown {
        action_type: String,
        action_props: Value,
    },
}

impl Action {
    /// The catalog type, or `None` for an unknown action.
    pub fn action_type(&self) -> Option<ActionType> {
        match self {
            Action::Notify(_) => Some(ActionType::Notify),
            Action::Email(_) => Some(ActionType::Email),
            Action::Webhook(_) => Some(ActionType::Webhook),
            Action::SetFieldValue(_) => Some(ActionType::SetFieldValue),
            Action::Unknown { .. } => None,
        }
    }

    /// The type tag as it appears on the wire.
    pub fn type_name(&self) -> String {
        match self {
            Action::Unknown { action_type, .. } => action_type.clone(),
            typed => typed.action_type().map(|t| t.to_string()).unwrap_or_default(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Action::Unknown { .. })
    }

    /// Decode a wire action. Props may arrive as an object, as a
    /// JSON-encoded string (older backends) or as `null`.
    pub fn from_wire(wire: ActionWire) -> Action {
        let Ok(action_type) = wire.action_type.parse::<ActionType>() else {
            return Action::unknown(wire);
        };

        let props = match &wire.action_props {
            Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
                Ok(props) => props,
                Err(_) => return Action::unknown(wire),
            },
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };

        let typed = match action_type {
            ActionType::Notify => serde_json::from_value(props).map(Action::Notify),
            ActionType::Email => serde_json::from_value(props).map(Action::Email),
            ActionType::Webhook => serde_json::from_value(props).map(Action::Webhook),
            ActionType::SetFieldValue => serde_json::from_value(props).map(Action::SetFieldValue),
        };
        typed.unwrap_or_else(|_| Action::unknown(wire))
    }

    /// Encode for the wire. Typed props are always emitted as an object;
    /// unknown actions are emitted unchanged.
    pub fn to_wire(&self) -> Result<ActionWire, serde_json::Error> {
        let action_props = match self {
            Action::Notify(props) => serde_json::to_value(props)?,
            Action::Email(props) => serde_json::to_value(props)?,
            Action::Webhook(props) => serde_json::to_value(props)?,
            Action::SetFieldValue(props) => serde_json::to_value(props)?,
            Action::Unknown { action_props, .. } => action_props.clone(),
        };
        Ok(ActionWire {
            action_type: self.type_name(),
            action_props,
        })
    }

    fn unknown(wire: ActionWire) -> Action {
        Action::Unknown {
            action_type: wire.action_type,
            action_props: wire.action_props,
        }
    }
}

impl From<ActionWire> for Action {
    fn from(wire: ActionWire) -> Self {
        Action::from_wire(wire)
    }
}

impl From<Action> for ActionWire {
    fn from(action: Action) -> Self {
        action.to_wire().unwrap_or_else(|_| ActionWire {
            action_type: action.type_name(),
            action_props: Value::Null,
        })
    }
}

/// Tag of a catalog [`Action`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Notify,
    Email,
    Webhook,
    SetFieldValue,
}

impl ActionType {
    pub const ALL: [ActionType; 4] = [
        ActionType::Notify,
        ActionType::Email,
        ActionType::Webhook,
        ActionType::SetFieldValue,
    ];
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Notify => write!(f, "notify"),
            ActionType::Email => write!(f, "email"),
            ActionType::Webhook => write!(f, "webhook"),
            ActionType::SetFieldValue => write!(f, "set_field_value"),
        }
    }
}

/// Case-insensitive; `-` and `_` are interchangeable.
impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "notify" => Ok(ActionType::Notify),
            "email" | "send_email" => Ok(ActionType::Email),
            "webhook" | "call_webhook" => Ok(ActionType::Webhook),
            "set_field_value" => Ok(ActionType::SetFieldValue),
            other => Err(format!("unknown action type: '{other}'")),
        }
    }
}

/// In-app notification to users and/or roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyProps {
    pub user_ids: Vec<i64>,
    pub roles: Vec<String>,
    pub message: String,
    /// Keys this client does not model, kept for the round trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outgoing email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailProps {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Persisted field holding an additional recipient address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_field_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// HTTP call to an external endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookProps {
    pub url: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    pub timeout_secs: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WebhookProps {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
}

impl Default for WebhookProps {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: HttpMethod::Post,
            headers: BTreeMap::new(),
            payload: None,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

/// Write a value into a persisted field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetFieldValueProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_id: Option<i64>,
    pub value: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
