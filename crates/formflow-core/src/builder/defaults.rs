//! Default values for newly created entities.
//!
//! Field creation merges three layers: base defaults < field-type defaults
//! (from the [`FieldTypeRegistry`]) < caller overrides. Action creation
//! looks the action type up in [`ACTION_DEFAULTS`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use formflow_types::form::{
    Action, ActionType, EmailProps, Field, NotifyProps, Rule, SetFieldValueProps, WebhookProps,
};
use formflow_types::id::EntityId;

use super::ids::new_temporary_id;

pub const DEFAULT_STAGE_NAME: &str = "New stage";
pub const DEFAULT_SECTION_NAME: &str = "New section";
pub const DEFAULT_TRANSITION_LABEL: &str = "Continue";
pub const DEFAULT_FIELD_LABEL: &str = "New field";

// ---------------------------------------------------------------------------
// Field-type registry
// ---------------------------------------------------------------------------

/// Default presentation text for one field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTypeDefaults {
    /// Registry key, e.g. "email".
    pub key: String,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub helper_text: Option<String>,
}

impl FieldTypeDefaults {
    fn new(key: &str, label: &str, placeholder: Option<&str>, helper_text: Option<&str>) -> Self {
        Self {
            key: key.to_string(),
            label: Some(label.to_string()),
            placeholder: placeholder.map(str::to_string),
            helper_text: helper_text.map(str::to_string),
        }
    }
}

/// Mapping from numeric field-type id to its creation defaults.
///
/// The editors and renderers for each type live outside the core; the
/// registry only carries what is needed to pre-fill a new field. Unknown
/// type ids are allowed and fall back to base defaults.
#[derive(Debug, Clone, Default)]
pub struct FieldTypeRegistry {
    types: HashMap<i64, FieldTypeDefaults>,
}

impl FieldTypeRegistry {
    /// An empty registry: every field gets base defaults only.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in catalog of common field types.
    pub fn builtin() -> Self {
        let entries = [
            (1, FieldTypeDefaults::new("short_text", "Short answer", Some("Enter text"), None)),
            (2, FieldTypeDefaults::new("long_text", "Long answer", Some("Type your answer"), None)),
            (3, FieldTypeDefaults::new("number", "Number", Some("0"), None)),
            (
                4,
                FieldTypeDefaults::new(
                    "email",
                    "Email address",
                    Some("name@example.com"),
                    Some("We will only use this to contact you about this form"),
                ),
            ),
            (5, FieldTypeDefaults::new("phone", "Phone number", Some("+1 555 0100"), None)),
            (6, FieldTypeDefaults::new("date", "Date", Some("YYYY-MM-DD"), None)),
            (7, FieldTypeDefaults::new("time", "Time", Some("HH:MM"), None)),
            (8, FieldTypeDefaults::new("datetime", "Date and time", None, None)),
            (9, FieldTypeDefaults::new("dropdown", "Select an option", Some("Choose..."), None)),
            (
                10,
                FieldTypeDefaults::new(
                    "multi_select",
                    "Select options",
                    None,
                    Some("Select all that apply"),
                ),
            ),
            (11, FieldTypeDefaults::new("radio", "Choose one", None, None)),
            (12, FieldTypeDefaults::new("checkbox", "I agree", None, None)),
            (
                13,
                FieldTypeDefaults::new("file_upload", "Attachment", None, Some("Maximum size 10 MB")),
            ),
            (14, FieldTypeDefaults::new("signature", "Signature", None, Some("Sign inside the box"))),
            (15, FieldTypeDefaults::new("url", "Website", Some("https://"), None)),
            (16, FieldTypeDefaults::new("currency", "Amount", Some("0.00"), None)),
        ];

        Self {
            types: entries.into_iter().collect(),
        }
    }

    /// Register or replace the defaults for a field type.
    pub fn register(&mut self, field_type_id: i64, defaults: FieldTypeDefaults) {
        self.types.insert(field_type_id, defaults);
    }

    pub fn get(&self, field_type_id: i64) -> Option<&FieldTypeDefaults> {
        self.types.get(&field_type_id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Field construction
// ---------------------------------------------------------------------------

/// Caller-supplied values for a new field. `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOverrides {
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub helper_text: Option<String>,
    pub default_value: Option<String>,
    pub visibility_condition: Option<String>,
    pub rules: Option<Vec<Rule>>,
}

/// Build a new field with a temporary id.
///
/// Precedence: base defaults < type defaults < overrides.
pub fn build_field(
    registry: &FieldTypeRegistry,
    section_id: EntityId,
    field_type_id: i64,
    overrides: FieldOverrides,
) -> Field {
    let type_defaults = registry.get(field_type_id);

    let label = overrides
        .label
        .or_else(|| type_defaults.and_then(|d| d.label.clone()))
        .unwrap_or_else(|| DEFAULT_FIELD_LABEL.to_string());
    let placeholder = overrides
        .placeholder
        .or_else(|| type_defaults.and_then(|d| d.placeholder.clone()));
    let helper_text = overrides
        .helper_text
        .or_else(|| type_defaults.and_then(|d| d.helper_text.clone()));

    Field {
        id: new_temporary_id(),
        section_id,
        field_type_id,
        label: Some(label),
        placeholder,
        helper_text,
        default_value: overrides.default_value,
        visibility_condition: overrides.visibility_condition,
        rules: overrides.rules.unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Action defaults
// ---------------------------------------------------------------------------

fn notify_defaults() -> Action {
    Action::Notify(NotifyProps::default())
}

fn email_defaults() -> Action {
    Action::Email(EmailProps::default())
}

fn webhook_defaults() -> Action {
    Action::Webhook(WebhookProps::default())
}

fn set_field_value_defaults() -> Action {
    Action::SetFieldValue(SetFieldValueProps::default())
}

/// Default constructor for each action type.
pub const ACTION_DEFAULTS: [(ActionType, fn() -> Action); 4] = [
    (ActionType::Notify, notify_defaults),
    (ActionType::Email, email_defaults),
    (ActionType::Webhook, webhook_defaults),
    (ActionType::SetFieldValue, set_field_value_defaults),
];

/// A new action of the given type with its default properties.
pub fn default_action(action_type: ActionType) -> Action {
    ACTION_DEFAULTS
        .iter()
        .find(|(t, _)| *t == action_type)
        .map(|(_, make)| make())
        // every ActionType has an entry; see test_every_action_type_has_defaults
        .unwrap_or_else(notify_defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_types::form::HttpMethod;

    #[test]
    fn test_build_field_uses_type_defaults() {
        let registry = FieldTypeRegistry::builtin();
        let field = build_field(&registry, EntityId::Real(3), 4, FieldOverrides::default());

        assert!(field.id.is_temporary());
        assert_eq!(field.section_id, EntityId::Real(3));
        assert_eq!(field.label.as_deref(), Some("Email address"));
        assert_eq!(field.placeholder.as_deref(), Some("name@example.com"));
        assert!(field.helper_text.is_some());
        assert!(field.rules.is_empty());
    }

    #[test]
    fn test_build_field_overrides_win() {
        let registry = FieldTypeRegistry::builtin();
        let overrides = FieldOverrides {
            label: Some("Work email".to_string()),
            default_value: Some("ops@example.com".to_string()),
            ..Default::default()
        };
        let field = build_field(&registry, EntityId::Real(3), 4, overrides);

        assert_eq!(field.label.as_deref(), Some("Work email"));
        // Untouched keys still come from the type
        assert_eq!(field.placeholder.as_deref(), Some("name@example.com"));
        assert_eq!(field.default_value.as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn test_build_field_unknown_type_gets_base_defaults() {
        let registry = FieldTypeRegistry::builtin();
        let field = build_field(&registry, EntityId::Real(3), 999, FieldOverrides::default());

        assert_eq!(field.label.as_deref(), Some(DEFAULT_FIELD_LABEL));
        assert!(field.placeholder.is_none());
        assert!(field.helper_text.is_none());
    }

    #[test]
    fn test_register_replaces_type() {
        let mut registry = FieldTypeRegistry::empty();
        assert!(registry.is_empty());

        registry.register(
            40,
            FieldTypeDefaults::new("matrix", "Rate each item", None, Some("1 = worst")),
        );
        let field = build_field(&registry, EntityId::Real(1), 40, FieldOverrides::default());
        assert_eq!(field.label.as_deref(), Some("Rate each item"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_every_action_type_has_defaults() {
        for action_type in ActionType::ALL {
            assert_eq!(default_action(action_type).action_type(), Some(action_type));
        }
    }

    #[test]
    fn test_webhook_defaults() {
        match default_action(ActionType::Webhook) {
            Action::Webhook(props) => {
                assert_eq!(props.method, HttpMethod::Post);
                assert!(props.headers.is_empty());
                assert!(props.payload.is_none());
                assert_eq!(props.timeout_secs, 30);
            }
            other => panic!("expected webhook, got {other:?}"),
        }
    }
}
