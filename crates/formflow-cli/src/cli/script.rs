//! Edit scripts: a JSON list of draft actions applied in order.
//!
//! ```json
//! [
//!   { "as": "review", "action": { "op": "create_stage", "name": "Review" } },
//!   { "action": { "op": "create_section", "stage_id": "@review", "name": "Details" } }
//! ]
//! ```
//!
//! A step with `as` names the entity it creates. Later steps refer to it as
//! `"@name"` in an id key (`stage_id`, `to_stage_id`, `id` and so on); the
//! reference is replaced with the entity's temporary id before the step is
//! decoded. Strings under any other key are left alone.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::Value;

use formflow_core::draft::{DraftAction, DraftStore, Missing, Outcome};
use formflow_types::id::EntityId;

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptStep {
    #[serde(default, rename = "as")]
    pub alias: Option<String>,
    pub action: Value,
}

/// What running a script did to the draft.
#[derive(Debug, Default)]
pub struct ScriptSummary {
    pub applied: usize,
    pub created: Vec<(String, EntityId)>,
    /// Steps whose target did not exist, by zero-based step index.
    pub missing: Vec<(usize, Missing)>,
}

pub async fn read_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read edit script {}", path.display()))?;
    parse_script(&content).with_context(|| format!("invalid edit script {}", path.display()))
}

pub fn parse_script(content: &str) -> Result<Vec<ScriptStep>> {
    Ok(serde_json::from_str(content)?)
}

/// Apply every step to the store. Decoding errors abort the run; steps
/// targeting missing entities are recorded and skipped.
pub fn run_script(store: &DraftStore, steps: Vec<ScriptStep>) -> Result<ScriptSummary> {
    let mut aliases: HashMap<String, EntityId> = HashMap::new();
    let mut summary = ScriptSummary::default();

    for (index, step) in steps.into_iter().enumerate() {
        let resolved = resolve_aliases(step.action, &aliases)
            .with_context(|| format!("step {index}"))?;
        let action: DraftAction = serde_json::from_value(resolved)
            .with_context(|| format!("step {index}: not a valid draft action"))?;

        match store.dispatch(action) {
            Outcome::Created(id) => {
                summary.applied += 1;
                if let Some(alias) = step.alias {
                    if aliases.insert(alias.clone(), id).is_some() {
                        bail!("step {index}: alias '@{alias}' is already defined");
                    }
                    summary.created.push((alias, id));
                }
            }
            Outcome::Applied => {
                summary.applied += 1;
                if let Some(alias) = step.alias {
                    bail!("step {index}: '@{alias}' names a step that creates nothing");
                }
            }
            Outcome::Missing(missing) => summary.missing.push((index, missing)),
        }
    }

    Ok(summary)
}

/// Keys whose string values are entity references.
const ID_KEYS: &[&str] = &[
    "id",
    "stage_id",
    "section_id",
    "field_id",
    "transition_id",
    "from_stage_id",
    "to_stage_id",
    "email_field_id",
];

/// Replace `"@alias"` values of id keys with the aliased id. Other strings
/// are content and pass through even when they start with `@`.
fn resolve_aliases(value: Value, aliases: &HashMap<String, EntityId>) -> Result<Value> {
    Ok(match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| resolve_aliases(item, aliases))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| {
                    let v = match v {
                        Value::String(s) if ID_KEYS.contains(&key.as_str()) => resolve_reference(s, aliases)?,
                        other => resolve_aliases(other, aliases)?,
                    };
                    Ok((key, v))
                })
                .collect::<Result<_>>()?,
        ),
        other => other,
    })
}

fn resolve_reference(s: String, aliases: &HashMap<String, EntityId>) -> Result<Value> {
    let Some(alias) = s.strip_prefix('@') else {
        return Ok(Value::String(s));
    };
    let id = aliases
        .get(alias)
        .ok_or_else(|| anyhow!("unknown alias '@{alias}'"))?;
    Ok(serde_json::to_value(id)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"[
        { "as": "intake", "action": { "op": "create_stage", "name": "Intake" } },
        { "as": "review", "action": { "op": "create_stage", "name": "Review" } },
        { "as": "details", "action": { "op": "create_section", "stage_id": "@intake", "name": "Details" } },
        { "action": { "op": "create_field", "stage_id": "@intake", "section_id": "@details", "field_type_id": 1 } },
        { "action": { "op": "create_transition", "from_stage_id": "@intake", "to_stage_id": "@review" } }
    ]"#;

    #[test]
    fn test_aliases_link_created_entities() {
        let store = DraftStore::create();
        let summary = run_script(&store, parse_script(SCRIPT).unwrap()).unwrap();

        assert_eq!(summary.applied, 5);
        assert!(summary.missing.is_empty());
        assert_eq!(summary.created.len(), 3);

        let draft = store.snapshot();
        let intake = draft.stages[0].id;
        let review = draft.stages[1].id;
        assert_eq!(draft.stages[0].sections[0].name, "Details");
        assert_eq!(draft.stages[0].sections[0].fields.len(), 1);
        assert_eq!(draft.transitions[0].from_stage_id, intake);
        assert_eq!(draft.transitions[0].to_stage_id, Some(review));
    }

    #[test]
    fn test_missing_targets_are_recorded() {
        let store = DraftStore::create();
        let steps = parse_script(r#"[{ "action": { "op": "delete_stage", "stage_id": 99 } }]"#).unwrap();

        let summary = run_script(&store, steps).unwrap();
        assert_eq!(summary.applied, 0);
        assert_eq!(summary.missing, vec![(0, Missing::Stage(EntityId::Real(99)))]);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_unknown_alias_is_an_error() {
        let store = DraftStore::create();
        let steps =
            parse_script(r#"[{ "action": { "op": "delete_stage", "stage_id": "@nope" } }]"#).unwrap();

        let err = run_script(&store, steps).unwrap_err();
        assert!(format!("{err:#}").contains("unknown alias '@nope'"));
    }

    #[test]
    fn test_invalid_action_is_an_error() {
        let store = DraftStore::create();
        let steps = parse_script(r#"[{ "action": { "op": "explode" } }]"#).unwrap();
        assert!(run_script(&store, steps).is_err());
    }

    #[test]
    fn test_non_alias_strings_are_untouched() {
        let aliases = HashMap::new();
        let value = serde_json::json!({"name": "Plain", "nested": ["a", 1]});
        assert_eq!(resolve_aliases(value.clone(), &aliases).unwrap(), value);
    }

    #[test]
    fn test_content_starting_with_at_sign_is_kept() {
        let store = DraftStore::create();
        let steps = parse_script(
            r#"[
                { "as": "team", "action": { "op": "create_stage", "name": "@team" } },
                { "action": { "op": "create_stage", "name": "@nobody please review" } }
            ]"#,
        )
        .unwrap();

        let summary = run_script(&store, steps).unwrap();
        assert_eq!(summary.applied, 2);
        let names: Vec<String> = store.snapshot().stages.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["@team", "@nobody please review"]);
    }

    #[test]
    fn test_nested_id_keys_resolve() {
        let mut aliases = HashMap::new();
        aliases.insert("review".to_string(), EntityId::Real(7));
        let value = serde_json::json!({
            "patch": {"to_stage_id": "@review", "label": "@review"},
            "items": [{"stage_id": "@review"}]
        });

        let resolved = resolve_aliases(value, &aliases).unwrap();
        assert_eq!(resolved["patch"]["to_stage_id"], 7);
        assert_eq!(resolved["patch"]["label"], "@review");
        assert_eq!(resolved["items"][0]["stage_id"], 7);
    }
}
