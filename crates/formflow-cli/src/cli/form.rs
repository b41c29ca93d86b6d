//! Form version commands: show, plan, push, publish, new-version.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use console::style;
use serde_json::json;

use formflow_core::draft::DraftStore;
use formflow_core::mapping::build_save_request;
use formflow_types::error::ServiceError;
use formflow_types::wire::FormVersion;

use super::render;
use super::script::{ScriptSummary, read_script, run_script};
use crate::state::AppState;

/// Attach the backend's structured details to the error message.
fn service_error(err: ServiceError, doing: &str) -> anyhow::Error {
    let mut message = format!("{doing}: {err}");
    if let Some(status) = err.status_code.filter(|s| *s != ServiceError::NETWORK_FAILURE_STATUS) {
        message.push_str(&format!(" (HTTP {status})"));
    }
    if let Some(details) = &err.details {
        if let Ok(pretty) = serde_json::to_string_pretty(details) {
            message.push('\n');
            message.push_str(&pretty);
        }
    }
    anyhow!(message)
}

fn missing_json(summary: &ScriptSummary) -> Vec<serde_json::Value> {
    summary
        .missing
        .iter()
        .map(|(step, missing)| json!({"step": step, "missing": format!("{missing:?}")}))
        .collect()
}

/// How a command reports back. `quiet` keeps the data a command was asked
/// for and drops confirmations, warnings and extra listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    fn notices(&self) -> bool {
        !self.quiet
    }

    fn success(&self, message: impl std::fmt::Display) {
        if self.notices() {
            render::success(message);
        }
    }

    fn warning(&self, message: impl std::fmt::Display) {
        if self.notices() {
            render::warning(message);
        }
    }

    fn blank_line(&self) {
        if self.notices() {
            println!();
        }
    }

    fn script_summary(&self, summary: &ScriptSummary) {
        self.success(format!("Applied {} edit(s)", summary.applied));
        for (step, missing) in &summary.missing {
            self.warning(format!("step {step} skipped, target not found: {missing:?}"));
        }
    }
}

/// Display a form version as the editor would load it.
pub async fn show(state: &AppState, id: i64, out: Output) -> Result<()> {
    state
        .orchestrator
        .load(id)
        .await
        .map_err(|e| service_error(e, &format!("failed to load form version {id}")))?;

    let draft = state.store().snapshot();
    if out.json {
        println!("{}", serde_json::to_string_pretty(&draft)?);
        return Ok(());
    }

    render::print_draft(&draft);
    Ok(())
}

/// Build the save request for a form version file without contacting the
/// backend.
///
/// ```bash
/// formflow plan version.json --actions edits.json --json
/// ```
pub async fn plan(state: &AppState, path: &Path, actions: Option<&Path>, out: Output) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let form_version: FormVersion = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a form version", path.display()))?;

    let store = DraftStore::from_form_version(Some(&form_version))
        .with_context(|| format!("failed to load {}", path.display()))?;

    let summary = match actions {
        Some(script) => run_script(&store, read_script(script).await?)?,
        None => ScriptSummary::default(),
    };

    let draft = store.snapshot();
    let outcome = build_save_request(&draft, state.config.transition_policy)
        .context("the draft cannot be saved")?;

    if out.json {
        let body = json!({
            "request": outcome.request,
            "dropped": outcome.dropped,
            "missing_steps": missing_json(&summary),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if actions.is_some() {
        out.script_summary(&summary);
    }
    render::print_draft(&draft);
    render::print_dropped(&outcome.dropped);
    println!(
        "  {} {} stage(s), {} transition(s) would be sent",
        style("→").cyan(),
        outcome.request.stages.len(),
        outcome.request.stage_transitions.len()
    );
    println!();
    Ok(())
}

/// Load a form version, apply an edit script and save the result.
///
/// Transitions between stages the script created are sent by a follow-up
/// save once those stages have backend ids.
pub async fn push(state: &AppState, id: i64, actions: &Path, out: Output) -> Result<()> {
    let steps = read_script(actions).await?;

    state
        .orchestrator
        .load(id)
        .await
        .map_err(|e| service_error(e, &format!("failed to load form version {id}")))?;
    let summary = run_script(state.store(), steps)?;

    if !state.store().is_dirty() {
        if out.json {
            println!("{}", json!({"saved": false, "missing_steps": missing_json(&summary)}));
        } else {
            out.script_summary(&summary);
            out.warning("Nothing to save");
        }
        return Ok(());
    }

    let report = state
        .orchestrator
        .save_settled(id)
        .await
        .map_err(|e| service_error(e, &format!("failed to save form version {id}")))?;

    if out.json {
        let body = json!({
            "saved": true,
            "form_version_id": report.form_version_id,
            "saved_at": report.saved_at,
            "adopted_ids": report.adopted_ids,
            "dropped": report.dropped,
            "still_dirty": report.still_dirty,
            "missing_steps": missing_json(&summary),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    out.blank_line();
    out.script_summary(&summary);
    out.success(format!(
        "Saved form version {} ({} new id(s) assigned)",
        style(report.form_version_id).cyan(),
        report.adopted_ids
    ));
    if out.notices() {
        render::print_dropped(&report.dropped);
    }
    if report.still_dirty {
        out.warning("Some changes are still unsaved; see the transitions listed above");
    }
    out.blank_line();
    Ok(())
}

pub async fn publish(state: &AppState, id: i64, out: Output) -> Result<()> {
    state
        .orchestrator
        .load(id)
        .await
        .map_err(|e| service_error(e, &format!("failed to load form version {id}")))?;

    let published = state
        .orchestrator
        .publish(id)
        .await
        .map_err(|e| service_error(e, &format!("failed to publish form version {id}")))?;

    if out.json {
        println!("{}", serde_json::to_string_pretty(&published)?);
        return Ok(());
    }

    out.blank_line();
    out.success(format!(
        "Published form version {} as version {}",
        style(published.id).cyan(),
        style(published.version_number).bold()
    ));
    out.blank_line();
    Ok(())
}

pub async fn new_version(state: &AppState, form_id: i64, copy_from_current: bool, out: Output) -> Result<()> {
    let created = state
        .orchestrator
        .create_version(form_id, copy_from_current)
        .await
        .map_err(|e| service_error(e, &format!("failed to create a version of form {form_id}")))?;

    if out.json {
        println!("{}", serde_json::to_string_pretty(&created)?);
        return Ok(());
    }
    if out.quiet {
        println!("{}", created.id);
        return Ok(());
    }

    println!();
    out.success(format!(
        "Created version {} of form {} (form version id {})",
        style(created.version_number).bold(),
        form_id,
        style(created.id).cyan()
    ));
    render::print_draft(&state.store().snapshot());
    Ok(())
}
