use anyhow::{Context, Result};
use distmirror_domain::{import_name, CandidateReference};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;

use super::effects::{Effects, SystemEffects};
use super::run::{self, Selection};
use crate::config::{RunConfig, WorkspaceConfig};
use crate::outcome::{CommandStatus, ExecutionOutcome, MirrorUserError};
use crate::sources::RunError;

/// Everything a command needs to touch one upstream.
#[derive(Debug, Clone)]
pub struct MirrorRequest {
    pub config: RunConfig,
    pub workspace: WorkspaceConfig,
}

impl MirrorRequest {
    fn system_effects(&self) -> Result<SystemEffects> {
        SystemEffects::new(
            self.workspace.blob_store.clone(),
            self.workspace.export_store.clone(),
        )
    }
}

pub fn mirror_resolve(request: &MirrorRequest) -> Result<ExecutionOutcome> {
    let effects = request.system_effects()?;
    mirror_resolve_with(request, &effects)
}

pub fn mirror_resolve_with(
    request: &MirrorRequest,
    effects: &dyn Effects,
) -> Result<ExecutionOutcome> {
    let candidates = match run::resolve(&request.config, &request.workspace, effects) {
        Ok(candidates) => candidates,
        Err(err) => match err.downcast::<MirrorUserError>() {
            Ok(user) => return Ok(ExecutionOutcome::user_error(user.message, user.details)),
            Err(other) => return Err(other),
        },
    };
    let package = request.config.package();
    let message = match candidates.last() {
        Some(newest) => format!(
            "{} candidate(s) for {package}, newest {}",
            candidates.len(),
            newest.reference
        ),
        None => format!("no import candidates for {package}"),
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "package": package,
            "upstream": request.config.upstream(),
            "candidates": candidates_json(&candidates)?,
        }),
    ))
}

pub fn mirror_sync(request: &MirrorRequest, selection: &Selection) -> Result<ExecutionOutcome> {
    let effects = request.system_effects()?;
    mirror_sync_with(request, selection, &effects)
}

pub fn mirror_sync_with(
    request: &MirrorRequest,
    selection: &Selection,
    effects: &dyn Effects,
) -> Result<ExecutionOutcome> {
    let report = match run::sync(&request.config, &request.workspace, effects, selection) {
        Ok(report) => report,
        Err(err) => {
            let err = match err.downcast::<MirrorUserError>() {
                Ok(user) => return Ok(ExecutionOutcome::user_error(user.message, user.details)),
                Err(other) => other,
            };
            return match err.downcast::<RunError>() {
                Ok(failed) => Ok(ExecutionOutcome::failure(
                    failed.to_string(),
                    json!({
                        "reason": "reconcile_failed",
                        "reference": failed.reference,
                        "import_name": import_name(&failed.reference),
                        "state": failed.state,
                    }),
                )),
                Err(other) => Err(other),
            };
        }
    };

    let package = request.config.package();
    let message = match report.references.as_slice() {
        [single] => format!(
            "mirrored {} ({}, {} source(s))",
            single.import_name,
            single.reference,
            single.sources.len()
        ),
        many => format!("mirrored {} references of {package}", many.len()),
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "package": package,
            "upstream": request.config.upstream(),
            "workdir": request.workspace.workdir.display().to_string(),
            "candidates": candidates_json(&report.candidates)?,
            "references": serde_json::to_value(&report.references)
                .context("failed to serialize the run report")?,
        }),
    ))
}

fn candidates_json(candidates: &[CandidateReference]) -> Result<Vec<Value>> {
    candidates
        .iter()
        .map(|candidate| {
            let timestamp = candidate
                .timestamp
                .format(&Rfc3339)
                .with_context(|| format!("unformattable timestamp for {}", candidate.reference))?;
            Ok(json!({
                "reference": candidate.reference,
                "import_name": import_name(&candidate.reference),
                "timestamp": timestamp,
            }))
        })
        .collect()
}

#[must_use]
pub fn format_status_message(command: &str, message: &str) -> String {
    let prefix = format!("distmirror {command}");
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}

#[must_use]
pub fn to_json_response(command: &str, outcome: &ExecutionOutcome) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": format_status_message(command, &outcome.message),
        "details": details,
    })
}
