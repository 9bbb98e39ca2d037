// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Job intake and query handlers: `POST /api/v1/jobs`,
//! `POST /api/v1/jobs/cross-region`, `GET /api/v1/jobs`,
//! `GET /api/v1/jobs/{id}`, `GET /api/v1/jobs/{id}/executions`.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use inference_mesh_core::api::{ApiError, ApiResult, Role};
use inference_mesh_core::domain::{JobRecord, JobSpec, WorkEnvelope};
use inference_mesh_core::security::verify_jobspec_signature;

use crate::api::auth::require_role;
use crate::state::AppState;

/// Response body for a successful or idempotent-replay submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    id: String,
    status: String,
}

/// `POST /api/v1/jobs`. See spec §4.1 "Submit".
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(spec): Json<JobSpec>,
) -> Response {
    if let Err(e) = require_role(&headers, &state.auth, Role::Admin) {
        return e.into_response();
    }
    match do_submit(&state, spec).await {
        Ok((status, body)) => (status, Json(body)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn do_submit(state: &AppState, spec: JobSpec) -> ApiResult<(StatusCode, SubmitResponse)> {
    spec.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    verify_jobspec_signature(
        &spec,
        &state.config.security.trusted_keys,
        state.config.security.signature_bypass,
    )
    .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    if state.db.jobs().exists(&spec.id).await? {
        let existing = state.db.jobs().get(&spec.id).await?;
        return Ok((
            StatusCode::OK,
            SubmitResponse {
                id: existing.jobspec_id,
                status: existing.status.to_string(),
            },
        ));
    }

    let raw_spec = serde_json::to_value(&spec)?;
    let record = JobRecord::new(raw_spec, spec.id.clone(), spec.version.clone());

    let mut tx = state
        .db
        .pool()
        .begin()
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    let inserted = state.db.jobs().insert_in_tx(&mut tx, &record).await?;

    let envelope = WorkEnvelope::new(uuid::Uuid::new_v4().to_string(), inserted.jobspec_id.clone());
    let payload = serde_json::to_value(&envelope)?;
    state
        .db
        .outbox()
        .insert_in_tx(&mut tx, &inserted.jobspec_id, &payload)
        .await?;

    tx.commit()
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    state
        .metrics
        .http_requests_total
        .with_label_values(&["/api/v1/jobs", "202"])
        .inc();

    Ok((
        StatusCode::ACCEPTED,
        SubmitResponse {
            id: inserted.jobspec_id,
            status: inserted.status.to_string(),
        },
    ))
}

/// Query params for `GET /api/v1/jobs`.
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// `GET /api/v1/jobs?limit=N`.
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListJobsParams>,
) -> Response {
    if let Err(e) = require_role(&headers, &state.auth, Role::Viewer) {
        return e.into_response();
    }
    match state.db.jobs().list_recent(params.limit).await {
        Ok(jobs) => Json(jobs).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Query params for `GET /api/v1/jobs/{id}`.
#[derive(Debug, Deserialize)]
pub struct GetJobParams {
    #[serde(default)]
    include: Option<String>,
    #[serde(default = "default_exec_limit")]
    exec_limit: i64,
}

fn default_exec_limit() -> i64 {
    100
}

/// The shape returned by `GET /api/v1/jobs/{id}`, optionally carrying
/// its executions when `include=executions`.
#[derive(Debug, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    job: JobRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    executions: Option<Vec<inference_mesh_core::domain::ExecutionRecord>>,
}

/// `GET /api/v1/jobs/{id}?include=executions|latest&exec_limit=N`.
pub async fn get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<GetJobParams>,
) -> Response {
    if let Err(e) = require_role(&headers, &state.auth, Role::Viewer) {
        return e.into_response();
    }

    let job = match state.db.jobs().get(&id).await {
        Ok(job) => job,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let executions = match params.include.as_deref() {
        Some("executions") | Some("latest") => {
            match state
                .db
                .executions()
                .query(Some(&id), None, None, params.exec_limit)
                .await
            {
                Ok(executions) => Some(executions),
                Err(e) => return ApiError::from(e).into_response(),
            }
        }
        _ => None,
    };

    Json(JobDetail { job, executions }).into_response()
}

/// `GET /api/v1/jobs/{id}/executions` and `/executions/all` (identical:
/// the Execution Store has no pagination cursor beyond `limit`).
pub async fn list_executions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(e) = require_role(&headers, &state.auth, Role::Viewer) {
        return e.into_response();
    }
    match state.db.executions().list_for_job(&id).await {
        Ok(executions) => Json(executions).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Body for `POST /api/v1/jobs/cross-region`.
#[derive(Debug, Deserialize)]
pub struct CrossRegionRequest {
    jobspec: JobSpec,
    target_regions: Vec<String>,
    min_regions: Option<usize>,
    min_success_rate: Option<f64>,
    /// Accepted for forward-compatibility with the bias-analysis
    /// collaborator; has no effect on this service's own submission
    /// path.
    #[serde(default)]
    #[allow(dead_code)]
    enable_analysis: bool,
}

/// `POST /api/v1/jobs/cross-region`: overlays explicit region/quorum
/// overrides onto a JobSpec's constraints before submitting it through
/// the same path as [`submit`] (spec §4.1 "Cross-region submit").
pub async fn submit_cross_region(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut request): Json<CrossRegionRequest>,
) -> Response {
    if let Err(e) = require_role(&headers, &state.auth, Role::Admin) {
        return e.into_response();
    }

    request.jobspec.constraints.regions = request.target_regions;
    if let Some(min_regions) = request.min_regions {
        request.jobspec.constraints.min_regions = min_regions;
    }
    if let Some(min_success_rate) = request.min_success_rate {
        request.jobspec.constraints.min_success_rate = min_success_rate;
    }

    match do_submit(&state, request.jobspec).await {
        Ok((status, body)) => (status, Json(body)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `GET /api/v2/jobs/{id}/bias-analysis`: the analysis algorithm lives
/// in a downstream collaborator this service does not implement.
pub async fn bias_analysis_stub(Path(_id): Path<String>) -> Response {
    let body = serde_json::json!({
        "code": "NOT_IMPLEMENTED",
        "message": "bias analysis is computed by a downstream collaborator; this service persists only the executions it consumes",
    });
    (StatusCode::NOT_IMPLEMENTED, Json(body)).into_response()
}
