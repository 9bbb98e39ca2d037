// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution query and retry handlers: `GET /api/v1/executions`,
//! `GET /api/v1/executions/{id}/details`,
//! `POST /api/v1/executions/{id}/retry-question`.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use inference_mesh_core::api::{ApiError, Role};

use crate::api::auth::require_role;
use crate::retry::retry_question;
use crate::state::AppState;

/// Query params for `GET /api/v1/executions`.
#[derive(Debug, Deserialize)]
pub struct QueryExecutionsParams {
    job_id: Option<String>,
    region: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// `GET /api/v1/executions?job_id=...&region=...&limit=...`.
pub async fn query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QueryExecutionsParams>,
) -> Response {
    if let Err(e) = require_role(&headers, &state.auth, Role::Viewer) {
        return e.into_response();
    }
    match state
        .db
        .executions()
        .query(params.job_id.as_deref(), params.region.as_deref(), None, params.limit)
        .await
    {
        Ok(executions) => Json(executions).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// `GET /api/v1/executions/{id}/details`.
pub async fn details(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(e) = require_role(&headers, &state.auth, Role::Viewer) {
        return e.into_response();
    }
    match state.db.executions().get(id).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Body for `POST /api/v1/executions/{id}/retry-question`. `region` and
/// `question_index` are accepted for client-side consistency checking
/// against the execution actually found at `id`, but `id` alone is
/// sufficient to locate the row (spec §4.8 "Retry a question").
#[derive(Debug, Deserialize)]
pub struct RetryQuestionRequest {
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    question_index: Option<usize>,
}

/// `POST /api/v1/executions/{id}/retry-question`.
pub async fn retry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<RetryQuestionRequest>,
) -> Response {
    if let Err(e) = require_role(&headers, &state.auth, Role::Operator) {
        return e.into_response();
    }

    match retry_question(&state, id).await {
        Ok(record) => {
            if let Some(expected_region) = &request.region {
                if expected_region != &record.region {
                    return ApiError::Conflict(format!(
                        "execution {id} belongs to region {}, not {expected_region}",
                        record.region
                    ))
                    .into_response();
                }
            }
            Json(record).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
