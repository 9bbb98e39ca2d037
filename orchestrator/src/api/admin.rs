// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Admin-only operations: republishing stuck jobs and requesting a job
//! cancellation.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use inference_mesh_core::api::{ApiError, Role};

use crate::api::auth::require_role;
use crate::outbox::republish_stuck_jobs;
use crate::state::AppState;

/// Body for `POST /api/v1/admin/republish-stuck-jobs`.
#[derive(Debug, Deserialize)]
pub struct RepublishRequest {
    #[serde(default = "default_stuck_after_secs")]
    stuck_after_secs: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_stuck_after_secs() -> i64 {
    300
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
struct RepublishResponse {
    republished: usize,
}

/// `POST /api/v1/admin/republish-stuck-jobs`. Admin only (spec §4.9).
pub async fn republish(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RepublishRequest>,
) -> Response {
    if let Err(e) = require_role(&headers, &state.auth, Role::Admin) {
        return e.into_response();
    }

    match republish_stuck_jobs(&state, request.stuck_after_secs, request.limit).await {
        Ok(republished) => Json(RepublishResponse { republished }).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// `POST /api/v1/admin/jobs/{id}/cancel`. Operator or Admin: sets the
/// cooperative cancellation flag the job runner's fan-out checks
/// between tuples (spec §4.6 "Cancel").
pub async fn cancel(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(e) = require_role(&headers, &state.auth, Role::Operator) {
        return e.into_response();
    }

    match state.db.jobs().get(&id).await {
        Ok(job) if job.status.is_terminal() => {
            return ApiError::Conflict(format!("job {id} is already {}", job.status)).into_response();
        }
        Ok(_) => {}
        Err(e) => return ApiError::from(e).into_response(),
    }

    state.request_cancellation(&id);
    Json(serde_json::json!({ "id": id, "cancellation_requested": true })).into_response()
}
