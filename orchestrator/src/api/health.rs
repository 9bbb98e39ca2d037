// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `GET /api/v1/health`, `/health/ready`, `/api/v1/metrics`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

/// `GET /api/v1/health`: process liveness only, no dependency checks.
pub async fn liveness() -> Response {
    Json(HealthBody { status: "ok" }).into_response()
}

#[derive(Debug, Serialize)]
struct ReadinessBody {
    database: bool,
    queue: bool,
}

/// `GET /api/v1/health/ready`: verifies the database and work queue are
/// reachable. Returns 503 if either check fails.
pub async fn readiness(State(state): State<AppState>) -> Response {
    let database = state.db.health_check().await.unwrap_or(false);
    let queue = state.queue.main_queue_depth().await.is_ok();

    let body = ReadinessBody { database, queue };
    let status = if database && queue {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(body)).into_response()
}

/// `GET /api/v1/metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Response {
    if let Ok(depth) = state.queue.main_queue_depth().await {
        state.metrics.queue_depth.set(depth);
    }
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}
