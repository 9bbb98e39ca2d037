// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `GET /health`, `GET /ready`, `GET /metrics`.

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

/// `GET /health`: process liveness only.
pub async fn liveness() -> Response {
    Json(HealthBody { status: "ok" }).into_response()
}

#[derive(Debug, Serialize)]
struct ReadinessBody {
    regions_with_healthy_provider: usize,
    regions_total: usize,
}

/// `GET /ready`: at least one region must have a healthy provider.
/// Returns 503 otherwise, since the router cannot usefully serve
/// `/inference` for that region.
pub async fn readiness(State(state): State<AppState>) -> Response {
    let regions = state.registry.regions();
    let regions_with_healthy_provider = regions.iter().filter(|r| state.registry.select(r).is_some()).count();

    let body = ReadinessBody {
        regions_with_healthy_provider,
        regions_total: regions.len(),
    };
    let status = if regions_with_healthy_provider > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(body)).into_response()
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Response {
    for region_state in state.queues.all_states() {
        state
            .metrics
            .queue_depth
            .with_label_values(&[&region_state.region])
            .set(region_state.main_queue_depth as i64);
    }
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}
