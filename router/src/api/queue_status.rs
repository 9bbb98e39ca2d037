// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `GET /queue/status`, `GET /queue/status/{region}`.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use inference_mesh_core::api::ApiError;

use crate::state::AppState;

/// Every region's queue depth and completion counters.
pub async fn all(State(state): State<AppState>) -> Response {
    Json(state.queues.all_states()).into_response()
}

/// One region's queue depth and completion counters.
pub async fn one(State(state): State<AppState>, Path(region): Path<String>) -> Response {
    match state.queues.state(&region) {
        Some(status) => Json(status).into_response(),
        None => ApiError::NotFound(format!("no queue for region {region}")).into_response(),
    }
}
