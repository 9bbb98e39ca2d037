// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `GET /providers`: a read-only snapshot of the Provider Registry.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::AppState;

/// Lists every registered provider and its current health/latency
/// stats.
pub async fn list(State(state): State<AppState>) -> Response {
    Json(state.registry.snapshot()).into_response()
}
