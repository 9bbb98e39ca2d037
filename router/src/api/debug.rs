// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Debug surface named in spec §4.5: provider timings, forcing a
//! health-check sweep, probing a single provider or the inference path
//! directly, and the health-check/startup history.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use inference_mesh_core::api::ApiError;
use inference_mesh_core::router_client::InferenceRequest;

use crate::dispatch::call_provider;
use crate::health_check;
use crate::state::AppState;

/// `GET /debug/providers`: the registry snapshot with timings, same
/// payload as `GET /providers` — the debug route exists as a stable
/// operator-facing alias per spec §4.5.
pub async fn providers_with_timings(State(state): State<AppState>) -> Response {
    Json(state.registry.snapshot()).into_response()
}

/// `POST /debug/force-health-check`: runs one sweep inline and reports
/// how many providers are healthy afterwards.
#[derive(Debug, Serialize)]
struct ForceHealthCheckResponse {
    providers_checked: usize,
    healthy_count: usize,
}

pub async fn force_health_check(State(state): State<AppState>) -> Response {
    health_check::sweep_now(&state).await;
    let snapshot = state.registry.snapshot();
    let healthy_count = snapshot.iter().filter(|p| p.healthy).count();
    Json(ForceHealthCheckResponse {
        providers_checked: snapshot.len(),
        healthy_count,
    })
    .into_response()
}

/// `POST /debug/test-provider/{name}`: sends a canary request to one
/// named provider, bypassing routing selection entirely.
pub async fn test_provider(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let Some((endpoint, api_key)) = state.registry.endpoint_and_key(&name) else {
        return ApiError::NotFound(format!("provider {name} not registered")).into_response();
    };

    let canary = InferenceRequest {
        model: name.clone(),
        prompt: "ping".to_string(),
        region_preference: String::new(),
        temperature: 0.0,
        max_tokens: 1,
        metadata: None,
    };

    match call_provider(&state.http, &endpoint, api_key.as_deref(), &canary).await {
        Ok(body) => Json(serde_json::json!({
            "provider": name,
            "success": body.success,
            "response": body.response,
        }))
        .into_response(),
        Err(e) => Json(serde_json::json!({
            "provider": name,
            "success": false,
            "error": e.to_string(),
        }))
        .into_response(),
    }
}

/// `POST /debug/test-inference`: drives the real queue-and-dispatch
/// path with an operator-supplied request, for reproducing a routing
/// decision without going through the orchestrator.
pub async fn test_inference(state: State<AppState>, request: Json<InferenceRequest>) -> Response {
    crate::api::inference::inference(state, request).await
}

/// `GET /debug/health-check-history`: the rolling log of canary
/// outcomes.
pub async fn history(State(state): State<AppState>) -> Response {
    Json(state.debug_log.history()).into_response()
}

/// `GET /debug/startup-status`: the one-time snapshot taken when the
/// router finished booting.
pub async fn startup_status(State(state): State<AppState>) -> Response {
    match state.debug_log.startup() {
        Some(status) => Json(status).into_response(),
        None => ApiError::ServiceUnavailable("startup snapshot not yet recorded".to_string()).into_response(),
    }
}
