// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `POST /inference`: the Hybrid Router's sole inference contract, per
//! spec §4.5.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::sync::oneshot;

use inference_mesh_core::api::ApiError;
use inference_mesh_core::router_client::{InferenceRequest, InferenceResponse};

use crate::queues::{EnqueueError, QueuedInference};
use crate::state::AppState;

/// Enqueues the request onto its target region's queue and awaits the
/// region worker's outcome.
pub async fn inference(State(state): State<AppState>, Json(request): Json<InferenceRequest>) -> Response {
    let region = request.region_preference.clone();
    let (tx, rx) = oneshot::channel();
    let item = QueuedInference {
        request,
        attempt: 0,
        respond_to: tx,
    };

    if let Err(e) = state.queues.try_enqueue(&region, item) {
        let error_code = match &e {
            EnqueueError::UnknownRegion(_) => "BAD_REQUEST",
            EnqueueError::QueueFull(_) => "QUEUE_FULL",
        };
        state
            .metrics
            .inference_requests_total
            .with_label_values(&[&region, "rejected"])
            .inc();
        return Json(InferenceResponse {
            success: false,
            response: String::new(),
            provider_used: None,
            metadata: serde_json::json!({}),
            error: Some(e.to_string()),
            error_code: Some(error_code.to_string()),
        })
        .into_response();
    }

    match rx.await {
        Ok(response) => {
            let outcome = if response.success { "success" } else { "failure" };
            state
                .metrics
                .inference_requests_total
                .with_label_values(&[&region, outcome])
                .inc();
            Json(response).into_response()
        }
        Err(_dropped) => ApiError::InternalError("region worker dropped the response channel".to_string()).into_response(),
    }
}
