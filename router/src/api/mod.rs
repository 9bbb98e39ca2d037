// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Hybrid Router API: route assembly for the router's axum server.

pub mod debug;
pub mod health;
pub mod inference;
pub mod providers;
pub mod queue_status;

use axum::routing::{get, post};
use axum::Router;

use inference_mesh_core::api::{rate_limit_layer, CorsConfig};

use crate::state::AppState;

/// Requests per second each client IP may sustain before `429`. The
/// router's only caller is the orchestrator's job runner, so this is a
/// generous ceiling meant to catch a misbehaving client, not to shape
/// normal traffic.
const RATE_LIMIT_PER_SECOND: u64 = 200;
/// Burst capacity atop the sustained rate.
const RATE_LIMIT_BURST: u32 = 400;

/// Builds the full Hybrid Router API router, with CORS and per-IP rate
/// limiting applied to every route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/inference", post(inference::inference))
        .route("/providers", get(providers::list))
        .route("/debug/providers", get(debug::providers_with_timings))
        .route("/debug/force-health-check", post(debug::force_health_check))
        .route("/debug/test-provider/:name", post(debug::test_provider))
        .route("/debug/test-inference", post(debug::test_inference))
        .route("/debug/health-check-history", get(debug::history))
        .route("/debug/startup-status", get(debug::startup_status))
        .route("/queue/status", get(queue_status::all))
        .route("/queue/status/:region", get(queue_status::one))
        .route("/health", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/metrics", get(health::metrics))
        .layer(rate_limit_layer(RATE_LIMIT_PER_SECOND, RATE_LIMIT_BURST))
        .layer(CorsConfig::default().to_layer())
        .with_state(state)
}
