// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Intake API: route assembly for the orchestrator's axum server.

pub mod admin;
pub mod auth;
pub mod executions;
pub mod health;
pub mod jobs;
pub mod questions;

use axum::routing::{get, post};
use axum::Router;

use inference_mesh_core::api::{rate_limit_layer, CorsConfig};

use crate::state::AppState;

/// Requests per second each client IP may sustain before `429`.
const RATE_LIMIT_PER_SECOND: u64 = 20;
/// Burst capacity atop the sustained rate.
const RATE_LIMIT_BURST: u32 = 40;

/// Builds the full Intake API router, with CORS and per-IP rate
/// limiting applied to every route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/jobs", post(jobs::submit).get(jobs::list))
        .route("/api/v1/jobs/cross-region", post(jobs::submit_cross_region))
        .route("/api/v1/jobs/:id", get(jobs::get))
        .route("/api/v1/jobs/:id/executions", get(jobs::list_executions))
        .route("/api/v1/jobs/:id/executions/all", get(jobs::list_executions))
        .route("/api/v2/jobs/:id/bias-analysis", get(jobs::bias_analysis_stub))
        .route("/api/v1/executions", get(executions::query))
        .route("/api/v1/executions/:id/details", get(executions::details))
        .route("/api/v1/executions/:id/retry-question", post(executions::retry))
        .route("/api/v1/questions", get(questions::list))
        .route("/api/v1/admin/republish-stuck-jobs", post(admin::republish))
        .route("/api/v1/admin/jobs/:id/cancel", post(admin::cancel))
        .route("/api/v1/health", get(health::liveness))
        .route("/api/v1/health/ready", get(health::readiness))
        .route("/api/v1/metrics", get(health::metrics))
        .layer(rate_limit_layer(RATE_LIMIT_PER_SECOND, RATE_LIMIT_BURST))
        .layer(CorsConfig::default().to_layer())
        .with_state(state)
}
