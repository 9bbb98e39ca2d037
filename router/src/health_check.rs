// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Background health-check loop, per spec §4.5 "Health checks": polls
//! every registered provider's real inference endpoint with a minimal
//! canary request, never a separate health URL.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use inference_mesh_core::router_client::InferenceRequest;

use crate::debug_log::HealthCheckEvent;
use crate::dispatch::call_provider;
use crate::state::AppState;

/// Minimum interval between health-check sweeps, per spec §4.5 "≥ every
/// 30 s".
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// A trivial prompt cheap enough for every provider to answer quickly,
/// used only to prove the inference path itself is alive.
const CANARY_PROMPT: &str = "ping";

/// Runs until `shutdown` fires, sweeping every configured provider once
/// per interval.
pub async fn run(state: AppState, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep(&state).await;
            }
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

/// Runs one sweep immediately, outside the regular interval — used by
/// `POST /debug/force-health-check`.
pub async fn sweep_now(state: &AppState) {
    sweep(state).await;
}

async fn sweep(state: &AppState) {
    for provider in state.registry.snapshot() {
        let Some((endpoint, api_key)) = state.registry.endpoint_and_key(&provider.name) else {
            continue;
        };

        let canary = InferenceRequest {
            model: provider.name.clone(),
            prompt: CANARY_PROMPT.to_string(),
            region_preference: provider.region.clone(),
            temperature: 0.0,
            max_tokens: 1,
            metadata: None,
        };

        let started = Instant::now();
        let outcome = call_provider(&state.http, &endpoint, api_key.as_deref(), &canary).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let healthy = matches!(&outcome, Ok(body) if body.success);

        if let Err(e) = &outcome {
            warn!(provider = %provider.name, error = %e, "health check failed");
        } else {
            debug!(provider = %provider.name, latency_ms, "health check succeeded");
        }

        state.registry.record_health_check(&provider.name, healthy, latency_ms);
        state
            .metrics
            .health_check_total
            .with_label_values(&[&provider.name, if healthy { "healthy" } else { "unhealthy" }])
            .inc();
        state.debug_log.record(HealthCheckEvent {
            provider: provider.name.clone(),
            healthy,
            latency_ms,
            checked_at: chrono::Utc::now(),
        });
    }
}
