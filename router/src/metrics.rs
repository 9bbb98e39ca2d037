// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Prometheus metrics for the router, exposed at `GET /metrics`.

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_vec_with_registry, HistogramVec, IntCounterVec, IntGaugeVec, Registry,
};

/// Counters and histograms covering dispatch and health checks.
pub struct Metrics {
    registry: Registry,
    /// Inference requests by region and outcome (`success`, `failure`,
    /// `queue_full`).
    pub inference_requests_total: IntCounterVec,
    /// Outbound provider call latency, labeled by provider name.
    pub provider_call_duration_seconds: HistogramVec,
    /// Health-check outcomes by provider and result.
    pub health_check_total: IntCounterVec,
    /// Current main-queue depth by region.
    pub queue_depth: IntGaugeVec,
}

impl Metrics {
    /// Registers every metric against a fresh registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let inference_requests_total = register_int_counter_vec_with_registry!(
            "mesh_router_inference_requests_total",
            "Inference requests by region and outcome",
            &["region", "outcome"],
            registry
        )
        .expect("metric registration is infallible for a fresh registry");

        let provider_call_duration_seconds = register_histogram_vec_with_registry!(
            "mesh_router_provider_call_duration_seconds",
            "Outbound provider call latency",
            &["provider"],
            registry
        )
        .expect("metric registration is infallible for a fresh registry");

        let health_check_total = register_int_counter_vec_with_registry!(
            "mesh_router_health_check_total",
            "Health-check canary outcomes by provider and result",
            &["provider", "result"],
            registry
        )
        .expect("metric registration is infallible for a fresh registry");

        let queue_depth = register_int_gauge_vec_with_registry!(
            "mesh_router_queue_depth",
            "Current main-queue depth by region",
            &["region"],
            registry
        )
        .expect("metric registration is infallible for a fresh registry");

        Self {
            registry,
            inference_requests_total,
            provider_call_duration_seconds,
            health_check_total,
            queue_depth,
        }
    }

    /// Renders the Prometheus text exposition format.
    pub fn render(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .expect("text encoding of gathered metric families cannot fail");
        String::from_utf8(buffer).expect("prometheus text encoding is always valid UTF-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
