// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Prometheus metrics for the orchestrator, exposed at
//! `GET /api/v1/metrics`.

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_with_registry, HistogramVec, IntCounterVec, IntGauge, Registry,
};

/// Counters and histograms covering intake, dispatch and the outbox.
pub struct Metrics {
    registry: Registry,
    /// Intake requests by route and status code.
    pub http_requests_total: IntCounterVec,
    /// Fan-out tuple outcomes, labeled by response classification.
    pub tuple_outcomes_total: IntCounterVec,
    /// Per-tuple dispatch latency, in seconds.
    pub tuple_duration_seconds: HistogramVec,
    /// Outbox rows published per publisher cycle.
    pub outbox_published_total: IntCounterVec,
    /// Current depth of the main work queue.
    pub queue_depth: IntGauge,
}

impl Metrics {
    /// Registers every metric against a fresh registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = register_int_counter_vec_with_registry!(
            "mesh_orchestrator_http_requests_total",
            "Intake API requests by route and status code",
            &["route", "status"],
            registry
        )
        .expect("metric registration is infallible for a fresh registry");

        let tuple_outcomes_total = register_int_counter_vec_with_registry!(
            "mesh_orchestrator_tuple_outcomes_total",
            "Fan-out tuple outcomes by response classification",
            &["classification"],
            registry
        )
        .expect("metric registration is infallible for a fresh registry");

        let tuple_duration_seconds = register_histogram_vec_with_registry!(
            "mesh_orchestrator_tuple_duration_seconds",
            "Per-tuple dispatch latency",
            &["region"],
            registry
        )
        .expect("metric registration is infallible for a fresh registry");

        let outbox_published_total = register_int_counter_vec_with_registry!(
            "mesh_orchestrator_outbox_published_total",
            "Outbox rows published to the work queue",
            &["result"],
            registry
        )
        .expect("metric registration is infallible for a fresh registry");

        let queue_depth = register_int_gauge_with_registry!(
            "mesh_orchestrator_queue_depth",
            "Current depth of the main work queue",
            registry
        )
        .expect("metric registration is infallible for a fresh registry");

        Self {
            registry,
            http_requests_total,
            tuple_outcomes_total,
            tuple_duration_seconds,
            outbox_published_total,
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
