// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared application state handed to every axum handler and region
//! worker.

use std::sync::Arc;

use inference_mesh_core::api::AuthService;
use inference_mesh_core::config::Config;

use crate::debug_log::DebugLog;
use crate::metrics::Metrics;
use crate::queues::RegionQueues;
use crate::registry::ProviderRegistry;

/// Everything a handler or region worker needs, cloned cheaply via
/// `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Full configuration.
    pub config: Arc<Config>,
    /// Provider Registry.
    pub registry: ProviderRegistry,
    /// Region Queues and the global retry queue.
    pub queues: Arc<RegionQueues>,
    /// Bearer-token RBAC, shared with the orchestrator's.
    pub auth: Arc<AuthService>,
    /// HTTP client used for both provider calls and health-check
    /// canaries.
    pub http: reqwest::Client,
    /// Prometheus counters and histograms.
    pub metrics: Arc<Metrics>,
    /// Rolling history backing `GET /debug/health-check-history` and
    /// `GET /debug/startup-status`.
    pub debug_log: Arc<DebugLog>,
}
