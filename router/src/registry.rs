// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Provider Registry: the set of inference backends loaded from
//! configuration at startup, kept current by the health-check task
//! (spec §4.9).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{error, warn};

use inference_mesh_core::config::{parse_provider_type, resolve_api_key, ProviderSettings};
use inference_mesh_core::domain::Provider;

/// A registered provider plus the in-flight count the router tracks to
/// enforce `max_concurrent`, per spec §4.5 "Provider selection" step 2.
struct Entry {
    provider: parking_lot::RwLock<Provider>,
    in_flight: AtomicU32,
    api_key: Option<String>,
}

/// The Provider Registry. Cheap to clone; shares its entries via `Arc`.
#[derive(Clone)]
pub struct ProviderRegistry {
    entries: Arc<DashMap<String, Entry>>,
}

impl ProviderRegistry {
    /// Loads provider definitions from configuration. Logs (does not
    /// fail startup on) a region with zero providers, per spec §4.9
    /// "if any region has zero providers at startup, the system logs
    /// an error but starts".
    pub fn from_settings(settings: &[ProviderSettings], known_regions: &[String]) -> Self {
        let entries = Arc::new(DashMap::new());

        for setting in settings {
            let Some(provider_type) = parse_provider_type(&setting.provider_type) else {
                warn!(provider = %setting.name, kind = %setting.provider_type, "unknown provider type, skipping");
                continue;
            };
            let provider = Provider {
                name: setting.name.clone(),
                provider_type,
                endpoint: setting.endpoint.clone(),
                region: setting.region.clone(),
                healthy: false,
                last_health_check: None,
                cost_per_second: setting.cost_per_second,
                max_concurrent: setting.max_concurrent,
                avg_latency_ms: 0.0,
                success_rate: 1.0,
            };
            entries.insert(
                setting.name.clone(),
                Entry {
                    provider: parking_lot::RwLock::new(provider),
                    in_flight: AtomicU32::new(0),
                    api_key: resolve_api_key(setting),
                },
            );
        }

        for region in known_regions {
            if !entries.iter().any(|e| e.provider.read().region == *region) {
                error!(region, "no providers configured for region at startup");
            }
        }

        Self { entries }
    }

    /// Selects the best eligible provider for `region`, per spec §4.5
    /// "Provider selection": healthy, under its concurrency cap, lowest
    /// [`Provider::routing_score`], ties broken by most recent
    /// successful call.
    pub fn select(&self, region: &str) -> Option<String> {
        let mut best: Option<(String, f64, chrono::DateTime<Utc>)> = None;

        for entry in self.entries.iter() {
            let provider = entry.provider.read();
            if !provider.is_eligible_for(region) {
                continue;
            }
            if entry.in_flight.load(Ordering::Acquire) >= provider.max_concurrent {
                continue;
            }
            let score = provider.routing_score();
            let last_success = provider.last_health_check.unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
            let is_better = match &best {
                None => true,
                Some((_, best_score, best_last)) => {
                    score < *best_score || (score == *best_score && last_success > *best_last)
                }
            };
            if is_better {
                best = Some((provider.name.clone(), score, last_success));
            }
        }

        best.map(|(name, _, _)| name)
    }

    /// The provider's configured endpoint and API key, for the dispatch
    /// loop to build its outbound call.
    pub fn endpoint_and_key(&self, name: &str) -> Option<(String, Option<String>)> {
        self.entries
            .get(name)
            .map(|e| (e.provider.read().endpoint.clone(), e.api_key.clone()))
    }

    /// Marks a call in flight, for `max_concurrent` enforcement.
    pub fn begin_call(&self, name: &str) {
        if let Some(entry) = self.entries.get(name) {
            entry.in_flight.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Marks a call finished, releasing its concurrency slot and
    /// updating the rolling latency/success stats this provider's
    /// routing score depends on.
    pub fn end_call(&self, name: &str, latency_ms: f64, succeeded: bool) {
        if let Some(entry) = self.entries.get(name) {
            entry.in_flight.fetch_sub(1, Ordering::AcqRel);
            let mut provider = entry.provider.write();
            provider.avg_latency_ms = ewma(provider.avg_latency_ms, latency_ms);
            provider.success_rate = ewma(provider.success_rate, if succeeded { 1.0 } else { 0.0 });
        }
    }

    /// Applies the outcome of a health-check canary call, per spec
    /// §4.5 "Health checks".
    pub fn record_health_check(&self, name: &str, healthy: bool, latency_ms: f64) {
        if let Some(entry) = self.entries.get(name) {
            let mut provider = entry.provider.write();
            provider.healthy = healthy;
            provider.last_health_check = Some(Utc::now());
            if healthy {
                provider.avg_latency_ms = ewma(provider.avg_latency_ms, latency_ms);
            }
            provider.success_rate = ewma(provider.success_rate, if healthy { 1.0 } else { 0.0 });
        }
    }

    /// Snapshot of every registered provider, for `GET /providers` and
    /// `GET /debug/providers`.
    pub fn snapshot(&self) -> Vec<Provider> {
        self.entries.iter().map(|e| e.provider.read().clone()).collect()
    }

    /// Distinct regions covered by at least one configured provider.
    pub fn regions(&self) -> Vec<String> {
        let mut regions: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.provider.read().region.clone())
            .collect();
        regions.sort();
        regions.dedup();
        regions
    }
}

/// Exponential moving average with a fixed smoothing factor, the same
/// shape used for rolling latency/success-rate stats throughout this
/// codebase's metrics.
fn ewma(previous: f64, sample: f64) -> f64 {
    const ALPHA: f64 = 0.2;
    if previous == 0.0 {
        sample
    } else {
        ALPHA * sample + (1.0 - ALPHA) * previous
    }
}
