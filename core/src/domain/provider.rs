//! Provider registry entries: the inference backends the Hybrid Router
//! dispatches to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of backend a [`Provider`] fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Modal serverless GPU endpoints.
    Modal,
    /// RunPod serverless GPU endpoints.
    Runpod,
    /// Golem Network compute marketplace.
    Golem,
}

/// A registered inference backend, as loaded from configuration and
/// kept current by the Provider Registry's health-check loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Unique provider name, used as [`crate::domain::execution::ExecutionRecord::provider_id`].
    pub name: String,
    /// Backend kind.
    pub provider_type: ProviderType,
    /// HTTP endpoint the router dispatches requests to.
    pub endpoint: String,
    /// Region this provider serves. A provider serves exactly one region;
    /// multi-region coverage means multiple `Provider` entries.
    pub region: String,
    /// Whether the most recent health check succeeded.
    pub healthy: bool,
    /// Timestamp of the most recent health check.
    pub last_health_check: Option<DateTime<Utc>>,
    /// Estimated cost per second of compute, used in routing scores.
    pub cost_per_second: f64,
    /// Maximum number of concurrent in-flight requests this provider
    /// will accept.
    pub max_concurrent: u32,
    /// Rolling average response latency, in milliseconds.
    pub avg_latency_ms: f64,
    /// Rolling success rate in `[0, 1]`.
    pub success_rate: f64,
}

impl Provider {
    /// Whether this provider may currently accept new work: healthy and
    /// serving the requested region.
    pub fn is_eligible_for(&self, region: &str) -> bool {
        self.healthy && self.region == region
    }

    /// Routing score per spec §4.5: lower is better. Weights cost and
    /// latency equally; a provider with zero recorded latency is treated
    /// as unproven rather than free, so it is not artificially favored.
    pub fn routing_score(&self) -> f64 {
        let latency_component = if self.avg_latency_ms > 0.0 {
            self.avg_latency_ms
        } else {
            f64::MAX / 2.0
        };
        self.cost_per_second * 1000.0 + latency_component
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_provider() -> Provider {
        Provider {
            name: "modal-us".to_string(),
            provider_type: ProviderType::Modal,
            endpoint: "https://modal.example/us".to_string(),
            region: "US".to_string(),
            healthy: true,
            last_health_check: Some(Utc::now()),
            cost_per_second: 0.002,
            max_concurrent: 10,
            avg_latency_ms: 450.0,
            success_rate: 0.98,
        }
    }

    #[test]
    fn test_eligible_when_healthy_and_matching_region() {
        let provider = sample_provider();
        assert!(provider.is_eligible_for("US"));
        assert!(!provider.is_eligible_for("EU"));
    }

    #[test]
    fn test_not_eligible_when_unhealthy() {
        let mut provider = sample_provider();
        provider.healthy = false;
        assert!(!provider.is_eligible_for("US"));
    }

    #[test]
    fn test_lower_latency_scores_better() {
        let fast = sample_provider();
        let mut slow = sample_provider();
        slow.avg_latency_ms = 2000.0;
        assert!(fast.routing_score() < slow.routing_score());
    }

    #[test]
    fn test_unproven_provider_is_not_favored() {
        let mut unproven = sample_provider();
        unproven.avg_latency_ms = 0.0;
        let proven = sample_provider();
        assert!(proven.routing_score() < unproven.routing_score());
    }
}
