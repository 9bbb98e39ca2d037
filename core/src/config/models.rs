//! Configuration schema: database, queue, router, security and admin
//! settings for both `mesh-orchestrator` and `mesh-router`.

use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::collections::{HashMap, HashSet};

/// Root configuration shared by both binaries. Each binary only reads
/// the sections it needs; carrying the full schema in one struct keeps
/// a single `config.toml` / env-var surface for operators.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Execution Store connection settings.
    pub database: DatabaseSettings,
    /// Work Queue connection settings.
    pub queue: QueueSettings,
    /// Hybrid Router client settings, used by the orchestrator.
    pub hybrid_router: HybridRouterSettings,
    /// JobSpec signature verification settings.
    pub security: SecuritySettings,
    /// Bearer-token role-based access control.
    pub auth: AuthSettings,
    /// Provider registry entries, used by the router.
    #[serde(default)]
    pub providers: Vec<ProviderSettings>,
    /// Observability knobs.
    pub observability: ObservabilitySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            queue: QueueSettings::default(),
            hybrid_router: HybridRouterSettings::default(),
            security: SecuritySettings::default(),
            auth: AuthSettings::default(),
            providers: Vec::new(),
            observability: ObservabilitySettings::default(),
        }
    }
}

/// Execution Store (Postgres) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Full `postgres://` connection string.
    #[validate(min_length = 1)]
    pub url: String,
    /// Connection pool size.
    #[validate(minimum = 1)]
    #[validate(maximum = 200)]
    pub pool_size: u32,
    /// Per-query timeout, in milliseconds. Defaults to 30s; a prior
    /// incident traced a production outage to this being left at the
    /// driver default of 4s under load, so it is always set explicitly.
    #[validate(minimum = 1000)]
    pub timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/inference_mesh".to_string(),
            pool_size: 10,
            timeout_ms: 30_000,
        }
    }
}

/// Work Queue (Redis) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct QueueSettings {
    /// `redis://` connection string.
    #[validate(min_length = 1)]
    pub url: String,
    /// Name of the main FIFO list.
    #[validate(min_length = 1)]
    pub jobs_queue_name: String,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            jobs_queue_name: "jobs".to_string(),
        }
    }
}

/// Hybrid Router client settings, used by `mesh-orchestrator` to invoke
/// `mesh-router`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HybridRouterSettings {
    /// Base URL of the `mesh-router` service.
    #[validate(min_length = 1)]
    pub base_url: String,
    /// Per-request timeout, in seconds.
    #[validate(minimum = 1)]
    #[validate(maximum = 300)]
    pub timeout_seconds: u64,
}

impl Default for HybridRouterSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            timeout_seconds: 60,
        }
    }
}

/// JobSpec signature verification settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SecuritySettings {
    /// Base64-encoded ed25519 public keys allowed to submit jobs.
    pub trusted_keys: HashSet<String>,
    /// When `true`, signature verification is skipped. Intended for
    /// local development only; never set in a deployed environment.
    pub signature_bypass: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            trusted_keys: HashSet::new(),
            signature_bypass: false,
        }
    }
}

/// Static bearer-token role allowlists for the Intake and Router APIs.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AuthSettings {
    /// Tokens granted the `admin` role (submit, cancel, republish).
    pub admin_tokens: HashSet<String>,
    /// Tokens granted the `operator` role (retry, requeue).
    pub operator_tokens: HashSet<String>,
    /// Tokens granted the `viewer` role (read-only query endpoints).
    pub viewer_tokens: HashSet<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            admin_tokens: HashSet::new(),
            operator_tokens: HashSet::new(),
            viewer_tokens: HashSet::new(),
        }
    }
}

/// One statically-configured provider registry entry.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProviderSettings {
    /// Unique provider name.
    #[validate(min_length = 1)]
    pub name: String,
    /// `modal`, `runpod`, or `golem`.
    #[validate(min_length = 1)]
    pub provider_type: String,
    /// HTTP endpoint.
    #[validate(min_length = 1)]
    pub endpoint: String,
    /// Region this provider serves.
    #[validate(min_length = 1)]
    pub region: String,
    /// Estimated cost per second of compute.
    #[validate(minimum = 0.0)]
    pub cost_per_second: f64,
    /// Maximum concurrent in-flight requests.
    #[validate(minimum = 1)]
    pub max_concurrent: u32,
    /// Name of the environment variable holding this provider's API key.
    pub api_key_env: String,
}

/// Observability settings. `sentry_dsn` is logged at startup but never
/// wired to an actual Sentry client; shipping error events to an
/// external backend is out of scope for this service.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Optional Sentry DSN, logged but not dispatched to.
    pub sentry_dsn: Option<String>,
    /// Whether to emit per-query tracing spans from the database layer.
    /// Expensive under load; off by default.
    pub enable_db_tracing: bool,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            sentry_dsn: None,
            enable_db_tracing: false,
        }
    }
}

/// Maps `ProviderSettings::provider_type` strings onto
/// [`crate::domain::ProviderType`] values at config-load time.
pub fn parse_provider_type(s: &str) -> Option<crate::domain::ProviderType> {
    match s {
        "modal" => Some(crate::domain::ProviderType::Modal),
        "runpod" => Some(crate::domain::ProviderType::Runpod),
        "golem" => Some(crate::domain::ProviderType::Golem),
        _ => None,
    }
}

/// Looks up a provider's API key from its configured environment
/// variable, if set.
pub fn resolve_api_key(settings: &ProviderSettings) -> Option<String> {
    std::env::var(&settings.api_key_env).ok()
}

/// Groups provider settings by region, the shape the router's region
/// worker startup needs.
pub fn providers_by_region(
    providers: &[ProviderSettings],
) -> HashMap<String, Vec<&ProviderSettings>> {
    let mut map: HashMap<String, Vec<&ProviderSettings>> = HashMap::new();
    for provider in providers {
        map.entry(provider.region.clone()).or_default().push(provider);
    }
    map
}
