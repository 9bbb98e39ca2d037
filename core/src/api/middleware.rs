// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared HTTP middleware: CORS and per-IP rate limiting.

use axum::http::{HeaderValue, Method};
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};

/// CORS configuration.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins. `["*"]` enables a wildcard and implies
    /// `allow_credentials = false`, since browsers reject the
    /// combination of a wildcard origin with credentialed requests.
    pub allowed_origins: Vec<String>,
    /// Allowed HTTP methods.
    pub allowed_methods: Vec<Method>,
    /// Allowed request headers.
    pub allowed_headers: Vec<String>,
    /// Whether to allow credentialed requests (cookies, auth headers).
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
                Method::OPTIONS,
            ],
            allowed_headers: vec![
                "content-type".to_string(),
                "authorization".to_string(),
            ],
            allow_credentials: true,
        }
    }
}

impl CorsConfig {
    /// Builds the `tower_http` layer for this configuration.
    pub fn to_layer(&self) -> CorsLayer {
        let is_wildcard = self.allowed_origins.iter().any(|o| o == "*");

        let mut layer = CorsLayer::new()
            .allow_methods(self.allowed_methods.clone())
            .allow_headers(
                self.allowed_headers
                    .iter()
                    .map(|h| h.parse().unwrap())
                    .collect::<Vec<_>>(),
            );

        layer = if is_wildcard {
            layer.allow_origin(Any)
        } else {
            layer.allow_origin(
                self.allowed_origins
                    .iter()
                    .map(|o| o.parse::<HeaderValue>().unwrap())
                    .collect::<Vec<_>>(),
            )
        };

        if self.allow_credentials && !is_wildcard {
            layer = layer.allow_credentials(true);
        }

        layer
    }
}

/// Builds a per-IP rate-limiting layer backed by `tower_governor`'s
/// token bucket. `requests_per_second` refills the bucket;
/// `burst_size` is its capacity.
pub fn rate_limit_layer(
    requests_per_second: u64,
    burst_size: u32,
) -> GovernorLayer<tower_governor::key_extractor::PeerIpKeyExtractor, NoOpMiddleware> {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(requests_per_second)
            .burst_size(burst_size)
            .finish()
            .expect("rate limit configuration is valid"),
    );
    GovernorLayer { config }
}
