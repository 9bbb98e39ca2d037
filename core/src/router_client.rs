// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! HTTP client the Job Runner uses to invoke the Hybrid Router's
//! `POST /inference`, per spec §4.5 "Contract".

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::HybridRouterSettings;

/// Request body for `POST /inference`.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceRequest {
    /// Model identifier to exercise.
    pub model: String,
    /// Prompt text.
    pub prompt: String,
    /// Client-facing region identifier the router maps to a provider.
    pub region_preference: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Free-form metadata carried through to the provider call and
    /// echoed back on the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Response body from `POST /inference`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Whether the provider call succeeded.
    pub success: bool,
    /// Raw provider text. Present and possibly empty on success; an
    /// empty string is a legitimate response, not a failure (spec
    /// §4.5 "Execution and response handling").
    #[serde(default)]
    pub response: String,
    /// Name of the provider that served the request, if one was
    /// reached.
    #[serde(default)]
    pub provider_used: Option<String>,
    /// At least `{model, region_context, temperature, max_tokens,
    /// system_prompt_extracted_from_receipt_if_any}`.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Human-readable error, present when `success` is `false`.
    #[serde(default)]
    pub error: Option<String>,
    /// Machine-readable error code, e.g. `NO_HEALTHY_PROVIDER`.
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Errors raised by the router client, distinct from an `{success:
/// false}` response body: these mean the router itself could not be
/// reached or returned a malformed envelope, which the caller treats
/// as `router_unreachable` (spec §9 "Failure modes").
#[derive(Debug, Error)]
pub enum RouterClientError {
    /// The HTTP call failed (connect, TLS, timeout).
    #[error("router request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The router returned a non-2xx status outside of its own
    /// `{success: false}` envelope, e.g. a 502 from a proxy in front
    /// of it.
    #[error("router returned HTTP {0}")]
    UnexpectedStatus(u16),
}

impl RouterClientError {
    /// Whether this failure should be treated as `router_unreachable`
    /// for the purposes of envelope retry classification.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            Self::UnexpectedStatus(status) => *status >= 500,
        }
    }
}

/// Thin HTTP client over the Hybrid Router's inference endpoint.
#[derive(Debug, Clone)]
pub struct RouterClient {
    client: reqwest::Client,
    base_url: String,
}

impl RouterClient {
    /// Builds a client from the configured base URL and timeout.
    pub fn new(settings: &HybridRouterSettings) -> Result<Self, RouterClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Invokes `POST /inference` and returns the parsed envelope. A
    /// `{success: false, ...}` body is returned as `Ok`; only
    /// transport-level failures produce `Err`.
    pub async fn inference(
        &self,
        request: &InferenceRequest,
    ) -> Result<InferenceResponse, RouterClientError> {
        let response = self
            .client
            .post(format!("{}/inference", self.base_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouterClientError::UnexpectedStatus(status.as_u16()));
        }

        Ok(response.json::<InferenceResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> HybridRouterSettings {
        HybridRouterSettings {
            base_url: "http://localhost:8081/".to_string(),
            timeout_seconds: 300,
        }
    }

    #[test]
    fn test_new_strips_trailing_slash() {
        let client = RouterClient::new(&settings()).unwrap();
        assert_eq!(client.base_url, "http://localhost:8081");
    }

    #[test]
    fn test_unexpected_status_unreachable_only_for_5xx() {
        assert!(RouterClientError::UnexpectedStatus(502).is_unreachable());
        assert!(!RouterClientError::UnexpectedStatus(404).is_unreachable());
    }

    #[test]
    fn test_inference_response_defaults_empty_response_is_not_missing() {
        let json = r#"{"success": true, "response": "", "metadata": {}}"#;
        let parsed: InferenceResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.response, "");
        assert!(parsed.error.is_none());
    }

    #[test]
    fn test_inference_response_error_envelope() {
        let json = r#"{"success": false, "error": "No healthy providers available", "error_code": "NO_HEALTHY_PROVIDER", "metadata": {}}"#;
        let parsed: InferenceResponse = serde_json::from_str(json).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.error_code.as_deref(), Some("NO_HEALTHY_PROVIDER"));
    }
}
