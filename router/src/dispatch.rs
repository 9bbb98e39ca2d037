// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-region dispatch worker: dequeues one request at a time and
//! performs the outbound provider call, per spec §4.5 "Per-region
//! sequential queueing".

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use inference_mesh_core::router_client::{InferenceRequest, InferenceResponse};

use crate::queues::QueuedInference;
use crate::state::AppState;

/// Cap on retry attempts before a request is failed permanently, per
/// spec §4.5 "cap 3".
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Poll interval a region worker uses to re-check its retry queues
/// when its main queue has nothing immediately available.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Body sent to a provider's inference endpoint.
#[derive(Debug, Serialize)]
struct ProviderRequestBody<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f64,
    max_tokens: u32,
}

/// Body a provider endpoint returns, the same envelope shape the
/// router itself exposes at `POST /inference`.
#[derive(Debug, Deserialize)]
pub(crate) struct ProviderResponseBody {
    pub(crate) success: bool,
    #[serde(default)]
    pub(crate) response: String,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) metadata: serde_json::Value,
}

/// Transport-level failure from a provider call, distinct from a
/// `{success: false}` envelope. Each variant maps to one of the
/// router's closed-set normalized error codes.
#[derive(Debug, Error)]
pub(crate) enum ProviderCallError {
    /// The outbound request timed out.
    #[error("provider request timed out: {0}")]
    Timeout(reqwest::Error),
    /// The outbound request failed for any other transport reason
    /// (connect, TLS, etc).
    #[error("provider request failed: {0}")]
    Request(reqwest::Error),
    /// The provider returned a non-2xx status.
    #[error("provider returned HTTP {0}")]
    UnexpectedStatus(u16),
    /// The provider's response body didn't match the expected envelope.
    #[error("provider response was malformed: {0}")]
    Decode(reqwest::Error),
}

impl ProviderCallError {
    /// The normalized code this failure surfaces to callers, per spec
    /// §7's closed error-code taxonomy.
    fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "PROVIDER_TIMEOUT",
            Self::Request(_) | Self::UnexpectedStatus(_) | Self::Decode(_) => "PROVIDER_HTTP_ERROR",
        }
    }
}

/// Runs until `shutdown` fires or the main queue's sender is dropped,
/// draining `region`'s queues in priority order: global retry, local
/// retry, main.
pub async fn run_region_worker(
    state: AppState,
    region: String,
    mut main_rx: mpsc::Receiver<QueuedInference>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    info!(region = %region, "region worker started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        if let Some(item) = state.queues.global_retry().take_due(&region) {
            dispatch_one(&state, &region, item).await;
            continue;
        }
        if let Some(item) = state.queues.take_due_local_retry(&region) {
            dispatch_one(&state, &region, item).await;
            continue;
        }

        tokio::select! {
            received = tokio::time::timeout(IDLE_POLL_INTERVAL, main_rx.recv()) => {
                match received {
                    Ok(Some(item)) => dispatch_one(&state, &region, item).await,
                    Ok(None) => {
                        info!(region = %region, "main queue closed, region worker stopping");
                        break;
                    }
                    Err(_elapsed) => continue,
                }
            }
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!(region = %region, "region worker stopped");
}

/// Selects a provider and performs one outbound call, handling success,
/// failure-with-retry and the terminal failure envelope.
async fn dispatch_one(state: &AppState, region: &str, item: QueuedInference) {
    let QueuedInference {
        request,
        attempt,
        respond_to,
    } = item;

    let Some(provider_name) = state.registry.select(region) else {
        state.queues.record_failed(region);
        let _ = respond_to.send(InferenceResponse {
            success: false,
            response: String::new(),
            provider_used: None,
            metadata: serde_json::json!({}),
            error: Some("No healthy providers available".to_string()),
            error_code: Some("NO_HEALTHY_PROVIDER".to_string()),
        });
        return;
    };

    let Some((endpoint, api_key)) = state.registry.endpoint_and_key(&provider_name) else {
        state.queues.record_failed(region);
        let _ = respond_to.send(InferenceResponse {
            success: false,
            response: String::new(),
            provider_used: None,
            metadata: serde_json::json!({}),
            error: Some("provider disappeared from registry".to_string()),
            error_code: Some("NO_HEALTHY_PROVIDER".to_string()),
        });
        return;
    };

    state.registry.begin_call(&provider_name);
    let started = Instant::now();
    let outcome = call_provider(&state.http, &endpoint, api_key.as_deref(), &request).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(body) if body.success => {
            state.registry.end_call(&provider_name, elapsed_ms, true);
            state.queues.record_completed(region);
            let metadata = merge_request_metadata(&request, body.metadata);
            let _ = respond_to.send(InferenceResponse {
                success: true,
                response: body.response,
                provider_used: Some(provider_name),
                metadata,
                error: None,
                error_code: None,
            });
        }
        Ok(body) => {
            state.registry.end_call(&provider_name, elapsed_ms, false);
            state.queues.record_failed(region);
            let _ = respond_to.send(InferenceResponse {
                success: false,
                response: String::new(),
                provider_used: Some(provider_name),
                metadata: serde_json::json!({}),
                error: body.error.or_else(|| Some("provider reported failure".to_string())),
                error_code: Some("PROVIDER_HTTP_ERROR".to_string()),
            });
        }
        Err(transport_error) => {
            state.registry.end_call(&provider_name, elapsed_ms, false);
            requeue_or_fail(state, region, request, attempt, respond_to, transport_error).await;
        }
    }
}

/// On a transport failure, re-enqueues onto the global retry queue with
/// exponential backoff if under the attempt cap, else returns the
/// terminal failure envelope, per spec §4.5 "Execution and response
/// handling".
async fn requeue_or_fail(
    state: &AppState,
    region: &str,
    request: InferenceRequest,
    attempt: u32,
    respond_to: tokio::sync::oneshot::Sender<InferenceResponse>,
    transport_error: ProviderCallError,
) {
    if attempt >= MAX_RETRY_ATTEMPTS {
        state.queues.record_failed(region);
        let _ = respond_to.send(InferenceResponse {
            success: false,
            response: String::new(),
            provider_used: None,
            metadata: serde_json::json!({}),
            error_code: Some(transport_error.error_code().to_string()),
            error: Some(transport_error.to_string()),
        });
        return;
    }

    let backoff = retry_backoff(attempt);
    warn!(region, attempt, backoff_secs = backoff, error = %transport_error, "requeueing after provider failure");
    let eligible_at = chrono::Utc::now() + chrono::Duration::seconds(backoff as i64);
    state.queues.global_retry().push(
        region.to_string(),
        eligible_at,
        QueuedInference {
            request,
            attempt: attempt + 1,
            respond_to,
        },
    );
}

/// `min(60, 2^attempt)` seconds, per spec §4.5.
pub fn retry_backoff(attempt: u32) -> u64 {
    60u64.min(2u64.saturating_pow(attempt))
}

/// Performs the outbound HTTP call to a provider's inference endpoint.
/// Shared with the health-check task, which issues the same call with
/// a minimal canary prompt rather than a distinct health endpoint, per
/// spec §4.5 "Using a separate health endpoint is explicitly
/// forbidden".
pub(crate) async fn call_provider(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: Option<&str>,
    request: &InferenceRequest,
) -> Result<ProviderResponseBody, ProviderCallError> {
    let mut builder = client.post(endpoint).json(&ProviderRequestBody {
        model: &request.model,
        prompt: &request.prompt,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    });
    if let Some(key) = api_key {
        builder = builder.bearer_auth(key);
    }

    let response = builder.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderCallError::Timeout(e)
        } else {
            ProviderCallError::Request(e)
        }
    })?;
    if !response.status().is_success() {
        return Err(ProviderCallError::UnexpectedStatus(response.status().as_u16()));
    }
    response.json::<ProviderResponseBody>().await.map_err(ProviderCallError::Decode)
}

/// Attaches the request parameters to whatever metadata the provider
/// returned, per spec §4.5 "Attaches ... a metadata object containing
/// at least `{model, region_context, temperature, max_tokens, ...}`".
fn merge_request_metadata(request: &InferenceRequest, provider_metadata: serde_json::Value) -> serde_json::Value {
    let mut merged = serde_json::json!({
        "model": request.model,
        "region_context": request.region_preference,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    });
    if let (Some(merged_obj), Some(provider_obj)) = (merged.as_object_mut(), provider_metadata.as_object()) {
        for (key, value) in provider_obj {
            merged_obj.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_backoff_doubles_up_to_cap() {
        assert_eq!(retry_backoff(0), 1);
        assert_eq!(retry_backoff(1), 2);
        assert_eq!(retry_backoff(6), 60);
        assert_eq!(retry_backoff(10), 60);
    }

    #[test]
    fn test_unexpected_status_maps_to_provider_http_error() {
        assert_eq!(ProviderCallError::UnexpectedStatus(502).error_code(), "PROVIDER_HTTP_ERROR");
        assert_eq!(ProviderCallError::UnexpectedStatus(400).error_code(), "PROVIDER_HTTP_ERROR");
    }

    #[test]
    fn test_merge_request_metadata_carries_required_fields() {
        let request = InferenceRequest {
            model: "m1".to_string(),
            prompt: "hi".to_string(),
            region_preference: "US".to_string(),
            temperature: 0.5,
            max_tokens: 128,
            metadata: None,
        };
        let merged = merge_request_metadata(&request, serde_json::json!({"system_prompt": "be nice"}));
        assert_eq!(merged["model"], "m1");
        assert_eq!(merged["region_context"], "US");
        assert_eq!(merged["system_prompt"], "be nice");
    }
}
