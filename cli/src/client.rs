//! Thin HTTP client for the intake API, shared by every command.

use crate::error::CliError;
use anyhow::{Context, Result};
use serde_json::Value;

/// Default intake API base URL, used when neither `--api-url` nor
/// `MESH_API_URL` is set.
const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Connection details for the intake API, built once from CLI flags
/// and environment variables.
pub struct IntakeClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl IntakeClient {
    /// Builds a client from an optional explicit base URL/token,
    /// falling back to `MESH_API_URL` / `MESH_TOKEN`, then defaults.
    pub fn new(api_url: Option<String>, token: Option<String>) -> Self {
        let base_url = api_url
            .or_else(|| std::env::var("MESH_API_URL").ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let token = token.or_else(|| std::env::var("MESH_TOKEN").ok());

        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// `GET {base_url}{path}`, returning the parsed JSON body.
    pub async fn get(&self, path: &str) -> Result<Value> {
        let request = self.authed(self.http.get(format!("{}{path}", self.base_url)));
        Self::send(request).await
    }

    /// `POST {base_url}{path}` with a JSON body, returning the parsed
    /// JSON response body.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let request = self
            .authed(self.http.post(format!("{}{path}", self.base_url)))
            .json(body);
        Self::send(request).await
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await.context("request to intake API failed")?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("intake API returned a non-JSON response")?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            return Err(CliError::ApiError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let client = IntakeClient::new(None, None);
        assert!(client.base_url.starts_with("http://"));
    }

    #[test]
    fn test_trims_trailing_slash() {
        let client = IntakeClient::new(Some("http://localhost:9000/".to_string()), None);
        assert_eq!(client.base_url, "http://localhost:9000");
    }
}
