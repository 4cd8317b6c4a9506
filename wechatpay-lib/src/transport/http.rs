//! reqwest-backed [`Transport`].
//!
//! Requires the `http-transport` feature (enabled by default).

use std::time::Duration;

use async_trait::async_trait;

use super::traits::{HttpRequest, HttpResponse, Transport};
use crate::config::WechatPayConfig;
use crate::{Result, WechatPayError};

const USER_AGENT: &str = concat!("wechatpay-rs/", env!("CARGO_PKG_VERSION"));

/// HTTP transport over a shared `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    api_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport for `api_url` with a per-request timeout.
    pub fn new(api_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WechatPayError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_url: api_url.into(),
            timeout_secs,
            client,
        })
    }

    /// Create a transport from the URL and timeout in `config`.
    pub fn from_config(config: &WechatPayConfig) -> Result<Self> {
        Self::new(config.api_url.clone(), config.timeout_secs)
    }

    /// Base URL requests are sent to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Build the full URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout_secs.saturating_mul(1000)
    }

    /// Map reqwest errors to WechatPayError.
    fn map_reqwest_error(&self, e: reqwest::Error) -> WechatPayError {
        if e.is_timeout() {
            WechatPayError::ConnectionTimeout {
                operation: "WeChat Pay request".to_string(),
                timeout_ms: self.timeout_ms(),
            }
        } else if e.is_connect() {
            WechatPayError::ConnectionFailed {
                target: self.api_url.clone(),
                reason: e.to_string(),
            }
        } else {
            WechatPayError::Transport(format!("WeChat Pay request failed: {}", e))
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| WechatPayError::Internal(format!("invalid HTTP method: {}", request.method)))?;

        let mut builder = self
            .client
            .request(method, self.url(&request.path))
            .header("Accept", "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.header("Content-Type", "application/json").body(body);
        }

        let response = builder.send().await.map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| WechatPayError::Transport(format!("Failed to read response: {}", e)))?;

        tracing::debug!(status, body_len = body.len(), "received response");
        Ok(HttpResponse::new(status, headers, body))
    }
}
