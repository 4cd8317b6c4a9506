use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Result, WechatPayError};

/// A request ready to go on the wire.
///
/// `path` is relative to the API base URL and includes the query string; it is
/// the same string that was signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    /// Upper-case HTTP method.
    pub method: String,
    /// Path with query.
    pub path: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Serialized body, if any.
    pub body: Option<String>,
}

impl HttpRequest {
    /// Create a request without headers.
    pub fn new(method: &str, path: impl Into<String>, body: Option<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.into(),
            headers: Vec::new(),
            body,
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as received from the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Headers keyed by lower-case name.
    pub headers: HashMap<String, String>,
    /// Body text exactly as received.
    pub body: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpResponse {
    /// Create a response; header names are lower-cased.
    pub fn new<I, K, V>(status: u16, headers: I, body: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            status,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
            body: body.into(),
        }
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into an error.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(map_status_error(&self))
    }
}

/// Map HTTP status codes to WechatPayError.
fn map_status_error(response: &HttpResponse) -> WechatPayError {
    if response.status == 429 {
        let retry_after_ms = response
            .header("retry-after")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000))
            .unwrap_or(5000);
        return WechatPayError::RateLimited { retry_after_ms };
    }

    match serde_json::from_str::<ApiErrorBody>(&response.body) {
        Ok(ApiErrorBody { code, message }) if code.is_some() || message.is_some() => {
            WechatPayError::Api {
                status: response.status,
                code,
                message: message.unwrap_or_default(),
            }
        }
        _ => WechatPayError::Api {
            status: response.status,
            code: None,
            message: response.body.clone(),
        },
    }
}

/// Sends signed requests to the payment API.
///
/// Implementations own timeouts and connection handling; this crate never
/// retries a send.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Transport {
    /// Perform one HTTP exchange.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
