//! Request signing.
//!
//! Every API call carries an `Authorization` header computed over
//!
//! ```text
//! METHOD\n
//! /path?query\n
//! timestamp\n
//! nonce\n
//! body\n
//! ```
//!
//! where `body` is the exact JSON text sent on the wire (empty for requests
//! without a body). The trailing newline is significant.

use std::fmt;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;

use crate::keys::KeyMaterial;
use crate::Result;

/// Authentication scheme identifier sent in front of the credential.
pub const AUTH_SCHEME: &str = "WECHATPAY2-SHA256-RSA2048";

/// Length of generated nonces.
pub const NONCE_LEN: usize = 32;

/// Random alphanumeric nonce.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// Current Unix time in seconds, as a decimal string.
pub fn unix_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Serialize a request or response body the way it is signed.
///
/// Object keys keep the order they were inserted in; nothing is re-sorted.
pub fn canonical_body(body: Option<&Value>) -> Result<String> {
    match body {
        None => Ok(String::new()),
        Some(value) => Ok(serde_json::to_string(value)?),
    }
}

/// Inputs to a single request signature.
///
/// Created fresh for each request; use [`SigningContext::with_nonce`] to pin
/// the timestamp and nonce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningContext {
    method: String,
    path: String,
    timestamp: String,
    nonce: String,
    body: String,
}

impl SigningContext {
    /// Context with a fresh timestamp and nonce.
    ///
    /// `body` must be the serialized body exactly as it will be sent.
    pub fn new(method: &str, path: impl Into<String>, body: impl Into<String>) -> Self {
        Self::with_nonce(method, path, body, unix_timestamp(), generate_nonce())
    }

    /// Context with a caller-provided timestamp and nonce.
    pub fn with_nonce(
        method: &str,
        path: impl Into<String>,
        body: impl Into<String>,
        timestamp: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.into(),
            timestamp: timestamp.into(),
            nonce: nonce.into(),
            body: body.into(),
        }
    }

    /// Upper-case HTTP method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path including the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Unix seconds.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Nonce string.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Serialized body (empty when there is none).
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The exact bytes that get signed.
    pub fn signing_string(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}\n",
            self.method, self.path, self.timestamp, self.nonce, self.body
        )
    }
}

/// Parsed form of the `Authorization` header value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationHeader {
    /// Merchant id.
    pub mchid: String,
    /// Nonce used in the signing string.
    pub nonce_str: String,
    /// Timestamp used in the signing string.
    pub timestamp: String,
    /// Merchant certificate serial.
    pub serial_no: String,
    /// Base64 signature.
    pub signature: String,
}

impl AuthorizationHeader {
    /// Render the header value.
    pub fn to_header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AuthorizationHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mchid=\"{}\",nonce_str=\"{}\",timestamp=\"{}\",serial_no=\"{}\",signature=\"{}\"",
            AUTH_SCHEME, self.mchid, self.nonce_str, self.timestamp, self.serial_no, self.signature
        )
    }
}

/// Computes `Authorization` headers with the merchant private key.
#[derive(Clone, Debug)]
pub struct RequestSigner {
    keys: Arc<KeyMaterial>,
}

impl RequestSigner {
    /// Create a signer over shared key material.
    pub fn new(keys: Arc<KeyMaterial>) -> Self {
        Self { keys }
    }

    /// Sign a request with a fresh timestamp and nonce.
    ///
    /// `path` must include the query string, if any.
    pub fn sign(&self, method: &str, path: &str, body: Option<&Value>) -> Result<AuthorizationHeader> {
        let body = canonical_body(body)?;
        self.sign_context(&SigningContext::new(method, path, body))
    }

    /// Sign a fully specified context. Deterministic for a given context.
    pub fn sign_context(&self, context: &SigningContext) -> Result<AuthorizationHeader> {
        let signature = self.keys.sign_message(&context.signing_string())?;

        Ok(AuthorizationHeader {
            mchid: self.keys.merchant_id().to_string(),
            nonce_str: context.nonce().to_string(),
            timestamp: context.timestamp().to_string(),
            serial_no: self.keys.certificate_serial().to_string(),
            signature,
        })
    }
}
