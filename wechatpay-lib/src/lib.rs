//! WeChat Pay v3 client core.
//!
//! Authenticates outbound API requests, verifies the platform's signature on
//! responses and keeps the rotating set of platform certificates decrypted and
//! cached. Business endpoints beyond order creation and refunds are left to
//! callers, who go through [`WechatPay::request`] with their own paths.
//!
//! # Features
//!
//! - **Request signing**: RSA-SHA256 `Authorization` headers over the exact bytes sent
//! - **Response verification**: platform signatures checked against cached certificates
//! - **Certificate management**: AES-256-GCM decryption, all-or-nothing refresh,
//!   at most one refresh in flight
//! - **Transport abstraction**: bring your own [`Transport`] or use the reqwest default
//!
//! # Example
//!
//! ```ignore
//! use wechatpay_lib::{WechatPay, WechatPayConfig};
//!
//! let config = WechatPayConfig::new(appid, mchid, cert_pem, key_pem, api_v3_key);
//! let client = WechatPay::new(config)?;
//!
//! let header = client.sign("GET", "/v3/certificates", None)?;
//! println!("Authorization: {}", header);
//!
//! let order = client.get("/v3/pay/transactions/out-trade-no/T1?mchid=1900000001").await?;
//! ```

pub mod certificates;
mod client;
pub mod config;
pub mod errors;
pub mod keys;
pub mod prelude;
pub mod prepay;
pub mod signing;
pub mod transport;
pub mod verify;
mod x509;

/// Test utilities: fixture keys, bundle builders and a mock transport.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use certificates::{CertificateStore, EncryptedResource, PlatformCertificate};
pub use client::{WechatPay, JSAPI_PATH, REFUNDS_PATH};
pub use config::WechatPayConfig;
pub use errors::{WechatPayError, WechatPayErrorCode};
pub use keys::KeyMaterial;
pub use prepay::{PrepaySignature, PrepaySigner};
pub use signing::{AuthorizationHeader, RequestSigner, SigningContext};
pub use transport::{HttpRequest, HttpResponse, Transport};
pub use verify::{verify_with_key, ResponseVerifier, VerificationContext};

#[cfg(feature = "http-transport")]
pub use transport::ReqwestTransport;

/// Common result alias for WeChat Pay operations.
pub type Result<T> = std::result::Result<T, WechatPayError>;
