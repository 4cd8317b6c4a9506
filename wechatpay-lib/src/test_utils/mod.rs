//! Test utilities.
//!
//! Fixture keys and certificates, helpers that build encrypted certificate
//! bundles the way the platform does, and a call-counting [`MockTransport`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wechatpay_lib::test_utils::{merchant_config, platform_bundle, MockTransport};
//! use wechatpay_lib::WechatPay;
//!
//! let transport = MockTransport::always(200, platform_bundle().to_string());
//! let client = WechatPay::with_transport(merchant_config(), transport)?;
//! client.refresh_certificates().await?;
//! ```

mod fixtures;
mod mock_transport;

use std::sync::Arc;

pub use fixtures::*;
pub use mock_transport::MockTransport;

use crate::config::WechatPayConfig;
use crate::keys::KeyMaterial;
use crate::transport::HttpResponse;
use crate::verify::verify_with_key;

/// Config built from the fixture merchant credentials.
pub fn merchant_config() -> WechatPayConfig {
    WechatPayConfig::new(
        APP_ID,
        MERCHANT_ID,
        MERCHANT_CERTIFICATE,
        MERCHANT_PRIVATE_KEY,
        API_V3_SECRET,
    )
}

/// Key material loaded from [`merchant_config`].
pub fn merchant_keys() -> Arc<KeyMaterial> {
    Arc::new(KeyMaterial::from_config(&merchant_config()).unwrap())
}

/// Check a base64 signature against the merchant certificate.
pub fn verify_merchant_signature(message: &str, signature_b64: &str) -> bool {
    verify_with_key(merchant_keys().merchant_public_key(), message, signature_b64)
}

/// A 200 response carrying `body`, signed by the current platform key.
pub fn signed_response(body: &str) -> HttpResponse {
    HttpResponse::new(200, signed_response_headers(body, "1700000000", "respnonce"), body)
}

/// A 200 response carrying the certificate list `bundle`.
pub fn bundle_response(bundle: &serde_json::Value) -> HttpResponse {
    HttpResponse::new(200, Vec::<(String, String)>::new(), bundle.to_string())
}
