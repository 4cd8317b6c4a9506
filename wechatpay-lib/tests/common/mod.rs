//! Shared helpers for integration tests.

#![allow(dead_code)]

#[path = "../../src/test_utils/fixtures.rs"]
mod fixtures;

pub use fixtures::*;

use wechatpay_lib::WechatPayConfig;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config for the fixture merchant pointed at `api_url`.
pub fn merchant_config(api_url: &str) -> WechatPayConfig {
    WechatPayConfig::new(
        APP_ID,
        MERCHANT_ID,
        MERCHANT_CERTIFICATE,
        MERCHANT_PRIVATE_KEY,
        API_V3_SECRET,
    )
    .with_api_url(api_url)
    .with_timeout(5)
}

/// A 200 response carrying `body` and a valid platform signature.
pub fn signed_template(body: &str) -> ResponseTemplate {
    let mut template = ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json");
    for (name, value) in signed_response_headers(body, "1700000000", "respnonce") {
        template = template.insert_header(name.as_str(), value.as_str());
    }
    template
}

/// Serve `bundle` from the certificate endpoint, expecting `times` calls.
pub async fn mount_certificates(server: &MockServer, bundle: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path("/v3/certificates"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle))
        .expect(times)
        .mount(server)
        .await;
}
