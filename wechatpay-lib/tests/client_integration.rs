//! Integration tests for the client over the reqwest transport.
//!
//! All tests run against a local wiremock server; no network access needed.
//!
//! ```bash
//! cargo test -p wechatpay-lib --test client_integration
//! ```

#![cfg(feature = "http-transport")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use common::*;
use serde_json::json;
use wechatpay_lib::{
    verify_with_key, VerificationContext, WechatPay, WechatPayError, JSAPI_PATH, REFUNDS_PATH,
};
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> WechatPay {
    WechatPay::new(merchant_config(&server.uri())).expect("client")
}

// ============================================================
// Certificate refresh
// ============================================================

#[tokio::test]
async fn test_refresh_installs_platform_certificate() {
    let server = MockServer::start().await;
    mount_certificates(&server, platform_bundle(), 1).await;
    let client = client_for(&server).await;

    assert_eq!(client.refresh_certificates().await.unwrap(), 1);

    let certs = client.certificates().unwrap();
    assert_eq!(certs.len(), 1);
    assert_eq!(certs[0].serial_no, PLATFORM_SERIAL);

    // The cached key checks signatures made by the platform private key.
    let message = "1700000000\nabc\n{}\n";
    assert!(verify_with_key(
        &certs[0].public_key,
        message,
        &sign_as_platform(message)
    ));
}

#[tokio::test]
async fn test_concurrent_lookups_fetch_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/certificates"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(platform_bundle())
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(client_for(&server).await);
    let mut handles = Vec::new();
    for _ in 0..10 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client
                .certificate_store()
                .get_public_key(PLATFORM_SERIAL)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_tampered_tag_fails_refresh_without_touching_cache() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    mount_certificates(&server, platform_bundle(), 1).await;
    client.refresh_certificates().await.unwrap();
    server.reset().await;

    let mut bundle = rotated_bundle();
    let field = &mut bundle["data"][1]["encrypt_certificate"]["ciphertext"];
    let mut sealed = BASE64.decode(field.as_str().unwrap()).unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0x40;
    *field = BASE64.encode(sealed).into();
    mount_certificates(&server, bundle, 1).await;

    let err = client.refresh_certificates().await.unwrap_err();
    assert!(matches!(err, WechatPayError::CertificateDecryption { .. }));

    let serials: Vec<_> = client
        .certificates()
        .unwrap()
        .iter()
        .map(|c| c.serial_no.clone())
        .collect();
    assert_eq!(serials, vec![PLATFORM_SERIAL.to_string()]);
}

#[tokio::test]
async fn test_rotation_keeps_previous_serial() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    mount_certificates(&server, platform_bundle(), 1).await;
    client.refresh_certificates().await.unwrap();
    server.reset().await;

    mount_certificates(&server, rotated_bundle(), 1).await;
    assert_eq!(client.refresh_certificates().await.unwrap(), 2);
    assert_eq!(client.certificates().unwrap().len(), 2);
}

#[tokio::test]
async fn test_certificate_endpoint_error_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/certificates"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "SIGN_ERROR",
            "message": "signature mismatch"
        })))
        .mount(&server)
        .await;
    let client = client_for(&server).await;

    match client.refresh_certificates().await.unwrap_err() {
        WechatPayError::Api { status, code, .. } => {
            assert_eq!(status, 401);
            assert_eq!(code.as_deref(), Some("SIGN_ERROR"));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

// ============================================================
// Signed requests
// ============================================================

#[tokio::test]
async fn test_jsapi_order_round_trip() {
    let server = MockServer::start().await;
    mount_certificates(&server, platform_bundle(), 1).await;

    let response_body = r#"{"prepay_id":"wx201410272009395522657a690389285100"}"#;
    Mock::given(method("POST"))
        .and(path(JSAPI_PATH))
        .and(header_exists("Authorization"))
        .and(body_json(json!({
            "appid": APP_ID,
            "mchid": MERCHANT_ID,
            "description": "Image",
            "out_trade_no": "T1",
            "amount": {"total": 100, "currency": "CNY"}
        })))
        .respond_with(signed_template(response_body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let order = client
        .transactions_jsapi(&json!({
            "description": "Image",
            "out_trade_no": "T1",
            "amount": {"total": 100, "currency": "CNY"}
        }))
        .await
        .unwrap();

    let prepay_id = order["prepay_id"].as_str().unwrap();
    let sheet = client.sign_prepay(prepay_id).unwrap();
    assert_eq!(sheet.package, format!("prepay_id={}", prepay_id));
    assert_eq!(sheet.sign_type, "RSA");
}

#[tokio::test]
async fn test_forged_response_is_rejected() {
    let server = MockServer::start().await;
    mount_certificates(&server, platform_bundle(), 1).await;

    let mut template = ResponseTemplate::new(200)
        .set_body_raw(r#"{"refund_id":"forged"}"#, "application/json");
    for (name, value) in signed_response_headers(r#"{"refund_id":"50000000382019052709732678859"}"#, "1700000000", "respnonce") {
        template = template.insert_header(name.as_str(), value.as_str());
    }
    Mock::given(method("POST"))
        .and(path(REFUNDS_PATH))
        .respond_with(template)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .refunds(&json!({"out_refund_no": "R1"}))
        .await
        .unwrap_err();
    assert!(matches!(err, WechatPayError::SignatureRejected { .. }));
}

#[tokio::test]
async fn test_unsigned_response_reports_missing_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/pay/transactions/out-trade-no/T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"trade_state": "SUCCESS"})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .get("/v3/pay/transactions/out-trade-no/T1?mchid=1900000001")
        .await
        .unwrap_err();
    assert!(matches!(err, WechatPayError::MissingHeader(ref h) if h == "Wechatpay-Timestamp"));
}

#[tokio::test]
async fn test_verify_response_from_raw_send() {
    let server = MockServer::start().await;
    mount_certificates(&server, platform_bundle(), 1).await;
    Mock::given(method("GET"))
        .and(path("/v3/pay/transactions/id/4200000001"))
        .respond_with(signed_template(r#"{"trade_state":"SUCCESS"}"#))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response = client
        .send("GET", "/v3/pay/transactions/id/4200000001?mchid=1900000001", None)
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert!(client.verify_response(&response).await.unwrap());

    let context = VerificationContext::from_response(&response).unwrap();
    let altered = VerificationContext::new(
        context.timestamp(),
        context.nonce(),
        r#"{"trade_state":"REFUND"}"#,
        context.signature(),
        context.serial(),
    );
    assert!(!client.verify(&altered).await.unwrap());
}

#[tokio::test]
async fn test_rate_limit_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REFUNDS_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.refunds(&json!({"out_refund_no": "R1"})).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.retry_after_ms(), Some(2000));
}

#[tokio::test]
async fn test_unreachable_host_is_retryable() {
    let client = WechatPay::new(merchant_config("http://127.0.0.1:1")).unwrap();
    let err = client.refresh_certificates().await.unwrap_err();
    assert!(err.is_retryable(), "unexpected: {:?}", err);
}

#[test]
fn test_missing_secret_fails_before_network() {
    let mut config = merchant_config("http://127.0.0.1:1");
    config.secret = String::new();
    let err = WechatPay::new(config).unwrap_err();
    assert_eq!(err.config_field(), Some("secret"));
}
