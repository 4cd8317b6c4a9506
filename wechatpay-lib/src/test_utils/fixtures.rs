//! Key material and certificate bundles for tests.
//!
//! Only depends on external crates so integration tests can include this file
//! directly.

#![allow(dead_code)]

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use sha2::Sha256;

/// Merchant id bound to the fixture certificate.
pub const MERCHANT_ID: &str = "1900000001";
/// App id used by fixture configs.
pub const APP_ID: &str = "wxd930ea5d5a258f4f";
/// API v3 key, 32 ASCII bytes.
pub const API_V3_SECRET: &str = "a7cde1ZJB1kG2e7VfTs3jQzaWizur8Gb";

/// Merchant certificate, serial `ABC123`.
pub const MERCHANT_CERTIFICATE: &str = include_str!("../../test-data/merchant_cert.pem");
/// Merchant private key, PKCS#8.
pub const MERCHANT_PRIVATE_KEY: &str = include_str!("../../test-data/merchant_key.pem");
/// The same merchant private key, PKCS#1.
pub const MERCHANT_PRIVATE_KEY_PKCS1: &str = include_str!("../../test-data/merchant_key_pkcs1.pem");

/// Serial of the current platform certificate.
pub const PLATFORM_SERIAL: &str = "3D2A64F1C8B70E59A1420B6F9D7C35E2184A6B0C";
/// Current platform certificate, PEM.
pub const PLATFORM_CERTIFICATE: &str = include_str!("../../test-data/platform_cert.pem");
/// Current platform certificate, DER.
pub const PLATFORM_CERTIFICATE_DER: &[u8] = include_bytes!("../../test-data/platform_cert.der");
/// Private key of the current platform certificate.
pub const PLATFORM_PRIVATE_KEY: &str = include_str!("../../test-data/platform_key.pem");

/// Serial of the rotated-in platform certificate.
pub const NEXT_PLATFORM_SERIAL: &str = "5F0B9E27A3C4D61880F2E4B17C59A0D3E6B21F47";
/// Rotated-in platform certificate, PEM.
pub const NEXT_PLATFORM_CERTIFICATE: &str = include_str!("../../test-data/platform_next_cert.pem");
/// Private key of the rotated-in platform certificate.
pub const NEXT_PLATFORM_PRIVATE_KEY: &str = include_str!("../../test-data/platform_next_key.pem");

/// Associated data the platform uses for certificate payloads.
pub const CERTIFICATE_AAD: &str = "certificate";

/// Encrypt `plaintext` the way the platform does, returning the JSON envelope.
///
/// `nonce` must be 12 ASCII characters.
pub fn encrypt_resource(plaintext: &[u8], associated_data: &str, nonce: &str) -> Value {
    encrypt_resource_with_key(API_V3_SECRET.as_bytes(), plaintext, associated_data, nonce)
}

/// Like [`encrypt_resource`] with an explicit key.
pub fn encrypt_resource_with_key(
    key: &[u8],
    plaintext: &[u8],
    associated_data: &str,
    nonce: &str,
) -> Value {
    let cipher = Aes256Gcm::new_from_slice(key).unwrap();
    let sealed = cipher
        .encrypt(
            Nonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: plaintext,
                aad: associated_data.as_bytes(),
            },
        )
        .unwrap();

    json!({
        "algorithm": "AEAD_AES_256_GCM",
        "associated_data": associated_data,
        "ciphertext": BASE64.encode(sealed),
        "nonce": nonce,
    })
}

/// One entry of the certificate list.
pub fn certificate_entry(serial: &str, certificate: &[u8], nonce: &str) -> Value {
    json!({
        "serial_no": serial,
        "effective_time": "2026-10-19T19:41:11+08:00",
        "expire_time": "2031-10-18T19:41:11+08:00",
        "encrypt_certificate": encrypt_resource(certificate, CERTIFICATE_AAD, nonce),
    })
}

/// Wrap entries in the list envelope.
pub fn certificate_list(entries: Vec<Value>) -> Value {
    json!({ "data": entries })
}

/// List holding only the current platform certificate (DER payload).
pub fn platform_bundle() -> Value {
    certificate_list(vec![certificate_entry(
        PLATFORM_SERIAL,
        PLATFORM_CERTIFICATE_DER,
        "4a2f8c1d9e0b",
    )])
}

/// List holding the current and the rotated-in platform certificates.
pub fn rotated_bundle() -> Value {
    certificate_list(vec![
        certificate_entry(PLATFORM_SERIAL, PLATFORM_CERTIFICATE.as_bytes(), "4a2f8c1d9e0b"),
        certificate_entry(
            NEXT_PLATFORM_SERIAL,
            NEXT_PLATFORM_CERTIFICATE.as_bytes(),
            "b71e03c5d2a9",
        ),
    ])
}

/// Sign `message` with an RSA PKCS#8 PEM key, base64 output.
pub fn sign_with_key(private_key_pem: &str, message: &str) -> String {
    let key = RsaPrivateKey::from_pkcs8_pem(private_key_pem).unwrap();
    let signer = SigningKey::<Sha256>::new(key);
    BASE64.encode(signer.sign(message.as_bytes()).to_bytes())
}

/// Sign `message` as the current platform certificate.
pub fn sign_as_platform(message: &str) -> String {
    sign_with_key(PLATFORM_PRIVATE_KEY, message)
}

/// Response headers a platform-signed response carries.
pub fn signed_response_headers(
    body: &str,
    timestamp: &str,
    nonce: &str,
) -> Vec<(String, String)> {
    let signature = sign_as_platform(&format!("{timestamp}\n{nonce}\n{body}\n"));
    vec![
        ("Wechatpay-Timestamp".to_string(), timestamp.to_string()),
        ("Wechatpay-Nonce".to_string(), nonce.to_string()),
        ("Wechatpay-Signature".to_string(), signature),
        ("Wechatpay-Serial".to_string(), PLATFORM_SERIAL.to_string()),
    ]
}
