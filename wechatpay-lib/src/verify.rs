//! Response signature verification.
//!
//! Responses are signed by a platform certificate over
//!
//! ```text
//! timestamp\n
//! nonce\n
//! body\n
//! ```
//!
//! A signature that does not match is an ordinary `false`, never an error.
//! The only error is a serial that stays unknown after a certificate refresh.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use serde_json::Value;
use sha2::Sha256;

use crate::certificates::CertificateStore;
use crate::signing::canonical_body;
use crate::transport::HttpResponse;
use crate::{Result, WechatPayError};

/// Header carrying the signing timestamp.
pub const HEADER_TIMESTAMP: &str = "Wechatpay-Timestamp";
/// Header carrying the signing nonce.
pub const HEADER_NONCE: &str = "Wechatpay-Nonce";
/// Header carrying the base64 signature.
pub const HEADER_SIGNATURE: &str = "Wechatpay-Signature";
/// Header naming the platform certificate serial.
pub const HEADER_SERIAL: &str = "Wechatpay-Serial";

/// Everything needed to check one response signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationContext {
    timestamp: String,
    nonce: String,
    body: String,
    signature: String,
    serial: String,
}

impl VerificationContext {
    /// `body` must be the response text exactly as received.
    pub fn new(
        timestamp: impl Into<String>,
        nonce: impl Into<String>,
        body: impl Into<String>,
        signature: impl Into<String>,
        serial: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            nonce: nonce.into(),
            body: body.into(),
            signature: signature.into(),
            serial: serial.into(),
        }
    }

    /// Build a context from a parsed JSON body, serialized the same way
    /// request bodies are.
    pub fn with_json_body(
        timestamp: impl Into<String>,
        nonce: impl Into<String>,
        body: Option<&Value>,
        signature: impl Into<String>,
        serial: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::new(
            timestamp,
            nonce,
            canonical_body(body)?,
            signature,
            serial,
        ))
    }

    /// Extract the signature headers and raw body of `response`.
    ///
    /// # Errors
    ///
    /// [`WechatPayError::MissingHeader`] naming the first absent header.
    pub fn from_response(response: &HttpResponse) -> Result<Self> {
        let header = |name: &str| {
            response
                .header(name)
                .map(str::to_string)
                .ok_or_else(|| WechatPayError::MissingHeader(name.to_string()))
        };

        Ok(Self {
            timestamp: header(HEADER_TIMESTAMP)?,
            nonce: header(HEADER_NONCE)?,
            signature: header(HEADER_SIGNATURE)?,
            serial: header(HEADER_SERIAL)?,
            body: response.body.clone(),
        })
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Serial of the platform certificate that signed the response.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// The exact bytes the platform signed.
    pub fn verification_string(&self) -> String {
        format!("{}\n{}\n{}\n", self.timestamp, self.nonce, self.body)
    }
}

/// Check a base64 RSA-SHA256 signature over `message` against `key`.
///
/// Malformed base64 or a signature of the wrong length yields `false`.
pub fn verify_with_key(key: &RsaPublicKey, message: &str, signature_b64: &str) -> bool {
    let Ok(raw) = BASE64.decode(signature_b64.trim()) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(raw.as_slice()) else {
        return false;
    };
    VerifyingKey::<Sha256>::new(key.clone())
        .verify(message.as_bytes(), &signature)
        .is_ok()
}

/// Verifies responses against the platform certificates in a store.
#[derive(Clone, Debug)]
pub struct ResponseVerifier {
    store: Arc<CertificateStore>,
}

impl ResponseVerifier {
    pub fn new(store: Arc<CertificateStore>) -> Self {
        Self { store }
    }

    /// True if the signature in `context` was made by the named certificate.
    ///
    /// # Errors
    ///
    /// [`WechatPayError::CertificateNotFound`] when the serial is unknown even
    /// after a refresh; errors from that refresh itself are passed through.
    #[tracing::instrument(skip_all, fields(serial = %context.serial()))]
    pub async fn verify(&self, context: &VerificationContext) -> Result<bool> {
        let certificate = self.store.get_certificate(context.serial()).await?;
        let valid = verify_with_key(
            &certificate.public_key,
            &context.verification_string(),
            context.signature(),
        );
        if !valid {
            tracing::warn!("response signature did not verify");
        }
        Ok(valid)
    }

    /// Verify a response using its own headers and body.
    pub async fn verify_response(&self, response: &HttpResponse) -> Result<bool> {
        self.verify(&VerificationContext::from_response(response)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        bundle_response, merchant_keys, platform_bundle, sign_as_platform, sign_with_key,
        signed_response, MockTransport, NEXT_PLATFORM_PRIVATE_KEY, PLATFORM_CERTIFICATE,
        PLATFORM_SERIAL,
    };

    fn verifier() -> (ResponseVerifier, MockTransport) {
        let transport = MockTransport::new();
        transport.set_fallback(bundle_response(&platform_bundle()));
        let store = CertificateStore::new(merchant_keys(), Arc::new(transport.clone()));
        (ResponseVerifier::new(Arc::new(store)), transport)
    }

    fn signed_context() -> VerificationContext {
        let body = r#"{"prepay_id":"wx201410272009395522657a690389285100"}"#;
        let signature = sign_as_platform(&format!("1700000000\nrespnonce\n{body}\n"));
        VerificationContext::new("1700000000", "respnonce", body, signature, PLATFORM_SERIAL)
    }

    #[test]
    fn test_verification_string_layout() {
        let context = VerificationContext::new("1", "n", "", "sig", "S");
        assert_eq!(context.verification_string(), "1\nn\n\n");
    }

    #[test]
    fn test_verify_with_key_handles_garbage() {
        let key = crate::x509::parse_certificate(PLATFORM_CERTIFICATE.as_bytes())
            .unwrap()
            .public_key;
        assert!(!verify_with_key(&key, "m", "not base64!!"));
        assert!(!verify_with_key(&key, "m", "AAAA"));
        assert!(!verify_with_key(&key, "m", ""));
        assert!(verify_with_key(&key, "m", &sign_as_platform("m")));
    }

    #[tokio::test]
    async fn test_valid_signature_verifies() {
        let (verifier, transport) = verifier();
        assert!(verifier.verify(&signed_context()).await.unwrap());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_any_altered_field_fails() {
        let (verifier, _) = verifier();
        let good = signed_context();

        let altered = [
            VerificationContext::new("1700000001", good.nonce(), good.body(), good.signature(), good.serial()),
            VerificationContext::new(good.timestamp(), "othernonce", good.body(), good.signature(), good.serial()),
            VerificationContext::new(good.timestamp(), good.nonce(), "{}", good.signature(), good.serial()),
            VerificationContext::new(
                good.timestamp(),
                good.nonce(),
                good.body(),
                sign_as_platform("something else"),
                good.serial(),
            ),
        ];
        for context in &altered {
            assert!(!verifier.verify(context).await.unwrap());
        }
        assert!(verifier.verify(&good).await.unwrap());
    }

    #[tokio::test]
    async fn test_signature_from_other_key_fails() {
        let (verifier, _) = verifier();
        let forged = sign_with_key(NEXT_PLATFORM_PRIVATE_KEY, "1\nn\n{}\n");
        let context = VerificationContext::new("1", "n", "{}", forged, PLATFORM_SERIAL);
        assert!(!verifier.verify(&context).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_serial_is_an_error() {
        let (verifier, _) = verifier();
        let context = VerificationContext::new("1", "n", "{}", "AAAA", "0000");
        let err = verifier.verify(&context).await.unwrap_err();
        assert!(matches!(err, WechatPayError::CertificateNotFound { ref serial } if serial == "0000"));
    }

    #[tokio::test]
    async fn test_from_response_headers() {
        let (verifier, _) = verifier();
        let response = signed_response(r#"{"code":"SUCCESS"}"#);
        assert!(verifier.verify_response(&response).await.unwrap());

        let mut stripped = response.clone();
        stripped.headers.remove("wechatpay-nonce");
        let err = VerificationContext::from_response(&stripped).unwrap_err();
        assert!(matches!(err, WechatPayError::MissingHeader(ref h) if h == HEADER_NONCE));
    }

    #[test]
    fn test_json_body_context() {
        let body = serde_json::json!({"b": 1, "a": 2});
        let context =
            VerificationContext::with_json_body("1", "n", Some(&body), "s", "S").unwrap();
        assert_eq!(context.body(), r#"{"b":1,"a":2}"#);

        let empty = VerificationContext::with_json_body("1", "n", None, "s", "S").unwrap();
        assert_eq!(empty.verification_string(), "1\nn\n\n");
    }
}
