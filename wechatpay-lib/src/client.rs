//! The [`WechatPay`] client.
//!
//! One client serves one merchant. It owns the key material, the request and
//! prepay signers, the platform certificate cache and the transport, and wires
//! them into the usual flow: sign, send, verify, parse.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::certificates::{decrypt, CertificateStore, EncryptedResource, PlatformCertificate};
use crate::config::WechatPayConfig;
use crate::keys::KeyMaterial;
use crate::prepay::{PrepaySignature, PrepaySigner};
use crate::signing::{canonical_body, AuthorizationHeader, RequestSigner, SigningContext};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::verify::{ResponseVerifier, VerificationContext};
use crate::{Result, WechatPayError};

/// JSAPI order creation.
pub const JSAPI_PATH: &str = "/v3/pay/transactions/jsapi";
/// Domestic refunds.
pub const REFUNDS_PATH: &str = "/v3/refund/domestic/refunds";

/// Client for a single merchant account.
///
/// # Example
///
/// ```rust,ignore
/// use wechatpay_lib::{WechatPay, WechatPayConfig};
///
/// let client = WechatPay::new(WechatPayConfig::from_env())?;
/// let order = client
///     .transactions_jsapi(&serde_json::json!({
///         "description": "Image",
///         "out_trade_no": "1217752501201407033233368018",
///         "notify_url": "https://example.com/notify",
///         "amount": {"total": 100, "currency": "CNY"},
///         "payer": {"openid": "oUpF8uMuAJO_M2pxb1Q9zNjWeS6o"}
///     }))
///     .await?;
/// let sheet = client.sign_prepay(order["prepay_id"].as_str().unwrap_or_default())?;
/// ```
pub struct WechatPay {
    keys: Arc<KeyMaterial>,
    signer: RequestSigner,
    prepay: PrepaySigner,
    store: Arc<CertificateStore>,
    verifier: ResponseVerifier,
    transport: Arc<dyn Transport + Send + Sync>,
    verify_responses: bool,
}

impl std::fmt::Debug for WechatPay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatPay")
            .field("keys", &self.keys)
            .field("store", &self.store)
            .field("verify_responses", &self.verify_responses)
            .finish_non_exhaustive()
    }
}

impl WechatPay {
    /// Create a client that talks HTTP via reqwest.
    ///
    /// # Errors
    ///
    /// [`WechatPayError::Configuration`] if any credential is missing or
    /// malformed. Nothing touches the network before validation passes.
    #[cfg(feature = "http-transport")]
    pub fn new(config: WechatPayConfig) -> Result<Self> {
        let keys = Arc::new(KeyMaterial::from_config(&config)?);
        let transport = crate::transport::ReqwestTransport::from_config(&config)?;
        Ok(Self::assemble(keys, Arc::new(transport), config.verify_responses))
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_transport<T>(config: WechatPayConfig, transport: T) -> Result<Self>
    where
        T: Transport + Send + Sync + 'static,
    {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    /// Create a client over a transport shared with other code.
    pub fn with_shared_transport(
        config: WechatPayConfig,
        transport: Arc<dyn Transport + Send + Sync>,
    ) -> Result<Self> {
        let keys = Arc::new(KeyMaterial::from_config(&config)?);
        Ok(Self::assemble(keys, transport, config.verify_responses))
    }

    fn assemble(
        keys: Arc<KeyMaterial>,
        transport: Arc<dyn Transport + Send + Sync>,
        verify_responses: bool,
    ) -> Self {
        let store = Arc::new(CertificateStore::new(keys.clone(), transport.clone()));
        Self {
            signer: RequestSigner::new(keys.clone()),
            prepay: PrepaySigner::new(keys.clone()),
            verifier: ResponseVerifier::new(store.clone()),
            store,
            keys,
            transport,
            verify_responses,
        }
    }

    /// Merchant key material.
    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    /// Platform certificate cache.
    pub fn certificate_store(&self) -> &CertificateStore {
        &self.store
    }

    /// Compute the `Authorization` header for a request.
    pub fn sign(&self, method: &str, path: &str, body: Option<&Value>) -> Result<AuthorizationHeader> {
        self.signer.sign(method, path, body)
    }

    /// Check a response signature.
    pub async fn verify(&self, context: &VerificationContext) -> Result<bool> {
        self.verifier.verify(context).await
    }

    /// Check the signature of a response using its own headers and body.
    pub async fn verify_response(&self, response: &HttpResponse) -> Result<bool> {
        self.verifier.verify_response(response).await
    }

    /// Sign a prepay id for the payment sheet.
    pub fn sign_prepay(&self, prepay_id: &str) -> Result<PrepaySignature> {
        self.prepay.sign_prepay(prepay_id)
    }

    /// Download the current platform certificates.
    pub async fn refresh_certificates(&self) -> Result<usize> {
        self.store.refresh().await
    }

    /// Certificates currently cached.
    pub fn certificates(&self) -> Result<Vec<Arc<PlatformCertificate>>> {
        self.store.snapshot()
    }

    /// Send a signed request and return the raw response, whatever its status.
    #[tracing::instrument(skip(self, body))]
    pub async fn send(&self, method: &str, path: &str, body: Option<&Value>) -> Result<HttpResponse> {
        let body = match body {
            Some(value) => Some(canonical_body(Some(value))?),
            None => None,
        };
        let context = SigningContext::new(method, path, body.clone().unwrap_or_default());
        let authorization = self.signer.sign_context(&context)?;

        let request = HttpRequest::new(method, path, body)
            .with_header("Authorization", authorization.to_header_value());
        self.transport.send(request).await
    }

    /// Send a signed request, check status and signature, and parse the body.
    ///
    /// Empty bodies come back as `Value::Null`.
    ///
    /// # Errors
    ///
    /// [`WechatPayError::Api`] or [`WechatPayError::RateLimited`] for non-2xx
    /// responses, [`WechatPayError::SignatureRejected`] when verification is
    /// enabled and the signature does not match.
    pub async fn request(&self, method: &str, path: &str, body: Option<&Value>) -> Result<Value> {
        let response = self.send(method, path, body).await?.error_for_status()?;

        if self.verify_responses {
            let context = VerificationContext::from_response(&response)?;
            if !self.verifier.verify(&context).await? {
                return Err(WechatPayError::SignatureRejected {
                    serial: context.serial().to_string(),
                });
            }
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    /// `GET` helper; `path` includes any query string.
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request("GET", path, None).await
    }

    /// `POST` helper.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request("POST", path, Some(body)).await
    }

    /// Create a JSAPI order. `appid` and `mchid` are filled in from the
    /// client unless the caller sets them.
    pub async fn transactions_jsapi(&self, order: &Value) -> Result<Value> {
        let body = self.with_merchant(order)?;
        self.post(JSAPI_PATH, &body).await
    }

    /// Request a refund, merged the same way as [`Self::transactions_jsapi`].
    pub async fn refunds(&self, refund: &Value) -> Result<Value> {
        let body = self.with_merchant(refund)?;
        self.post(REFUNDS_PATH, &body).await
    }

    /// Decrypt a notification resource with the API v3 key.
    pub fn decrypt_resource(&self, resource: &EncryptedResource) -> Result<String> {
        let label = resource.original_type.as_deref().unwrap_or("resource");
        let plaintext = decrypt(self.keys.platform_secret(), resource)
            .map_err(|e| WechatPayError::resource_decryption(label, e.to_string()))?;
        String::from_utf8(plaintext).map_err(|e| {
            WechatPayError::Serialization(format!("decrypted {} is not UTF-8: {}", label, e))
        })
    }

    /// `appid` and `mchid` first, caller fields after (and winning).
    fn with_merchant(&self, body: &Value) -> Result<Value> {
        let fields = body.as_object().ok_or_else(|| {
            WechatPayError::Serialization("request body must be a JSON object".to_string())
        })?;

        let mut merged = Map::new();
        merged.insert("appid".into(), Value::String(self.keys.app_id().to_string()));
        merged.insert("mchid".into(), Value::String(self.keys.merchant_id().to_string()));
        for (key, value) in fields {
            merged.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        bundle_response, encrypt_resource, merchant_config, platform_bundle, signed_response,
        verify_merchant_signature, MockTransport, PLATFORM_SERIAL,
    };
    use serde_json::json;

    fn client_with(transport: &MockTransport) -> WechatPay {
        WechatPay::with_transport(merchant_config(), transport.clone()).unwrap()
    }

    #[test]
    fn test_missing_secret_fails_before_network() {
        let transport = MockTransport::new();
        let mut config = merchant_config();
        config.secret.clear();

        let err = WechatPay::with_transport(config, transport.clone()).unwrap_err();
        assert_eq!(err.config_field(), Some("secret"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_request_verifies_and_parses() {
        let transport = MockTransport::new();
        transport.push_response(signed_response(r#"{"prepay_id":"wx2017"}"#));
        transport.push_response(bundle_response(&platform_bundle()));
        let client = client_with(&transport);

        let value = client.post(JSAPI_PATH, &json!({"out_trade_no": "T1"})).await.unwrap();
        assert_eq!(value["prepay_id"], "wx2017");
        assert_eq!(transport.call_count(), 2);
        assert_eq!(client.certificates().unwrap()[0].serial_no, PLATFORM_SERIAL);
    }

    #[tokio::test]
    async fn test_request_rejects_forged_response() {
        let transport = MockTransport::new();
        let mut forged = signed_response(r#"{"prepay_id":"wx2017"}"#);
        forged.body = r#"{"prepay_id":"attacker"}"#.into();
        transport.push_response(forged);
        transport.push_response(bundle_response(&platform_bundle()));
        let client = client_with(&transport);

        let err = client.get("/v3/pay/transactions/id/1").await.unwrap_err();
        assert!(matches!(err, WechatPayError::SignatureRejected { ref serial } if serial == PLATFORM_SERIAL));
    }

    #[tokio::test]
    async fn test_verification_can_be_disabled() {
        let transport = MockTransport::always(200, r#"{"ok":true}"#);
        let config = merchant_config().with_response_verification(false);
        let client = WechatPay::with_transport(config, transport.clone()).unwrap();

        assert_eq!(client.get("/v3/anything").await.unwrap(), json!({"ok": true}));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_api_error_surfaces() {
        let transport =
            MockTransport::always(400, r#"{"code":"PARAM_ERROR","message":"out_trade_no missing"}"#);
        let client = client_with(&transport);

        let err = client.post(REFUNDS_PATH, &json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "API error 400 (PARAM_ERROR): out_trade_no missing");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let transport = MockTransport::new();
        transport.push_response(signed_response(""));
        transport.push_response(bundle_response(&platform_bundle()));
        let client = client_with(&transport);

        assert_eq!(client.post("/v3/pay/transactions/out-trade-no/T1/close", &json!({})).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_jsapi_merges_merchant_fields_first() {
        let transport = MockTransport::always(200, "{}");
        let config = merchant_config().with_response_verification(false);
        let client = WechatPay::with_transport(config, transport.clone()).unwrap();

        client
            .transactions_jsapi(&json!({"out_trade_no": "T1", "appid": "wxoverride"}))
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.path, JSAPI_PATH);
        assert_eq!(
            request.body.as_deref(),
            Some(r#"{"appid":"wxoverride","mchid":"1900000001","out_trade_no":"T1"}"#)
        );
    }

    #[tokio::test]
    async fn test_sent_body_is_the_signed_body() {
        let transport = MockTransport::always(200, "{}");
        let config = merchant_config().with_response_verification(false);
        let client = WechatPay::with_transport(config, transport.clone()).unwrap();

        client.refunds(&json!({"out_refund_no": "R1"})).await.unwrap();

        let request = &transport.requests()[0];
        let auth = request.header("Authorization").unwrap();
        let field = |name: &str| {
            let start = auth.find(&format!("{name}=\"")).unwrap() + name.len() + 2;
            let end = start + auth[start..].find('"').unwrap();
            auth[start..end].to_string()
        };
        let signing_string = format!(
            "POST\n{}\n{}\n{}\n{}\n",
            REFUNDS_PATH,
            field("timestamp"),
            field("nonce_str"),
            request.body.as_deref().unwrap()
        );
        assert!(verify_merchant_signature(&signing_string, &field("signature")));
    }

    #[tokio::test]
    async fn test_non_object_body_rejected() {
        let client = client_with(&MockTransport::new());
        let err = client.refunds(&json!(["not", "an", "object"])).await.unwrap_err();
        assert!(matches!(err, WechatPayError::Serialization(_)));
    }

    #[test]
    fn test_decrypt_notification_resource() {
        let client = client_with(&MockTransport::new());
        let mut envelope = encrypt_resource(br#"{"trade_state":"SUCCESS"}"#, "transaction", "5K8264ILTKCH");
        envelope["original_type"] = "transaction".into();
        let resource: EncryptedResource = serde_json::from_value(envelope).unwrap();

        assert_eq!(client.decrypt_resource(&resource).unwrap(), r#"{"trade_state":"SUCCESS"}"#);

        let mut tampered = resource.clone();
        tampered.associated_data = "other".into();
        let err = client.decrypt_resource(&tampered).unwrap_err();
        assert!(matches!(err, WechatPayError::ResourceDecryption { ref resource, .. } if resource == "transaction"));
    }

    #[test]
    fn test_prepay_via_client() {
        let client = client_with(&MockTransport::new());
        let sheet = client.sign_prepay("wx2017").unwrap();
        let message = format!(
            "wxd930ea5d5a258f4f\n{}\n{}\nprepay_id=wx2017\n",
            sheet.time_stamp, sheet.nonce_str
        );
        assert!(verify_merchant_signature(&message, &sheet.pay_sign));
    }
}
