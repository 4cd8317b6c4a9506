//! Client-side payment sheet signatures.
//!
//! After creating an order the merchant hands a prepay id to the app or web
//! page, which opens the payment sheet with a second signature computed over
//!
//! ```text
//! appid\n
//! timestamp\n
//! nonce\n
//! prepay_id=<id>\n
//! ```
//!
//! Unlike the request signing string there is no method, path or body line.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::keys::KeyMaterial;
use crate::signing::{generate_nonce, unix_timestamp};
use crate::Result;

/// Signature type announced to the payment sheet.
pub const PREPAY_SIGN_TYPE: &str = "RSA";

/// Parameters for opening the in-app payment sheet.
///
/// Serializes with the field names the payment UI expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepaySignature {
    /// Unix seconds.
    pub time_stamp: String,
    /// Random nonce.
    pub nonce_str: String,
    /// `prepay_id=<id>`.
    pub package: String,
    /// Always [`PREPAY_SIGN_TYPE`].
    pub sign_type: String,
    /// Base64 RSA-SHA256 signature.
    pub pay_sign: String,
}

/// Signs prepay ids for the payment sheet.
#[derive(Clone, Debug)]
pub struct PrepaySigner {
    keys: Arc<KeyMaterial>,
}

impl PrepaySigner {
    /// Create a signer over shared key material.
    pub fn new(keys: Arc<KeyMaterial>) -> Self {
        Self { keys }
    }

    /// Sign `prepay_id` with a fresh timestamp and nonce.
    pub fn sign_prepay(&self, prepay_id: &str) -> Result<PrepaySignature> {
        self.sign_prepay_with(prepay_id, unix_timestamp(), generate_nonce())
    }

    /// Sign `prepay_id` with a fixed timestamp and nonce.
    pub fn sign_prepay_with(
        &self,
        prepay_id: &str,
        timestamp: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Result<PrepaySignature> {
        let timestamp = timestamp.into();
        let nonce = nonce.into();
        let package = format!("prepay_id={prepay_id}");
        let message = prepay_message(self.keys.app_id(), &timestamp, &nonce, &package);

        Ok(PrepaySignature {
            pay_sign: self.keys.sign_message(&message)?,
            time_stamp: timestamp,
            nonce_str: nonce,
            package,
            sign_type: PREPAY_SIGN_TYPE.to_string(),
        })
    }
}

/// The string signed for the payment sheet.
pub fn prepay_message(app_id: &str, timestamp: &str, nonce: &str, package: &str) -> String {
    format!("{app_id}\n{timestamp}\n{nonce}\n{package}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{merchant_keys, verify_merchant_signature};

    #[test]
    fn test_prepay_message_layout() {
        assert_eq!(
            prepay_message("wx1", "1700000000", "abc", "prepay_id=wx201410272009395522657a690389285100"),
            "wx1\n1700000000\nabc\nprepay_id=wx201410272009395522657a690389285100\n"
        );
    }

    #[test]
    fn test_sign_prepay_bundle() {
        let signer = PrepaySigner::new(merchant_keys());
        let bundle = signer.sign_prepay_with("wx2017", "1700000000", "n0nce12345").unwrap();

        assert_eq!(bundle.package, "prepay_id=wx2017");
        assert_eq!(bundle.sign_type, "RSA");
        assert_eq!(bundle.time_stamp, "1700000000");

        let expected = "wxd930ea5d5a258f4f\n1700000000\nn0nce12345\nprepay_id=wx2017\n";
        assert!(verify_merchant_signature(expected, &bundle.pay_sign));
    }

    #[test]
    fn test_prepay_signature_differs_from_request_signature_layout() {
        let signer = PrepaySigner::new(merchant_keys());
        let bundle = signer.sign_prepay_with("wx2017", "1", "n").unwrap();
        // Without the app id line the signature must not verify.
        assert!(!verify_merchant_signature("1\nn\nprepay_id=wx2017\n", &bundle.pay_sign));
    }

    #[test]
    fn test_serializes_with_payment_sheet_names() {
        let signer = PrepaySigner::new(merchant_keys());
        let bundle = signer.sign_prepay("wx2017").unwrap();
        let json = serde_json::to_value(&bundle).unwrap();

        for key in ["timeStamp", "nonceStr", "package", "signType", "paySign"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
