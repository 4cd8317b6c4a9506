//! Merchant key material.
//!
//! [`KeyMaterial`] is built once per client and never mutated. Construction is
//! the only place configuration is validated: a value of this type always holds
//! a usable signing key, the certificate serial derived from the merchant
//! certificate, and a 32-byte platform secret.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::config::WechatPayConfig;
use crate::x509::parse_certificate;
use crate::{Result, WechatPayError};

/// Length of the API v3 key in bytes.
pub const PLATFORM_SECRET_LEN: usize = 32;

/// Merchant credentials used for signing requests and decrypting platform data.
pub struct KeyMaterial {
    merchant_id: String,
    app_id: String,
    signing_key: SigningKey<Sha256>,
    merchant_public_key: RsaPublicKey,
    certificate_serial: String,
    platform_secret: Zeroizing<[u8; PLATFORM_SECRET_LEN]>,
}

impl KeyMaterial {
    /// Validate `config` and load the key material it names.
    ///
    /// # Errors
    ///
    /// Returns [`WechatPayError::Configuration`] naming the first field that is
    /// missing (checked in the order `appid`, `mchid`, `public_key`,
    /// `private_key`, `secret`) or malformed.
    pub fn from_config(config: &WechatPayConfig) -> Result<Self> {
        let required = [
            ("appid", &config.appid),
            ("mchid", &config.mchid),
            ("public_key", &config.public_key),
            ("private_key", &config.private_key),
            ("secret", &config.secret),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(WechatPayError::configuration(field, "must not be empty"));
            }
        }

        let certificate = parse_certificate(config.public_key.as_bytes())
            .map_err(|reason| WechatPayError::configuration("public_key", reason))?;

        let private_key = parse_private_key(&config.private_key)?;
        if private_key.to_public_key() != certificate.public_key {
            return Err(WechatPayError::configuration(
                "private_key",
                "does not match the public key of the merchant certificate",
            ));
        }

        let secret = config.secret.as_bytes();
        if secret.len() != PLATFORM_SECRET_LEN {
            return Err(WechatPayError::configuration(
                "secret",
                format!(
                    "must be exactly {} bytes, got {}",
                    PLATFORM_SECRET_LEN,
                    secret.len()
                ),
            ));
        }
        let mut platform_secret = Zeroizing::new([0u8; PLATFORM_SECRET_LEN]);
        platform_secret.copy_from_slice(secret);

        tracing::debug!(
            mchid = %config.mchid,
            serial = %certificate.serial,
            "loaded merchant key material"
        );

        Ok(Self {
            merchant_id: config.mchid.clone(),
            app_id: config.appid.clone(),
            signing_key: SigningKey::<Sha256>::new(private_key),
            merchant_public_key: certificate.public_key,
            certificate_serial: certificate.serial,
            platform_secret,
        })
    }

    /// Merchant id (`mchid`).
    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    /// App id bound to the merchant.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Serial number of the merchant certificate, upper-case hex.
    pub fn certificate_serial(&self) -> &str {
        &self.certificate_serial
    }

    /// Public key of the merchant certificate.
    pub fn merchant_public_key(&self) -> &RsaPublicKey {
        &self.merchant_public_key
    }

    pub(crate) fn platform_secret(&self) -> &[u8; PLATFORM_SECRET_LEN] {
        &self.platform_secret
    }

    /// Sign `message` with RSA PKCS#1 v1.5 / SHA-256 and return base64.
    pub fn sign_message(&self, message: &str) -> Result<String> {
        let signature = self
            .signing_key
            .try_sign(message.as_bytes())
            .map_err(|e| WechatPayError::Signing(e.to_string()))?;
        Ok(BASE64.encode(signature.to_bytes()))
    }
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| {
            WechatPayError::configuration(
                "private_key",
                format!("expected a PKCS#8 or PKCS#1 RSA private key: {e}"),
            )
        })
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("merchant_id", &self.merchant_id)
            .field("app_id", &self.app_id)
            .field("certificate_serial", &self.certificate_serial)
            .finish_non_exhaustive()
    }
}
