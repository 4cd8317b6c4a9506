//! Wire and cache types for platform certificates.

use chrono::{DateTime, Utc};
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};

/// AEAD envelope used for certificates and notification resources.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedResource {
    /// Always `AEAD_AES_256_GCM` today.
    pub algorithm: String,
    /// Associated data bound into the tag; may be empty.
    #[serde(default)]
    pub associated_data: String,
    /// Base64 of body followed by the 16-byte tag.
    pub ciphertext: String,
    /// 12-character nonce, used as raw bytes.
    pub nonce: String,
    /// Payload type tag sent with notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_type: Option<String>,
}

/// One entry of the certificate list response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCertificateEntry {
    pub serial_no: String,
    /// RFC 3339.
    #[serde(default)]
    pub effective_time: String,
    /// RFC 3339.
    #[serde(default)]
    pub expire_time: String,
    pub encrypt_certificate: EncryptedResource,
}

/// Body of `GET /v3/certificates`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateList {
    #[serde(default)]
    pub data: Vec<EncryptedCertificateEntry>,
}

/// A decrypted platform certificate, as cached.
///
/// The validity window is kept for callers that want it; lookups never
/// enforce it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformCertificate {
    /// Serial the platform refers to this certificate by.
    pub serial_no: String,
    /// RSA key platform responses are signed with.
    pub public_key: RsaPublicKey,
    /// Start of validity.
    pub effective_time: DateTime<Utc>,
    /// End of validity.
    pub expire_time: DateTime<Utc>,
}

impl PlatformCertificate {
    /// True if `at` falls inside the validity window.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.effective_time <= at && at <= self.expire_time
    }
}

/// Parse an RFC 3339 timestamp from the list, falling back to the
/// certificate's own validity field.
pub(crate) fn parse_time(value: &str, fallback_unix: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| DateTime::from_timestamp(fallback_unix, 0))
        .unwrap_or_default()
}
