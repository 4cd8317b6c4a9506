//! Platform certificate management.
//!
//! The platform signs every response with one of its certificates and rotates
//! them from time to time. [`CertificateStore`] downloads the current set from
//! `GET /v3/certificates`, decrypts each entry with the API v3 key and caches
//! the public keys by serial.
//!
//! # Refresh semantics
//!
//! - Every entry is decrypted into a staging map first. The cache is only
//!   touched when the whole bundle decrypted, so a corrupt bundle never leaves
//!   a partially updated cache behind.
//! - Entries are merged, not replaced: serials absent from a newer bundle stay
//!   cached, serials present in it are overwritten.
//! - At most one refresh runs at a time. Callers that missed the cache while a
//!   refresh was in flight wait for it and re-check the cache instead of
//!   starting another download.
//! - Nothing here retries; a failed refresh is reported to the caller that
//!   started it.

mod aead;
mod types;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use rsa::RsaPublicKey;
use tokio::sync::Mutex;

pub use aead::{decrypt, DecryptError, DecryptResult, ALGORITHM, NONCE_SIZE, TAG_SIZE};
pub use types::{CertificateList, EncryptedCertificateEntry, EncryptedResource, PlatformCertificate};

use crate::keys::KeyMaterial;
use crate::signing::RequestSigner;
use crate::transport::{HttpRequest, Transport};
use crate::x509::parse_certificate;
use crate::{Result, WechatPayError};

/// Path of the certificate list endpoint.
pub const CERTIFICATES_PATH: &str = "/v3/certificates";

type Cache = HashMap<String, Arc<PlatformCertificate>>;

/// Cache of platform certificates for one merchant.
///
/// Reads go through a `RwLock` and never wait on the network.
pub struct CertificateStore {
    keys: Arc<KeyMaterial>,
    signer: RequestSigner,
    transport: Arc<dyn Transport + Send + Sync>,
    cache: RwLock<Cache>,
    refresh_lock: Mutex<()>,
    /// Completed refresh attempts, successful or not.
    generation: AtomicU64,
}

impl CertificateStore {
    /// Create an empty store.
    pub fn new(keys: Arc<KeyMaterial>, transport: Arc<dyn Transport + Send + Sync>) -> Self {
        Self {
            signer: RequestSigner::new(keys.clone()),
            keys,
            transport,
            cache: RwLock::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Download, decrypt and merge the current certificate list.
    ///
    /// Returns the number of certificates in the downloaded bundle.
    ///
    /// # Errors
    ///
    /// Transport and API errors are passed through. Any entry that fails to
    /// decrypt or parse fails the whole refresh with
    /// [`WechatPayError::CertificateDecryption`]; the cache is then unchanged.
    pub async fn refresh(&self) -> Result<usize> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Public key for `serial`, refreshing once on a cache miss.
    ///
    /// # Errors
    ///
    /// [`WechatPayError::CertificateNotFound`] if the serial is still unknown
    /// after the refresh.
    pub async fn get_public_key(&self, serial: &str) -> Result<RsaPublicKey> {
        Ok(self.get_certificate(serial).await?.public_key.clone())
    }

    /// Cached certificate for `serial`, refreshing once on a cache miss.
    #[tracing::instrument(skip(self))]
    pub async fn get_certificate(&self, serial: &str) -> Result<Arc<PlatformCertificate>> {
        if let Some(cert) = self.cached(serial)? {
            tracing::debug!("platform certificate cache hit");
            return Ok(cert);
        }

        let observed = self.generation.load(Ordering::SeqCst);
        let _guard = self.refresh_lock.lock().await;

        if let Some(cert) = self.cached(serial)? {
            tracing::debug!("platform certificate installed by concurrent refresh");
            return Ok(cert);
        }
        if self.generation.load(Ordering::SeqCst) != observed {
            // A refresh finished while we waited and did not produce this serial.
            return Err(WechatPayError::certificate_not_found(serial));
        }

        tracing::debug!("platform certificate cache miss, refreshing");
        self.refresh_locked().await?;

        self.cached(serial)?
            .ok_or_else(|| WechatPayError::certificate_not_found(serial))
    }

    /// Cached certificate for `serial`, without touching the network.
    pub fn cached(&self, serial: &str) -> Result<Option<Arc<PlatformCertificate>>> {
        let cache = self.cache.read().map_err(|_| lock_error())?;
        Ok(cache.get(serial).cloned())
    }

    /// All cached certificates, ordered by serial.
    pub fn snapshot(&self) -> Result<Vec<Arc<PlatformCertificate>>> {
        let cache = self.cache.read().map_err(|_| lock_error())?;
        let mut certs: Vec<_> = cache.values().cloned().collect();
        certs.sort_by(|a, b| a.serial_no.cmp(&b.serial_no));
        Ok(certs)
    }

    /// Number of cached certificates.
    pub fn len(&self) -> Result<usize> {
        let cache = self.cache.read().map_err(|_| lock_error())?;
        Ok(cache.len())
    }

    /// True if nothing has been cached yet.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Must be called with `refresh_lock` held.
    async fn refresh_locked(&self) -> Result<usize> {
        let result = self.fetch_bundle().await;

        let outcome = match result {
            Ok(staged) => {
                let count = staged.len();
                match self.cache.write() {
                    Ok(mut cache) => {
                        cache.extend(staged);
                        tracing::debug!(count, total = cache.len(), "platform certificates refreshed");
                        Ok(count)
                    }
                    Err(_) => Err(lock_error()),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "platform certificate refresh failed");
                Err(e)
            }
        };

        self.generation.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    async fn fetch_bundle(&self) -> Result<Cache> {
        let authorization = self.signer.sign("GET", CERTIFICATES_PATH, None)?;
        let request = HttpRequest::new("GET", CERTIFICATES_PATH, None)
            .with_header("Authorization", authorization.to_header_value());

        let response = self.transport.send(request).await?.error_for_status()?;
        let list: CertificateList = serde_json::from_str(&response.body)?;

        let mut staged = HashMap::with_capacity(list.data.len());
        for entry in &list.data {
            let cert = decode_entry(self.keys.platform_secret(), entry)?;
            staged.insert(cert.serial_no.clone(), Arc::new(cert));
        }
        Ok(staged)
    }
}

/// Decrypt and parse one list entry.
fn decode_entry(secret: &[u8], entry: &EncryptedCertificateEntry) -> Result<PlatformCertificate> {
    let plaintext = decrypt(secret, &entry.encrypt_certificate)
        .map_err(|e| WechatPayError::decryption(&entry.serial_no, e.to_string()))?;
    let parsed = parse_certificate(&plaintext)
        .map_err(|reason| WechatPayError::decryption(&entry.serial_no, reason))?;

    if parsed.serial != entry.serial_no.to_ascii_uppercase() {
        tracing::warn!(
            listed = %entry.serial_no,
            actual = %parsed.serial,
            "certificate serial differs from list entry"
        );
    }

    Ok(PlatformCertificate {
        serial_no: entry.serial_no.clone(),
        public_key: parsed.public_key,
        effective_time: types::parse_time(&entry.effective_time, parsed.not_before),
        expire_time: types::parse_time(&entry.expire_time, parsed.not_after),
    })
}

fn lock_error() -> WechatPayError {
    WechatPayError::Internal("certificate cache lock poisoned".to_string())
}

impl std::fmt::Debug for CertificateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateStore")
            .field("cached", &self.len().ok())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
