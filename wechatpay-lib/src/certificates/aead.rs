//! AES-256-GCM decryption of platform payloads.
//!
//! The platform encrypts certificates and notification bodies with the API v3
//! key. The envelope carries base64 `ciphertext` (encrypted body followed by a
//! 16-byte authentication tag), a 12-character `nonce` used as raw bytes, and
//! `associated_data` bound into the tag.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::types::EncryptedResource;

/// The only algorithm the platform uses.
pub const ALGORITHM: &str = "AEAD_AES_256_GCM";

/// Size of the nonce in bytes (96 bits for GCM).
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Decryption error types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecryptError {
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("Invalid nonce length: expected 12 bytes, got {0}")]
    InvalidNonce(usize),
    #[error("Invalid ciphertext encoding: {0}")]
    InvalidEncoding(String),
    #[error("Ciphertext too short: {0} bytes")]
    TooShort(usize),
    #[error("Authentication tag mismatch")]
    AuthenticationFailed,
}

/// Result type for decryption operations.
pub type DecryptResult<T> = Result<T, DecryptError>;

/// Decrypt an envelope with `key`.
///
/// Nothing is returned unless the tag verifies.
pub fn decrypt(key: &[u8], resource: &EncryptedResource) -> DecryptResult<Vec<u8>> {
    if resource.algorithm != ALGORITHM {
        return Err(DecryptError::UnsupportedAlgorithm(resource.algorithm.clone()));
    }

    let nonce = resource.nonce.as_bytes();
    if nonce.len() != NONCE_SIZE {
        return Err(DecryptError::InvalidNonce(nonce.len()));
    }

    let sealed = BASE64
        .decode(resource.ciphertext.trim())
        .map_err(|e| DecryptError::InvalidEncoding(e.to_string()))?;
    if sealed.len() < TAG_SIZE {
        return Err(DecryptError::TooShort(sealed.len()));
    }

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| DecryptError::InvalidKeyLength(key.len()))?;

    // aes-gcm expects the tag appended to the body, which is the wire layout.
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: &sealed,
                aad: resource.associated_data.as_bytes(),
            },
        )
        .map_err(|_| DecryptError::AuthenticationFailed)
}
