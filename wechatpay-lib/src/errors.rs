//! Error types for WeChat Pay operations.
//!
//! Every cryptographic or parsing failure is converted into one of these
//! variants at the boundary of the operation that detected it, so callers
//! never see raw errors from the underlying crypto crates.

use std::fmt;

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum WechatPayErrorCode {
    /// Missing or malformed key material / configuration
    Configuration = 1000,
    /// Signing the request failed
    Signing = 1001,
    /// Platform certificate bundle could not be decrypted
    CertificateDecryption = 2000,
    /// Platform certificate serial unknown after refresh
    CertificateNotFound = 2001,
    /// Notification resource could not be decrypted
    ResourceDecryption = 2002,
    /// Response signature did not match
    SignatureRejected = 3000,
    /// Required response header missing
    MissingHeader = 3001,
    /// Transport/network layer error
    Transport = 4000,
    /// Connection failed
    ConnectionFailed = 4001,
    /// Connection timeout
    ConnectionTimeout = 4002,
    /// Remote API returned an error status
    Api = 5000,
    /// Rate limited by the remote API
    RateLimited = 5001,
    /// Serialization error
    Serialization = 6000,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Comprehensive error type for WeChat Pay operations.
#[derive(Debug)]
pub enum WechatPayError {
    /// Key material or configuration is missing or malformed.
    ///
    /// Raised at construction time only; never retried.
    Configuration {
        /// Configuration field name (e.g. `"secret"`)
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// The merchant private key failed to produce a signature.
    Signing(String),

    /// A platform certificate entry failed AEAD decryption or parsing.
    ///
    /// The certificate cache is left untouched when this is returned.
    CertificateDecryption {
        /// Serial number of the offending entry
        serial: String,
        /// Failure reason
        reason: String,
    },

    /// An encrypted notification resource failed AEAD decryption.
    ResourceDecryption {
        /// The resource's `original_type`, or `"resource"` when absent
        resource: String,
        /// Failure reason
        reason: String,
    },

    /// No platform certificate with this serial, even after a refresh.
    CertificateNotFound {
        /// Serial number that was requested
        serial: String,
    },

    /// A response carried a signature that does not verify.
    SignatureRejected {
        /// Serial of the platform certificate the response claimed
        serial: String,
    },

    /// A response is missing one of the signature headers.
    MissingHeader(String),

    /// Transport/network layer error.
    Transport(String),

    /// Connection failed.
    ConnectionFailed {
        /// Target endpoint or service
        target: String,
        /// Underlying error message
        reason: String,
    },

    /// Connection timeout.
    ConnectionTimeout {
        /// Operation that timed out
        operation: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// The API answered with a non-success status.
    Api {
        /// HTTP status code
        status: u16,
        /// Error code from the response body, when present
        code: Option<String>,
        /// Error message from the response body (or the raw body)
        message: String,
    },

    /// Rate limited, should retry after delay.
    RateLimited {
        /// Suggested retry delay in milliseconds
        retry_after_ms: u64,
    },

    /// Serialization/deserialization error.
    Serialization(String),

    /// Internal/unexpected error.
    Internal(String),
}

impl WechatPayError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> WechatPayErrorCode {
        match self {
            Self::Configuration { .. } => WechatPayErrorCode::Configuration,
            Self::Signing(_) => WechatPayErrorCode::Signing,
            Self::CertificateDecryption { .. } => WechatPayErrorCode::CertificateDecryption,
            Self::CertificateNotFound { .. } => WechatPayErrorCode::CertificateNotFound,
            Self::ResourceDecryption { .. } => WechatPayErrorCode::ResourceDecryption,
            Self::SignatureRejected { .. } => WechatPayErrorCode::SignatureRejected,
            Self::MissingHeader(_) => WechatPayErrorCode::MissingHeader,
            Self::Transport(_) => WechatPayErrorCode::Transport,
            Self::ConnectionFailed { .. } => WechatPayErrorCode::ConnectionFailed,
            Self::ConnectionTimeout { .. } => WechatPayErrorCode::ConnectionTimeout,
            Self::Api { .. } => WechatPayErrorCode::Api,
            Self::RateLimited { .. } => WechatPayErrorCode::RateLimited,
            Self::Serialization(_) => WechatPayErrorCode::Serialization,
            Self::Internal(_) => WechatPayErrorCode::Internal,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if this error is potentially recoverable by retrying later.
    ///
    /// Nothing in this crate retries on its own; this is advice for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_)
            | Self::ConnectionFailed { .. }
            | Self::ConnectionTimeout { .. }
            | Self::RateLimited { .. }
            | Self::CertificateDecryption { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns a suggested retry delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            Self::ConnectionTimeout { .. } => Some(1000),
            Self::ConnectionFailed { .. } => Some(2000),
            Self::Transport(_) => Some(1000),
            _ => None,
        }
    }

    /// Create a configuration error.
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a certificate decryption error.
    pub fn decryption(serial: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CertificateDecryption {
            serial: serial.into(),
            reason: reason.into(),
        }
    }

    /// Create a notification resource decryption error.
    pub fn resource_decryption(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResourceDecryption {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Create a certificate-not-found error.
    pub fn certificate_not_found(serial: impl Into<String>) -> Self {
        Self::CertificateNotFound {
            serial: serial.into(),
        }
    }

    /// Name of the offending configuration field, if this is a configuration error.
    pub fn config_field(&self) -> Option<&str> {
        match self {
            Self::Configuration { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for WechatPayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { field, reason } => {
                write!(f, "invalid configuration `{}`: {}", field, reason)
            }
            Self::Signing(msg) => write!(f, "signing failed: {}", msg),
            Self::CertificateDecryption { serial, reason } => {
                write!(
                    f,
                    "failed to decrypt platform certificate {}: {}",
                    serial, reason
                )
            }
            Self::ResourceDecryption { resource, reason } => {
                write!(f, "failed to decrypt {}: {}", resource, reason)
            }
            Self::CertificateNotFound { serial } => {
                write!(f, "platform certificate not found: {}", serial)
            }
            Self::SignatureRejected { serial } => {
                write!(
                    f,
                    "response signature rejected for platform certificate {}",
                    serial
                )
            }
            Self::MissingHeader(name) => write!(f, "missing response header: {}", name),
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
            Self::ConnectionFailed { target, reason } => {
                write!(f, "connection to {} failed: {}", target, reason)
            }
            Self::ConnectionTimeout {
                operation,
                timeout_ms,
            } => {
                write!(f, "{} timed out after {}ms", operation, timeout_ms)
            }
            Self::Api {
                status,
                code,
                message,
            } => match code {
                Some(code) => write!(f, "API error {} ({}): {}", status, code, message),
                None => write!(f, "API error {}: {}", status, message),
            },
            Self::RateLimited { retry_after_ms } => {
                write!(f, "rate limited, retry after {}ms", retry_after_ms)
            }
            Self::Serialization(msg) => write!(f, "serialization error: {}", msg),
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for WechatPayError {}

impl From<serde_json::Error> for WechatPayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
