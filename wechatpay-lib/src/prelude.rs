//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use wechatpay_lib::prelude::*;
//! ```

// Client and configuration
pub use crate::{WechatPay, WechatPayConfig};

// Error handling
pub use crate::errors::{WechatPayError, WechatPayErrorCode};
pub use crate::Result;

// Signing and verification
pub use crate::prepay::PrepaySignature;
pub use crate::signing::{AuthorizationHeader, SigningContext};
pub use crate::verify::VerificationContext;

// Transport
pub use crate::transport::{HttpRequest, HttpResponse, Transport};
