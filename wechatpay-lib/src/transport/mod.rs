//! Transport abstraction.
//!
//! The core only needs one operation from the network: send a signed request
//! and hand back status, headers and body. [`ReqwestTransport`] is the default
//! implementation; tests and embedders can supply their own [`Transport`].

#[cfg(feature = "http-transport")]
mod http;
mod traits;

#[cfg(feature = "http-transport")]
pub use http::ReqwestTransport;
pub use traits::{HttpRequest, HttpResponse, Transport};
