//! Verify command - check a response signature

use anyhow::{bail, Result};
use std::path::Path;
use wechatpay_lib::VerificationContext;

use crate::ui;

/// Signature headers copied from a response.
pub struct Headers {
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
    pub serial: String,
}

pub async fn run(
    config_path: Option<&Path>,
    headers: Headers,
    body: String,
    verbose: bool,
) -> Result<()> {
    let client = super::load_client(config_path)?;
    let context = VerificationContext::new(
        headers.timestamp,
        headers.nonce,
        body,
        headers.signature,
        headers.serial,
    );

    if verbose {
        ui::header("Verification String");
        println!("{:?}", context.verification_string());
    }

    if client.verify(&context).await? {
        ui::success(&format!("Signature valid (certificate {})", context.serial()));
        Ok(())
    } else {
        ui::error("Signature does not match");
        bail!("response signature rejected for certificate {}", context.serial())
    }
}
