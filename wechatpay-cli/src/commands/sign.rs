//! Sign command - print the Authorization header for a request

use anyhow::{Context, Result};
use std::path::Path;
use wechatpay_lib::RequestSigner;

use crate::ui;

pub fn run(
    config_path: Option<&Path>,
    method: &str,
    path: &str,
    body: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let keys = super::load_keys(config_path)?;
    let body = body
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("Body is not valid JSON")?;

    let header = RequestSigner::new(keys.clone()).sign(method, path, body.as_ref())?;
    tracing::debug!(serial = %keys.certificate_serial(), "signed request");

    if verbose {
        ui::header("Signed Request");
        ui::key_value("Method", &method.to_ascii_uppercase());
        ui::key_value("Path", path);
        ui::key_value("Timestamp", &header.timestamp);
        ui::key_value("Nonce", &header.nonce_str);
        ui::key_value("Serial", &header.serial_no);
        println!();
    }
    println!("{}", header);

    Ok(())
}
