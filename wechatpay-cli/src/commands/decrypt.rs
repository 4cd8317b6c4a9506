//! Decrypt command - open a notification resource with the API v3 key

use anyhow::{Context, Result};
use std::path::Path;
use wechatpay_lib::certificates::{decrypt, EncryptedResource, ALGORITHM};

use crate::{config, ui};

pub fn run(
    config_path: Option<&Path>,
    ciphertext: String,
    nonce: String,
    associated_data: String,
    verbose: bool,
) -> Result<()> {
    // Only the API v3 key is needed here.
    let config = config::load(config_path)?;
    let resource = EncryptedResource {
        algorithm: ALGORITHM.to_string(),
        associated_data,
        ciphertext,
        nonce,
        original_type: None,
    };

    let plaintext = decrypt(config.secret.as_bytes(), &resource).context("Decryption failed")?;
    let text = String::from_utf8(plaintext).context("Decrypted payload is not UTF-8")?;

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => ui::json(&value),
        Err(_) => println!("{}", text),
    }
    if verbose {
        ui::info(&format!("{} bytes decrypted", text.len()));
    }
    Ok(())
}
