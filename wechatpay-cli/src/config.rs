//! Merchant config file loading.
//!
//! The file names PEM files rather than embedding them:
//!
//! ```toml
//! appid = "wxd930ea5d5a258f4f"
//! mchid = "1900000001"
//! public_key_path = "apiclient_cert.pem"
//! private_key_path = "apiclient_key.pem"
//! secret = "..."
//! # api_url = "https://api.mch.weixin.qq.com"
//! # timeout_secs = 30
//! ```
//!
//! Relative paths are resolved against the file's directory. Anything the
//! file leaves out falls back to the `WECHATPAY_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use wechatpay_lib::WechatPayConfig;

/// Used when neither `--config` nor `WECHATPAY_CONFIG` is given.
pub const DEFAULT_CONFIG_FILE: &str = "wechatpay.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    appid: Option<String>,
    mchid: Option<String>,
    public_key_path: Option<PathBuf>,
    private_key_path: Option<PathBuf>,
    secret: Option<String>,
    api_url: Option<String>,
    timeout_secs: Option<u64>,
    verify_responses: Option<bool>,
}

/// Load the merchant config.
///
/// An explicitly named file must exist; the default file is optional.
pub fn load(path: Option<&Path>) -> Result<WechatPayConfig> {
    let mut config = WechatPayConfig::from_env();

    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    if !required && !path.exists() {
        tracing::debug!("no config file, using environment only");
        return Ok(config);
    }

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let file: FileConfig = toml::from_str(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    if let Some(appid) = file.appid {
        config.appid = appid;
    }
    if let Some(mchid) = file.mchid {
        config.mchid = mchid;
    }
    if let Some(cert) = file.public_key_path {
        config.public_key = read_pem(base, &cert)?;
    }
    if let Some(key) = file.private_key_path {
        config.private_key = read_pem(base, &key)?;
    }
    if let Some(secret) = file.secret {
        config.secret = secret;
    }
    if let Some(api_url) = file.api_url {
        config = config.with_api_url(api_url);
    }
    if let Some(timeout) = file.timeout_secs {
        config = config.with_timeout(timeout);
    }
    if let Some(verify) = file.verify_responses {
        config = config.with_response_verification(verify);
    }

    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

fn read_pem(base: &Path, path: &Path) -> Result<String> {
    let full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    std::fs::read_to_string(&full).with_context(|| format!("Failed to read {}", full.display()))
}
