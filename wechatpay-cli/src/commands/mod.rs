//! Command implementations

pub mod certificates;
pub mod decrypt;
pub mod prepay;
pub mod sign;
pub mod verify;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use wechatpay_lib::{KeyMaterial, WechatPay};

use crate::config;

/// Load merchant keys without building a network client.
pub fn load_keys(config_path: Option<&Path>) -> Result<Arc<KeyMaterial>> {
    let config = config::load(config_path)?;
    let keys = KeyMaterial::from_config(&config).context("Invalid merchant configuration")?;
    Ok(Arc::new(keys))
}

/// Build a client from the merchant config.
pub fn load_client(config_path: Option<&Path>) -> Result<WechatPay> {
    let config = config::load(config_path)?;
    WechatPay::new(config).context("Invalid merchant configuration")
}
