//! Prepay command - sign a prepay id for the payment sheet

use anyhow::Result;
use std::path::Path;
use wechatpay_lib::PrepaySigner;

use crate::ui;

pub fn run(config_path: Option<&Path>, prepay_id: &str, _verbose: bool) -> Result<()> {
    let keys = super::load_keys(config_path)?;
    let bundle = PrepaySigner::new(keys).sign_prepay(prepay_id)?;

    ui::json(&serde_json::to_value(&bundle)?);
    Ok(())
}
