//! Certificates command - download and list platform certificates

use anyhow::Result;
use std::path::Path;

use crate::ui;

pub async fn run(config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let client = super::load_client(config_path)?;

    let spinner = ui::spinner("Fetching platform certificates...");
    let result = client.refresh_certificates().await;
    spinner.finish_and_clear();

    let count = match result {
        Ok(count) => count,
        Err(e) => {
            ui::error(&format!("Refresh failed: {}", e));
            if e.is_retryable() {
                ui::info("The error looks transient; try again shortly");
            }
            return Err(e.into());
        }
    };
    ui::success(&format!("Downloaded {} platform certificate(s)", count));

    let now = chrono::Utc::now();
    for cert in client.certificates()? {
        ui::header(&cert.serial_no);
        ui::key_value("Effective", &cert.effective_time.to_rfc3339());
        ui::key_value("Expires", &cert.expire_time.to_rfc3339());
        ui::key_value(
            "Status",
            if cert.is_valid_at(now) { "valid" } else { "outside validity window" },
        );
    }

    if verbose {
        println!();
        ui::info(&format!(
            "{} certificate(s) cached in total",
            client.certificate_store().len()?
        ));
    }

    Ok(())
}
