//! WeChat Pay CLI
//!
//! Command-line front end for signing requests, checking response signatures
//! and decrypting platform payloads.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod ui;

#[derive(Parser)]
#[command(name = "wechatpay")]
#[command(about = "WeChat Pay v3 CLI - sign, verify and decrypt API payloads", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Merchant config file (TOML)
    #[arg(long, global = true, env = "WECHATPAY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Authorization header for a request
    Sign {
        /// HTTP method
        method: String,

        /// Path including query string, e.g. /v3/certificates
        path: String,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },

    /// Sign a prepay id for the payment sheet
    Prepay {
        /// Prepay id returned by order creation
        prepay_id: String,
    },

    /// Download and list platform certificates
    Certificates,

    /// Verify a response signature
    Verify {
        /// Wechatpay-Timestamp header
        #[arg(long)]
        timestamp: String,

        /// Wechatpay-Nonce header
        #[arg(long)]
        nonce: String,

        /// Wechatpay-Signature header
        #[arg(long)]
        signature: String,

        /// Wechatpay-Serial header
        #[arg(long)]
        serial: String,

        /// Response body as received
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,

        /// File holding the response body
        #[arg(long)]
        body_file: Option<PathBuf>,
    },

    /// Decrypt a notification resource
    Decrypt {
        /// Base64 ciphertext (body followed by tag)
        #[arg(long)]
        ciphertext: String,

        /// 12-character nonce
        #[arg(long)]
        nonce: String,

        /// Associated data
        #[arg(long, default_value = "")]
        associated_data: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "wechatpay_cli=debug,wechatpay_lib=debug"
    } else {
        "wechatpay_cli=info,wechatpay_lib=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    // Dispatch commands
    match cli.command {
        Commands::Sign { method, path, body } => {
            commands::sign::run(config_path, &method, &path, body.as_deref(), cli.verbose)?;
        }
        Commands::Prepay { prepay_id } => {
            commands::prepay::run(config_path, &prepay_id, cli.verbose)?;
        }
        Commands::Certificates => {
            commands::certificates::run(config_path, cli.verbose).await?;
        }
        Commands::Verify {
            timestamp,
            nonce,
            signature,
            serial,
            body,
            body_file,
        } => {
            let body = match (body, body_file) {
                (Some(body), _) => body,
                (None, Some(file)) => std::fs::read_to_string(&file)?,
                (None, None) => String::new(),
            };
            commands::verify::run(
                config_path,
                commands::verify::Headers {
                    timestamp,
                    nonce,
                    signature,
                    serial,
                },
                body,
                cli.verbose,
            )
            .await?;
        }
        Commands::Decrypt {
            ciphertext,
            nonce,
            associated_data,
        } => {
            commands::decrypt::run(config_path, ciphertext, nonce, associated_data, cli.verbose)?;
        }
    }

    Ok(())
}
