//! # Token Inspector
//!
//! Authenticates one token and prints the resulting principal as JSON.
//!
//! ```text
//! virava-inspect <token>
//! echo "$TOKEN" | virava-inspect
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `VIRAVA_ROLE_TABLE` - path of the role table JSON file (required)
//! - `VIRAVA_*` token settings, see `virava_authz::config`
//! - `RUST_LOG` - Log level (default: info)
//!
//! Logs go to stderr; stdout carries only the JSON document.

use std::io::Read;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use virava_authz::{extract_bearer, AuthTokenConfig, Authenticator, RoleTable};

fn read_token() -> anyhow::Result<String> {
    let raw = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read token from stdin")?;
            input
        }
    };

    let raw = raw.trim();
    let token = extract_bearer(raw).unwrap_or(raw);
    if token.is_empty() {
        bail!("No token supplied");
    }
    Ok(token.to_string())
}

async fn run() -> anyhow::Result<()> {
    let config = AuthTokenConfig::from_env()?;
    let table_path = std::env::var("VIRAVA_ROLE_TABLE").context("VIRAVA_ROLE_TABLE must be set")?;
    let role_config = RoleTable::from_path(&table_path)?.build()?;

    let authenticator = Authenticator::new(&config, Arc::new(role_config))?;
    let token = read_token()?;

    let authentication = authenticator.authenticate(&token).await?;
    let output = json!({
        "principal": authentication.principal(),
        "roles": authentication.roles(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("virava-inspect v{}", virava_authz::VERSION);

    if let Err(e) = run().await {
        error!("{:#}", e);
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
