use std::time::Duration;

use clap::Parser;
use do_exporter_client::{DEFAULT_API_URL, StaticTokenSource};
use do_exporter_common::error::{ExporterError, Result};

pub const TOKEN_ENV_VAR: &str = "DO_TOKEN";

#[derive(Debug, Parser)]
#[command(name = "do_exporter", about = "Prometheus exporter for DigitalOcean account metrics")]
pub struct Cli {
    /// Address on which to expose metrics.
    #[arg(long, default_value = ":8080")]
    pub listen_address: String,

    /// Path under which to expose metrics.
    #[arg(long, default_value = "/metrics")]
    pub telemetry_path: String,

    /// Base URL of the DigitalOcean API.
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Upper bound for each account request, in seconds.
    #[arg(long, default_value_t = 3)]
    pub timeout_secs: u64,
}

#[derive(Debug)]
pub struct ExporterConfig {
    pub listen_address: String,
    pub telemetry_path: String,
    pub api_url: String,
    pub timeout: Duration,
    pub tokens: StaticTokenSource,
}

impl ExporterConfig {
    pub fn load(cli: Cli) -> Result<Self> {
        let tokens = StaticTokenSource::from_env(TOKEN_ENV_VAR)?;
        Self::from_parts(cli, tokens)
    }

    pub fn from_parts(cli: Cli, tokens: StaticTokenSource) -> Result<Self> {
        validate_telemetry_path(&cli.telemetry_path)?;

        if cli.timeout_secs == 0 {
            return Err(ExporterError::Config(
                "timeout must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            listen_address: normalize_listen_address(&cli.listen_address)?,
            telemetry_path: cli.telemetry_path,
            api_url: cli.api_url,
            timeout: Duration::from_secs(cli.timeout_secs),
            tokens,
        })
    }
}

/// The path becomes a literal route, so router pattern syntax is refused.
fn validate_telemetry_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(ExporterError::Config(format!(
            "telemetry path must start with '/': {path}"
        )));
    }

    let has_pattern = path.contains(['{', '}'])
        || path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'));
    if has_pattern {
        return Err(ExporterError::Config(format!(
            "telemetry path must be a literal path without route parameters: {path}"
        )));
    }

    Ok(())
}

/// Accepts the `:port` shorthand for "all interfaces".
fn normalize_listen_address(address: &str) -> Result<String> {
    let address = address.trim();
    if address.is_empty() {
        return Err(ExporterError::Config(
            "listen address must not be empty".to_string(),
        ));
    }

    if address.starts_with(':') {
        Ok(format!("0.0.0.0{address}"))
    } else {
        Ok(address.to_string())
    }
}
