mod config;

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use do_exporter_client::{AccountClient, TokenSource};
use do_exporter_common::error::Result;
use do_exporter_metrics::{AccountCollector, ExporterState, MetricsRegistry, exporter_router};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, ExporterConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "do_exporter=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    info!("Starting do_exporter");

    match run(cli).await {
        Ok(()) => {
            info!("do_exporter stopped");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, kind = err.kind(), "do_exporter failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ExporterConfig::load(cli)?;

    let tokens: Arc<dyn TokenSource> = Arc::new(config.tokens.clone());
    let client = AccountClient::new(&config.api_url, tokens)?;
    info!(endpoint = %client.endpoint(), timeout = ?config.timeout, "account client configured");

    let registry = Arc::new(MetricsRegistry::new());
    registry.register_collector(Arc::new(AccountCollector::with_timeout(
        Arc::new(client),
        config.timeout,
    )))?;
    for descriptor in registry.describe_all() {
        info!(metric = %descriptor.name, "registered metric");
    }

    let state = Arc::new(ExporterState::new(registry, config.telemetry_path.clone()));
    let app = exporter_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_address).await?;
    info!(
        "do_exporter listening on {} (metrics at {})",
        config.listen_address, config.telemetry_path
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
