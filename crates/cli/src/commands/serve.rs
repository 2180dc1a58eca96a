//! `bixso serve` — Start the HTTP orchestrator.

use anyhow::Context;
use bixso_config::AppConfig;

pub async fn run(port: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::load().context("Failed to load configuration")?;

    if let Some(port) = port {
        config.gateway.port = port;
    }

    // Missing credentials are loud but not fatal
    config.warn_if_degraded();

    bixso_gateway::serve(config)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway failed: {e}"))
}
