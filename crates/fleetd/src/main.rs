//! Fleet Daemon - DOT fleet compliance report service
//!
//! Serves `POST /generate` and `GET /health`.

use anyhow::{Context, Result};
use fleet_common::{GenerationMode, ReportConfig};
use fleetd::server::{self, AppState};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("[BOOT] fleetd v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = ReportConfig::load().context("Failed to load configuration")?;
    info!(
        "[BOOT] Mode: {}, model: {}, timeout: {}ms",
        config.mode, config.model, config.timeout_ms
    );
    if config.mode == GenerationMode::Live && !config.has_credential() {
        warn!("[BOOT] Live mode without OPENAI_API_KEY: /generate will fail until it is set");
    }

    let state = AppState::from_config(config).context("Failed to initialize completion client")?;
    info!(
        "[BOOT] Completion backend: {}",
        state.completion.backend_name()
    );
    server::run(state).await
}
