//! HTTP server for fleetd

use crate::completion::{CompletionBackend, CompletionClient, OpenAiBackend};
use crate::routes;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use fleet_common::{ReportConfig, ReportError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Maximum request body size: 1 MiB
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Headroom on top of the completion timeout before a request is abandoned
pub const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Application state shared across handlers. Immutable after startup.
pub struct AppState {
    pub config: ReportConfig,
    pub completion: CompletionClient,
    pub start_time: Instant,
    /// Deadline for a whole /generate request
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(config: ReportConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        let request_timeout = config.timeout() + REQUEST_TIMEOUT_MARGIN;
        Self {
            config,
            completion: CompletionClient::new(backend),
            start_time: Instant::now(),
            request_timeout,
        }
    }

    /// State backed by the real completion service
    pub fn from_config(config: ReportConfig) -> Result<Self, ReportError> {
        let backend = OpenAiBackend::from_config(&config)?;
        Ok(Self::new(config, Arc::new(backend)))
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::report_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.listen.clone();
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down gracefully");
    }
}
