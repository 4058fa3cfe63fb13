pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod render;
pub mod server;
pub mod sheets;
pub mod shutdown;
pub mod sse;
pub mod state;
pub mod tools;

pub use config::{CliArgs, ServerConfig, TransportKind};
pub use error::{ErrorCode, SheetsError, to_mcp_error};
pub use logging::{LoggingConfig, init_logging, shutdown_telemetry};
pub use server::GsheetServer;
pub use state::AppState;

use anyhow::{Context, Result};
use axum::Router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const HTTP_SERVICE_PATH: &str = "/mcp";

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);
    let state = Arc::new(AppState::connect(config.clone())?);

    tracing::info!(
        transport = %config.transport,
        service_account = %config.service_account_path.display(),
        enabled_tools = ?config.enabled_tools,
        "starting Google Sheets MCP server",
    );

    match config.transport {
        TransportKind::Stdio => GsheetServer::from_state(state).run_stdio().await,
        TransportKind::Http => {
            let listener = TcpListener::bind((config.host.as_str(), config.port))
                .await
                .with_context(|| format!("failed to bind {}", config.http_base_url()))?;
            let token = CancellationToken::new();
            shutdown::cancel_on_signal(token.clone());
            serve_http(listener, state, token).await
        }
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> (axum::http::StatusCode, String) {
    (axum::http::StatusCode::OK, metrics::METRICS.encode())
}

/// All HTTP routes: streamable HTTP on `/mcp`, legacy SSE, health and metrics.
pub fn http_router(state: Arc<AppState>, shutdown: CancellationToken) -> Router {
    let service_state = state.clone();
    let service = StreamableHttpService::new(
        move || Ok(GsheetServer::from_state(service_state.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    Router::new()
        .nest_service(HTTP_SERVICE_PATH, service)
        .merge(sse::router(state, shutdown))
        .route("/health", axum::routing::get(health::liveness_handler))
        .route("/metrics", axum::routing::get(metrics_handler))
}

/// Serves the HTTP transports on `listener` until `shutdown` is cancelled.
pub async fn serve_http(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<()> {
    health::mark_started();
    let router = http_router(state, shutdown.clone());
    let addr = listener.local_addr()?;
    tracing::info!(
        transport = "http",
        bind = %addr,
        sse = %format!("http://{addr}{}", sse::SSE_PATH),
        streamable = %format!("http://{addr}{HTTP_SERVICE_PATH}"),
        "listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("http server stopped");
    Ok(())
}
