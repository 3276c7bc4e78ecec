//! Prometheus HTTP endpoint for stats scraping.
//!
//! Provides:
//! - `/metrics` - Prometheus metrics endpoint over the view collectors
//! - `/views` - JSON snapshot of every registered view
//! - `/health` - Basic health check
//! - `/ready` - Readiness check

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::error::BootstrapError;
use crate::observability::views::{ViewData, ViewRegistry};

/// Prometheus server state.
#[derive(Clone)]
pub struct PrometheusState {
    views: Arc<ViewRegistry>,
}

impl PrometheusState {
    /// Create a new Prometheus state serving the given views.
    pub fn new(views: Arc<ViewRegistry>) -> Self {
        Self { views }
    }
}

/// Create the Prometheus HTTP router.
pub fn create_router(state: PrometheusState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/views", get(views_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle GET /metrics - Prometheus metrics endpoint.
async fn metrics_handler(State(state): State<PrometheusState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.views.registry().gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                format!("Failed to encode metrics: {e}").into_bytes(),
            )
        }
    }
}

/// Handle GET /views - current snapshot of every view.
async fn views_handler(State(state): State<PrometheusState>) -> Json<Vec<ViewData>> {
    Json(state.views.snapshot())
}

/// Handle GET /health - Basic health check.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Handle GET /ready - Readiness check.
async fn ready_handler() -> impl IntoResponse {
    (StatusCode::OK, "READY")
}

/// Running metrics endpoint.
#[derive(Debug)]
pub struct MetricsServer {
    /// Address actually bound (differs from the requested one for port 0).
    pub local_addr: SocketAddr,
    pub handle: JoinHandle<()>,
}

/// Start serving the view registry on `addr`.
///
/// The listener is bound before returning, so a port conflict fails startup
/// instead of surfacing later in the background task.
pub async fn setup_metrics_exporter(
    addr: SocketAddr,
    views: Arc<ViewRegistry>,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<MetricsServer, BootstrapError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| BootstrapError::MetricsListener { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| BootstrapError::MetricsListener { addr, source })?;

    let state = PrometheusState::new(views);
    let handle = tokio::spawn(async move {
        if let Err(e) = run_prometheus_server(listener, state, shutdown_rx).await {
            tracing::error!(error = %e, "Prometheus server error");
        }
    });

    Ok(MetricsServer { local_addr, handle })
}

/// Serve the Prometheus router on an already bound listener.
///
/// # Arguments
///
/// * `listener` - Bound listener
/// * `state` - Views to serve
/// * `shutdown_rx` - Receiver for shutdown signal
pub async fn run_prometheus_server(
    listener: TcpListener,
    state: PrometheusState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let app = create_router(state);

    tracing::info!(address = ?listener.local_addr().ok(), "Starting Prometheus metrics server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            tracing::info!("Prometheus server shutting down");
        })
        .await
}
