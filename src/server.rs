//! HTTP surface: Prometheus scrape endpoint plus liveness and readiness checks.

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::ExporterResult;

#[derive(Clone)]
struct ServerState {
    registry: Registry,
    rx_passes: watch::Receiver<u64>,
}

/// Routes `/metrics`, `/healthz` and `/readyz`. Readiness follows the completed pass count.
pub fn router(registry: Registry, rx_passes: watch::Receiver<u64>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(ServerState { registry, rx_passes })
}

/// Serves `router` on `address` until `shutdown` is cancelled.
#[tracing::instrument(level = "info", skip(router, shutdown))]
pub async fn serve(address: SocketAddr, router: Router, shutdown: CancellationToken) -> ExporterResult<()> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(local_address=?listener.local_addr().ok(), "metrics server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("metrics server stopped");
    Ok(())
}

async fn metrics(State(state): State<ServerState>) -> Response {
    let encoder = TextEncoder::new();
    let families = state.registry.gather();
    let mut body = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut body) {
        tracing::error!(error=?err, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    ([(header::CONTENT_TYPE, encoder.format_type().to_string())], body).into_response()
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<ServerState>) -> (StatusCode, &'static str) {
    if 0 < *state.rx_passes.borrow() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}
