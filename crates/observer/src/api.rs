//! HTTP API for health checks, Prometheus metrics, and the reconciled state

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use observer_lib::{
    health::{ComponentStatus, HealthRegistry},
    models::{Node, Pod},
    ObserverMetrics, SharedStore,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: ObserverMetrics,
    pub store: SharedStore,
    pub connected: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: ObserverMetrics,
        store: SharedStore,
        connected: watch::Receiver<bool>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            store,
            connected,
        }
    }
}

/// Summary of the reconciled view for the presentation layer
#[derive(Debug, Serialize)]
struct StatusResponse {
    connected: bool,
    nodes: usize,
    pods: usize,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Reconciled node list
async fn nodes(State(state): State<Arc<AppState>>) -> Json<Vec<Node>> {
    let store = state.store.read().await;
    Json(store.nodes().cloned().collect())
}

/// Reconciled pod list, with layout positions applied
async fn pods(State(state): State<Arc<AppState>>) -> Json<Vec<Pod>> {
    let store = state.store.read().await;
    Json(store.pods().cloned().collect())
}

/// Connectivity and resource counts
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let connected = *state.connected.borrow();
    let store = state.store.read().await;

    Json(StatusResponse {
        connected,
        nodes: store.node_count(),
        pods: store.pod_count(),
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/nodes", get(nodes))
        .route("/api/pods", get(pods))
        .route("/api/status", get(status))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
