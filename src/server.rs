//! HTTP endpoints for health checks and relay info.

use anyhow::Result;
use axum::{extract::State, http::header, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::{future::Future, net::SocketAddr, sync::Arc};
use tracing::{debug, info};

use crate::relay::{Relay, RelayStats};

struct HttpState {
    relay: Arc<Relay>,
    info: RelayInfo,
}

/// Response body for the `/healthz` endpoint.
#[derive(Serialize, Deserialize)]
struct Health {
    /// Always "ok" when the server is running.
    status: String,
    connections: usize,
    subscriptions: usize,
    events: usize,
}

impl Health {
    fn ok(stats: RelayStats) -> Self {
        Self {
            status: "ok".to_string(),
            connections: stats.connections,
            subscriptions: stats.subscriptions,
            events: stats.events,
        }
    }
}

/// Minimal NIP-11 relay information document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayInfo {
    /// Human-readable relay name.
    pub name: String,
    pub description: String,
    /// Software identifier (always "relaylite").
    pub software: String,
    /// Semantic version string such as "0.1.0".
    pub version: String,
    pub supported_nips: Vec<u32>,
}

impl RelayInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            software: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
            supported_nips: vec![1],
        }
    }
}

/// Start an HTTP server exposing `/healthz` and relay info.
pub async fn serve_http(
    addr: SocketAddr,
    relay: Arc<Relay>,
    info: RelayInfo,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "http listening");
    axum::serve(listener, router(relay, info).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

fn router(relay: Arc<Relay>, info: RelayInfo) -> Router {
    Router::new()
        .route("/", get(relay_info))
        .route("/healthz", get(healthz))
        .with_state(Arc::new(HttpState { relay, info }))
}

/// Health check endpoint with live relay counters.
async fn healthz(State(state): State<Arc<HttpState>>) -> Json<Health> {
    let stats = state.relay.stats();
    debug!(?stats, "GET /healthz");
    Json(Health::ok(stats))
}

async fn relay_info(State(state): State<Arc<HttpState>>) -> impl axum::response::IntoResponse {
    debug!("GET /");
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(state.info.clone()),
    )
}
