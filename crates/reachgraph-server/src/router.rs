//! Axum router for the minimal graph-update transport (§6.4).
//!
//! No static asset serving here — the interactive viewer that would
//! consume these routes is out of scope (§1); this crate only proves the
//! `{type: "graph-update", graph}` interface exists and is reachable over
//! HTTP/WebSocket.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::{
    handlers::{get_graph, health_check},
    websocket::ws_handler,
    ServerState,
};

/// Builds the router: a websocket endpoint for live updates plus two
/// REST endpoints for the last-assembled artifact and a health probe.
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/graph", get(get_graph))
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `host:port` and serves the router until the process is killed.
pub async fn serve(state: Arc<ServerState>, host: &str, port: u16) -> anyhow::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("listening on {}:{}", host, port);
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast;

    #[test]
    fn router_builds_with_no_graph_assembled_yet() {
        let (tx, _rx) = broadcast::channel(8);
        let state = ServerState::new(None, tx);
        let _router = create_router(state);
    }
}
