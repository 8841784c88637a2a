//! REST handlers (§6.1 artifact, §6.4 transport).

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

use crate::ServerState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Returns the most recently assembled `CodeGraph`, or 404 before the
/// first run completes.
pub async fn get_graph(State(state): State<Arc<ServerState>>) -> Result<Json<reachgraph_core::CodeGraph>, StatusCode> {
    let graph = state.graph.read().await;
    graph.clone().map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_check_reports_ok() {
        let response = health_check().await;
        assert_eq!(response.status, "ok");
    }
}
