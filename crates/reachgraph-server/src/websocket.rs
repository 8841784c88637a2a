//! WebSocket transport for the §6.4 `{type: "graph-update", graph}`
//! envelope.
//!
//! The viewer that would normally drive this socket is out of scope —
//! there is no client-to-server protocol to speak of beyond the initial
//! upgrade. A connecting client receives the current graph (if one has
//! been assembled yet) immediately, then every subsequent update
//! `reachgraph-watch` broadcasts, verbatim.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::ServerState;

/// The sole message shape this transport emits (§6.4).
#[derive(Debug, Serialize)]
struct GraphUpdate<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    graph: &'a reachgraph_core::CodeGraph,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    info!("websocket client connected");
    let (mut sender, mut receiver) = socket.split();
    let mut updates = state.updates.subscribe();

    if let Some(graph) = state.graph.read().await.as_ref() {
        let envelope = GraphUpdate { kind: "graph-update", graph };
        match serde_json::to_string(&envelope) {
            Ok(json) => {
                if sender.send(Message::Text(json)).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!("failed to serialize initial graph update: {e}"),
        }
    }

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                debug!("websocket client disconnected");
                break;
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("websocket connection closed");
}
