//! Minimal HTTP + WebSocket transport that pushes `CodeGraph` snapshots
//! (§6.4). The viewer itself is out of scope; this proves the interface.

pub mod handlers;
pub mod router;
pub mod websocket;

use std::sync::Arc;

use reachgraph_core::CodeGraph;
use tokio::sync::{broadcast, RwLock};

/// Shared state: the most recently assembled artifact plus the broadcast
/// channel of `{"type":"graph-update",...}` JSON messages (§6.4), fed by
/// `reachgraph-watch` or a one-shot `analyze` run.
pub struct ServerState {
    pub graph: RwLock<Option<CodeGraph>>,
    pub updates: broadcast::Sender<String>,
}

impl ServerState {
    pub fn new(graph: Option<CodeGraph>, updates: broadcast::Sender<String>) -> Arc<Self> {
        Arc::new(ServerState {
            graph: RwLock::new(graph),
            updates,
        })
    }
}
