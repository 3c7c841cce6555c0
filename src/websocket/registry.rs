//! WebSocket connection registry
//!
//! Tracks live duplex connections in a DashMap keyed by connection id.
//! Components that notify clients depend on the [`ConnectionGateway`]
//! trait rather than the registry itself, so tests can swap in a
//! recording double and a future deployment could push through an
//! external connection service.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Unique connection identifier
pub type ConnectionId = u64;

/// Frames queued for one connection's writer task
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Serialized JSON payload to deliver as a text frame
    Payload(String),
    /// Ask the writer task to close the socket
    Close,
}

/// Per-connection sender half
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

/// Push access to live connections
///
/// Delivery is best-effort: `push` reports `false` instead of erroring
/// when the peer is gone, and `close` on an unknown id is a no-op.
#[async_trait]
pub trait ConnectionGateway: Send + Sync {
    /// Whether the connection is registered and its writer still runs
    async fn is_alive(&self, id: ConnectionId) -> bool;

    /// Queue a payload for delivery; `false` when it cannot be queued
    async fn push(&self, id: ConnectionId, payload: Value) -> bool;

    /// Force-close the connection from the server side
    async fn close(&self, id: ConnectionId);
}

/// Registry of live WebSocket connections
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, OutboundSender>,
    next_conn_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Register a connection's writer channel, returning its id
    pub fn register(&self, tx: OutboundSender) -> ConnectionId {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.connections.insert(conn_id, tx);
        info!(
            conn_id,
            total_connections = self.connections.len(),
            "WebSocket connection registered"
        );
        conn_id
    }

    /// Drop a connection after its socket tasks finish
    pub fn deregister(&self, conn_id: ConnectionId) {
        if self.connections.remove(&conn_id).is_some() {
            info!(
                conn_id,
                total_connections = self.connections.len(),
                "WebSocket connection deregistered"
            );
        }
    }

    /// Number of registered connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionGateway for ConnectionRegistry {
    async fn is_alive(&self, id: ConnectionId) -> bool {
        self.connections
            .get(&id)
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    async fn push(&self, id: ConnectionId, payload: Value) -> bool {
        let Some(tx) = self.connections.get(&id) else {
            debug!(conn_id = id, "Push to unknown connection dropped");
            return false;
        };
        if tx.send(Outbound::Payload(payload.to_string())).is_err() {
            warn!(conn_id = id, "Push failed; client writer already gone");
            return false;
        }
        true
    }

    async fn close(&self, id: ConnectionId) {
        // Remove first so later pushes fail fast, then tell the writer
        // task to close the socket.
        if let Some((_, tx)) = self.connections.remove(&id) {
            let _ = tx.send(Outbound::Close);
            info!(conn_id = id, "Connection closed by server");
        }
    }
}
