//! Fan-out of server-pushed events to connected clients.
//!
//! Delivery of incident lifecycle events is gated on the per-connection
//! seen set: `new_incident` marks recipients as having seen the
//! incident, and later updates go only to connections already marked.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::dispatch::types::GatewayEvent;
use crate::websocket::connection::ClientConnection;

/// Registry of live connections for targeted and fan-out sends.
pub struct BroadcastManager {
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
}

impl BroadcastManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection.
    pub async fn add(&self, conn: Arc<ClientConnection>) {
        let mut connections = self.connections.write().await;
        let _ = connections.insert(conn.id.clone(), conn);
    }

    /// Remove a connection on disconnect.
    pub async fn remove(&self, connection_id: &str) -> Option<Arc<ClientConnection>> {
        let mut connections = self.connections.write().await;
        connections.remove(connection_id)
    }

    /// Look up one connection.
    pub async fn get(&self, connection_id: &str) -> Option<Arc<ClientConnection>> {
        let connections = self.connections.read().await;
        connections.get(connection_id).cloned()
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send one event to one connection. Returns whether it was queued.
    pub async fn send_to(&self, connection_id: &str, event: &GatewayEvent) -> bool {
        match self.get(connection_id).await {
            Some(conn) => conn.send_event(event),
            None => false,
        }
    }

    /// Mark an incident as seen by one connection.
    pub async fn mark_seen(&self, connection_id: &str, incident_id: &str) {
        if let Some(conn) = self.get(connection_id).await {
            let _ = conn.mark_seen(incident_id);
        }
    }

    /// Deliver a new-incident event to the given connections, marking
    /// each recipient as having seen the incident. Returns the number
    /// of connections the event was queued to.
    pub async fn multicast_incident(
        &self,
        connection_ids: &[String],
        incident_id: &str,
        event: &GatewayEvent,
    ) -> usize {
        let connections = self.connections.read().await;
        let mut delivered = 0;
        for id in connection_ids {
            let Some(conn) = connections.get(id) else {
                continue;
            };
            let _ = conn.mark_seen(incident_id);
            if conn.send_event(event) {
                delivered += 1;
            }
        }
        debug!(incident = %incident_id, delivered, "multicast incident");
        delivered
    }

    /// Deliver an incident lifecycle event to every connection that has
    /// already seen the incident. Returns the number queued.
    pub async fn broadcast_to_seen(&self, incident_id: &str, event: &GatewayEvent) -> usize {
        let connections = self.connections.read().await;
        let mut delivered = 0;
        for conn in connections.values() {
            if conn.has_seen(incident_id) && conn.send_event(event) {
                delivered += 1;
            }
        }
        debug!(incident = %incident_id, delivered, "broadcast to seen");
        delivered
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}
