//! Per-connection transport state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use metrics::counter;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::dispatch::types::GatewayEvent;
use crate::metrics::BROADCAST_DROPS_TOTAL;

/// Capacity of the per-connection outbound queue. A client that cannot
/// drain this many frames is considered slow and starts losing pushes.
pub const SEND_QUEUE_CAPACITY: usize = 64;

/// Transport-side state for one WebSocket connection.
///
/// Shared between the session loop (which owns the socket) and the
/// broadcast manager (which pushes server events through `tx`). Fields
/// that handlers touch concurrently sit behind their own locks so a
/// broadcast never contends with the session registry.
pub struct ClientConnection {
    /// Connection identifier, same key as the session registry.
    pub id: String,
    /// Remote peer address, for audit records.
    pub addr: String,
    tx: mpsc::Sender<String>,
    last_pong: Mutex<Instant>,
    seen_incidents: Mutex<HashSet<String>>,
    dropped: AtomicU64,
}

impl ClientConnection {
    /// Create connection state around an outbound channel.
    pub fn new(id: impl Into<String>, addr: impl Into<String>, tx: mpsc::Sender<String>) -> Self {
        Self {
            id: id.into(),
            addr: addr.into(),
            tx,
            last_pong: Mutex::new(Instant::now()),
            seen_incidents: Mutex::new(HashSet::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue a text frame. Returns `false` when the client is gone or
    /// too slow; the frame is dropped, never blocked on.
    pub fn send(&self, text: String) -> bool {
        match self.tx.try_send(text) {
            Ok(()) => true,
            Err(_) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                counter!(BROADCAST_DROPS_TOTAL).increment(1);
                warn!(conn = %self.id, "outbound queue full or closed, dropping frame");
                false
            }
        }
    }

    /// Serialize and queue a JSON value.
    pub fn send_json<T: Serialize>(&self, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(text) => self.send(text),
            Err(e) => {
                warn!(conn = %self.id, error = %e, "failed to serialize outbound frame");
                false
            }
        }
    }

    /// Queue a server-pushed event.
    pub fn send_event(&self, event: &GatewayEvent) -> bool {
        self.send_json(event)
    }

    /// Record a pong (or any inbound traffic) as liveness.
    pub fn mark_pong(&self) {
        *self.last_pong.lock() = Instant::now();
    }

    /// Time since the last recorded pong.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Mark an incident as delivered to this client. Returns `true` if
    /// it was newly marked.
    pub fn mark_seen(&self, incident_id: &str) -> bool {
        self.seen_incidents.lock().insert(incident_id.to_owned())
    }

    /// Whether this client has already been shown the incident.
    pub fn has_seen(&self, incident_id: &str) -> bool {
        self.seen_incidents.lock().contains(incident_id)
    }

    /// Number of incidents this client has been shown.
    pub fn seen_count(&self) -> usize {
        self.seen_incidents.lock().len()
    }

    /// Frames dropped on this connection's queue.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn make_conn(capacity: usize) -> (ClientConnection, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ClientConnection::new("c1", "127.0.0.1:9", tx), rx)
    }

    #[tokio::test]
    async fn send_queues_frame() {
        let (conn, mut rx) = make_conn(4);
        assert!(conn.send("hello".into()));
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn send_json_serializes() {
        let (conn, mut rx) = make_conn(4);
        assert!(conn.send_json(&json!({"a": 1})));
        let v: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[tokio::test]
    async fn full_queue_drops_and_counts() {
        let (conn, _rx) = make_conn(1);
        assert!(conn.send("one".into()));
        assert!(!conn.send("two".into()));
        assert_eq!(conn.dropped_frames(), 1);
    }

    #[tokio::test]
    async fn closed_receiver_drops() {
        let (conn, rx) = make_conn(4);
        drop(rx);
        assert!(!conn.send("into the void".into()));
        assert_eq!(conn.dropped_frames(), 1);
    }

    #[test]
    fn seen_set_tracks_incidents() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = ClientConnection::new("c1", "addr", tx);
        assert!(!conn.has_seen("inc_1"));
        assert!(conn.mark_seen("inc_1"));
        assert!(conn.has_seen("inc_1"));
        // Re-marking is not an error, just not new.
        assert!(!conn.mark_seen("inc_1"));
        assert_eq!(conn.seen_count(), 1);
    }

    #[test]
    fn pong_updates_liveness() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = ClientConnection::new("c1", "addr", tx);
        conn.mark_pong();
        assert!(conn.last_pong_elapsed() < Duration::from_secs(1));
    }
}
