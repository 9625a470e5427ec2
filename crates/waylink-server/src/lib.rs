//! # waylink-server
//!
//! Axum HTTP + `WebSocket` gateway for live incident and navigation
//! events.
//!
//! - Connection authentication from the `access_token` handshake cookie
//! - Session registry keyed by connection id
//! - Guard pipeline per inbound event: authenticate → authorize → audit
//! - Event registry with typed payload validation and async dispatch
//! - Incident fan-out: proximity-matched `new_incident`, seen-set
//!   multicast for updates
//! - Heartbeat, health endpoint, Prometheus metrics, graceful shutdown

#![deny(unsafe_code)]

pub mod audit;
pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod health;
pub mod metrics;
pub mod server;
pub mod sessions;
pub mod shutdown;
pub mod websocket;
