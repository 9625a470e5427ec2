//! WebSocket transport: per-connection state, fan-out, and the session
//! loop that ties authentication, dispatch, and heartbeats together.

pub mod broadcast;
pub mod connection;
pub mod session;
