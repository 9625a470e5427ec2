//! The per-connection session loop.
//!
//! Authentication happens once, at the handshake: a failed token check
//! sends a single `auth_error` event and closes the socket before any
//! session state exists. After that, inbound events are handled
//! strictly one at a time so a client's own events never race each
//! other.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use metrics::{counter, gauge, histogram};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;
use waylink_auth::{AuthError, Claims, TokenVerifier};

use crate::dispatch::errors::INVALID_PAYLOAD;
use crate::dispatch::types::{EventAck, EventRequest, GatewayEvent};
use crate::metrics::{
    WS_AUTH_FAILURES_TOTAL, WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE,
    WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
};
use crate::server::AppState;
use crate::sessions::Session;
use crate::websocket::connection::{ClientConnection, SEND_QUEUE_CAPACITY};

/// Cookie carrying the signed access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Verify the handshake token. A missing cookie is its own failure
/// code, distinct from a present-but-bad token.
pub fn authenticate_handshake(
    verifier: &TokenVerifier,
    token: Option<&str>,
) -> Result<Claims, AuthError> {
    match token {
        None => Err(AuthError::NoToken),
        Some(token) => verifier.verify(token),
    }
}

/// Drive one WebSocket connection from handshake to close.
pub async fn run_ws_session(
    state: Arc<AppState>,
    mut socket: WebSocket,
    addr: std::net::SocketAddr,
    token: Option<String>,
) {
    let claims = match authenticate_handshake(&state.verifier, token.as_deref()) {
        Ok(claims) => claims,
        Err(err) => {
            counter!(WS_AUTH_FAILURES_TOTAL, "code" => err.code()).increment(1);
            warn!(%addr, code = err.code(), "handshake authentication failed");
            if let Ok(text) = serde_json::to_string(&GatewayEvent::auth_error(err)) {
                let _ = socket.send(Message::Text(text.into())).await;
            }
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    if state.ctx.broadcast.connection_count().await >= state.config.max_connections {
        warn!(%addr, limit = state.config.max_connections, "connection limit reached");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let connection_id = format!("conn_{}", Uuid::now_v7().simple());
    let (tx, mut outbound) = mpsc::channel(SEND_QUEUE_CAPACITY);
    let conn = Arc::new(ClientConnection::new(&connection_id, addr.to_string(), tx));

    state
        .ctx
        .sessions
        .insert(Session::new(&connection_id, &claims))
        .await;
    state.ctx.broadcast.add(Arc::clone(&conn)).await;
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    info!(conn = %connection_id, user = %claims.sub, role = %claims.role, %addr, "connection established");

    let started = Instant::now();
    let _ = conn.send_event(&GatewayEvent::new(
        "connection.established",
        Some(json!({
            "connectionId": &connection_id,
            "userId": &claims.sub,
            "role": claims.role,
        })),
    ));

    let heartbeat_timeout = Duration::from_secs(state.config.heartbeat_timeout_secs);
    let mut ping = tokio::time::interval(Duration::from_secs(state.config.heartbeat_interval_secs));
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick resolves immediately; consume it so the first real
    // ping happens one interval in.
    let _ = ping.tick().await;
    let shutdown = state.shutdown.token();

    loop {
        tokio::select! {
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    conn.mark_pong();
                    let reply = match serde_json::from_str::<EventRequest>(text.as_str()) {
                        Ok(request) => state.registry.dispatch(request, &state.ctx, &conn).await,
                        Err(e) => {
                            debug!(conn = %connection_id, error = %e, "malformed event frame");
                            EventAck::error("unknown", INVALID_PAYLOAD, format!("Malformed event frame: {e}"))
                        }
                    };
                    match serde_json::to_string(&reply) {
                        Ok(text) => {
                            if socket.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(conn = %connection_id, error = %e, "failed to serialize ack"),
                    }
                }
                Some(Ok(Message::Pong(_))) => conn.mark_pong(),
                Some(Ok(Message::Ping(payload))) => {
                    conn.mark_pong();
                    if socket.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    debug!(conn = %connection_id, "ignoring binary frame");
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(conn = %connection_id, error = %e, "socket error");
                    break;
                }
            },
            pushed = outbound.recv() => match pushed {
                Some(text) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = ping.tick() => {
                if conn.last_pong_elapsed() > heartbeat_timeout {
                    warn!(conn = %connection_id, "heartbeat timeout, closing");
                    break;
                }
                if socket.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            },
            () = shutdown.cancelled() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    // Session and broadcast entries go away together, before the socket
    // task ends, so no fan-out can target a half-closed connection.
    let _ = state.ctx.sessions.remove(&connection_id).await;
    let _ = state.ctx.broadcast.remove(&connection_id).await;
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    info!(conn = %connection_id, user = %claims.sub, "connection closed");
}
