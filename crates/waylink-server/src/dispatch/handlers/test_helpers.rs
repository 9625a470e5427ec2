//! Shared fixtures for handler and registry tests.

use std::sync::Arc;

use tokio::sync::mpsc;
use waylink_auth::Claims;
use waylink_core::role::Role;

use crate::audit::AuditInterceptor;
use crate::collaborators::{DirectRouteService, InMemoryIncidentStore};
use crate::dispatch::context::GatewayContext;
use crate::sessions::{Session, SessionRegistry};
use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::connection::ClientConnection;

/// Fresh context over in-memory collaborators and the default corridor.
pub(crate) fn make_test_context() -> Arc<GatewayContext> {
    Arc::new(GatewayContext {
        sessions: Arc::new(SessionRegistry::new()),
        broadcast: Arc::new(BroadcastManager::new()),
        incidents: Arc::new(InMemoryIncidentStore::new()),
        routes: Arc::new(DirectRouteService),
        audit: AuditInterceptor::new(),
        corridor_distance_m: 100.0,
    })
}

/// A connection with a buffered outbound queue the test can drain.
pub(crate) fn make_connection(id: &str) -> (Arc<ClientConnection>, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(32);
    (
        Arc::new(ClientConnection::new(id, "127.0.0.1:40000", tx)),
        rx,
    )
}

/// Register a session and a broadcast entry for one fake client.
pub(crate) async fn connect_client(
    ctx: &GatewayContext,
    connection_id: &str,
    user_id: &str,
    role: Role,
) -> (Arc<ClientConnection>, mpsc::Receiver<String>) {
    let (conn, rx) = make_connection(connection_id);
    ctx.sessions
        .insert(Session::new(
            connection_id,
            &Claims {
                sub: user_id.into(),
                role,
                exp: chrono::Utc::now().timestamp() + 3600,
            },
        ))
        .await;
    ctx.broadcast.add(Arc::clone(&conn)).await;
    (conn, rx)
}
