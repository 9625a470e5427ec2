//! Server assembly: shared state, routing, and the serve loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use waylink_auth::TokenVerifier;
use waylink_core::role::Role;

use crate::audit::AuditInterceptor;
use crate::collaborators::{IncidentStore, RouteService};
use crate::config::{GatewayConfig, ServerConfig};
use crate::dispatch::context::GatewayContext;
use crate::dispatch::handlers::incidents::{
    ChangeIncidentStatus, ConfirmIncident, DenyIncident, ListIncidents, ReportIncident,
    UpdateIncident,
};
use crate::dispatch::handlers::navigation::{
    RecalculateRoute, StartNavigation, StopNavigation, UpdatePosition,
};
use crate::dispatch::registry::EventRegistry;
use crate::health::{HealthResponse, health_check};
use crate::sessions::SessionRegistry;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::session::{ACCESS_TOKEN_COOKIE, run_ws_session};

const ADMIN_ONLY: &[Role] = &[Role::Admin];
const ANY_ROLE: &[Role] = &[];

/// Shared state behind every route handler and session task.
pub struct AppState {
    /// Dispatch context (sessions, broadcast, collaborators).
    pub ctx: Arc<GatewayContext>,
    /// Event registry.
    pub registry: Arc<EventRegistry>,
    /// Handshake token verifier.
    pub verifier: TokenVerifier,
    /// Shutdown coordinator.
    pub shutdown: ShutdownCoordinator,
    /// When the server started, for uptime reporting.
    pub start_time: Instant,
    /// Transport settings.
    pub config: ServerConfig,
    /// Prometheus handle when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

/// The full event table. Only moderation requires a role; everything
/// else is open to any authenticated session.
pub fn default_registry() -> EventRegistry {
    let mut registry = EventRegistry::new();
    registry.register("navigation.start", ANY_ROLE, StartNavigation);
    registry.register("navigation.stop", ANY_ROLE, StopNavigation);
    registry.register("navigation.recalculate", ANY_ROLE, RecalculateRoute);
    registry.register("navigation.position", ANY_ROLE, UpdatePosition);
    registry.register("incident.report", ANY_ROLE, ReportIncident);
    registry.register("incident.update", ANY_ROLE, UpdateIncident);
    registry.register("incident.status_change", ADMIN_ONLY, ChangeIncidentStatus);
    registry.register("incident.confirm", ANY_ROLE, ConfirmIncident);
    registry.register("incident.deny", ANY_ROLE, DenyIncident);
    registry.register("incident.list", ANY_ROLE, ListIncidents);
    registry
}

/// The gateway server: owns state, builds the router, serves.
pub struct GatewayServer {
    state: Arc<AppState>,
}

impl GatewayServer {
    /// Assemble a server over the given collaborators.
    pub fn new(
        config: GatewayConfig,
        incidents: Arc<dyn IncidentStore>,
        routes: Arc<dyn RouteService>,
    ) -> Self {
        let ctx = Arc::new(GatewayContext {
            sessions: Arc::new(SessionRegistry::new()),
            broadcast: Arc::new(BroadcastManager::new()),
            incidents,
            routes,
            audit: AuditInterceptor::new(),
            corridor_distance_m: config.corridor_distance_m,
        });
        Self {
            state: Arc::new(AppState {
                ctx,
                registry: Arc::new(default_registry()),
                verifier: TokenVerifier::new(&config.token_secret),
                shutdown: ShutdownCoordinator::new(),
                start_time: Instant::now(),
                config: config.server,
                prometheus: None,
            }),
        }
    }

    /// Attach a Prometheus handle so `/metrics` renders.
    ///
    /// Only valid before the first [`Self::router`] call.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        match Arc::get_mut(&mut self.state) {
            Some(state) => state.prometheus = Some(handle),
            None => info!("state already shared, metrics handle ignored"),
        }
        self
    }

    /// Shared state, for embedding and tests.
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Request shutdown; the serve loop drains and returns.
    pub fn shutdown(&self) {
        self.state.shutdown.shutdown();
    }

    /// Build the router: `/ws`, `/health`, `/metrics`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    /// Serve on an already-bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "gateway listening");
        let token = self.state.shutdown.token();
        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(token.cancelled_owned())
        .await
    }
}

async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    ws: WebSocketUpgrade,
) -> Response {
    let token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_owned());
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_ws_session(state, socket, addr, token))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let connections = state.ctx.broadcast.connection_count().await;
    let navigating = state.ctx.sessions.navigating_count().await;
    Json(health_check(state.start_time, connections, navigating))
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => crate::metrics::render(handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
