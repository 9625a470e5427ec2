//! Shared state passed to every event handler.

use std::sync::Arc;

use crate::audit::AuditInterceptor;
use crate::collaborators::{IncidentStore, RouteService};
use crate::sessions::SessionRegistry;
use crate::websocket::broadcast::BroadcastManager;

/// Dependencies available to event handlers and the dispatch loop.
///
/// Built once at server startup; collaborators are trait objects so
/// tests substitute in-memory implementations.
pub struct GatewayContext {
    /// Live-session registry.
    pub sessions: Arc<SessionRegistry>,
    /// Fan-out to connected clients.
    pub broadcast: Arc<BroadcastManager>,
    /// Incident persistence collaborator.
    pub incidents: Arc<dyn IncidentStore>,
    /// Route computation collaborator.
    pub routes: Arc<dyn RouteService>,
    /// Audit interceptor, passed explicitly rather than held globally.
    pub audit: AuditInterceptor,
    /// Corridor distance in meters for proximity alerts.
    pub corridor_distance_m: f64,
}
