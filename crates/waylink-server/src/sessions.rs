//! Live-session state, one entry per authenticated connection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use waylink_auth::Claims;
use waylink_core::geo::GeoPoint;
use waylink_core::role::Role;
use waylink_core::route::Route;

/// Navigation state of a session.
///
/// `Idle → Navigating` on start, `Navigating → Navigating` on
/// recalculation (route replaced), `Navigating → Idle` on stop,
/// destination reached, or disconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavState {
    /// Connected but not following a route.
    Idle,
    /// Actively following `active_route`.
    Navigating,
}

/// Server-side state for one live, authenticated connection.
#[derive(Clone, Debug)]
pub struct Session {
    /// Opaque connection identifier, unique for the connection's lifetime.
    pub connection_id: String,
    /// User id from the verified claims.
    pub user_id: String,
    /// Granted role.
    pub role: Role,
    /// When authentication succeeded.
    pub authenticated_at: DateTime<Utc>,
    /// Route currently navigated, if any. Replaced wholesale on
    /// recalculation so readers never see a half-updated route.
    pub active_route: Option<Arc<Route>>,
    /// Last reported position.
    pub last_position: Option<GeoPoint>,
    /// Navigation state.
    pub nav_state: NavState,
}

impl Session {
    /// Build a fresh idle session from verified claims.
    pub fn new(connection_id: impl Into<String>, claims: &Claims) -> Self {
        Self {
            connection_id: connection_id.into(),
            user_id: claims.sub.clone(),
            role: claims.role,
            authenticated_at: Utc::now(),
            active_route: None,
            last_position: None,
            nav_state: NavState::Idle,
        }
    }

    /// Whether this session should be considered for proximity alerts.
    pub fn is_navigating(&self) -> bool {
        self.nav_state == NavState::Navigating && self.active_route.is_some()
    }
}

/// Registry of live sessions, keyed by connection id.
///
/// A session exists here iff its connection is open and authenticated.
/// All mutations go through this registry; reads hand out cloned
/// snapshots so no caller can observe a mutation in progress.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a session, keyed by its connection id.
    pub async fn insert(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        let _ = sessions.insert(session.connection_id.clone(), session);
    }

    /// Remove a session on disconnect. Returns the removed session.
    pub async fn remove(&self, connection_id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(connection_id)
    }

    /// Snapshot of a session by connection id.
    pub async fn get(&self, connection_id: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(connection_id).cloned()
    }

    /// Attach (or replace) the active route, moving the session to
    /// `Navigating`. The `Arc` swap is atomic with respect to readers.
    pub async fn set_route(&self, connection_id: &str, route: Arc<Route>) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(connection_id) {
            Some(session) => {
                session.active_route = Some(route);
                session.nav_state = NavState::Navigating;
                true
            }
            None => false,
        }
    }

    /// Detach the active route, returning the session to `Idle`.
    pub async fn clear_route(&self, connection_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(connection_id) {
            Some(session) => {
                session.active_route = None;
                session.nav_state = NavState::Idle;
                true
            }
            None => false,
        }
    }

    /// Record the client's last known position.
    pub async fn update_position(&self, connection_id: &str, position: GeoPoint) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(connection_id) {
            Some(session) => {
                session.last_position = Some(position);
                true
            }
            None => false,
        }
    }

    /// Snapshots of all sessions currently navigating a route.
    pub async fn navigating(&self) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| s.is_navigating())
            .cloned()
            .collect()
    }

    /// Number of navigating sessions.
    pub async fn navigating_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|s| s.is_navigating()).count()
    }

    /// Total number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
