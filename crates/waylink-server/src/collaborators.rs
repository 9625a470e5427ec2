//! External collaborator interfaces.
//!
//! The gateway never owns incident persistence or route computation; it
//! calls these traits and re-broadcasts the results. The in-memory
//! implementations back the standalone binary and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;
use waylink_core::geo::GeoPoint;
use waylink_core::incident::{Incident, IncidentPatch, IncidentStatus, NewIncident};
use waylink_core::route::{Route, RouteOptions};

/// Failure from a downstream collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// The referenced incident does not exist.
    #[error("incident '{0}' not found")]
    IncidentNotFound(String),

    /// The collaborator could not serve the request.
    #[error("{0}")]
    Unavailable(String),
}

/// Incident persistence collaborator.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Create a new incident.
    async fn create(&self, new: NewIncident) -> Result<Incident, CollaboratorError>;
    /// Apply a partial update.
    async fn update(&self, id: &str, patch: IncidentPatch) -> Result<Incident, CollaboratorError>;
    /// Change moderation status.
    async fn change_status(
        &self,
        id: &str,
        status: IncidentStatus,
    ) -> Result<Incident, CollaboratorError>;
    /// Increment the confirmation counter.
    async fn confirm(&self, id: &str) -> Result<Incident, CollaboratorError>;
    /// Increment the denial counter.
    async fn deny(&self, id: &str) -> Result<Incident, CollaboratorError>;
    /// Fetch one incident.
    async fn get(&self, id: &str) -> Result<Option<Incident>, CollaboratorError>;
    /// List all active incidents.
    async fn list(&self) -> Result<Vec<Incident>, CollaboratorError>;
}

/// Route computation collaborator.
#[async_trait]
pub trait RouteService: Send + Sync {
    /// Compute a route between two points.
    async fn compute(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        options: RouteOptions,
    ) -> Result<Route, CollaboratorError>;

    /// Recompute from the current position to the same destination.
    async fn recalculate(
        &self,
        position: GeoPoint,
        destination: GeoPoint,
        options: RouteOptions,
    ) -> Result<Route, CollaboratorError>;
}

/// In-memory incident store for the standalone binary and tests.
pub struct InMemoryIncidentStore {
    incidents: RwLock<HashMap<String, Incident>>,
}

impl InMemoryIncidentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            incidents: RwLock::new(HashMap::new()),
        }
    }

    async fn mutate(
        &self,
        id: &str,
        f: impl FnOnce(&mut Incident),
    ) -> Result<Incident, CollaboratorError> {
        let mut incidents = self.incidents.write().await;
        match incidents.get_mut(id) {
            Some(incident) => {
                f(incident);
                incident.updated_at = chrono::Utc::now();
                Ok(incident.clone())
            }
            None => Err(CollaboratorError::IncidentNotFound(id.to_owned())),
        }
    }
}

impl Default for InMemoryIncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IncidentStore for InMemoryIncidentStore {
    async fn create(&self, new: NewIncident) -> Result<Incident, CollaboratorError> {
        let id = format!("inc_{}", Uuid::now_v7().simple());
        let incident = Incident::from_new(id.clone(), new);
        let mut incidents = self.incidents.write().await;
        let _ = incidents.insert(id, incident.clone());
        Ok(incident)
    }

    async fn update(&self, id: &str, patch: IncidentPatch) -> Result<Incident, CollaboratorError> {
        self.mutate(id, |incident| incident.apply(&patch)).await
    }

    async fn change_status(
        &self,
        id: &str,
        status: IncidentStatus,
    ) -> Result<Incident, CollaboratorError> {
        self.mutate(id, |incident| incident.status = status).await
    }

    async fn confirm(&self, id: &str) -> Result<Incident, CollaboratorError> {
        self.mutate(id, |incident| incident.confirmations += 1).await
    }

    async fn deny(&self, id: &str) -> Result<Incident, CollaboratorError> {
        self.mutate(id, |incident| incident.denials += 1).await
    }

    async fn get(&self, id: &str) -> Result<Option<Incident>, CollaboratorError> {
        let incidents = self.incidents.read().await;
        Ok(incidents.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Incident>, CollaboratorError> {
        let incidents = self.incidents.read().await;
        let mut all: Vec<Incident> = incidents.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}

/// Straight-line route service for the standalone binary and tests.
///
/// Interpolates a polyline directly between origin and destination; a
/// real deployment substitutes a routing-engine-backed implementation.
pub struct DirectRouteService;

/// Number of interpolated polyline points, endpoints included.
const POLYLINE_POINTS: usize = 9;

#[async_trait]
impl RouteService for DirectRouteService {
    async fn compute(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        options: RouteOptions,
    ) -> Result<Route, CollaboratorError> {
        if !origin.is_valid() || !destination.is_valid() {
            return Err(CollaboratorError::Unavailable(
                "route endpoints out of range".into(),
            ));
        }
        #[allow(clippy::cast_precision_loss)]
        let polyline = (0..POLYLINE_POINTS)
            .map(|i| {
                let t = i as f64 / (POLYLINE_POINTS - 1) as f64;
                GeoPoint::new(
                    t.mul_add(destination.lat - origin.lat, origin.lat),
                    t.mul_add(destination.lon - origin.lon, origin.lon),
                )
            })
            .collect();
        Ok(Route {
            id: format!("route_{}", Uuid::now_v7().simple()),
            origin,
            destination,
            polyline,
            options,
        })
    }

    async fn recalculate(
        &self,
        position: GeoPoint,
        destination: GeoPoint,
        options: RouteOptions,
    ) -> Result<Route, CollaboratorError> {
        self.compute(position, destination, options).await
    }
}
