//! Incident types shared between the gateway and the incident collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Kind of reported incident.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    /// Collision or crash.
    Accident,
    /// Slow or stopped traffic.
    TrafficJam,
    /// Road fully closed.
    RoadClosed,
    /// Police control.
    Police,
    /// Object or hazard on the road.
    Obstacle,
}

/// Moderation status of an incident.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Reported, awaiting validation.
    Pending,
    /// Confirmed by a moderator.
    Validated,
    /// Rejected by a moderator.
    Rejected,
    /// No longer active.
    Resolved,
}

/// A reported incident as held by the incident collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Unique identifier.
    pub id: String,
    /// Kind of incident.
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    /// Where it was reported.
    pub position: GeoPoint,
    /// Severity, `1..=5`.
    pub severity: u8,
    /// Moderation status.
    pub status: IncidentStatus,
    /// User id of the reporter.
    pub reporter_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Number of confirmations from other users.
    pub confirmations: u32,
    /// Number of denials from other users.
    pub denials: u32,
}

/// Payload for creating an incident.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncident {
    /// Kind of incident.
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    /// Where it happened.
    pub position: GeoPoint,
    /// Severity, `1..=5`.
    pub severity: u8,
    /// User id of the reporter.
    pub reporter_id: String,
}

/// Partial update to an incident. `None` fields are left untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPatch {
    /// New kind, if changed.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub incident_type: Option<IncidentType>,
    /// New position, if moved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<GeoPoint>,
    /// New severity, if changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
}

impl Incident {
    /// Build a fresh `pending` incident from a creation payload.
    pub fn from_new(id: impl Into<String>, new: NewIncident) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            incident_type: new.incident_type,
            position: new.position,
            severity: new.severity,
            status: IncidentStatus::Pending,
            reporter_id: new.reporter_id,
            created_at: now,
            updated_at: now,
            confirmations: 0,
            denials: 0,
        }
    }

    /// Apply a partial update, bumping `updated_at`.
    pub fn apply(&mut self, patch: &IncidentPatch) {
        if let Some(t) = patch.incident_type {
            self.incident_type = t;
        }
        if let Some(p) = patch.position {
            self.position = p;
        }
        if let Some(s) = patch.severity {
            self.severity = s;
        }
        self.updated_at = Utc::now();
    }
}
