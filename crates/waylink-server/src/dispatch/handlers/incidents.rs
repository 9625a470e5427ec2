//! Incident lifecycle handlers: report, update, moderate, vote, list.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use waylink_core::geo::GeoPoint;
use waylink_core::incident::{Incident, IncidentPatch, IncidentStatus, IncidentType, NewIncident};
use waylink_core::proximity::incident_near_route;

use crate::dispatch::context::GatewayContext;
use crate::dispatch::errors::EventError;
use crate::dispatch::registry::{EventHandler, decode_payload};
use crate::dispatch::types::GatewayEvent;
use crate::sessions::Session;

fn check_position(position: GeoPoint) -> Result<(), EventError> {
    if position.is_valid() {
        Ok(())
    } else {
        Err(EventError::Validation {
            message: format!("position ({}, {}) out of range", position.lat, position.lon),
        })
    }
}

fn check_severity(severity: u8) -> Result<(), EventError> {
    if (1..=5).contains(&severity) {
        Ok(())
    } else {
        Err(EventError::Validation {
            message: format!("severity {severity} outside 1..=5"),
        })
    }
}

/// Deliver a freshly reported incident to the reporter and to every
/// navigating session whose route passes within the corridor.
///
/// A proximity failure on one candidate only excludes that candidate:
/// bad route geometry never turns into a failed report.
async fn fan_out_new_incident(ctx: &GatewayContext, reporter: &Session, incident: &Incident) {
    let mut recipients = vec![reporter.connection_id.clone()];
    for candidate in ctx.sessions.navigating().await {
        if candidate.connection_id == reporter.connection_id {
            continue;
        }
        let Some(route) = candidate.active_route.as_ref() else {
            continue;
        };
        match incident_near_route(incident.position, route, ctx.corridor_distance_m) {
            Ok(true) => recipients.push(candidate.connection_id.clone()),
            Ok(false) => {}
            Err(e) => {
                warn!(conn = %candidate.connection_id, error = %e, "proximity check failed, skipping recipient");
            }
        }
    }
    let event = GatewayEvent::new("new_incident", Some(json!({ "incident": incident })));
    let delivered = ctx
        .broadcast
        .multicast_incident(&recipients, &incident.id, &event)
        .await;
    info!(incident = %incident.id, delivered, "new incident fanned out");
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ReportIncidentPayload {
    #[serde(rename = "type")]
    incident_type: IncidentType,
    position: GeoPoint,
    severity: u8,
}

/// `incident.report` — create an incident and alert nearby navigators.
pub struct ReportIncident;

#[async_trait]
impl EventHandler for ReportIncident {
    async fn handle(
        &self,
        payload: Option<Value>,
        session: &Session,
        ctx: &GatewayContext,
    ) -> Result<Value, EventError> {
        let p: ReportIncidentPayload = decode_payload(payload)?;
        check_position(p.position)?;
        check_severity(p.severity)?;

        let incident = ctx
            .incidents
            .create(NewIncident {
                incident_type: p.incident_type,
                position: p.position,
                severity: p.severity,
                reporter_id: session.user_id.clone(),
            })
            .await?;
        fan_out_new_incident(ctx, session, &incident).await;
        Ok(json!({ "incident": incident }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UpdateIncidentPayload {
    id: String,
    #[serde(rename = "type")]
    incident_type: Option<IncidentType>,
    position: Option<GeoPoint>,
    severity: Option<u8>,
}

/// `incident.update` — apply a partial update and notify everyone who
/// has seen the incident.
pub struct UpdateIncident;

#[async_trait]
impl EventHandler for UpdateIncident {
    async fn handle(
        &self,
        payload: Option<Value>,
        _session: &Session,
        ctx: &GatewayContext,
    ) -> Result<Value, EventError> {
        let p: UpdateIncidentPayload = decode_payload(payload)?;
        if let Some(position) = p.position {
            check_position(position)?;
        }
        if let Some(severity) = p.severity {
            check_severity(severity)?;
        }

        let incident = ctx
            .incidents
            .update(
                &p.id,
                IncidentPatch {
                    incident_type: p.incident_type,
                    position: p.position,
                    severity: p.severity,
                },
            )
            .await?;
        let event = GatewayEvent::new("incident_update", Some(json!({ "incident": incident })));
        let _ = ctx.broadcast.broadcast_to_seen(&incident.id, &event).await;
        Ok(json!({ "incident": incident }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ChangeIncidentStatusPayload {
    id: String,
    status: IncidentStatus,
}

/// `incident.status_change` — moderation status transition.
///
/// Registered admin-only; the authorization guard enforces the role
/// before this handler runs.
pub struct ChangeIncidentStatus;

#[async_trait]
impl EventHandler for ChangeIncidentStatus {
    async fn handle(
        &self,
        payload: Option<Value>,
        session: &Session,
        ctx: &GatewayContext,
    ) -> Result<Value, EventError> {
        let p: ChangeIncidentStatusPayload = decode_payload(payload)?;
        let incident = ctx.incidents.change_status(&p.id, p.status).await?;
        info!(incident = %incident.id, status = ?p.status, moderator = %session.user_id, "incident status changed");
        let event = GatewayEvent::new(
            "incident_status_change",
            Some(json!({ "incident": incident })),
        );
        let _ = ctx.broadcast.broadcast_to_seen(&incident.id, &event).await;
        Ok(json!({ "incident": incident }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct IncidentIdPayload {
    id: String,
}

/// `incident.confirm` — add one confirmation vote.
pub struct ConfirmIncident;

#[async_trait]
impl EventHandler for ConfirmIncident {
    async fn handle(
        &self,
        payload: Option<Value>,
        _session: &Session,
        ctx: &GatewayContext,
    ) -> Result<Value, EventError> {
        let p: IncidentIdPayload = decode_payload(payload)?;
        let incident = ctx.incidents.confirm(&p.id).await?;
        let event = GatewayEvent::new("incident_update", Some(json!({ "incident": incident })));
        let _ = ctx.broadcast.broadcast_to_seen(&incident.id, &event).await;
        Ok(json!({ "incident": incident }))
    }
}

/// `incident.deny` — add one denial vote.
pub struct DenyIncident;

#[async_trait]
impl EventHandler for DenyIncident {
    async fn handle(
        &self,
        payload: Option<Value>,
        _session: &Session,
        ctx: &GatewayContext,
    ) -> Result<Value, EventError> {
        let p: IncidentIdPayload = decode_payload(payload)?;
        let incident = ctx.incidents.deny(&p.id).await?;
        let event = GatewayEvent::new("incident_update", Some(json!({ "incident": incident })));
        let _ = ctx.broadcast.broadcast_to_seen(&incident.id, &event).await;
        Ok(json!({ "incident": incident }))
    }
}

/// `incident.list` — list incidents and mark them seen by the caller,
/// so later updates reach this connection too.
pub struct ListIncidents;

#[async_trait]
impl EventHandler for ListIncidents {
    async fn handle(
        &self,
        _payload: Option<Value>,
        session: &Session,
        ctx: &GatewayContext,
    ) -> Result<Value, EventError> {
        let incidents = ctx.incidents.list().await?;
        for incident in &incidents {
            ctx.broadcast
                .mark_seen(&session.connection_id, &incident.id)
                .await;
        }
        Ok(json!({ "incidents": incidents }))
    }
}
