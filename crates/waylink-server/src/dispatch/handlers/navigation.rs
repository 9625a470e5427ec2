//! Navigation lifecycle handlers: start, stop, recalculate, position.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use waylink_core::geo::GeoPoint;
use waylink_core::route::RouteOptions;

use crate::dispatch::context::GatewayContext;
use crate::dispatch::errors::{EventError, NOT_NAVIGATING};
use crate::dispatch::registry::{EventHandler, decode_payload};
use crate::sessions::Session;

fn check_point(label: &str, point: GeoPoint) -> Result<(), EventError> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(EventError::Validation {
            message: format!("{label} ({}, {}) out of range", point.lat, point.lon),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StartNavigationPayload {
    origin: GeoPoint,
    destination: GeoPoint,
    #[serde(default)]
    options: RouteOptions,
}

/// `navigation.start` — compute a route and attach it to the session.
pub struct StartNavigation;

#[async_trait]
impl EventHandler for StartNavigation {
    async fn handle(
        &self,
        payload: Option<Value>,
        session: &Session,
        ctx: &GatewayContext,
    ) -> Result<Value, EventError> {
        let p: StartNavigationPayload = decode_payload(payload)?;
        check_point("origin", p.origin)?;
        check_point("destination", p.destination)?;

        let route = Arc::new(ctx.routes.compute(p.origin, p.destination, p.options).await?);
        if !ctx.sessions.set_route(&session.connection_id, Arc::clone(&route)).await {
            return Err(EventError::Internal {
                message: "session disappeared while starting navigation".into(),
            });
        }
        info!(conn = %session.connection_id, route = %route.id, "navigation started");
        Ok(json!({ "route": &*route, "navigating": true }))
    }
}

/// `navigation.stop` — detach the active route.
///
/// Idempotent: stopping while idle is still a success.
pub struct StopNavigation;

#[async_trait]
impl EventHandler for StopNavigation {
    async fn handle(
        &self,
        _payload: Option<Value>,
        session: &Session,
        ctx: &GatewayContext,
    ) -> Result<Value, EventError> {
        let _ = ctx.sessions.clear_route(&session.connection_id).await;
        info!(conn = %session.connection_id, "navigation stopped");
        Ok(json!({ "navigating": false }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RecalculateRoutePayload {
    position: GeoPoint,
}

/// `navigation.recalculate` — recompute from the current position to
/// the active route's destination, replacing the route wholesale.
pub struct RecalculateRoute;

#[async_trait]
impl EventHandler for RecalculateRoute {
    async fn handle(
        &self,
        payload: Option<Value>,
        session: &Session,
        ctx: &GatewayContext,
    ) -> Result<Value, EventError> {
        let p: RecalculateRoutePayload = decode_payload(payload)?;
        check_point("position", p.position)?;

        let current = session.active_route.as_ref().ok_or(EventError::NotFound {
            code: NOT_NAVIGATING,
            message: "No active route to recalculate".into(),
        })?;
        let route = Arc::new(
            ctx.routes
                .recalculate(p.position, current.destination, current.options)
                .await?,
        );
        if !ctx.sessions.set_route(&session.connection_id, Arc::clone(&route)).await {
            return Err(EventError::Internal {
                message: "session disappeared while recalculating".into(),
            });
        }
        info!(conn = %session.connection_id, route = %route.id, "route recalculated");
        Ok(json!({ "route": &*route, "navigating": true }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UpdatePositionPayload {
    position: GeoPoint,
}

/// `navigation.position` — record the client's last known position.
pub struct UpdatePosition;

#[async_trait]
impl EventHandler for UpdatePosition {
    async fn handle(
        &self,
        payload: Option<Value>,
        session: &Session,
        ctx: &GatewayContext,
    ) -> Result<Value, EventError> {
        let p: UpdatePositionPayload = decode_payload(payload)?;
        check_point("position", p.position)?;
        let _ = ctx
            .sessions
            .update_position(&session.connection_id, p.position)
            .await;
        Ok(json!({ "updated": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handlers::test_helpers::{connect_client, make_test_context};
    use waylink_core::role::Role;

    fn start_payload() -> Value {
        json!({
            "origin": {"lat": 48.85, "lon": 2.35},
            "destination": {"lat": 48.86, "lon": 2.36},
        })
    }

    #[tokio::test]
    async fn start_attaches_route() {
        let ctx = make_test_context();
        let (_conn, _rx) = connect_client(&ctx, "c1", "u1", Role::Rider).await;
        let session = ctx.sessions.get("c1").await.unwrap();

        let result = StartNavigation
            .handle(Some(start_payload()), &session, &ctx)
            .await
            .unwrap();
        assert_eq!(result["navigating"], true);
        assert!(result["route"]["id"].is_string());

        let session = ctx.sessions.get("c1").await.unwrap();
        assert!(session.is_navigating());
    }

    #[tokio::test]
    async fn start_with_options() {
        let ctx = make_test_context();
        let (_conn, _rx) = connect_client(&ctx, "c1", "u1", Role::Rider).await;
        let session = ctx.sessions.get("c1").await.unwrap();

        let mut payload = start_payload();
        payload["options"] = json!({"avoidHighways": true});
        let result = StartNavigation
            .handle(Some(payload), &session, &ctx)
            .await
            .unwrap();
        assert_eq!(result["route"]["options"]["avoidHighways"], true);
    }

    #[tokio::test]
    async fn start_rejects_out_of_range_origin() {
        let ctx = make_test_context();
        let (_conn, _rx) = connect_client(&ctx, "c1", "u1", Role::Rider).await;
        let session = ctx.sessions.get("c1").await.unwrap();

        let payload = json!({
            "origin": {"lat": 99.0, "lon": 2.35},
            "destination": {"lat": 48.86, "lon": 2.36},
        });
        let err = StartNavigation
            .handle(Some(payload), &session, &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn start_rejects_missing_fields() {
        let ctx = make_test_context();
        let (_conn, _rx) = connect_client(&ctx, "c1", "u1", Role::Rider).await;
        let session = ctx.sessions.get("c1").await.unwrap();

        let err = StartNavigation
            .handle(Some(json!({"origin": {"lat": 1.0, "lon": 1.0}})), &session, &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn stop_clears_route_and_is_idempotent() {
        let ctx = make_test_context();
        let (_conn, _rx) = connect_client(&ctx, "c1", "u1", Role::Rider).await;
        let session = ctx.sessions.get("c1").await.unwrap();
        let _ = StartNavigation
            .handle(Some(start_payload()), &session, &ctx)
            .await
            .unwrap();

        let result = StopNavigation.handle(None, &session, &ctx).await.unwrap();
        assert_eq!(result["navigating"], false);
        assert!(!ctx.sessions.get("c1").await.unwrap().is_navigating());

        // Stopping again succeeds.
        let result = StopNavigation.handle(None, &session, &ctx).await.unwrap();
        assert_eq!(result["navigating"], false);
    }

    #[tokio::test]
    async fn recalculate_requires_active_route() {
        let ctx = make_test_context();
        let (_conn, _rx) = connect_client(&ctx, "c1", "u1", Role::Rider).await;
        let session = ctx.sessions.get("c1").await.unwrap();

        let err = RecalculateRoute
            .handle(
                Some(json!({"position": {"lat": 48.855, "lon": 2.355}})),
                &session,
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_NAVIGATING");
    }

    #[tokio::test]
    async fn recalculate_replaces_route_keeping_destination() {
        let ctx = make_test_context();
        let (_conn, _rx) = connect_client(&ctx, "c1", "u1", Role::Rider).await;
        let session = ctx.sessions.get("c1").await.unwrap();
        let first = StartNavigation
            .handle(Some(start_payload()), &session, &ctx)
            .await
            .unwrap();

        // Handlers get a fresh snapshot on each dispatch.
        let session = ctx.sessions.get("c1").await.unwrap();
        let result = RecalculateRoute
            .handle(
                Some(json!({"position": {"lat": 48.853, "lon": 2.352}})),
                &session,
                &ctx,
            )
            .await
            .unwrap();
        assert_ne!(result["route"]["id"], first["route"]["id"]);
        assert_eq!(result["route"]["destination"], first["route"]["destination"]);
        assert_eq!(result["route"]["origin"]["lat"], 48.853);
        assert!(ctx.sessions.get("c1").await.unwrap().is_navigating());
    }

    #[tokio::test]
    async fn update_position_records_last_position() {
        let ctx = make_test_context();
        let (_conn, _rx) = connect_client(&ctx, "c1", "u1", Role::Rider).await;
        let session = ctx.sessions.get("c1").await.unwrap();

        let result = UpdatePosition
            .handle(
                Some(json!({"position": {"lat": 48.851, "lon": 2.351}})),
                &session,
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(result["updated"], true);
        let stored = ctx.sessions.get("c1").await.unwrap().last_position.unwrap();
        assert!((stored.lat - 48.851).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn update_position_rejects_invalid_coordinates() {
        let ctx = make_test_context();
        let (_conn, _rx) = connect_client(&ctx, "c1", "u1", Role::Rider).await;
        let session = ctx.sessions.get("c1").await.unwrap();

        let err = UpdatePosition
            .handle(
                Some(json!({"position": {"lat": 48.85, "lon": 200.0}})),
                &session,
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PAYLOAD");
    }
}
