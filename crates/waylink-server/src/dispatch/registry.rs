//! Event registry and guarded async dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use waylink_core::role::Role;

use crate::audit::UNAUTHENTICATED;
use crate::dispatch::context::GatewayContext;
use crate::metrics::{EVENT_DURATION_SECONDS, EVENT_ERRORS_TOTAL, EVENTS_TOTAL};
use crate::dispatch::errors::{self, EventError};
use crate::dispatch::pipeline::{AuthzError, run_guards};
use crate::dispatch::types::{EventAck, EventRequest, GatewayEvent};
use crate::sessions::Session;
use crate::websocket::connection::ClientConnection;

/// Trait implemented by every event handler.
///
/// Handlers run after the guard chain, so `session` is always the
/// authenticated caller.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Execute the handler with the decoded-on-demand payload.
    async fn handle(
        &self,
        payload: Option<Value>,
        session: &Session,
        ctx: &GatewayContext,
    ) -> Result<Value, EventError>;
}

/// Decode a typed payload, mapping shape mismatches to a validation
/// error acknowledgment.
pub fn decode_payload<T: DeserializeOwned>(payload: Option<Value>) -> Result<T, EventError> {
    serde_json::from_value(payload.unwrap_or(Value::Null)).map_err(|e| EventError::Validation {
        message: format!("Invalid payload: {e}"),
    })
}

struct Registration {
    required_roles: &'static [Role],
    handler: Arc<dyn EventHandler>,
}

/// Registry mapping event names to required roles and handlers.
///
/// The required-role set is a plain static table queried by the
/// authorization guard — no reflection, no runtime metadata.
pub struct EventRegistry {
    handlers: HashMap<String, Registration>,
}

impl EventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler with its required-role set (empty slice means
    /// unrestricted).
    pub fn register(
        &mut self,
        event: &str,
        required_roles: &'static [Role],
        handler: impl EventHandler + 'static,
    ) {
        let _ = self.handlers.insert(
            event.to_owned(),
            Registration {
                required_roles,
                handler: Arc::new(handler),
            },
        );
    }

    /// Required-role set for an event, if registered.
    pub fn required_roles(&self, event: &str) -> Option<&'static [Role]> {
        self.handlers.get(event).map(|r| r.required_roles)
    }

    /// Check whether an event is registered.
    pub fn has_event(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// List all registered event names (sorted).
    pub fn events(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Dispatch one inbound event through the guard pipeline.
    ///
    /// Order per event: audit(inbound) → authenticate → authorize →
    /// handler → audit(outbound). Failures become an error
    /// acknowledgment to `caller` only; the connection stays open.
    #[instrument(skip_all, fields(event = %request.event, conn = %caller.id))]
    pub async fn dispatch(
        &self,
        request: EventRequest,
        ctx: &GatewayContext,
        caller: &ClientConnection,
    ) -> EventAck {
        let event = request.event.clone();
        counter!(EVENTS_TOTAL, "event" => event.clone()).increment(1);

        let Some(registration) = self.handlers.get(&event) else {
            warn!("unknown event");
            counter!(EVENT_ERRORS_TOTAL, "event" => event.clone(), "error_type" => "event_not_found")
                .increment(1);
            return EventAck::error(
                &request.id,
                errors::EVENT_NOT_FOUND,
                format!("Event '{event}' not found"),
            );
        };

        let session = ctx.sessions.get(&caller.id).await;
        let user = session
            .as_ref()
            .map_or_else(|| UNAUTHENTICATED.to_owned(), |s| s.user_id.clone());
        let _ = ctx
            .audit
            .log_inbound(&event, &user, &caller.addr, request.payload.as_ref());

        let start = std::time::Instant::now();
        let outcome = match run_guards(session.as_ref(), registration.required_roles) {
            Err(denied) => {
                if let AuthzError::InsufficientRole { required } = denied {
                    // Notify the caller only; never broadcast denials.
                    let _ = caller.send_event(&GatewayEvent::insufficient_permissions(required));
                }
                Err(EventError::from(denied))
            }
            Ok(()) => match &session {
                Some(session) => {
                    debug!(user = %session.user_id, "dispatching event");
                    registration
                        .handler
                        .handle(request.payload, session, ctx)
                        .await
                }
                // The authenticate guard makes this unreachable; fail
                // closed rather than panic if it ever regresses.
                None => Err(EventError::Internal {
                    message: "session missing after guard chain".into(),
                }),
            },
        };
        let elapsed = start.elapsed();

        let ack = match outcome {
            Ok(result) => EventAck::success(&request.id, result),
            Err(err) => {
                counter!(
                    EVENT_ERRORS_TOTAL,
                    "event" => event.clone(),
                    "error_type" => err.code().to_owned()
                )
                .increment(1);
                EventAck {
                    id: request.id,
                    success: false,
                    result: None,
                    error: Some(err.to_error_body()),
                }
            }
        };
        histogram!(EVENT_DURATION_SECONDS, "event" => event.clone())
            .record(elapsed.as_secs_f64());

        match serde_json::to_value(&ack) {
            Ok(ack_value) => {
                let _ = ctx
                    .audit
                    .log_outbound(&event, &user, &caller.addr, &ack_value, elapsed);
            }
            Err(e) => warn!(error = %e, "failed to serialize ack for audit"),
        }

        ack
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}
