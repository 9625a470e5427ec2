//! Wire-format types for the WebSocket event protocol.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use waylink_auth::AuthError;
use waylink_core::role::Role;

/// Incoming event from a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventRequest {
    /// Unique request identifier, echoed in the acknowledgment.
    pub id: String,
    /// Event name (e.g. `incident.report`).
    pub event: String,
    /// Optional payload object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Acknowledgment sent back to the requesting client only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventAck {
    /// Echoed request identifier.
    pub id: String,
    /// Whether the event was handled.
    pub success: bool,
    /// Result payload (present when `success == true`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload (present when `success == false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Structured error body inside an [`EventAck`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. `INVALID_PAYLOAD`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Server-pushed event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Event type (e.g. `new_incident`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    /// Event payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl EventAck {
    /// Build a success acknowledgment.
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error acknowledgment.
    pub fn error(id: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(ErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            }),
        }
    }
}

impl GatewayEvent {
    /// Create an event with the current UTC timestamp.
    pub fn new(event_type: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            data,
        }
    }

    /// `auth_error` control event for a failed connection authentication.
    pub fn auth_error(err: AuthError) -> Self {
        Self::new(
            "auth_error",
            Some(json!({
                "message": err.to_string(),
                "code": err.code(),
            })),
        )
    }

    /// `auth_error` control event for an authorization denial.
    pub fn insufficient_permissions(required: &[Role]) -> Self {
        Self::new(
            "auth_error",
            Some(json!({
                "message": "Insufficient permissions",
                "code": "INSUFFICIENT_PERMISSIONS",
                "requiredRoles": required,
            })),
        )
    }
}
