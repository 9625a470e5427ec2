//! Event handling error codes and error type.

use serde_json::json;

use crate::collaborators::CollaboratorError;
use crate::dispatch::pipeline::AuthzError;
use crate::dispatch::types::ErrorBody;

// ── Error code constants ────────────────────────────────────────────

/// Payload failed shape validation.
pub const INVALID_PAYLOAD: &str = "INVALID_PAYLOAD";
/// Event name not in the registry.
pub const EVENT_NOT_FOUND: &str = "EVENT_NOT_FOUND";
/// Caller has no registered session.
pub const NOT_AUTHENTICATED: &str = "NOT_AUTHENTICATED";
/// Caller's role is outside the required set.
pub const INSUFFICIENT_PERMISSIONS: &str = "INSUFFICIENT_PERMISSIONS";
/// Operation requires an active route.
pub const NOT_NAVIGATING: &str = "NOT_NAVIGATING";
/// Referenced incident does not exist.
pub const INCIDENT_NOT_FOUND: &str = "INCIDENT_NOT_FOUND";
/// A downstream collaborator failed.
pub const COLLABORATOR_ERROR: &str = "COLLABORATOR_ERROR";
/// Unexpected internal error.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Error returned by event handlers and guards.
///
/// Every variant is recoverable: it becomes an error acknowledgment to
/// the single caller and leaves the connection open.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Payload missing, malformed, or out of range.
    #[error("{message}")]
    Validation {
        /// Description of what is wrong.
        message: String,
    },

    /// A guard denied the event.
    #[error("{0}")]
    Denied(#[from] AuthzError),

    /// Referenced resource does not exist or is in the wrong state.
    #[error("{message}")]
    NotFound {
        /// Specific error code (e.g. `INCIDENT_NOT_FOUND`).
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Downstream collaborator failure.
    #[error("{message}")]
    Collaborator {
        /// Description.
        message: String,
    },

    /// Internal server error.
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl EventError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => INVALID_PAYLOAD,
            Self::Denied(AuthzError::NotAuthenticated) => NOT_AUTHENTICATED,
            Self::Denied(AuthzError::InsufficientRole { .. }) => INSUFFICIENT_PERMISSIONS,
            Self::NotFound { code, .. } => code,
            Self::Collaborator { .. } => COLLABORATOR_ERROR,
            Self::Internal { .. } => INTERNAL_ERROR,
        }
    }

    /// Convert to the wire-format error body.
    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().to_owned(),
            message: self.to_string(),
            details: match self {
                Self::Denied(AuthzError::InsufficientRole { required }) => {
                    Some(json!({ "requiredRoles": required }))
                }
                _ => None,
            },
        }
    }
}

impl From<CollaboratorError> for EventError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::IncidentNotFound(id) => Self::NotFound {
                code: INCIDENT_NOT_FOUND,
                message: format!("Incident '{id}' not found"),
            },
            CollaboratorError::Unavailable(message) => Self::Collaborator { message },
        }
    }
}
