//! Guard pipeline — the ordered authenticate → authorize chain run
//! before every event handler.
//!
//! Each guard is a plain function `(GuardContext) -> Result<(), AuthzError>`
//! executed in sequence, returning early on the first failure. The
//! ordering is static and testable rather than implicit framework
//! wiring. Guard failures are recoverable per-event: only connection
//! authentication (in the WebSocket session) terminates a connection.

use waylink_core::role::Role;

use crate::sessions::Session;

/// Why an event was denied before reaching its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No session for the calling connection. Unreachable after the
    /// connection authenticator, but checked defensively.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The caller's role is not in the event's required-role set.
    #[error("Insufficient permissions")]
    InsufficientRole {
        /// Roles that would have been accepted.
        required: &'static [Role],
    },
}

/// Input to each guard in the chain.
#[derive(Clone, Copy)]
pub struct GuardContext<'a> {
    /// The caller's session, if registered.
    pub session: Option<&'a Session>,
    /// Required-role set for the event; empty means unrestricted.
    pub required_roles: &'static [Role],
}

/// One stage in the guard chain.
pub type Guard = fn(&GuardContext<'_>) -> Result<(), AuthzError>;

/// The ordered chain. Order is load-bearing: authorization assumes an
/// authenticated session.
pub const GUARD_CHAIN: [Guard; 2] = [authenticate, authorize];

/// Reject callers with no registered session.
pub fn authenticate(ctx: &GuardContext<'_>) -> Result<(), AuthzError> {
    if ctx.session.is_some() {
        Ok(())
    } else {
        Err(AuthzError::NotAuthenticated)
    }
}

/// Reject callers whose role is outside the required set.
pub fn authorize(ctx: &GuardContext<'_>) -> Result<(), AuthzError> {
    if ctx.required_roles.is_empty() {
        return Ok(());
    }
    let allowed = ctx
        .session
        .is_some_and(|s| ctx.required_roles.contains(&s.role));
    if allowed {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole {
            required: ctx.required_roles,
        })
    }
}

/// Run the full chain for one event.
pub fn run_guards(
    session: Option<&Session>,
    required_roles: &'static [Role],
) -> Result<(), AuthzError> {
    let ctx = GuardContext {
        session,
        required_roles,
    };
    for guard in GUARD_CHAIN {
        guard(&ctx)?;
    }
    Ok(())
}
