//! Audit interceptor — structured records around every inbound event and
//! outbound response, with sensitive payload fields redacted.

use std::time::Duration;

use serde_json::Value;
use tracing::info;
use waylink_core::sanitize::sanitize_payload;

/// User label logged when no session exists for the caller.
pub const UNAUTHENTICATED: &str = "unauthenticated";

/// One structured audit record, as emitted to the log sink.
///
/// Returned from the logging calls so tests can assert on exactly what
/// was written.
#[derive(Clone, Debug, PartialEq)]
pub struct AuditRecord {
    /// Event name.
    pub event: String,
    /// Caller user id, or [`UNAUTHENTICATED`].
    pub user: String,
    /// Caller network address.
    pub addr: String,
    /// Sanitized payload copy.
    pub payload: Option<Value>,
    /// `SUCCESS` / `ERROR`, responses only.
    pub status: Option<&'static str>,
    /// Handling latency, responses only.
    pub elapsed_ms: Option<u128>,
}

/// Emits audit records for the gateway.
///
/// Constructed once at server startup and passed into the dispatch
/// context explicitly; its lifetime is scoped to the gateway, not held
/// as ambient global state.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuditInterceptor;

impl AuditInterceptor {
    /// Create an interceptor.
    pub fn new() -> Self {
        Self
    }

    /// Record an inbound event before it is handled.
    pub fn log_inbound(
        &self,
        event: &str,
        user: &str,
        addr: &str,
        payload: Option<&Value>,
    ) -> AuditRecord {
        let record = AuditRecord {
            event: event.to_owned(),
            user: user.to_owned(),
            addr: addr.to_owned(),
            payload: payload.map(sanitize_payload),
            status: None,
            elapsed_ms: None,
        };
        info!(
            target: "waylink::audit",
            event = %record.event,
            user = %record.user,
            addr = %record.addr,
            payload = %record
                .payload
                .as_ref()
                .map_or_else(String::new, serde_json::Value::to_string),
            "inbound event"
        );
        record
    }

    /// Record an outbound response after handling completes.
    ///
    /// Status derives from the payload's `success` field when present;
    /// anything else counts as `SUCCESS`.
    pub fn log_outbound(
        &self,
        event: &str,
        user: &str,
        addr: &str,
        payload: &Value,
        elapsed: Duration,
    ) -> AuditRecord {
        let status = match payload.get("success").and_then(Value::as_bool) {
            Some(false) => "ERROR",
            _ => "SUCCESS",
        };
        let record = AuditRecord {
            event: event.to_owned(),
            user: user.to_owned(),
            addr: addr.to_owned(),
            payload: Some(sanitize_payload(payload)),
            status: Some(status),
            elapsed_ms: Some(elapsed.as_millis()),
        };
        info!(
            target: "waylink::audit",
            event = %record.event,
            user = %record.user,
            addr = %record.addr,
            status,
            elapsed_ms = elapsed.as_millis(),
            payload = %record
                .payload
                .as_ref()
                .map_or_else(String::new, serde_json::Value::to_string),
            "outbound response"
        );
        record
    }
}
