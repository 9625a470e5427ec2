//! Sensitive-field masking for audit payloads.
//!
//! Hard security property: no value under a sensitive key may ever reach
//! a log sink. The walk operates on a copy and recurses structurally over
//! the JSON tree, so it terminates and never mutates the caller's payload.

use serde_json::Value;

/// Keys whose values are always masked, at any nesting depth.
pub const SENSITIVE_KEYS: [&str; 6] = [
    "password",
    "token",
    "secret",
    "apiKey",
    "accessToken",
    "refreshToken",
];

/// Replacement written in place of a sensitive value.
pub const MASK: &str = "[REDACTED]";

/// Return a copy of `payload` with every sensitive field masked.
pub fn sanitize_payload(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if SENSITIVE_KEYS.contains(&k.as_str()) {
                        (k.clone(), Value::String(MASK.into()))
                    } else {
                        (k.clone(), sanitize_payload(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_payload).collect()),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_top_level_key() {
        let out = sanitize_payload(&json!({"user": "u1", "password": "hunter2"}));
        assert_eq!(out["password"], MASK);
        assert_eq!(out["user"], "u1");
    }

    #[test]
    fn masks_nested_keys() {
        let out = sanitize_payload(&json!({
            "auth": {"accessToken": "abc", "refreshToken": "def"},
            "profile": {"deep": {"apiKey": "k"}},
        }));
        assert_eq!(out["auth"]["accessToken"], MASK);
        assert_eq!(out["auth"]["refreshToken"], MASK);
        assert_eq!(out["profile"]["deep"]["apiKey"], MASK);
    }

    #[test]
    fn masks_inside_arrays() {
        let out = sanitize_payload(&json!({"items": [{"token": "t1"}, {"token": "t2"}]}));
        assert_eq!(out["items"][0]["token"], MASK);
        assert_eq!(out["items"][1]["token"], MASK);
    }

    #[test]
    fn masks_entire_sensitive_subtree_value() {
        // A sensitive key holding an object is replaced outright.
        let out = sanitize_payload(&json!({"secret": {"inner": "x"}}));
        assert_eq!(out["secret"], MASK);
    }

    #[test]
    fn does_not_mutate_original() {
        let original = json!({"password": "hunter2"});
        let _ = sanitize_payload(&original);
        assert_eq!(original["password"], "hunter2");
    }

    #[test]
    fn idempotent() {
        let once = sanitize_payload(&json!({"token": "abc", "nested": {"secret": "x"}}));
        let twice = sanitize_payload(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn key_match_is_exact() {
        // Only exact key matches are masked; "tokenCount" is not sensitive.
        let out = sanitize_payload(&json!({"tokenCount": 5, "token": "t"}));
        assert_eq!(out["tokenCount"], 5);
        assert_eq!(out["token"], MASK);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(sanitize_payload(&json!(42)), json!(42));
        assert_eq!(sanitize_payload(&json!("hi")), json!("hi"));
        assert_eq!(sanitize_payload(&json!(null)), json!(null));
    }

    #[test]
    fn empty_object_and_array() {
        assert_eq!(sanitize_payload(&json!({})), json!({}));
        assert_eq!(sanitize_payload(&json!([])), json!([]));
    }
}
