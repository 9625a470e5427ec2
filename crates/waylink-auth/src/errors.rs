//! Authentication error reasons.
//!
//! Every variant is fatal to the connection that produced it: the gateway
//! sends an `auth_error` event carrying [`AuthError::code`] and the
//! `Display` text, then closes the transport.

/// Why a connection failed authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `access_token` cookie on the handshake.
    #[error("No authentication token provided")]
    NoToken,

    /// Token signature was valid but the token is past its expiry.
    #[error("Token expired")]
    Expired,

    /// Token was malformed or its signature did not verify.
    #[error("Invalid token")]
    Invalid,

    /// Any other verification failure.
    #[error("Authentication failed")]
    Other,
}

impl AuthError {
    /// Wire error code sent in the `auth_error` event.
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoToken => "NO_TOKEN",
            Self::Expired => "TOKEN_EXPIRED",
            Self::Invalid => "INVALID_TOKEN",
            Self::Other => "AUTH_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_protocol() {
        assert_eq!(AuthError::NoToken.code(), "NO_TOKEN");
        assert_eq!(AuthError::Expired.code(), "TOKEN_EXPIRED");
        assert_eq!(AuthError::Invalid.code(), "INVALID_TOKEN");
        assert_eq!(AuthError::Other.code(), "AUTH_FAILED");
    }

    #[test]
    fn expired_message_text() {
        // Clients display this string verbatim.
        assert_eq!(AuthError::Expired.to_string(), "Token expired");
    }

    #[test]
    fn no_token_message_text() {
        assert_eq!(
            AuthError::NoToken.to_string(),
            "No authentication token provided"
        );
    }
}
