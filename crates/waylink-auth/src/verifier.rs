//! Token decoding and claim extraction.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use waylink_core::role::Role;

use crate::errors::AuthError;

/// Identity claims decoded from a verified token.
///
/// Immutable once decoded; consumed only while building a session and
/// never persisted beyond it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the user id.
    pub sub: String,
    /// Granted role.
    pub role: Role,
    /// Expiry as a Unix timestamp in seconds.
    pub exp: i64,
}

/// Validates signed bearer tokens (HS256).
pub struct TokenVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Build a verifier over a shared HMAC secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        // No expiry leeway: a real-time gateway rejects stale tokens at
        // the moment they lapse.
        validation.leeway = 0;
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decode and validate a token, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => AuthError::Invalid,
                _ => AuthError::Other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret";

    fn mint(sub: &str, role: Role, exp_offset_secs: i64) -> String {
        let claims = Claims {
            sub: sub.into(),
            role,
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_claims() {
        let verifier = TokenVerifier::new(SECRET);
        let claims = verifier.verify(&mint("user_1", Role::Rider, 3600)).unwrap();
        assert_eq!(claims.sub, "user_1");
        assert_eq!(claims.role, Role::Rider);
    }

    #[test]
    fn admin_role_preserved() {
        let verifier = TokenVerifier::new(SECRET);
        let claims = verifier.verify(&mint("mod_1", Role::Admin, 3600)).unwrap();
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn expired_token_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        let err = verifier
            .verify(&mint("user_1", Role::Rider, -30))
            .unwrap_err();
        assert_eq!(err, AuthError::Expired);
    }

    #[test]
    fn garbage_token_is_invalid() {
        let verifier = TokenVerifier::new(SECRET);
        let err = verifier.verify("not-a-jwt").unwrap_err();
        assert_eq!(err, AuthError::Invalid);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let verifier = TokenVerifier::new("other-secret");
        let err = verifier
            .verify(&mint("user_1", Role::Rider, 3600))
            .unwrap_err();
        assert_eq!(err, AuthError::Invalid);
    }

    #[test]
    fn unknown_role_is_invalid() {
        // Token signed correctly but with a role the gateway doesn't know.
        #[derive(Serialize)]
        struct BadClaims<'a> {
            sub: &'a str,
            role: &'a str,
            exp: i64,
        }
        let token = encode(
            &Header::default(),
            &BadClaims {
                sub: "user_1",
                role: "superuser",
                exp: chrono::Utc::now().timestamp() + 3600,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let verifier = TokenVerifier::new(SECRET);
        assert_eq!(verifier.verify(&token).unwrap_err(), AuthError::Invalid);
    }

    #[test]
    fn missing_sub_is_rejected() {
        #[derive(Serialize)]
        struct NoSub {
            role: Role,
            exp: i64,
        }
        let token = encode(
            &Header::default(),
            &NoSub {
                role: Role::Rider,
                exp: chrono::Utc::now().timestamp() + 3600,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let verifier = TokenVerifier::new(SECRET);
        assert!(verifier.verify(&token).is_err());
    }
}
