//! # waylink-auth
//!
//! Bearer-token verification for gateway connections.
//!
//! The gateway receives a signed token in the `access_token` cookie at
//! WebSocket handshake time. [`TokenVerifier`] is the sole identity
//! authority: it decodes the token into [`Claims`] (`sub`, `role`, `exp`)
//! or fails with one of the [`AuthError`] reasons, each of which maps to
//! a wire error code (`NO_TOKEN`, `TOKEN_EXPIRED`, `INVALID_TOKEN`,
//! `AUTH_FAILED`).

#![deny(unsafe_code)]

pub mod errors;
pub mod verifier;

pub use errors::AuthError;
pub use verifier::{Claims, TokenVerifier};
