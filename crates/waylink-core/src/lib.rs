//! # waylink-core
//!
//! Domain model and pure logic for the Waylink gateway:
//!
//! - Geographic primitives and segment-distance math
//! - `Incident` / `Route` types shared across crates
//! - The proximity matcher (pure decision function)
//! - Recursive sensitive-field sanitization for audit logs

#![deny(unsafe_code)]

pub mod geo;
pub mod incident;
pub mod proximity;
pub mod role;
pub mod route;
pub mod sanitize;
