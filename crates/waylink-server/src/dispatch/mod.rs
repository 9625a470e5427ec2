//! Inbound event routing: wire types, guard pipeline, and the registry
//! that dispatches named events to their handlers.

pub mod context;
pub mod errors;
pub mod handlers;
pub mod pipeline;
pub mod registry;
pub mod types;
