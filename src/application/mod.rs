//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Errors: Domain-specific errors
//! - Messaging: Command parsing and dispatch
//! - Services: The message pump between a transport and the dispatcher

pub mod errors;
pub mod messaging;
pub mod services;
