//! Domain layer - Core business objects
//!
//! This layer contains:
//! - Entities: Inbound messages, command descriptors, the argument bundle
//! - Traits: Abstractions for infrastructure (Transport)

pub mod entities;
pub mod traits;
