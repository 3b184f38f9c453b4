//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Plugins: Registry, loader and directory watcher
//! - Host: Utilities handed to command handlers
//! - Adapters: Platform integrations

pub mod config;
pub mod plugins;
pub mod host;
pub mod adapters;
