//! Plugin system for nology-bot
//!
//! Plugins are manifest files in one directory. Each one declares a command:
//! its aliases, docs, restrictions and the handler it binds to. The directory
//! can be watched so edits take effect without a restart.

pub mod builtins;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod watcher;

pub use builtins::HandlerCatalog;
pub use loader::{LoadFailure, LoadReport, ManifestDirectory, PluginLoader, PluginSource, PluginUnit};
pub use manifest::{HandlerSpec, PluginManifest};
pub use registry::{CommandRegistry, CommandTable};
pub use watcher::PluginWatcher;
