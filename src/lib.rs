//! nology-bot - plugin-based command dispatcher for chat bots
//!
//! Inbound text is matched against commands loaded from plugin manifests and
//! handed to the matching handler together with a per-call argument bundle.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use application::errors::{BotError, CommandError, ConfigError, PluginError};
pub use application::messaging::{DispatchOutcome, Dispatcher};
pub use application::services::MessageService;
pub use domain::entities::{
    handler_fn, reply_fn, CommandArgs, CommandDescriptor, CommandHandler, InboundMessage, ReplyFn,
};
pub use domain::traits::{HostServices, Transport};
pub use infrastructure::config::Config;
pub use infrastructure::plugins::{
    CommandRegistry, HandlerCatalog, LoadReport, ManifestDirectory, PluginLoader, PluginWatcher,
};
