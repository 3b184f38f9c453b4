//! Domain traits - Abstractions for infrastructure implementations

pub mod bot;
pub mod host;

pub use bot::{BotInfo, Transport};
pub use host::HostServices;
