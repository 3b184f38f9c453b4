//! Application layer errors

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command execution errors, raised by handlers
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Reply failed: {0}")]
    Reply(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Handler timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

/// Plugin loading errors
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Failed to read plugin directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid plugin {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("Unknown native handler: {0}")]
    UnknownHandler(String),

    #[error("Reload aborted: {0}")]
    Reload(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
