//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::application::errors::ConfigError;

pub const DEFAULT_PREFIX: &str = "!";

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub plugins: PluginConfig,
    pub messages: MessagesConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    /// Display name, used by presentation plugins
    pub name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PluginConfig {
    pub directory: PathBuf,
    /// File extensions recognized as plugin units
    pub extensions: Vec<String>,
    /// Reload when the directory changes
    pub watch: bool,
    pub debounce_ms: u64,
}

/// User-facing notices sent by the dispatcher
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MessagesConfig {
    pub private: String,
    pub error: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DispatchConfig {
    /// Conversation ids ending with this are one-to-one chats
    pub private_suffix: String,
    /// Unset means handlers may run forever
    pub handler_timeout_secs: Option<u64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "nology-bot".to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./plugins"),
            extensions: vec!["yaml".to_string(), "yml".to_string(), "json".to_string()],
            watch: true,
            debounce_ms: 250,
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            private: "This command can only be used in private chat.".to_string(),
            error: "An error occurred while executing the command.".to_string(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            private_suffix: "@s.whatsapp.net".to_string(),
            handler_timeout_secs: None,
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();

        if let Ok(name) = std::env::var("BOT_NAME") {
            config.bot.name = name;
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            config.bot.prefix = prefix;
        }

        if let Ok(dir) = std::env::var("PLUGINS_DIR") {
            config.plugins.directory = PathBuf::from(dir);
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plugins.extensions.is_empty() {
            return Err(ConfigError::MissingField("plugins.extensions".to_string()));
        }
        if self.plugins.directory.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("plugins.directory".to_string()));
        }
        if self.dispatch.handler_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "dispatch.handler-timeout-secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured prefix, falling back to `!` when blank
    pub fn prefix(&self) -> &str {
        if self.bot.prefix.is_empty() {
            DEFAULT_PREFIX
        } else {
            &self.bot.prefix
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.plugins.debounce_ms)
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        self.dispatch.handler_timeout_secs.map(Duration::from_secs)
    }
}
