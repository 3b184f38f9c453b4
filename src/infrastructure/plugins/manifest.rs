//! Plugin manifest definition
//!
//! A plugin unit is a YAML (or JSON) document describing one command. The
//! manifest is untrusted input: it is parsed into these types and validated
//! before anything reaches the registry.

use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::application::errors::PluginError;

/// Plugin metadata as written on disk
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PluginManifest {
    /// Aliases; the first one is the display name
    #[serde(alias = "aliases")]
    pub command: Vec<String>,

    #[serde(default)]
    pub help: Option<Vec<String>>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,

    /// Only the bot's own account may run it
    #[serde(default, alias = "bot-only")]
    pub is_bot: bool,

    /// Only usable in one-to-one chats
    #[serde(default)]
    pub private: bool,

    pub handler: HandlerSpec,
}

/// Behaviour a manifest binds its aliases to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HandlerSpec {
    /// Reply with a rendered template
    #[serde(rename_all = "kebab-case")]
    Reply {
        text: String,
        #[serde(default)]
        usage: Option<String>,
        #[serde(default)]
        delay_ms: Option<u64>,
    },
    /// Fetch JSON over HTTP and reply with (part of) it
    #[serde(rename_all = "kebab-case")]
    FetchJson {
        url: String,
        #[serde(default)]
        query: Option<String>,
        #[serde(default)]
        pointer: Option<String>,
        #[serde(default)]
        template: Option<String>,
        #[serde(default)]
        usage: Option<String>,
    },
    /// List available commands
    Menu,
    /// Handler compiled into the host, looked up by name
    Native { name: String },
}

impl PluginManifest {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PluginError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse and validate manifest text; `path` is only used in errors
    pub fn parse(path: &Path, content: &str) -> Result<Self, PluginError> {
        let manifest: Self = serde_yaml::from_str(content).map_err(|e| PluginError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    /// Check the shape serde cannot express
    pub fn validate(&self, path: &Path) -> Result<(), PluginError> {
        let invalid = |reason: String| PluginError::Invalid {
            path: path.to_path_buf(),
            reason,
        };

        if self.command.is_empty() {
            return Err(invalid("no aliases declared".to_string()));
        }
        for alias in &self.command {
            if alias.trim().is_empty() {
                return Err(invalid("empty alias".to_string()));
            }
            if alias.chars().any(char::is_whitespace) {
                return Err(invalid(format!("alias '{}' contains whitespace", alias)));
            }
        }

        match &self.handler {
            HandlerSpec::Reply { text, .. } if text.is_empty() => {
                Err(invalid("reply handler has empty text".to_string()))
            }
            HandlerSpec::FetchJson { url, .. } if url.is_empty() => {
                Err(invalid("fetch-json handler has empty url".to_string()))
            }
            HandlerSpec::Native { name } if name.is_empty() => {
                Err(invalid("native handler has empty name".to_string()))
            }
            _ => Ok(()),
        }
    }
}
