//! Command parser - Splits prefixed text into a command name and arguments

use crate::infrastructure::config::DEFAULT_PREFIX;

/// A command invocation found in message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// First word after the prefix, lower-cased
    pub name: String,
    /// Remaining words joined by single spaces
    pub text: String,
}

/// Recognizes command invocations by prefix
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: String,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: if prefix.is_empty() { DEFAULT_PREFIX.to_string() } else { prefix },
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `None` for ordinary chat text and for a bare prefix
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        let rest = text.strip_prefix(&self.prefix)?;
        let mut words = rest.split_whitespace();
        let name = words.next()?.to_lowercase();
        let text = words.collect::<Vec<_>>().join(" ");
        Some(ParsedCommand { name, text })
    }
}
