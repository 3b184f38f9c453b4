//! Command dispatcher - Routes prefixed messages to registered handlers
//!
//! Every call runs the same straight pipeline: parse, look up, classify the
//! sender, gate on restrictions, invoke. Chat noise and unknown commands exit
//! silently. A failing handler is reported to the user with a generic notice
//! and never escapes `execute`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use super::parser::CommandParser;
use crate::application::errors::CommandError;
use crate::domain::entities::{CommandArgs, CommandDescriptor, InboundMessage, ReplyFn};
use crate::domain::traits::HostServices;
use crate::infrastructure::config::{Config, MessagesConfig};
use crate::infrastructure::host::HostUtils;
use crate::infrastructure::plugins::CommandRegistry;

/// Which exit a dispatch took
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No prefix, or nothing after it
    NotCommand,
    /// Prefixed, but no command has that alias
    UnknownCommand(String),
    /// Bot-only command from another account; nothing was sent
    BotOnly(String),
    /// Private-only command outside a private chat; the notice was sent
    PrivateOnly(String),
    /// Handler ran to completion
    Completed(String),
    /// Handler failed; the error notice was sent
    Failed(String),
}

/// Dispatches inbound text to commands in the registry
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    parser: CommandParser,
    notices: MessagesConfig,
    private_suffix: String,
    handler_timeout: Option<Duration>,
    host: Arc<dyn HostServices>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, config: &Config) -> Self {
        Self {
            registry,
            parser: CommandParser::new(config.prefix()),
            notices: config.messages.clone(),
            private_suffix: config.dispatch.private_suffix.clone(),
            handler_timeout: config.handler_timeout(),
            host: Arc::new(HostUtils::new()),
        }
    }

    /// Replace the services handed to handlers
    pub fn with_host(mut self, host: Arc<dyn HostServices>) -> Self {
        self.host = host;
        self
    }

    pub fn prefix(&self) -> &str {
        self.parser.prefix()
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// One-to-one chats are recognized by their conversation id suffix
    pub fn is_private_chat(&self, chat_id: &str) -> bool {
        chat_id.ends_with(&self.private_suffix)
    }

    /// Run the command in `text`, if any, replying through `reply`
    pub async fn execute(&self, text: &str, message: &InboundMessage, reply: ReplyFn) -> DispatchOutcome {
        let Some(parsed) = self.parser.parse(text) else {
            return DispatchOutcome::NotCommand;
        };

        let Some(command) = self.registry.lookup(&parsed.name) else {
            debug!("Unknown command {} from {}", parsed.name, message.origin());
            return DispatchOutcome::UnknownCommand(parsed.name);
        };

        let is_private = self.is_private_chat(&message.chat_id);
        info!(
            "Executing command {} for {} in {}",
            parsed.name,
            message.display_name(),
            message.chat_id
        );

        let args = CommandArgs::new(
            self.parser.prefix(),
            parsed.name.as_str(),
            parsed.text,
            message,
            is_private,
            reply,
            Arc::clone(&self.host),
        );

        if command.restrict_bot_sender && !args.is_bot {
            debug!("Command {} is bot-only, ignoring {}", parsed.name, message.origin());
            return DispatchOutcome::BotOnly(parsed.name);
        }

        if command.restrict_to_private && !args.is_private {
            if let Err(e) = args.reply(self.notices.private.as_str()).await {
                warn!("Failed to send private-only notice for {}: {}", parsed.name, e);
            }
            return DispatchOutcome::PrivateOnly(parsed.name);
        }

        match self.invoke(&command, message, &args).await {
            Ok(()) => DispatchOutcome::Completed(parsed.name),
            Err(e) => {
                error!(
                    "Error executing command {} for {}: {}",
                    parsed.name,
                    message.origin(),
                    e
                );
                if let Err(e) = args.reply(self.notices.error.as_str()).await {
                    warn!("Failed to send error notice for {}: {}", parsed.name, e);
                }
                DispatchOutcome::Failed(parsed.name)
            }
        }
    }

    /// Await the handler, turning panics and timeouts into errors
    async fn invoke(
        &self,
        command: &CommandDescriptor,
        message: &InboundMessage,
        args: &CommandArgs,
    ) -> Result<(), CommandError> {
        let call = AssertUnwindSafe(command.handler.call(message, args)).catch_unwind();
        let result = match self.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| CommandError::TimedOut(limit))?,
            None => call.await,
        };
        result.unwrap_or_else(|panic| Err(CommandError::Panicked(panic_message(panic.as_ref()))))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
