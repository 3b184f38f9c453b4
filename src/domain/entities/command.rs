use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::message::{InboundMessage, QuotedMessage};
use crate::application::errors::{BotError, CommandError};
use crate::domain::traits::HostServices;

/// Category used for descriptors without tags
pub const DEFAULT_TAG: &str = "uncategorized";

/// Sends a text reply back into the conversation a command came from
pub type ReplyFn = Arc<dyn Fn(String) -> BoxFuture<'static, Result<(), BotError>> + Send + Sync>;

/// Wrap an async closure as a [`ReplyFn`]
pub fn reply_fn<F, Fut>(f: F) -> ReplyFn
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BotError>> + Send + 'static,
{
    Arc::new(move |text| Box::pin(f(text)))
}

/// Behaviour bound to a command
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, message: &InboundMessage, args: &CommandArgs) -> Result<(), CommandError>;
}

/// Adapter turning an async closure into a [`CommandHandler`]
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(InboundMessage, CommandArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
{
    async fn call(&self, message: &InboundMessage, args: &CommandArgs) -> Result<(), CommandError> {
        (self.0)(message.clone(), args.clone()).await
    }
}

/// Wrap an async closure as a shareable handler
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(InboundMessage, CommandArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Static description of one command: its aliases, docs, restrictions and handler
pub struct CommandDescriptor {
    pub aliases: Vec<String>,
    pub help: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub restrict_bot_sender: bool,
    pub restrict_to_private: bool,
    /// Plugin unit this descriptor was loaded from
    pub source: Option<PathBuf>,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDescriptor {
    pub fn new<I, S>(aliases: I, handler: Arc<dyn CommandHandler>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aliases: aliases.into_iter().map(Into::into).collect(),
            help: None,
            tags: None,
            restrict_bot_sender: false,
            restrict_to_private: false,
            source: None,
            handler,
        }
    }

    pub fn with_help(mut self, help: Vec<String>) -> Self {
        self.help = Some(help);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn bot_only(mut self) -> Self {
        self.restrict_bot_sender = true;
        self
    }

    pub fn private_only(mut self) -> Self {
        self.restrict_to_private = true;
        self
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Canonical display name: the first alias
    pub fn name(&self) -> &str {
        self.aliases.first().map(String::as_str).unwrap_or_default()
    }

    pub fn help_text(&self) -> String {
        match &self.help {
            Some(help) if !help.is_empty() => help.join(", "),
            _ => "No description".to_string(),
        }
    }

    pub fn tag_text(&self) -> String {
        match &self.tags {
            Some(tags) if !tags.is_empty() => tags.join(", "),
            _ => DEFAULT_TAG.to_string(),
        }
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("aliases", &self.aliases)
            .field("help", &self.help)
            .field("tags", &self.tags)
            .field("restrict_bot_sender", &self.restrict_bot_sender)
            .field("restrict_to_private", &self.restrict_to_private)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Per-invocation context handed to a handler
#[derive(Clone)]
pub struct CommandArgs {
    pub prefix: String,
    /// Matched alias, lower-cased
    pub command: String,
    /// Argument text: everything after the alias, single-space separated
    pub text: String,
    pub push_name: String,
    pub is_bot: bool,
    pub is_private: bool,
    pub mime: Option<String>,
    pub quoted: Option<QuotedMessage>,
    reply: ReplyFn,
    host: Arc<dyn HostServices>,
}

impl CommandArgs {
    pub fn new(
        prefix: impl Into<String>,
        command: impl Into<String>,
        text: impl Into<String>,
        message: &InboundMessage,
        is_private: bool,
        reply: ReplyFn,
        host: Arc<dyn HostServices>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            command: command.into(),
            text: text.into(),
            push_name: message.display_name().to_string(),
            is_bot: message.from_me,
            is_private,
            mime: message.mime.clone(),
            quoted: message.quoted.clone(),
            reply,
            host,
        }
    }

    /// Send a reply into the originating conversation
    pub async fn reply(&self, text: impl Into<String>) -> Result<(), CommandError> {
        (self.reply)(text.into())
            .await
            .map_err(|e| CommandError::Reply(e.to_string()))
    }

    pub async fn sleep(&self, duration: Duration) {
        self.host.sleep(duration).await
    }

    pub async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, CommandError> {
        self.host.fetch_json(url).await
    }
}

impl fmt::Debug for CommandArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandArgs")
            .field("prefix", &self.prefix)
            .field("command", &self.command)
            .field("text", &self.text)
            .field("push_name", &self.push_name)
            .field("is_bot", &self.is_bot)
            .field("is_private", &self.is_private)
            .field("mime", &self.mime)
            .finish_non_exhaustive()
    }
}
