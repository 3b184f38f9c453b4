//! Console adapter for development/testing
//!
//! A line starting with `>` is sent as a reply to the bot's previous message.

use std::sync::{Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use crate::domain::entities::{InboundMessage, QuotedMessage};
use crate::domain::traits::{BotInfo, Transport};
use crate::application::errors::BotError;

const MIME: &str = "conversation";

/// Console transport: each stdin line is one inbound message
pub struct ConsoleAdapter {
    info: BotInfo,
    chat_id: String,
    from_me: bool,
    lines: Mutex<Lines<BufReader<Stdin>>>,
    last_reply: StdMutex<Option<String>>,
}

impl ConsoleAdapter {
    pub fn new(bot_name: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: bot_name.into(),
            },
            chat_id: chat_id.into(),
            from_me: false,
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            last_reply: StdMutex::new(None),
        }
    }

    /// Mark console input as sent by the bot's own account
    pub fn as_self(mut self, from_me: bool) -> Self {
        self.from_me = from_me;
        self
    }

    fn remember_reply(&self, text: &str) {
        *self.last_reply.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
    }

    /// Build the inbound message for one console line
    fn message_from_line(&self, line: &str) -> InboundMessage {
        let line = line.trim();
        let (text, quoted) = match line.strip_prefix('>') {
            Some(rest) => {
                let previous = self.last_reply.lock().unwrap_or_else(PoisonError::into_inner).clone();
                let quoted = previous.map(|text| QuotedMessage {
                    id: None,
                    sender_id: Some(self.info.id.clone()),
                    text: Some(text),
                    mime: Some(MIME.to_string()),
                });
                (rest.trim(), quoted)
            }
            None => (line, None),
        };

        let mut message = InboundMessage::new(self.chat_id.clone(), text)
            .with_sender("console")
            .with_push_name("Console")
            .with_mime(MIME)
            .with_platform("console")
            .with_raw(serde_json::json!({ "line": line }))
            .from_me(self.from_me);
        if let Some(quoted) = quoted {
            message = message.with_quoted(quoted);
        }
        message
    }
}

#[async_trait]
impl Transport for ConsoleAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting console bot (dev mode) in chat {}", self.chat_id);
        Ok(())
    }

    async fn next_message(&self) -> Option<InboundMessage> {
        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(Some(line)) => Some(self.message_from_line(&line)),
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed to read console input: {}", e);
                None
            }
        }
    }

    async fn send_text(&self, _chat_id: &str, text: &str) -> Result<(), BotError> {
        self.remember_reply(text);
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("[BOT] {}\n", text).as_bytes())
            .await
            .map_err(|e| BotError::Transport(format!("console write failed: {}", e)))?;
        stdout
            .flush()
            .await
            .map_err(|e| BotError::Transport(format!("console flush failed: {}", e)))
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
