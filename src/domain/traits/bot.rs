use async_trait::async_trait;
use crate::domain::entities::InboundMessage;
use crate::application::errors::BotError;

/// Transport trait - abstraction for messaging platform adapters
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect and begin receiving messages
    async fn start(&self) -> Result<(), BotError>;

    /// Wait for the next inbound message; `None` once the transport is closed
    async fn next_message(&self) -> Option<InboundMessage>;

    /// Send a plain-text message to a conversation
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
}
