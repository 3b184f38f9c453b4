use chrono::{DateTime, Utc};

/// A message quoted by (replied to in) an inbound message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotedMessage {
    pub id: Option<String>,
    pub sender_id: Option<String>,
    pub text: Option<String>,
    pub mime: Option<String>,
}

/// Represents an inbound chat message handed over by a transport
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    /// Conversation identifier (a group or a one-to-one chat)
    pub chat_id: String,
    pub sender_id: Option<String>,
    /// Display name the sender chose for themselves
    pub push_name: Option<String>,
    /// Set when the bot's own account sent the message
    pub from_me: bool,
    pub text: String,
    /// Content-type hint from the transport, e.g. `imageMessage`
    pub mime: Option<String>,
    pub quoted: Option<QuotedMessage>,
    pub timestamp: DateTime<Utc>,
    pub platform: String,
    pub raw: Option<serde_json::Value>,
}

impl InboundMessage {
    pub fn new(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            sender_id: None,
            push_name: None,
            from_me: false,
            text: text.into(),
            mime: None,
            quoted: None,
            timestamp: Utc::now(),
            platform: "unknown".to_string(),
            raw: None,
        }
    }

    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    pub fn with_push_name(mut self, name: impl Into<String>) -> Self {
        self.push_name = Some(name.into());
        self
    }

    pub fn from_me(mut self, from_me: bool) -> Self {
        self.from_me = from_me;
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn with_quoted(mut self, quoted: QuotedMessage) -> Self {
        self.quoted = Some(quoted);
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Name used when addressing the sender
    pub fn display_name(&self) -> &str {
        self.push_name.as_deref().unwrap_or("User")
    }

    /// Identifier used in logs: the sender if known, else the chat
    pub fn origin(&self) -> &str {
        self.sender_id.as_deref().unwrap_or(&self.chat_id)
    }
}
