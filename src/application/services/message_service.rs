use std::sync::Arc;

use crate::application::errors::BotError;
use crate::application::messaging::Dispatcher;
use crate::domain::entities::{reply_fn, InboundMessage};
use crate::domain::traits::Transport;

/// Pumps messages from a transport into the dispatcher
pub struct MessageService<T: Transport + 'static> {
    transport: Arc<T>,
    dispatcher: Arc<Dispatcher>,
}

impl<T: Transport + 'static> MessageService<T> {
    pub fn new(transport: Arc<T>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { transport, dispatcher }
    }

    /// Receive until the transport closes, one task per message
    ///
    /// A slow command does not hold up the messages behind it.
    pub async fn run(&self) -> Result<(), BotError> {
        self.transport.start().await?;
        tracing::info!("Bot started: {}", self.transport.bot_info().name);

        let mut in_flight = tokio::task::JoinSet::new();
        while let Some(message) = self.transport.next_message().await {
            if message.text.is_empty() {
                continue;
            }
            let transport = Arc::clone(&self.transport);
            let dispatcher = Arc::clone(&self.dispatcher);
            in_flight.spawn(async move { Self::process(transport, dispatcher, message).await });

            // reap finished tasks so the set does not grow unbounded
            while in_flight.try_join_next().is_some() {}
        }

        while in_flight.join_next().await.is_some() {}
        tracing::info!("Transport closed");
        Ok(())
    }

    /// Dispatch one message, replying into its conversation
    pub async fn process(transport: Arc<T>, dispatcher: Arc<Dispatcher>, message: InboundMessage) {
        tracing::debug!(
            "New message from {} ({}): {:?}",
            message.display_name(),
            message.chat_id,
            message.text
        );

        let chat_id = message.chat_id.clone();
        let reply = reply_fn(move |text| {
            let transport = Arc::clone(&transport);
            let chat_id = chat_id.clone();
            async move { transport.send_text(&chat_id, &text).await }
        });

        let text = message.text.clone();
        let outcome = dispatcher.execute(&text, &message, reply).await;
        tracing::debug!("[{}] {:?}", message.chat_id, outcome);
    }
}
