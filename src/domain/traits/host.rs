use std::time::Duration;

use async_trait::async_trait;
use crate::application::errors::CommandError;

/// Services the host lends to command handlers
#[async_trait]
pub trait HostServices: Send + Sync {
    async fn sleep(&self, duration: Duration);

    /// GET a URL and decode the body as JSON
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, CommandError>;
}
