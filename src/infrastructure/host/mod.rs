//! Host utilities exposed to command handlers
//!
//! Handlers never touch the transport or build their own clients; the host
//! hands them a delay primitive and a JSON fetcher.

use std::time::Duration;

use async_trait::async_trait;
use crate::application::errors::CommandError;
use crate::domain::traits::HostServices;

const USER_AGENT: &str = concat!("nology-bot/", env!("CARGO_PKG_VERSION"));

/// Tokio timer and a shared HTTP client, bound into every argument bundle
#[derive(Debug, Clone)]
pub struct HostUtils {
    client: reqwest::Client,
}

impl HostUtils {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl HostServices for HostUtils {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, CommandError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

impl Default for HostUtils {
    fn default() -> Self {
        Self::new()
    }
}
