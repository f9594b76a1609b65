pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// Outbound calls to the messaging provider.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a plain text message to a chat.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Remove the registered webhook and drop any pending updates.
    async fn delete_webhook(&self) -> Result<()>;

    /// Register `url` as the webhook updates are delivered to.
    async fn set_webhook(&self, url: &str) -> Result<()>;
}
