use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::{debug, info};

use crate::platform::Messenger;

/// Telegram Bot API client backed by teloxide.
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot_token: &str) -> Self {
        Self::with_bot(Bot::new(bot_token))
    }

    pub fn with_bot(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        debug!("Sending {} chars to chat {}", text.len(), chat_id);
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .with_context(|| format!("Failed to send message to chat {chat_id}"))?;
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<()> {
        self.bot
            .delete_webhook()
            .drop_pending_updates(true)
            .await
            .context("Failed to delete webhook")?;
        Ok(())
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        let url = reqwest::Url::parse(url).with_context(|| format!("Invalid webhook URL: {url}"))?;
        info!("Registering Telegram webhook at {}", url);
        self.bot
            .set_webhook(url)
            .await
            .context("Failed to set webhook")?;
        Ok(())
    }
}
