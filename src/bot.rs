//! Telegram webhook relay: inbound update → completion → outbound reply.

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::llm::CompletionClient;
use crate::platform::Messenger;

/// Sent instead of a completion when the completion API fails.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong with the AI response.";

/// Body returned for payloads that carry no usable message.
pub const INVALID_PAYLOAD: &str = "No valid data";

/// The parts of a Telegram update the relay needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TelegramUpdate {
    pub chat_id: i64,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    chat: RawChat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: i64,
}

/// Why an inbound payload was rejected.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("webhook body is empty")]
    Empty,
    #[error("webhook body is not a valid update: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("webhook update has no message")]
    NoMessage,
}

impl TelegramUpdate {
    /// Extract chat id and text from a raw webhook body.
    pub fn from_json(body: &[u8]) -> Result<Self, PayloadError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(PayloadError::Empty);
        }
        let raw: RawUpdate = serde_json::from_slice(body)?;
        let message = raw.message.ok_or(PayloadError::NoMessage)?;
        Ok(Self {
            chat_id: message.chat.id,
            text: message.text.unwrap_or_default(),
        })
    }
}

/// Ask the completion API for a reply to `update` and send it back to the
/// originating chat. Exactly one message is sent per call.
pub async fn relay(
    update: &TelegramUpdate,
    completion: &dyn CompletionClient,
    messenger: &dyn Messenger,
    model: &str,
) {
    info!("Message from chat_id {}: {}", update.chat_id, update.text);

    let reply = match completion.complete(model, &update.text).await {
        Ok(reply) => {
            info!("Replying with: {}", reply);
            reply
        }
        Err(e) => {
            error!("Error from completion API: {:#}", e);
            FALLBACK_REPLY.to_string()
        }
    };

    // Delivery failures are logged only; Telegram is still answered 200.
    if let Err(e) = messenger.send_text(update.chat_id, &reply).await {
        warn!("Failed to deliver reply to chat {}: {:#}", update.chat_id, e);
    } else {
        debug!("Reply delivered to chat {}", update.chat_id);
    }
}
