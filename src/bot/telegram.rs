//! Telegram client using teloxide.

use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, ParseMode};
use tracing::{info, warn};

use super::replies::Reply;

/// Telegram's hard limit is 4096 characters per message.
const MAX_MESSAGE_CHARS: usize = 4000;

/// Telegram API client.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send replies in order, stopping at the first failure.
    pub async fn deliver(&self, chat_id: ChatId, replies: &[Reply]) -> Result<(), String> {
        for reply in replies {
            self.send(chat_id, reply).await?;
        }
        Ok(())
    }

    pub async fn send(&self, chat_id: ChatId, reply: &Reply) -> Result<(), String> {
        let result = match reply {
            Reply::Html(text) => {
                self.bot
                    .send_message(chat_id, truncate(text))
                    .parse_mode(ParseMode::Html)
                    .await
            }
            Reply::Plain(text) => self.bot.send_message(chat_id, truncate(text)).await,
            Reply::Photo { png, caption } => {
                info!("📷 Sending chart to chat {} ({} bytes)", chat_id.0, png.len());
                let input_file = InputFile::memory(png.clone()).file_name("chart.png");
                self.bot.send_photo(chat_id, input_file).caption(caption.clone()).await
            }
        };

        result.map(|_| ()).map_err(|e| {
            let msg = format!("Failed to send to chat {}: {e}", chat_id.0);
            warn!("{}", msg);
            msg
        })
    }

    /// Show "typing..." or similar. Failures only matter for the log.
    pub async fn send_action(&self, chat_id: ChatId, action: ChatAction) {
        if let Err(e) = self.bot.send_chat_action(chat_id, action).await {
            warn!("Failed to send chat action: {e}");
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_MESSAGE_CHARS {
        let truncated: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}
