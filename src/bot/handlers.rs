//! teloxide update routing.

use std::sync::Arc;

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::ChatAction;
use tracing::info;

use super::telegram::TelegramClient;
use super::{BotState, Command, chat, commands};
use crate::claude::Client as ClaudeClient;

pub type LiveState = BotState<ClaudeClient>;

/// Commands first, then any other text goes to the AI chat.
pub fn handler_tree() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some_and(|t| !t.starts_with('/')))
                .endpoint(handle_text),
        )
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: Arc<LiveState>) -> ResponseResult<()> {
    let telegram = TelegramClient::new(bot);
    if let Some(action) = cmd.chat_action() {
        telegram.send_action(msg.chat.id, action).await;
    }

    let replies = commands::respond(&*state, &cmd).await;
    // Failures are already logged by the client.
    telegram.deliver(msg.chat.id, &replies).await.ok();
    Ok(())
}

async fn handle_text(bot: Bot, msg: Message, state: Arc<LiveState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let username = msg
        .from
        .as_ref()
        .map(|u| u.username.clone().unwrap_or_else(|| u.first_name.clone()))
        .unwrap_or_else(|| "unknown".to_string());
    let preview: String = text.chars().take(100).collect();
    info!("💬 Question from {username}: \"{preview}\"");

    let telegram = TelegramClient::new(bot);
    telegram.send_action(msg.chat.id, ChatAction::Typing).await;

    let reply = chat::answer(&*state, text).await;
    telegram.send(msg.chat.id, &reply).await.ok();
    Ok(())
}
