//! The five bot commands and the replies they produce.

use teloxide::types::ChatAction;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use super::BotState;
use super::replies::{self, CHART_CAPTION, Reply};
use crate::battery::StatusFigures;
use crate::chart::{self, ChartKind};
use crate::claude::Completion;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Battery Buddy Kommandos:")]
pub enum Command {
    #[command(description = "Bot starten")]
    Start,
    #[command(description = "Täglichen Report anfordern")]
    Daily,
    #[command(description = "Aktuellen Status abfragen")]
    Status,
    #[command(description = "Batterie-Chart generieren")]
    Chart,
    #[command(description = "Hilfe anzeigen")]
    Help,
}

impl Command {
    /// Indicator shown while a slow command runs.
    pub fn chat_action(&self) -> Option<ChatAction> {
        match self {
            Command::Daily => Some(ChatAction::Typing),
            Command::Chart => Some(ChatAction::UploadPhoto),
            Command::Start | Command::Status | Command::Help => None,
        }
    }
}

/// Replies for a command, in sending order. Never empty.
pub async fn respond<C: Completion>(state: &BotState<C>, command: &Command) -> Vec<Reply> {
    info!("⌨️ /{}", format!("{command:?}").to_lowercase());
    match command {
        Command::Start => vec![Reply::Html(replies::welcome())],
        Command::Help => vec![Reply::Html(replies::help())],
        Command::Status => vec![status(state)],
        Command::Chart => vec![chart(state).await],
        Command::Daily => match state.daily_report().await {
            Ok(report) => report.replies(),
            Err(e) => {
                warn!("Daily report failed: {e}");
                vec![replies::report_error(&e)]
            }
        },
    }
}

fn status<C: Completion>(state: &BotState<C>) -> Reply {
    match state.load_snapshot() {
        Ok(snapshot) => Reply::Html(replies::status(&StatusFigures::from_snapshot(&snapshot))),
        Err(e) => {
            warn!("Status failed: {e}");
            replies::status_error(&e)
        }
    }
}

async fn chart<C: Completion>(state: &BotState<C>) -> Reply {
    let snapshot = match state.load_snapshot() {
        Ok(s) => s,
        Err(e) => {
            warn!("Chart failed: {e}");
            return replies::chart_error(&e);
        }
    };
    match chart::render_blocking(snapshot, ChartKind::Status).await {
        Ok(png) => Reply::Photo {
            png,
            caption: CHART_CAPTION.to_string(),
        },
        Err(e) => {
            warn!("Chart failed: {e}");
            replies::chart_error(&e)
        }
    }
}
