use std::sync::Arc;

use anyhow::Context as _;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use battery_buddy::bot::handlers::{LiveState, handler_tree};
use battery_buddy::bot::{Command, Database, TelegramClient, scheduler};
use battery_buddy::claude::Client as ClaudeClient;
use battery_buddy::config::Config;
use battery_buddy::telegram_log::TelegramLogLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("refusing to start")?;

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).with_context(|| format!("creating {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::never(&log_dir, "battery-buddy.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        registry.with(TelegramLogLayer::new(bot.clone(), log_chat_id)).init();
    } else {
        registry.init();
    }

    info!("🤖 Battery Bot startet...");
    info!("Battery data: {}", config.data_path.display());
    info!("Model: {}", config.anthropic_model);
    if !config.data_path.exists() {
        warn!("Battery data file {} does not exist yet", config.data_path.display());
    }

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let ledger = Arc::new(Database::open(&config.ledger_path()).context("opening delivery ledger")?);
    let claude = ClaudeClient::new(config.anthropic_api_key.clone(), config.anthropic_model.clone());
    let state: Arc<LiveState> = Arc::new(LiveState::new(config, claude));

    tokio::spawn(scheduler::run(state.clone(), TelegramClient::new(bot.clone()), ledger));

    Dispatcher::builder(bot, handler_tree())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
