//! Forward log events to a Telegram chat.

use std::time::Duration;

use teloxide::prelude::*;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const MAX_BATCH_LINES: usize = 50;
const MAX_MESSAGE_CHARS: usize = 4000;

enum Entry {
    /// WARN/ERROR, sent on arrival.
    Urgent(String),
    /// INFO, batched.
    Info(String),
}

/// INFO lines waiting for the next flush.
#[derive(Default)]
struct Batch {
    lines: Vec<String>,
}

impl Batch {
    /// Returns true once the batch should be flushed early.
    fn push(&mut self, line: String) -> bool {
        self.lines.push(line);
        self.lines.len() >= MAX_BATCH_LINES
    }

    /// Drain into chat messages no longer than the Telegram limit.
    fn drain(&mut self) -> Vec<String> {
        let mut messages = Vec::new();
        let mut current = String::new();
        for line in self.lines.drain(..) {
            let line = clip(&line);
            if !current.is_empty() && current.chars().count() + line.chars().count() + 1 > MAX_MESSAGE_CHARS {
                messages.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(&line);
        }
        if !current.is_empty() {
            messages.push(current);
        }
        messages
    }
}

fn clip(text: &str) -> String {
    if text.chars().count() > MAX_MESSAGE_CHARS {
        let clipped: String = text.chars().take(MAX_MESSAGE_CHARS - 3).collect();
        format!("{clipped}...")
    } else {
        text.to_string()
    }
}

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<Entry>,
}

impl TelegramLogLayer {
    /// Must be called inside a tokio runtime.
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Entry>();

        tokio::spawn(async move {
            let mut batch = Batch::default();
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    entry = rx.recv() => match entry {
                        Some(Entry::Urgent(text)) => send(&bot, chat_id, &clip(&text)).await,
                        Some(Entry::Info(text)) => {
                            if batch.push(text) {
                                flush(&bot, chat_id, &mut batch).await;
                            }
                        }
                        None => {
                            flush(&bot, chat_id, &mut batch).await;
                            break;
                        }
                    },
                    _ = interval.tick() => flush(&bot, chat_id, &mut batch).await,
                }
            }
        });

        Self { tx }
    }
}

async fn flush(bot: &Bot, chat_id: ChatId, batch: &mut Batch) {
    for message in batch.drain() {
        send(bot, chat_id, &message).await;
    }
}

async fn send(bot: &Bot, chat_id: ChatId, text: &str) {
    // Not through tracing: that would feed back into this layer.
    if let Err(e) = bot.send_message(chat_id, text).await {
        eprintln!("Failed to send log to Telegram: {e}");
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = if field.name() == "message" {
            format!("{value:?}")
        } else {
            format!("{} = {:?}", field.name(), value)
        };
        if !self.message.is_empty() {
            self.message.push_str(", ");
        }
        self.message.push_str(&rendered);
    }
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::INFO {
            return;
        }
        // teloxide's own request logging would echo every forwarded line.
        if event.metadata().target().starts_with("teloxide") || event.metadata().target().starts_with("reqwest") {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let entry = match level {
            Level::ERROR => Entry::Urgent(format!("❌ {}", visitor.message)),
            Level::WARN => Entry::Urgent(format!("⚠️ {}", visitor.message)),
            _ => Entry::Info(visitor.message),
        };

        if self.tx.send(entry).is_err() {
            eprintln!("Log channel closed, message dropped");
        }
    }
}
