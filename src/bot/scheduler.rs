//! Cron-driven daily report delivery.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use teloxide::types::ChatId;
use tracing::{info, warn};

use super::database::Database;
use super::telegram::TelegramClient;
use super::{BotState, Reply, replies};
use crate::claude::Completion;

/// Next fire time strictly after `now`, in the schedule's time zone.
pub fn next_fire(schedule: &Schedule, tz: Tz, now: DateTime<Utc>) -> Option<DateTime<Tz>> {
    schedule.after(&now.with_timezone(&tz)).next()
}

/// Ledger key of a fire time.
pub fn slot_key(fire: &DateTime<Tz>) -> String {
    fire.to_rfc3339()
}

/// Sleep until each scheduled time and send the report. Runs until the process exits.
pub async fn run<C: Completion>(state: Arc<BotState<C>>, telegram: TelegramClient, db: Arc<Database>) {
    let chats = &state.config.report_chat_ids;
    if chats.is_empty() {
        info!("Daily report scheduler disabled (no REPORT_CHAT_IDS)");
        return;
    }

    loop {
        let now = Utc::now();
        let Some(fire) = next_fire(&state.config.report_schedule, state.config.timezone, now) else {
            warn!("Report schedule has no future occurrence, scheduler stopped");
            return;
        };

        let wait = (fire.with_timezone(&Utc) - now).to_std().unwrap_or_default();
        info!("⏰ Next daily report at {} (in {} min)", fire, wait.as_secs() / 60);
        tokio::time::sleep(wait).await;

        fire_once(&*state, &db, &slot_key(&fire), |chat_id, replies| {
            let telegram = telegram.clone();
            async move { telegram.deliver(chat_id, &replies).await }
        })
        .await;
    }
}

/// Deliver one scheduled report to every configured chat that has not had it yet.
/// Returns the chats the report was sent to.
pub async fn fire_once<C, F, Fut>(state: &BotState<C>, db: &Database, slot: &str, send: F) -> Vec<ChatId>
where
    C: Completion,
    F: Fn(ChatId, Vec<Reply>) -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    let mut claimed = Vec::new();
    for &chat_id in &state.config.report_chat_ids {
        match db.claim_delivery(chat_id.0, slot) {
            Ok(true) => claimed.push(chat_id),
            Ok(false) => info!("Report {slot} already delivered to chat {}", chat_id.0),
            Err(e) => warn!("Ledger error for chat {}, skipping: {e}", chat_id.0),
        }
    }
    if claimed.is_empty() {
        return claimed;
    }

    let replies = match state.daily_report().await {
        Ok(report) => report.replies(),
        Err(e) => {
            warn!("Scheduled report failed: {e}");
            vec![replies::report_error(&e)]
        }
    };

    let mut sent = Vec::new();
    for chat_id in claimed {
        match send(chat_id, replies.clone()).await {
            Ok(()) => {
                info!("📬 Daily report {slot} sent to chat {}", chat_id.0);
                sent.push(chat_id);
            }
            Err(e) => warn!("Daily report {slot} to chat {} failed: {e}", chat_id.0),
        }
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn test_next_fire_in_timezone() {
        let schedule = Schedule::from_str("0 0 8 * * * *").unwrap();
        let tz = chrono_tz::Europe::Berlin;

        // 05:30 UTC in summer is 07:30 in Berlin: fires the same morning
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 5, 30, 0).unwrap();
        let fire = next_fire(&schedule, tz, now).unwrap();
        assert_eq!(fire.format("%Y-%m-%d %H:%M").to_string(), "2024-06-15 08:00");
        assert_eq!(fire.with_timezone(&Utc).format("%H:%M").to_string(), "06:00");

        // exactly at fire time: next day
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 6, 0, 0).unwrap();
        let fire = next_fire(&schedule, tz, now).unwrap();
        assert_eq!(fire.format("%Y-%m-%d %H:%M").to_string(), "2024-06-16 08:00");
    }

    #[test]
    fn test_slot_key_includes_offset() {
        let schedule = Schedule::from_str("0 0 8 * * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let fire = next_fire(&schedule, chrono_tz::Europe::Berlin, now).unwrap();
        assert_eq!(slot_key(&fire), "2024-01-11T08:00:00+01:00");
    }

    #[test]
    fn test_expired_schedule() {
        let schedule = Schedule::from_str("0 0 8 1 1 * 2020").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        assert!(next_fire(&schedule, chrono_tz::UTC, now).is_none());
    }
}
