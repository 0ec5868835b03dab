//! Battery bot - command handlers, AI chat and the scheduled daily report.

pub mod chat;
pub mod commands;
pub mod database;
pub mod handlers;
pub mod replies;
pub mod report;
pub mod scheduler;
pub mod telegram;


use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::battery::{BatterySnapshot, SnapshotError};
use crate::claude::Completion;
use crate::config::Config;
use crate::weather::{OPEN_METEO_URL, WeatherClient};

pub use commands::Command;
pub use database::Database;
pub use replies::Reply;
pub use report::DailyReport;
pub use telegram::TelegramClient;

/// State shared by every handler and the scheduler.
pub struct BotState<C> {
    pub config: Config,
    pub llm: C,
    pub weather: WeatherClient,
    /// Today's report, keyed by the local date it was generated on.
    reports: Mutex<Option<(NaiveDate, DailyReport)>>,
}

impl<C: Completion> BotState<C> {
    pub fn new(config: Config, llm: C) -> Self {
        let weather = WeatherClient::new(
            OPEN_METEO_URL,
            config.latitude,
            config.longitude,
            config.timezone.name(),
        );
        Self::with_weather(config, llm, weather)
    }

    pub fn with_weather(config: Config, llm: C, weather: WeatherClient) -> Self {
        Self {
            config,
            llm,
            weather,
            reports: Mutex::new(None),
        }
    }

    /// Read the battery snapshot from disk.
    pub fn load_snapshot(&self) -> Result<BatterySnapshot, SnapshotError> {
        BatterySnapshot::load(&self.config.data_path)
    }

    /// Current date in the report time zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.config.timezone).date_naive()
    }

    /// Today's daily report, generated at most once per day unless the model failed.
    pub async fn daily_report(&self) -> Result<DailyReport, SnapshotError> {
        let today = self.today();
        let mut cached = self.reports.lock().await;

        if let Some((date, report)) = cached.as_ref()
            && *date == today
        {
            return Ok(report.clone());
        }

        let report = report::generate(self).await?;
        if report.from_model {
            *cached = Some((today, report.clone()));
        }
        Ok(report)
    }
}
