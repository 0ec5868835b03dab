use chrono_tz::Tz;
use cron::Schedule;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use teloxide::types::ChatId;

pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_DATA_PATH: &str = "data/day1.json";
pub const DEFAULT_REPORT_CRON: &str = "0 0 8 * * * *";
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";
/// Munich.
pub const DEFAULT_LATITUDE: f64 = 48.1374;
pub const DEFAULT_LONGITUDE: f64 = 11.5755;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    Missing(&'static str),
    /// A variable is set but its value is unusable.
    Invalid { var: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "environment variable {var} is required"),
            Self::Invalid { var, reason } => write!(f, "invalid {var}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    /// Battery snapshot served by every command.
    pub data_path: PathBuf,
    /// Directory for state files (logs, delivery ledger).
    pub data_dir: PathBuf,
    /// Chats that receive the scheduled daily report. Empty disables the scheduler.
    pub report_chat_ids: Vec<ChatId>,
    pub report_schedule: Schedule,
    pub timezone: Tz,
    pub latitude: f64,
    pub longitude: f64,
    pub log_chat_id: Option<ChatId>,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        match telegram_bot_token.split_once(':') {
            Some((id, secret)) if id.parse::<u64>().is_ok() && !secret.is_empty() && !secret.contains(':') => {}
            _ => {
                return Err(ConfigError::Invalid {
                    var: "TELEGRAM_BOT_TOKEN",
                    reason: "expected format 123456789:ABCdefGHI...".into(),
                });
            }
        }

        let anthropic_api_key = get("ANTHROPIC_API_KEY").ok_or(ConfigError::Missing("ANTHROPIC_API_KEY"))?;
        let anthropic_model = get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let data_path = PathBuf::from(get("BATTERY_DATA_PATH").unwrap_or_else(|| DEFAULT_DATA_PATH.to_string()));
        let data_dir = PathBuf::from(get("DATA_DIR").unwrap_or_else(|| ".".to_string()));

        let report_chat_ids = match get("REPORT_CHAT_IDS") {
            Some(raw) => parse_chat_ids(&raw)?,
            None => Vec::new(),
        };

        let cron_expr = get("REPORT_CRON").unwrap_or_else(|| DEFAULT_REPORT_CRON.to_string());
        let report_schedule = Schedule::from_str(&cron_expr).map_err(|e| ConfigError::Invalid {
            var: "REPORT_CRON",
            reason: format!("'{cron_expr}': {e}"),
        })?;

        let tz_name = get("REPORT_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = tz_name.parse::<Tz>().map_err(|e| ConfigError::Invalid {
            var: "REPORT_TIMEZONE",
            reason: e.to_string(),
        })?;

        let latitude = parse_coordinate(get("WEATHER_LATITUDE"), "WEATHER_LATITUDE", DEFAULT_LATITUDE, 90.0)?;
        let longitude = parse_coordinate(get("WEATHER_LONGITUDE"), "WEATHER_LONGITUDE", DEFAULT_LONGITUDE, 180.0)?;

        let log_chat_id = match get("LOG_CHAT_ID") {
            Some(raw) => Some(parse_chat_id(&raw, "LOG_CHAT_ID")?),
            None => None,
        };

        Ok(Self {
            telegram_bot_token,
            anthropic_api_key,
            anthropic_model,
            data_path,
            data_dir,
            report_chat_ids,
            report_schedule,
            timezone,
            latitude,
            longitude,
            log_chat_id,
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("battery_buddy.db")
    }
}

fn parse_chat_id(raw: &str, var: &'static str) -> Result<ChatId, ConfigError> {
    raw.trim().parse::<i64>().map(ChatId).map_err(|_| ConfigError::Invalid {
        var,
        reason: format!("'{raw}' is not a chat id"),
    })
}

fn parse_chat_ids(raw: &str) -> Result<Vec<ChatId>, ConfigError> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = parse_chat_id(part, "REPORT_CHAT_IDS")?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn parse_coordinate(raw: Option<String>, var: &'static str, default: f64, limit: f64) -> Result<f64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: f64 = raw.parse().map_err(|_| ConfigError::Invalid {
        var,
        reason: format!("'{raw}' is not a number"),
    })?;
    if !value.is_finite() || value.abs() > limit {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("{value} is outside ±{limit}"),
        });
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) fn test_config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
    use std::collections::HashMap;

    let mut env: HashMap<String, String> = HashMap::from([
        ("TELEGRAM_BOT_TOKEN".to_string(), "123456789:ABCdefGHIjklMNOpqrsTUVwxyz".to_string()),
        ("ANTHROPIC_API_KEY".to_string(), "sk-ant-test".to_string()),
    ]);
    for (k, v) in pairs {
        env.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(|key| env.get(key).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_defaults() {
        let config = test_config(&[]).expect("should load minimal config");
        assert_eq!(config.anthropic_model, DEFAULT_MODEL);
        assert_eq!(config.data_path, PathBuf::from("data/day1.json"));
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert!(config.report_chat_ids.is_empty());
        assert!(config.log_chat_id.is_none());
        assert_eq!(config.latitude, DEFAULT_LATITUDE);
        assert_eq!(config.ledger_path(), PathBuf::from("./battery_buddy.db"));
    }

    #[test]
    fn test_missing_token() {
        let err = assert_err(Config::from_lookup(|key| match key {
            "ANTHROPIC_API_KEY" => Some("key".into()),
            _ => None,
        }));
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn test_missing_api_key() {
        let err = assert_err(test_config(&[("ANTHROPIC_API_KEY", "   ")]));
        assert!(matches!(err, ConfigError::Missing("ANTHROPIC_API_KEY")));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_invalid_token_formats() {
        for token in ["no_colon", "notanumber:ABC", "123456789:", "1:2:3"] {
            let err = assert_err(test_config(&[("TELEGRAM_BOT_TOKEN", token)]));
            assert!(matches!(err, ConfigError::Invalid { var: "TELEGRAM_BOT_TOKEN", .. }), "{token}");
        }
    }

    #[test]
    fn test_report_chat_ids() {
        let config = test_config(&[("REPORT_CHAT_IDS", "42, -100123 ,42,")]).unwrap();
        assert_eq!(config.report_chat_ids, vec![ChatId(42), ChatId(-100123)]);

        let err = assert_err(test_config(&[("REPORT_CHAT_IDS", "42,abc")]));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_invalid_cron() {
        let err = assert_err(test_config(&[("REPORT_CRON", "every morning")]));
        assert!(matches!(err, ConfigError::Invalid { var: "REPORT_CRON", .. }));
    }

    #[test]
    fn test_invalid_timezone() {
        let err = assert_err(test_config(&[("REPORT_TIMEZONE", "Mars/Olympus")]));
        assert!(matches!(err, ConfigError::Invalid { var: "REPORT_TIMEZONE", .. }));
    }

    #[test]
    fn test_coordinates() {
        let config = test_config(&[("WEATHER_LATITUDE", "52.52"), ("WEATHER_LONGITUDE", "13.405")]).unwrap();
        assert_eq!(config.latitude, 52.52);
        assert_eq!(config.longitude, 13.405);

        assert!(test_config(&[("WEATHER_LATITUDE", "91")]).is_err());
        assert!(test_config(&[("WEATHER_LONGITUDE", "east")]).is_err());
    }

    #[test]
    fn test_log_chat_id() {
        let config = test_config(&[("LOG_CHAT_ID", "-1001")]).unwrap();
        assert_eq!(config.log_chat_id, Some(ChatId(-1001)));
    }
}
