//! Sunshine forecast from Open-Meteo.

use serde::Deserialize;
use std::time::Duration;
use tracing::info;

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug)]
pub enum WeatherError {
    Http(String),
    Parse(String),
    MissingDay,
}

impl std::fmt::Display for WeatherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherError::Http(e) => write!(f, "HTTP error: {e}"),
            WeatherError::Parse(e) => write!(f, "Parse error: {e}"),
            WeatherError::MissingDay => write!(f, "forecast has no value for tomorrow"),
        }
    }
}

impl std::error::Error for WeatherError {}

#[derive(Deserialize)]
struct Forecast {
    daily: DailyForecast,
}

#[derive(Deserialize)]
struct DailyForecast {
    /// Seconds of sunshine per day, today first.
    sunshine_duration: Vec<Option<f64>>,
}

pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
}

impl WeatherClient {
    pub fn new(base_url: impl Into<String>, latitude: f64, longitude: f64, timezone: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
            latitude,
            longitude,
            timezone: timezone.into(),
        }
    }

    /// Expected hours of sunshine tomorrow.
    pub async fn sun_hours_tomorrow(&self) -> Result<f64, WeatherError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                ("daily", "sunshine_duration,daylight_duration".to_string()),
                ("timezone", self.timezone.clone()),
                ("forecast_days", "3".to_string()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WeatherError::Http(format!("status {}", response.status())));
        }

        let body = response.text().await.map_err(|e| WeatherError::Http(e.to_string()))?;
        let hours = parse_sun_hours_tomorrow(&body)?;
        info!("☀️ Forecast: {hours:.1} sun hours tomorrow");
        Ok(hours)
    }
}

fn parse_sun_hours_tomorrow(body: &str) -> Result<f64, WeatherError> {
    let forecast: Forecast = serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))?;
    forecast
        .daily
        .sunshine_duration
        .get(1)
        .copied()
        .flatten()
        .map(|seconds| seconds / 3600.0)
        .ok_or(WeatherError::MissingDay)
}
