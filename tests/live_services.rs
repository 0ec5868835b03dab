//! Integration tests against real fonts and external services.
//!
//! These tests require:
//! 1. System fonts (fontconfig) for chart text rendering
//! 2. Network access for the weather test
//! 3. ANTHROPIC_API_KEY for the model test (skipped when unset)
//!
//! Run with: cargo test --features integ_test --test live_services

#[cfg(feature = "integ_test")]
mod tests {
    use battery_buddy::battery::BatterySnapshot;
    use battery_buddy::chart::{self, ChartKind};
    use battery_buddy::claude::{Client, Completion};
    use battery_buddy::config::{DEFAULT_LATITUDE, DEFAULT_LONGITUDE, DEFAULT_MODEL};
    use battery_buddy::weather::{OPEN_METEO_URL, WeatherClient};

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn sample() -> BatterySnapshot {
        BatterySnapshot::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/day1.json"))
            .expect("sample data should load")
    }

    /// `/chart` output is a PNG derived from the shipped sample day.
    #[test]
    fn test_status_chart_is_png() {
        let png = chart::render(&sample(), ChartKind::Status).expect("chart should render");
        assert!(png.starts_with(PNG_MAGIC));
        assert!(png.len() > 10_000, "suspiciously small chart: {} bytes", png.len());
    }

    #[test]
    fn test_energy_flow_chart_is_png() {
        let png = chart::render(&sample(), ChartKind::EnergyFlow).expect("chart should render");
        assert!(png.starts_with(PNG_MAGIC));
    }

    #[tokio::test]
    async fn test_weather_forecast() {
        let client = WeatherClient::new(OPEN_METEO_URL, DEFAULT_LATITUDE, DEFAULT_LONGITUDE, "Europe/Berlin");
        let hours = client.sun_hours_tomorrow().await.expect("forecast should load");
        assert!((0.0..=24.0).contains(&hours), "{hours}");
    }

    #[tokio::test]
    async fn test_model_answers() {
        let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") else {
            eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
            return;
        };
        let client = Client::new(api_key, DEFAULT_MODEL.to_string());
        let answer = client
            .complete("Antworte nur mit dem Wort: Batterie", 20)
            .await
            .expect("model should answer");
        assert!(!answer.trim().is_empty());
    }
}
