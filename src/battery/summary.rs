//! Figures derived from a snapshot for the status, chat and daily replies.

use serde::Serialize;

use super::snapshot::{BatteryRecord, BatterySnapshot};

/// Sun hours assumed when the forecast is unavailable.
pub const FALLBACK_SUN_HOURS: f64 = 5.0;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `numerator / denominator * 100`, or 0 when there is nothing to divide by.
fn percent(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < f64::EPSILON {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

fn clock(record: &BatteryRecord) -> String {
    record.timestamp.format("%H:%M").to_string()
}

fn charged(r: &BatteryRecord) -> f64 {
    r.pv_to_battery + r.grid_to_battery
}

fn discharged(r: &BatteryRecord) -> f64 {
    r.battery_to_load + r.battery_to_grid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocLevel {
    Full,
    Good,
    Partial,
    AlmostEmpty,
}

impl SocLevel {
    pub fn from_soc(soc: f64) -> Self {
        if soc > 0.8 {
            SocLevel::Full
        } else if soc > 0.5 {
            SocLevel::Good
        } else if soc > 0.2 {
            SocLevel::Partial
        } else {
            SocLevel::AlmostEmpty
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SocLevel::Full => "🔋 Voll geladen",
            SocLevel::Good => "⚡ Gut geladen",
            SocLevel::Partial => "🔋 Teilweise geladen",
            SocLevel::AlmostEmpty => "⚡ Fast leer",
        }
    }
}

/// What `/status` shows.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusFigures {
    pub current_soc: f64,
    pub total_savings: f64,
    pub current_price: f64,
    pub peak_price: f64,
    pub peak_time: String,
}

impl StatusFigures {
    pub fn from_snapshot(snapshot: &BatterySnapshot) -> Self {
        let peak = snapshot.argmax(|r| r.price);
        Self {
            current_soc: snapshot.last().soc,
            total_savings: snapshot.sum(|r| r.savings),
            current_price: snapshot.last().price,
            peak_price: peak.price,
            peak_time: clock(peak),
        }
    }

    pub fn level(&self) -> SocLevel {
        SocLevel::from_soc(self.current_soc)
    }

    pub fn is_charged(&self) -> bool {
        self.current_soc > 0.5
    }
}

/// Battery context handed to the model with every chat question.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatContext {
    pub current_soc: f64,
    pub total_savings: f64,
    pub solar_production: f64,
    pub battery_charged: f64,
    pub battery_discharged: f64,
    pub peak_price: f64,
    pub peak_time: String,
    pub grid_dependence: f64,
}

impl ChatContext {
    pub fn from_snapshot(snapshot: &BatterySnapshot) -> Self {
        let peak = snapshot.argmax(|r| r.price);
        Self {
            current_soc: snapshot.last().soc,
            total_savings: snapshot.sum(|r| r.savings),
            solar_production: snapshot.sum(|r| r.pv_production),
            battery_charged: snapshot.sum(charged),
            battery_discharged: snapshot.sum(discharged),
            peak_price: peak.price,
            peak_time: clock(peak),
            grid_dependence: percent(snapshot.sum(|r| r.grid_import), snapshot.sum(|r| r.gross_load)),
        }
    }
}

/// Day summary serialised into the daily report prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: String,
    pub total_solar: f64,
    pub solar_self_consumed: f64,
    pub solar_exported: f64,
    pub battery_charged: f64,
    pub battery_discharged: f64,
    pub grid_import: f64,
    pub grid_export: f64,
    pub savings: f64,
    pub peak_price_time: String,
    pub peak_price: f64,
    pub cheap_price_time: String,
    pub cheap_price: f64,
    pub sunniest_hour: String,
    pub solar_coverage_pct: f64,
    pub export_ratio_pct: f64,
    pub battery_contribution_pct: f64,
    pub soc_swing: f64,
    pub grid_dependence_pct: f64,
    pub sun_hours_tomorrow: f64,
}

impl DailySummary {
    pub fn from_snapshot(snapshot: &BatterySnapshot, sun_hours_tomorrow: f64) -> Self {
        let total_solar = snapshot.sum(|r| r.pv_production);
        let self_consumed = snapshot.sum(|r| r.pv_utilized);
        let exported = snapshot.sum(|r| r.pv_to_grid);
        let discharged_total = snapshot.sum(discharged);
        let gross_load = snapshot.sum(|r| r.gross_load);

        let peak = snapshot.argmax(|r| r.price);
        let cheap = snapshot.argmin(|r| r.price);
        let sunniest = snapshot.argmax(|r| r.pv_production);

        let soc_max = snapshot.records().iter().map(|r| r.soc).fold(f64::MIN, f64::max);
        let soc_min = snapshot.records().iter().map(|r| r.soc).fold(f64::MAX, f64::min);

        Self {
            date: snapshot.first().timestamp.date().to_string(),
            total_solar: round_to(total_solar, 1),
            solar_self_consumed: round_to(self_consumed, 1),
            solar_exported: round_to(exported, 1),
            battery_charged: round_to(snapshot.sum(charged), 1),
            battery_discharged: round_to(discharged_total, 1),
            grid_import: round_to(snapshot.sum(|r| r.grid_import), 1),
            grid_export: round_to(snapshot.sum(|r| r.grid_export), 1),
            savings: round_to(snapshot.sum(|r| r.savings + r.feed_in_revenue), 2),
            peak_price_time: clock(peak),
            peak_price: round_to(peak.price, 2),
            cheap_price_time: clock(cheap),
            cheap_price: round_to(cheap.price, 2),
            sunniest_hour: clock(sunniest),
            solar_coverage_pct: round_to(percent(self_consumed, gross_load), 1),
            export_ratio_pct: if total_solar > 0.0 { round_to(percent(exported, total_solar), 1) } else { 0.0 },
            battery_contribution_pct: round_to(percent(discharged_total, snapshot.sum(|r| r.net_load)), 1),
            soc_swing: round_to(soc_max - soc_min, 2),
            grid_dependence_pct: round_to(percent(snapshot.sum(|r| r.grid_import), gross_load), 1),
            sun_hours_tomorrow,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::snapshot::parse_timestamp;

    fn record(hour: u32, f: impl FnOnce(&mut BatteryRecord)) -> BatteryRecord {
        let mut r = BatteryRecord {
            timestamp: parse_timestamp(&format!("2024-06-15T{hour:02}:00:00")).unwrap(),
            ..Default::default()
        };
        f(&mut r);
        r
    }

    fn sample() -> BatterySnapshot {
        BatterySnapshot::from_records(vec![
            record(0, |r| {
                r.soc = 0.3;
                r.price = 0.20;
                r.grid_import = 1.0;
                r.gross_load = 1.0;
                r.net_load = 1.0;
                r.grid_to_battery = 0.5;
            }),
            record(12, |r| {
                r.soc = 0.9;
                r.price = 0.10;
                r.pv_production = 4.0;
                r.pv_utilized = 1.0;
                r.pv_to_battery = 2.0;
                r.pv_to_grid = 1.0;
                r.grid_export = 1.0;
                r.gross_load = 1.0;
                r.savings = 0.25;
                r.feed_in_revenue = 0.08;
            }),
            record(19, |r| {
                r.soc = 0.6;
                r.price = 0.41;
                r.battery_to_load = 1.5;
                r.gross_load = 2.0;
                r.net_load = 2.0;
                r.grid_import = 0.5;
                r.savings = 0.6;
            }),
        ])
        .unwrap()
    }

    #[test]
    fn test_soc_levels() {
        assert_eq!(SocLevel::from_soc(0.95), SocLevel::Full);
        assert_eq!(SocLevel::from_soc(0.8), SocLevel::Good);
        assert_eq!(SocLevel::from_soc(0.51), SocLevel::Good);
        assert_eq!(SocLevel::from_soc(0.5), SocLevel::Partial);
        assert_eq!(SocLevel::from_soc(0.2), SocLevel::AlmostEmpty);
        assert_eq!(SocLevel::from_soc(0.0), SocLevel::AlmostEmpty);
    }

    #[test]
    fn test_status_figures() {
        let status = StatusFigures::from_snapshot(&sample());
        assert_eq!(status.current_soc, 0.6);
        assert!((status.total_savings - 0.85).abs() < 1e-9);
        assert_eq!(status.current_price, 0.41);
        assert_eq!(status.peak_price, 0.41);
        assert_eq!(status.peak_time, "19:00");
        assert_eq!(status.level(), SocLevel::Good);
        assert!(status.is_charged());
    }

    #[test]
    fn test_chat_context() {
        let context = ChatContext::from_snapshot(&sample());
        assert_eq!(context.solar_production, 4.0);
        assert_eq!(context.battery_charged, 2.5);
        assert_eq!(context.battery_discharged, 1.5);
        // 1.5 imported of 4.0 consumed
        assert!((context.grid_dependence - 37.5).abs() < 1e-9);
    }

    #[test]
    fn test_daily_summary() {
        let summary = DailySummary::from_snapshot(&sample(), 6.5);
        assert_eq!(summary.date, "2024-06-15");
        assert_eq!(summary.total_solar, 4.0);
        assert_eq!(summary.savings, 0.93);
        assert_eq!(summary.peak_price_time, "19:00");
        assert_eq!(summary.cheap_price_time, "12:00");
        assert_eq!(summary.cheap_price, 0.1);
        assert_eq!(summary.sunniest_hour, "12:00");
        assert_eq!(summary.solar_coverage_pct, 25.0);
        assert_eq!(summary.export_ratio_pct, 25.0);
        assert_eq!(summary.battery_contribution_pct, 50.0);
        assert_eq!(summary.soc_swing, 0.6);
        assert_eq!(summary.grid_dependence_pct, 37.5);
        assert_eq!(summary.sun_hours_tomorrow, 6.5);

        let json: serde_json::Value = serde_json::from_str(&summary.to_json()).unwrap();
        assert_eq!(json["sunniest_hour"], "12:00");
    }

    #[test]
    fn test_zero_denominators() {
        let snapshot = BatterySnapshot::from_records(vec![record(0, |r| r.soc = 0.5)]).unwrap();
        let summary = DailySummary::from_snapshot(&snapshot, FALLBACK_SUN_HOURS);
        assert_eq!(summary.solar_coverage_pct, 0.0);
        assert_eq!(summary.export_ratio_pct, 0.0);
        assert_eq!(summary.battery_contribution_pct, 0.0);
        assert_eq!(summary.grid_dependence_pct, 0.0);
        assert_eq!(summary.soc_swing, 0.0);
        assert!(summary.to_json().contains("\"total_solar\":0.0"));
    }
}
