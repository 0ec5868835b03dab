//! PNG charts of a battery snapshot.

use chrono::NaiveDateTime;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::prelude::*;

use crate::battery::BatterySnapshot;

const PV_ORANGE: RGBColor = RGBColor(255, 140, 0);
const USED_GREEN: RGBColor = RGBColor(34, 139, 34);
const DISCHARGE_RED: RGBColor = RGBColor(214, 39, 40);
const SOC_BLUE: RGBColor = RGBColor(31, 119, 180);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// `/chart`: production, usage, battery flows and SOC in percent.
    Status,
    /// Daily report: production, usage and battery flows in kW.
    EnergyFlow,
}

impl ChartKind {
    pub fn size(&self) -> (u32, u32) {
        match self {
            ChartKind::Status => (1800, 900),
            ChartKind::EnergyFlow => (1500, 600),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::Status => "Batterie-Performance heute",
            ChartKind::EnergyFlow => "Energiefluss heute",
        }
    }

    pub fn y_label(&self) -> &'static str {
        match self {
            ChartKind::Status => "kW / %",
            ChartKind::EnergyFlow => "kW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    Line,
    /// Filled down to zero.
    Area,
}

#[derive(Debug, Clone)]
pub struct Series {
    pub label: &'static str,
    pub color: RGBColor,
    pub style: SeriesStyle,
    /// (hours since the first record, value)
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug)]
pub enum ChartError {
    Render(String),
    Encode(String),
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartError::Render(e) => write!(f, "chart rendering failed: {e}"),
            ChartError::Encode(e) => write!(f, "PNG encoding failed: {e}"),
        }
    }
}

impl std::error::Error for ChartError {}

fn hours_since(start: NaiveDateTime, ts: NaiveDateTime) -> f64 {
    (ts - start).num_seconds() as f64 / 3600.0
}

/// The series a chart kind draws, in drawing order.
pub fn series(snapshot: &BatterySnapshot, kind: ChartKind) -> Vec<Series> {
    let start = snapshot.first().timestamp;
    let points = |field: fn(&crate::battery::BatteryRecord) -> f64| -> Vec<(f64, f64)> {
        snapshot
            .records()
            .iter()
            .map(|r| (hours_since(start, r.timestamp), field(r)))
            .collect()
    };

    let mut out = vec![
        Series { label: "PV Produktion", color: PV_ORANGE, style: SeriesStyle::Line, points: points(|r| r.pv_production) },
        Series { label: "PV genutzt", color: USED_GREEN, style: SeriesStyle::Line, points: points(|r| r.pv_utilized) },
        Series { label: "Batterie geladen", color: USED_GREEN, style: SeriesStyle::Area, points: points(|r| r.pv_to_battery) },
        Series { label: "Batterie entladen", color: DISCHARGE_RED, style: SeriesStyle::Area, points: points(|r| r.battery_to_load) },
    ];
    if kind == ChartKind::Status {
        out.push(Series { label: "SOC %", color: SOC_BLUE, style: SeriesStyle::Line, points: points(|r| r.soc * 100.0) });
    }
    out
}

/// Axis ranges covering every series, with a little headroom.
pub fn bounds(series: &[Series]) -> ((f64, f64), (f64, f64)) {
    let all = series.iter().flat_map(|s| s.points.iter());
    let x_max = all.clone().map(|(x, _)| *x).fold(0.0, f64::max).max(1.0);
    let y_min = all.clone().map(|(_, y)| *y).fold(0.0, f64::min);
    let y_max = all.map(|(_, y)| *y).fold(0.0, f64::max).max(1.0) * 1.05;
    ((0.0, x_max), (y_min, y_max))
}

/// Render a chart and return it PNG encoded.
pub fn render(snapshot: &BatterySnapshot, kind: ChartKind) -> Result<Vec<u8>, ChartError> {
    let (width, height) = kind.size();
    let mut pixels = vec![0u8; (width * height * 3) as usize];
    let start = snapshot.first().timestamp;
    let all_series = series(snapshot, kind);

    draw(&mut pixels, (width, height), kind, start, &all_series).map_err(ChartError::Render)?;

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| ChartError::Encode(e.to_string()))?;
    Ok(png)
}

/// [`render`] on the blocking thread pool.
pub async fn render_blocking(snapshot: BatterySnapshot, kind: ChartKind) -> Result<Vec<u8>, ChartError> {
    tokio::task::spawn_blocking(move || render(&snapshot, kind))
        .await
        .map_err(|e| ChartError::Render(e.to_string()))?
}

fn message(e: impl std::fmt::Display) -> String {
    e.to_string()
}

fn draw(
    pixels: &mut [u8],
    size: (u32, u32),
    kind: ChartKind,
    start: NaiveDateTime,
    all_series: &[Series],
) -> Result<(), String> {
    let root = BitMapBackend::with_buffer(pixels, size).into_drawing_area();
    root.fill(&WHITE).map_err(message)?;

    let ((x_min, x_max), (y_min, y_max)) = bounds(all_series);
    let mut chart = ChartBuilder::on(&root)
        .caption(kind.title(), ("sans-serif", 36))
        .margin(24)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(message)?;

    let clock = |x: &f64| {
        let ts = start + chrono::Duration::seconds((x * 3600.0).round() as i64);
        ts.format("%H:%M").to_string()
    };

    chart
        .configure_mesh()
        .x_desc("Uhrzeit")
        .y_desc(kind.y_label())
        .x_label_formatter(&clock)
        .light_line_style(BLACK.mix(0.05))
        .bold_line_style(BLACK.mix(0.15))
        .draw()
        .map_err(message)?;

    for s in all_series {
        let color = s.color;
        match s.style {
            SeriesStyle::Line => {
                chart
                    .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(3)))
                    .map_err(message)?
                    .label(s.label)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
            }
            SeriesStyle::Area => {
                chart
                    .draw_series(AreaSeries::new(s.points.iter().copied(), 0.0, color.mix(0.3)))
                    .map_err(message)?
                    .label(s.label)
                    .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 20, y + 6)], color.mix(0.3).filled()));
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.3))
        .draw()
        .map_err(message)?;

    root.present().map_err(message)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::snapshot::parse_timestamp;
    use crate::battery::BatteryRecord;

    fn snapshot() -> BatterySnapshot {
        let records = (0..4)
            .map(|h| BatteryRecord {
                timestamp: parse_timestamp(&format!("2024-06-15T{:02}:30:00", 10 + h)).unwrap(),
                soc: 0.25 * h as f64,
                pv_production: 2.0 + h as f64,
                battery_to_load: -0.5,
                ..Default::default()
            })
            .collect();
        BatterySnapshot::from_records(records).unwrap()
    }

    #[test]
    fn test_status_series_include_soc_percent() {
        let s = series(&snapshot(), ChartKind::Status);
        let labels: Vec<_> = s.iter().map(|s| s.label).collect();
        assert_eq!(labels, ["PV Produktion", "PV genutzt", "Batterie geladen", "Batterie entladen", "SOC %"]);

        let soc = &s[4];
        assert_eq!(soc.points.last(), Some(&(3.0, 75.0)));
        assert_eq!(soc.points[0].0, 0.0);
    }

    #[test]
    fn test_energy_flow_series() {
        let s = series(&snapshot(), ChartKind::EnergyFlow);
        assert_eq!(s.len(), 4);
        assert!(s.iter().all(|s| s.points.len() == 4));
        assert_eq!(s[2].style, SeriesStyle::Area);
    }

    #[test]
    fn test_bounds() {
        let s = series(&snapshot(), ChartKind::Status);
        let ((x_min, x_max), (y_min, y_max)) = bounds(&s);
        assert_eq!((x_min, x_max), (0.0, 3.0));
        assert_eq!(y_min, -0.5);
        assert!((y_max - 75.0 * 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_flat_snapshot() {
        let flat = BatterySnapshot::from_records(vec![BatteryRecord::default()]).unwrap();
        let ((_, x_max), (y_min, y_max)) = bounds(&series(&flat, ChartKind::EnergyFlow));
        assert_eq!(x_max, 1.0);
        assert_eq!(y_min, 0.0);
        assert!(y_max > y_min);
    }
}
