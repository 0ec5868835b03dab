//! Battery snapshot: one day of telemetry loaded from a JSON file.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// One telemetry step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatteryRecord {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: NaiveDateTime,
    /// State of charge, 0..1.
    #[serde(rename = "SOC_opt", default, deserialize_with = "null_as_zero")]
    pub soc: f64,
    #[serde(rename = "electricity_savings_step", default, deserialize_with = "null_as_zero")]
    pub savings: f64,
    #[serde(rename = "feed_in_revenue_delta_step", default, deserialize_with = "null_as_zero")]
    pub feed_in_revenue: f64,
    /// Grid price in EUR/kWh.
    #[serde(rename = "foreign_power_costs", default, deserialize_with = "null_as_zero")]
    pub price: f64,
    #[serde(rename = "pv_profile", default, deserialize_with = "null_as_zero")]
    pub pv_production: f64,
    #[serde(rename = "pv_utilized_kw_opt", default, deserialize_with = "null_as_zero")]
    pub pv_utilized: f64,
    #[serde(rename = "pv_to_battery_kw_opt", default, deserialize_with = "null_as_zero")]
    pub pv_to_battery: f64,
    #[serde(rename = "pv_to_grid_kw_opt", default, deserialize_with = "null_as_zero")]
    pub pv_to_grid: f64,
    #[serde(rename = "grid_to_battery_kw_opt", default, deserialize_with = "null_as_zero")]
    pub grid_to_battery: f64,
    #[serde(rename = "battery_to_load_kw_opt", default, deserialize_with = "null_as_zero")]
    pub battery_to_load: f64,
    #[serde(rename = "battery_to_grid_kw_opt", default, deserialize_with = "null_as_zero")]
    pub battery_to_grid: f64,
    #[serde(rename = "grid_import_kw_opt", default, deserialize_with = "null_as_zero")]
    pub grid_import: f64,
    #[serde(rename = "grid_export_kw_opt", default, deserialize_with = "null_as_zero")]
    pub grid_export: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub gross_load: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub net_load: f64,
}

impl BatteryRecord {
    /// Numeric columns with their file names, in file order.
    pub fn columns(&self) -> [(&'static str, f64); 15] {
        [
            ("SOC_opt", self.soc),
            ("electricity_savings_step", self.savings),
            ("feed_in_revenue_delta_step", self.feed_in_revenue),
            ("foreign_power_costs", self.price),
            ("pv_profile", self.pv_production),
            ("pv_utilized_kw_opt", self.pv_utilized),
            ("pv_to_battery_kw_opt", self.pv_to_battery),
            ("pv_to_grid_kw_opt", self.pv_to_grid),
            ("grid_to_battery_kw_opt", self.grid_to_battery),
            ("battery_to_load_kw_opt", self.battery_to_load),
            ("battery_to_grid_kw_opt", self.battery_to_grid),
            ("grid_import_kw_opt", self.grid_import),
            ("grid_export_kw_opt", self.grid_export),
            ("gross_load", self.gross_load),
            ("net_load", self.net_load),
        ]
    }
}

/// Errors that can occur when loading a snapshot.
#[derive(Debug)]
pub enum SnapshotError {
    Read { path: PathBuf, source: std::io::Error },
    /// `path` is `None` when parsing in-memory content.
    Parse { path: Option<PathBuf>, reason: String },
    Empty { path: Option<PathBuf> },
}

fn origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" '{}'", path.display()),
        None => String::new(),
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read battery data '{}': {}", path.display(), source)
            }
            Self::Parse { path, reason } => {
                write!(f, "failed to parse battery data{}: {}", origin(path), reason)
            }
            Self::Empty { path } => write!(f, "battery data{} has no records", origin(path)),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A non-empty, time-ordered list of records.
#[derive(Debug, Clone)]
pub struct BatterySnapshot {
    records: Vec<BatteryRecord>,
}

impl BatterySnapshot {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SnapshotError::Read { path: path.to_path_buf(), source: e })?;
        Self::parse(&content).map_err(|e| match e {
            SnapshotError::Parse { reason, .. } => SnapshotError::Parse { path: Some(path.to_path_buf()), reason },
            SnapshotError::Empty { .. } => SnapshotError::Empty { path: Some(path.to_path_buf()) },
            other => other,
        })
    }

    /// Parse a records array or a pandas column-oriented object.
    pub fn parse(content: &str) -> Result<Self, SnapshotError> {
        let parse_err = |reason: String| SnapshotError::Parse { path: None, reason };

        let value: Value = serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?;
        let rows = match value {
            Value::Array(rows) => rows,
            Value::Object(columns) => columns_to_rows(columns).map_err(parse_err)?,
            _ => return Err(parse_err("expected an array of records or an object of columns".into())),
        };

        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                BatteryRecord::deserialize(row).map_err(|e| parse_err(format!("record {i}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_records(records)
    }

    pub fn from_records(mut records: Vec<BatteryRecord>) -> Result<Self, SnapshotError> {
        if records.is_empty() {
            return Err(SnapshotError::Empty { path: None });
        }
        records.sort_by_key(|r| r.timestamp);
        Ok(Self { records })
    }

    pub fn records(&self) -> &[BatteryRecord] {
        &self.records
    }

    pub fn first(&self) -> &BatteryRecord {
        &self.records[0]
    }

    pub fn last(&self) -> &BatteryRecord {
        &self.records[self.records.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn sum(&self, field: impl Fn(&BatteryRecord) -> f64) -> f64 {
        self.records.iter().map(field).sum()
    }

    /// First record holding the maximum of `field`.
    pub fn argmax(&self, field: impl Fn(&BatteryRecord) -> f64) -> &BatteryRecord {
        self.records
            .iter()
            .fold(self.first(), |best, r| if field(r) > field(best) { r } else { best })
    }

    /// First record holding the minimum of `field`.
    pub fn argmin(&self, field: impl Fn(&BatteryRecord) -> f64) -> &BatteryRecord {
        self.records
            .iter()
            .fold(self.first(), |best, r| if field(r) < field(best) { r } else { best })
    }
}

/// `{"col": {"0": v0, "1": v1}}` -> `[{"col": v0}, {"col": v1}]`
fn columns_to_rows(columns: Map<String, Value>) -> Result<Vec<Value>, String> {
    let mut rows: Vec<(i64, Map<String, Value>)> = Vec::new();

    for (column, cells) in columns {
        let Value::Object(cells) = cells else {
            return Err(format!("column '{column}' is not an object of cells"));
        };
        for (index, cell) in cells {
            let index: i64 = index
                .parse()
                .map_err(|_| format!("column '{column}' has non-numeric index '{index}'"))?;
            match rows.iter_mut().find(|(i, _)| *i == index) {
                Some((_, row)) => {
                    row.insert(column.clone(), cell);
                }
                None => {
                    let mut row = Map::new();
                    row.insert(column.clone(), cell);
                    rows.push((index, row));
                }
            }
        }
    }

    rows.sort_by_key(|(i, _)| *i);
    Ok(rows.into_iter().map(|(_, row)| Value::Object(row)).collect())
}

/// pandas writes NaN cells as `null`.
fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(ms) => DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp {ms} out of range"))),
        Raw::Text(s) => parse_timestamp(&s).map_err(serde::de::Error::custom),
    }
}

/// Accepts RFC 3339 and the naive ISO forms pandas writes.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    Err(format!("unrecognised timestamp '{s}'"))
}
