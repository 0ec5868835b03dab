//! Battery telemetry: the snapshot file and the figures derived from it.

pub mod snapshot;
pub mod summary;

pub use snapshot::{BatteryRecord, BatterySnapshot, SnapshotError};
pub use summary::{ChatContext, DailySummary, SocLevel, StatusFigures, FALLBACK_SUN_HOURS};
