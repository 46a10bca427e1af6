//! Core data types for the BMS serial monitor
//!
//! This module contains the fundamental data structures shared between the
//! classifier, the aggregator, and the backend worker.
//!
//! # Main Types
//!
//! - [`FieldUpdate`] - A (key, raw value) pair extracted from one telemetry line
//! - [`LineRecord`] / [`LineKind`] - One annotated transcript entry
//! - [`ConnectionStatus`] - Serial connection state reported to the front end
//!
//! # Raw values and display scaling
//!
//! The engine stores and logs raw value strings exactly as the device sent
//! them. Voltage-like channels are fixed-point integers; [`display_scale`]
//! documents the divisor a display or export layer applies per key. The
//! scaling never happens inside the engine.

use serde::{Deserialize, Serialize};

/// Key refreshed on every processed line with the wall-clock receipt time
pub const TIMESTAMP_KEY: &str = "Timestamp";

/// Format of the snapshot `Timestamp` value
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%m-%d-%y-%H:%M:%S";

/// Format of transcript line annotations
pub const TRANSCRIPT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of the timestamp embedded in export file names
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Default minimum number of seconds between logged snapshot rows
pub const DEFAULT_LOGGING_INTERVAL_SECS: u64 = 5;

/// Distinct key count at which the snapshot is considered warmed up.
/// Advisory only; rows logged earlier simply have fewer columns.
pub const SNAPSHOT_COMPLETE_KEYS: usize = 40;

/// A single extracted telemetry field: key plus raw (unscaled) value string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    /// Field key, drawn from the fixed vocabulary or derived from line tokens
    pub key: String,
    /// Raw value string as it appeared on the line
    pub value: String,
}

impl FieldUpdate {
    /// Create a new field update
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Classification of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    /// A raw line received from the device
    Received,
    /// A read or extraction failure
    Error,
    /// An engine notice (connect, disconnect, export, interval change)
    Notice,
}

/// One annotated transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    /// Receipt time, already formatted with [`TRANSCRIPT_TIMESTAMP_FORMAT`]
    pub timestamp: String,
    /// What this entry records
    pub kind: LineKind,
    /// The raw line text or message
    pub text: String,
}

impl LineRecord {
    /// Render the entry the way the transcript is exported
    pub fn render(&self) -> String {
        format!("{}: {}", self.timestamp, self.text)
    }
}

/// Serial connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionStatus {
    /// Not connected to any port
    #[default]
    Disconnected,
    /// Opening the port
    Connecting,
    /// Port open, feed loop running
    Connected,
    /// Connection failed
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Divisor a display layer applies to the raw value of `key`, if any.
///
/// Most voltage channels are reported in 0.1 mV steps; `mean_cell_voltage`
/// and `Vsafe` in mV. SOC channels are tenths of a percent. Capacity and
/// time-remaining share the 1/10000 factor.
pub fn display_scale(key: &str) -> Option<f64> {
    match key {
        "mean_cell_voltage" | "Vsafe" => Some(1_000.0),
        "pack_volt" | "term_volt" | "drain_volt" | "Vbus" | "capacity" | "time_remaining" => {
            Some(10_000.0)
        }
        "total_soc" => Some(10.0),
        _ if key.starts_with("volt") => Some(10_000.0),
        _ if key.starts_with("soc") => Some(10.0),
        _ => None,
    }
}

/// Scale a raw value string for display. Returns `None` when the key has no
/// documented scale factor or the raw value is not an integer.
pub fn scaled_value(key: &str, raw: &str) -> Option<f64> {
    let divisor = display_scale(key)?;
    raw.trim().parse::<i64>().ok().map(|v| v as f64 / divisor)
}

/// Human-facing rendering of a snapshot value: scaled when a factor is
/// documented, the raw string otherwise.
pub fn display_value(key: &str, raw: &str) -> String {
    match scaled_value(key, raw) {
        Some(v) => format!("{}", v),
        None => raw.to_string(),
    }
}
