//! Core state type definitions
//!
//! Defines the record stored per watched file and the logical state tags
//! derived from filenames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical state signalled by a write to a watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateTag {
    /// The firmware refreshed its NTP time sync (`ntp.json`)
    NtpUpdate,
    /// New sensor readings are available (`sensor.json`)
    SensorUpdate,
    /// The alarm was acknowledged/stopped (`alarm.json`)
    AlarmStop,
    /// File is watched but its name is not in the classification table
    Unknown,
}

impl std::fmt::Display for StateTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateTag::NtpUpdate => write!(f, "NTP_UPDATE"),
            StateTag::SensorUpdate => write!(f, "SENSOR_UPDATE"),
            StateTag::AlarmStop => write!(f, "ALARM_STOP"),
            StateTag::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Latest successfully decoded state of one watched file.
///
/// Immutable once built; the store replaces whole records, never patches
/// them in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Basename of the file the payload came from
    pub filename: String,
    /// Logical state derived from the filename
    pub tag: StateTag,
    /// Decoded file contents; shape is up to the firmware
    pub payload: serde_json::Value,
    /// When the decode completed
    pub observed_at: DateTime<Utc>,
}

/// Push-mode notification emitted after every store update.
///
/// Serialized verbatim onto each live WebSocket as
/// `{"filename": ..., "state": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateNotice {
    pub filename: String,
    pub state: StateTag,
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_wire_format() {
        assert_eq!(
            serde_json::to_string(&StateTag::NtpUpdate).unwrap(),
            "\"NTP_UPDATE\""
        );
        assert_eq!(
            serde_json::to_string(&StateTag::Unknown).unwrap(),
            "\"UNKNOWN\""
        );
        assert_eq!(StateTag::SensorUpdate.to_string(), "SENSOR_UPDATE");
        assert_eq!(StateTag::AlarmStop.to_string(), "ALARM_STOP");
    }

    #[test]
    fn test_notice_wire_format() {
        let notice = UpdateNotice {
            filename: "sensor.json".to_string(),
            state: StateTag::SensorUpdate,
            data: serde_json::json!({"temp": 21.5}),
        };
        let wire: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&notice).unwrap()).unwrap();
        assert_eq!(wire["filename"], "sensor.json");
        assert_eq!(wire["state"], "SENSOR_UPDATE");
        assert_eq!(wire["data"]["temp"], 21.5);
    }
}
