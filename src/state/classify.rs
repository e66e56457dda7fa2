//! Filename → logical state classification

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

use super::types::StateTag;

/// Known state files written by the firmware
static STATE_MAP: Lazy<HashMap<&'static str, StateTag>> = Lazy::new(|| {
    HashMap::from([
        ("ntp.json", StateTag::NtpUpdate),
        ("sensor.json", StateTag::SensorUpdate),
        ("alarm.json", StateTag::AlarmStop),
    ])
});

/// Map a file name to its logical state.
///
/// Total and side-effect free: only the basename is considered, so parent
/// directories never change the result, and any name outside the table is
/// accepted as [`StateTag::Unknown`].
pub fn classify(filename: &str) -> StateTag {
    let basename = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename);
    STATE_MAP
        .get(basename)
        .copied()
        .unwrap_or(StateTag::Unknown)
}
