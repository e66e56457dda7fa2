//! StateStore - latest successfully decoded record per watched file

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::types::StateRecord;

/// Concurrency-safe map from filename to its latest [`StateRecord`].
///
/// Cloning the store is cheap and all clones share storage. The ingestion
/// pipeline is the single writer; HTTP handlers read through [`snapshot`]
/// and never hold a reference into live storage. The lock is only ever held
/// for the in-memory copy or replace, never across I/O.
///
/// [`snapshot`]: StateStore::snapshot
#[derive(Clone, Default)]
pub struct StateStore {
    entries: Arc<RwLock<HashMap<String, StateRecord>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record stored for its filename.
    ///
    /// Unconditional last-write-wins: the single ingestion task processes
    /// events to completion in arrival order, which keeps per-file updates
    /// serialized. A failed decode never reaches this method, so the prior
    /// record survives any number of bad writes.
    pub fn update(&self, record: StateRecord) {
        self.entries.write().insert(record.filename.clone(), record);
    }

    /// Deep copy of every current entry.
    ///
    /// Readers get a consistent view taken under the read lock: each entry is
    /// either entirely before or entirely after any concurrent `update`.
    pub fn snapshot(&self) -> HashMap<String, StateRecord> {
        self.entries.read().clone()
    }

    /// Latest record for one filename, if it has ever decoded successfully.
    pub fn get(&self, filename: &str) -> Option<StateRecord> {
        self.entries.read().get(filename).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateTag;
    use chrono::Utc;
    use serde_json::json;

    fn make_record(filename: &str, tag: StateTag, payload: serde_json::Value) -> StateRecord {
        StateRecord {
            filename: filename.to_string(),
            tag,
            payload,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_update_and_get() {
        let store = StateStore::new();
        assert!(store.is_empty());

        store.update(make_record(
            "sensor.json",
            StateTag::SensorUpdate,
            json!({"temp": 21.5}),
        ));

        let record = store.get("sensor.json").unwrap();
        assert_eq!(record.tag, StateTag::SensorUpdate);
        assert_eq!(record.payload["temp"], 21.5);
        assert!(store.get("ntp.json").is_none());
    }

    #[test]
    fn test_update_replaces_whole_record() {
        let store = StateStore::new();
        store.update(make_record(
            "sensor.json",
            StateTag::SensorUpdate,
            json!({"temp": 21.5}),
        ));
        store.update(make_record(
            "sensor.json",
            StateTag::SensorUpdate,
            json!({"temp": 22.0, "humidity": 40}),
        ));

        assert_eq!(store.len(), 1);
        let record = store.get("sensor.json").unwrap();
        assert_eq!(record.payload, json!({"temp": 22.0, "humidity": 40}));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = StateStore::new();
        store.update(make_record("ntp.json", StateTag::NtpUpdate, json!({"epoch": 1})));

        let mut snapshot = store.snapshot();
        snapshot.remove("ntp.json");

        assert!(snapshot.is_empty());
        assert_eq!(store.len(), 1, "mutating a snapshot must not touch the store");
    }

    /// Readers must always see a whole record: payload and tag from the same
    /// update, never a mix of two.
    #[test]
    fn test_concurrent_readers_see_whole_records() {
        let store = StateStore::new();
        store.update(make_record("sensor.json", StateTag::SensorUpdate, json!({"v": 0})));

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for v in 1..200 {
                    store.update(make_record(
                        "sensor.json",
                        StateTag::SensorUpdate,
                        json!({"v": v}),
                    ));
                }
            })
        };

        let reader = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let snapshot = store.snapshot();
                    let record = &snapshot["sensor.json"];
                    assert_eq!(record.tag, StateTag::SensorUpdate);
                    assert!(record.payload["v"].is_i64() || record.payload["v"].is_u64());
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();

        assert_eq!(store.get("sensor.json").unwrap().payload["v"], 199);
    }
}
