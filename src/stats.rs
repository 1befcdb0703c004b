//! Request statistics
//!
//! Named counters reported by the MONITOR command. Not persisted.

use std::collections::BTreeMap;

use parking_lot::RwLock;

/// GET requests received
pub const GET_KEY: &str = "get";
/// SET requests received
pub const SET_KEY: &str = "set";
/// DEL requests received
pub const DELETE_KEY: &str = "delete";
/// GET requests for an unknown identifier
pub const NOT_FOUND_KEY: &str = "not-found";
/// Requests answered OK
pub const OK_KEY: &str = "ok";
/// Requests rejected by validation
pub const BAD_REQUEST_KEY: &str = "bad-request";
/// Requests that failed inside the server
pub const ERROR_KEY: &str = "error";
/// Connections turned away by admission control
pub const BUSY_KEY: &str = "busy";

/// Keys every server-side `Counters` starts with
pub const SERVER_KEYS: &[&str] = &[
    GET_KEY,
    SET_KEY,
    DELETE_KEY,
    NOT_FOUND_KEY,
    OK_KEY,
    BAD_REQUEST_KEY,
    ERROR_KEY,
    BUSY_KEY,
];

/// Map of named counters
#[derive(Debug, Default)]
pub struct Counters {
    counters: RwLock<BTreeMap<String, u64>>,
}

impl Counters {
    /// Create counters for `keys`, all starting at zero
    pub fn new(keys: &[&str]) -> Self {
        let counters = keys.iter().map(|key| (key.to_string(), 0)).collect();
        Self {
            counters: RwLock::new(counters),
        }
    }

    /// Add `delta` to `key`, creating it if needed
    pub fn increment(&self, key: &str, delta: u64) {
        let mut counters = self.counters.write();
        *counters.entry(key.to_string()).or_insert(0) += delta;
    }

    /// Current value of `key` (zero if unknown)
    pub fn get(&self, key: &str) -> u64 {
        self.counters.read().get(key).copied().unwrap_or(0)
    }

    /// Independent copy of every counter
    pub fn copy(&self) -> BTreeMap<String, u64> {
        self.counters.read().clone()
    }

    /// Set every counter back to zero, keeping the keys
    pub fn reset(&self) {
        let mut counters = self.counters.write();
        for value in counters.values_mut() {
            *value = 0;
        }
    }
}
