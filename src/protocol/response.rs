//! Response definitions
//!
//! Represents responses to clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    BadRequest = 0x03,
    Busy = 0x04,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (name for GET, JSON for MONITOR, message otherwise)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self::with_message(Status::Error, message)
    }

    /// Create a BAD_REQUEST response (input failed validation)
    pub fn bad_request(message: &str) -> Self {
        Self::with_message(Status::BadRequest, message)
    }

    /// Create a BUSY response (admission ceiling reached)
    pub fn busy(message: &str) -> Self {
        Self::with_message(Status::Busy, message)
    }

    fn with_message(status: Status, message: &str) -> Self {
        Self {
            status,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Payload as text, empty if there is none
    pub fn text(&self) -> String {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }
}

/// Payload of a MONITOR response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorReport {
    /// Request counters by name
    pub counters: BTreeMap<String, u64>,

    /// Users currently in the store
    pub users: usize,

    /// Connections currently admitted (absent when admission control is off)
    pub in_flight: Option<usize>,

    /// Checkpoints written and verified since startup
    pub checkpoints_completed: u64,

    /// Checkpoints that failed since startup
    pub checkpoints_failed: u64,
}
