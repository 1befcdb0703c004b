//! Error types for authstore
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::Status;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for authstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    /// Snapshot file absent. Expected on first startup.
    #[error("Snapshot not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Read-back of a freshly written snapshot did not match what was written
    #[error("Snapshot verification failed: {} does not match the data written", .0.display())]
    Verification(PathBuf),

    // -------------------------------------------------------------------------
    // Admission Errors
    // -------------------------------------------------------------------------
    #[error("Capacity exceeded: {max} requests already in flight")]
    CapacityExceeded { max: usize },

    /// Release without a matching acquire (caller bug)
    #[error("Admission counter underflow: release without matching acquire")]
    Underflow,

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Request rejected ({status:?}): {message}")]
    Rejected { status: Status, message: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// True for the missing-snapshot case, which startup treats as a fresh install
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
