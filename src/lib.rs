//! # authstore
//!
//! A concurrent user store with crash-safe snapshot persistence:
//! - Identifier → name map behind a single reader/writer lock
//! - Periodic background checkpoints, verified before the old snapshot is dropped
//! - Fail-fast admission control for in-flight connections
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │          (Admission Counter gates each connection)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │              (validate first, then store)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  UserStore  │◄─ copy ──│ Checkpoint  │
//!   │  (RwLock)   │          │    Loop     │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Snapshot   │
//!                           │ (verified)  │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod validator;
pub mod snapshot;
pub mod store;
pub mod checkpoint;
pub mod admission;
pub mod stats;
pub mod protocol;
pub mod network;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use admission::{AdmissionCounter, AdmissionPermit, OwnedAdmissionPermit};
pub use checkpoint::CheckpointLoop;
pub use config::Config;
pub use engine::Engine;
pub use error::{Result, StoreError};
pub use snapshot::UserMap;
pub use store::UserStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of authstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
