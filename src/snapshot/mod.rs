//! Snapshot Module
//!
//! Crash-safe persistence of the user map as a single document on disk.
//!
//! ## Responsibilities
//! - Encode/decode the identifier → name map (JSON object, sorted keys)
//! - Write with a backup-then-write-then-verify-then-cleanup protocol
//! - Read a snapshot back at startup
//!
//! ## Files
//! ```text
//! {dump_file}        current snapshot: {"<uuid>": "<name>", ...}
//! {dump_file}.bak    previous snapshot, present only while a write is in
//!                    flight or after a write that failed to verify
//! ```
//!
//! ## Write Protocol
//! ```text
//! 1. stat target ── exists ──► rename to .bak (abort on failure), keep its mode
//!                └─ absent ──► mode = 0600
//! 2. encode map
//! 3. write + fsync target with mode from step 1
//! 4. read back, decode, compare with the input map
//! 5. remove .bak (only if step 1 created it)
//! ```
//! Any failure after step 1 leaves the `.bak` in place as the last known-good
//! snapshot. There is no automatic rollback.

use std::collections::HashMap;

mod codec;
mod writer;

pub use codec::{JsonCodec, SnapshotCodec};
pub use writer::{backup_path, read, read_into, write, SnapshotFile, BACKUP_EXTENSION};

#[cfg(unix)]
pub use writer::DEFAULT_MODE;

/// Identifier → display name
pub type UserMap = HashMap<String, String>;
