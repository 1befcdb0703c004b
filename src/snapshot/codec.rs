//! Snapshot codec
//!
//! Turns a `UserMap` into document bytes and back.

use std::collections::BTreeMap;

use crate::error::{Result, StoreError};

use super::UserMap;

/// Encoding used for snapshot documents
///
/// `decode(encode(m))` must reproduce `m` exactly; the durable writer relies
/// on that to verify what it wrote.
pub trait SnapshotCodec {
    fn encode(&self, users: &UserMap) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<UserMap>;
}

/// JSON object codec, the on-disk format
///
/// Keys are written in sorted order so equal maps produce identical bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl SnapshotCodec for JsonCodec {
    fn encode(&self, users: &UserMap) -> Result<Vec<u8>> {
        let sorted: BTreeMap<&str, &str> = users
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
            .collect();

        serde_json::to_vec(&sorted).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<UserMap> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }
}
