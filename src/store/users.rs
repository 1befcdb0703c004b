//! UserStore implementation
//!
//! The identifier → name map behind one RwLock, plus its snapshot
//! persistence: `load` merges a snapshot file into the map and `dump`
//! writes a point-in-time copy through the durable snapshot writer.
//! Neither holds the map lock during file I/O.

use std::path::Path;

use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::snapshot::{self, UserMap};

/// Concurrent identifier → name store
#[derive(Debug, Default)]
pub struct UserStore {
    /// Protected by RwLock (many concurrent readers, exclusive writer)
    users: RwLock<UserMap>,

    /// Serializes `dump` calls; the snapshot writer supports one writer per path
    dump_lock: Mutex<()>,
}

impl UserStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `users`
    pub fn from_map(users: UserMap) -> Self {
        Self {
            users: RwLock::new(users),
            dump_lock: Mutex::new(()),
        }
    }

    /// Insert or overwrite the name for `id` (write lock)
    pub fn add(&self, id: impl Into<String>, name: impl Into<String>) {
        let mut users = self.users.write();
        users.insert(id.into(), name.into());
    }

    /// Get the name for `id`, `None` if absent (read lock)
    pub fn name(&self, id: &str) -> Option<String> {
        self.users.read().get(id).cloned()
    }

    /// Membership test (read lock)
    pub fn exists(&self, id: &str) -> bool {
        self.users.read().contains_key(id)
    }

    /// Remove `id` if present (write lock)
    ///
    /// Returns the removed name.
    pub fn delete(&self, id: &str) -> Option<String> {
        self.users.write().remove(id)
    }

    /// Independent copy of the current contents
    ///
    /// Taken under a single read lock, so the copy reflects one instant with
    /// respect to concurrent `add`/`delete`.
    pub fn snapshot(&self) -> UserMap {
        self.users.read().clone()
    }

    /// Merge the snapshot at `path` into the store
    ///
    /// The file is read and decoded before the lock is taken; on any error
    /// the store is unchanged. A missing file yields `StoreError::NotFound`,
    /// which callers treat as a fresh start. Returns the number of entries
    /// loaded.
    pub fn load(&self, path: &Path) -> Result<usize> {
        let loaded = snapshot::read(path)?;
        let count = loaded.len();

        let mut users = self.users.write();
        users.extend(loaded);
        drop(users);

        tracing::debug!("store: loaded {} users from {}", count, path.display());
        Ok(count)
    }

    /// Copy the store and persist the copy to `path`
    ///
    /// The map lock is released before any file is touched, so readers and
    /// writers are never blocked on disk I/O. Returns the number of entries
    /// written.
    pub fn dump(&self, path: &Path) -> Result<usize> {
        let _dumping = self.dump_lock.lock();
        let copy = self.snapshot();
        snapshot::write(path, &copy)?;
        Ok(copy.len())
    }

    /// Number of users
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}
