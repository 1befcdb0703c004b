//! Durable snapshot writer
//!
//! Persists a `UserMap` so that the previous snapshot is never discarded
//! before the new one has been read back and verified.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

use super::codec::{JsonCodec, SnapshotCodec};
use super::UserMap;

/// Suffix appended to the snapshot path for the backup copy
pub const BACKUP_EXTENSION: &str = ".bak";

/// Permission bits for snapshot files created from scratch (owner read/write)
#[cfg(unix)]
pub const DEFAULT_MODE: u32 = 0o600;

/// `<path>.bak`, in the same directory as `path`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_EXTENSION);
    PathBuf::from(name)
}

/// Write `users` to `path` using the JSON codec
pub fn write(path: &Path, users: &UserMap) -> Result<()> {
    SnapshotFile::new(path).write(users)
}

/// Read the snapshot at `path` using the JSON codec
pub fn read(path: &Path) -> Result<UserMap> {
    SnapshotFile::new(path).read()
}

/// Read the snapshot at `path` and merge it into `users`
pub fn read_into(path: &Path, users: &mut UserMap) -> Result<()> {
    SnapshotFile::new(path).read_into(users)
}

/// A snapshot document at a fixed path
///
/// Concurrent `write` calls for the same path are not supported;
/// `UserStore::dump` serializes its callers.
#[derive(Debug, Clone)]
pub struct SnapshotFile<C = JsonCodec> {
    path: PathBuf,
    codec: C,
}

impl SnapshotFile<JsonCodec> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_codec(path, JsonCodec)
    }
}

impl<C: SnapshotCodec> SnapshotFile<C> {
    /// Use a custom codec for this file
    pub fn with_codec(path: impl Into<PathBuf>, codec: C) -> Self {
        Self {
            path: path.into(),
            codec,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        backup_path(&self.path)
    }

    /// Permissions of the current snapshot, or `None` if there is no file
    pub fn exists(&self) -> Result<Option<Permissions>> {
        match fs::metadata(&self.path) {
            Ok(metadata) => Ok(Some(metadata.permissions())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::trace!("snapshot: {} does not exist", self.path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read and decode the snapshot
    pub fn read(&self) -> Result<UserMap> {
        let mut users = UserMap::new();
        self.read_into(&mut users)?;
        Ok(users)
    }

    /// Read and decode the snapshot, merging it into `users`
    ///
    /// `users` is left untouched unless the whole document decodes.
    pub fn read_into(&self, users: &mut UserMap) -> Result<()> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::trace!(
            "snapshot: decoding {} bytes from {}",
            contents.len(),
            self.path.display()
        );
        let decoded = self.codec.decode(&contents)?;
        users.extend(decoded);

        Ok(())
    }

    /// Persist `users` to the snapshot path
    ///
    /// Returns `Ok` only after the written file has been read back and
    /// compared equal to `users`. On any failure after the existing file was
    /// moved aside, the `.bak` copy is left on disk.
    pub fn write(&self, users: &UserMap) -> Result<()> {
        let backup = self.backup_path();

        // Step 1: move the current snapshot aside, remembering its mode
        let (permissions, backed_up) = match self.exists()? {
            Some(permissions) => {
                tracing::trace!("snapshot: renaming {} to {}", self.path.display(), backup.display());
                fs::rename(&self.path, &backup)?;
                (Some(permissions), true)
            }
            None => (default_permissions(), false),
        };

        // Step 2: encode
        let data = self.codec.encode(users)?;

        // Step 3: write + fsync
        tracing::trace!("snapshot: writing {} bytes to {}", data.len(), self.path.display());
        write_file(&self.path, &data, permissions.as_ref())?;

        // Step 4: read back and compare
        self.verify(users)?;

        // Step 5: the new snapshot is good, drop the old one
        if backed_up {
            tracing::trace!("snapshot: removing {}", backup.display());
            fs::remove_file(&backup)?;
        }

        Ok(())
    }

    fn verify(&self, expected: &UserMap) -> Result<()> {
        let written = match self.read() {
            Ok(written) => written,
            Err(StoreError::Decode(reason)) => {
                tracing::warn!("snapshot: {} unreadable after write: {}", self.path.display(), reason);
                return Err(StoreError::Verification(self.path.clone()));
            }
            Err(e) => return Err(e),
        };

        if written != *expected {
            return Err(StoreError::Verification(self.path.clone()));
        }

        Ok(())
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;

    Some(Permissions::from_mode(DEFAULT_MODE))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

/// Create/truncate `path`, write `data`, apply `permissions`, fsync
fn write_file(path: &Path, data: &[u8], permissions: Option<&Permissions>) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    if let Some(permissions) = permissions {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(permissions.mode() & 0o7777);
    }

    let mut file: File = options.open(path)?;
    file.write_all(data)?;

    // Creation mode is filtered by the umask; set the exact bits explicitly
    if let Some(permissions) = permissions {
        file.set_permissions(permissions.clone())?;
    }

    file.sync_all()?;
    Ok(())
}
