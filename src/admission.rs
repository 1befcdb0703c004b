//! Admission Counter
//!
//! Bounded in-flight counter used to fail fast once a concurrency ceiling is
//! reached. Rejects at the boundaries instead of clamping or blocking:
//!
//! ```text
//!   0 ──try_acquire──► 1 ──► ... ──► max ──try_acquire──► CapacityExceeded
//!   0 ──release──► Underflow
//! ```
//!
//! `acquire`/`acquire_owned` return permits that release on drop, so a
//! panicking holder still gives its slot back.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, StoreError};

/// Count of admitted operations, always within `0..=max`
#[derive(Debug)]
pub struct AdmissionCounter {
    count: RwLock<usize>,
    max: usize,
}

impl AdmissionCounter {
    pub fn new(max: usize) -> Self {
        Self {
            count: RwLock::new(0),
            max,
        }
    }

    /// Admit one more operation, or fail with `CapacityExceeded`
    pub fn try_acquire(&self) -> Result<()> {
        let mut count = self.count.write();
        if *count >= self.max {
            return Err(StoreError::CapacityExceeded { max: self.max });
        }
        *count += 1;
        Ok(())
    }

    /// Give back one admission, or fail with `Underflow` if none are held
    pub fn release(&self) -> Result<()> {
        let mut count = self.count.write();
        if *count == 0 {
            return Err(StoreError::Underflow);
        }
        *count -= 1;
        Ok(())
    }

    pub fn current(&self) -> usize {
        *self.count.read()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Take a slot that is given back when the permit drops
    pub fn acquire(&self) -> Result<AdmissionPermit<'_>> {
        self.try_acquire()?;
        Ok(AdmissionPermit { counter: self })
    }

    /// Like `acquire`, but the permit keeps the counter alive and can move
    /// to another thread
    pub fn acquire_owned(self: &Arc<Self>) -> Result<OwnedAdmissionPermit> {
        self.try_acquire()?;
        Ok(OwnedAdmissionPermit {
            counter: Arc::clone(self),
        })
    }

    /// Run `f` inside an admission slot
    ///
    /// Fails with `CapacityExceeded` without calling `f` when full. The slot
    /// is released once `f` returns or unwinds.
    pub fn admit<T>(&self, f: impl FnOnce() -> T) -> Result<T> {
        let _permit = self.acquire()?;
        Ok(f())
    }

    fn release_on_drop(&self) {
        if let Err(e) = self.release() {
            tracing::error!("admission: {}", e);
        }
    }
}

/// One admitted slot borrowed from an `AdmissionCounter`
#[must_use = "the slot is released as soon as the permit is dropped"]
#[derive(Debug)]
pub struct AdmissionPermit<'a> {
    counter: &'a AdmissionCounter,
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.counter.release_on_drop();
    }
}

/// One admitted slot that owns a handle to its counter
#[must_use = "the slot is released as soon as the permit is dropped"]
#[derive(Debug)]
pub struct OwnedAdmissionPermit {
    counter: Arc<AdmissionCounter>,
}

impl Drop for OwnedAdmissionPermit {
    fn drop(&mut self) {
        self.counter.release_on_drop();
    }
}
