//! Checkpoint Loop
//!
//! Background thread that periodically persists a copy of the store.
//!
//! ```text
//! spawn ─► checkpoint ─► wait(interval | shutdown) ─► checkpoint ─► ...
//!                                  │
//!                                  └─ shutdown ─► exit
//! ```
//!
//! A failed checkpoint is logged and counted, never propagated; the next
//! cycle retries from a fresh copy. No lock is held while waiting.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::Result;
use crate::store::UserStore;

/// Outcome counters for the checkpoint loop
#[derive(Debug, Default)]
pub struct CheckpointStats {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl CheckpointStats {
    /// Checkpoints that were written and verified
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Checkpoints that returned an error
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }
}

/// Handle to the running checkpoint thread
///
/// Dropping the handle stops the loop and waits for the thread to exit.
pub struct CheckpointLoop {
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<CheckpointStats>,
}

impl CheckpointLoop {
    /// Start the loop. The first checkpoint runs immediately.
    pub fn spawn(store: Arc<UserStore>, path: impl Into<PathBuf>, interval: Duration) -> Result<Self> {
        let path = path.into();
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let stats = Arc::new(CheckpointStats::default());
        let worker_stats = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("checkpoint".to_string())
            .spawn(move || run(store, path, interval, shutdown_rx, worker_stats))?;

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            stats,
        })
    }

    pub fn stats(&self) -> &Arc<CheckpointStats> {
        &self.stats
    }

    /// Stop the loop and wait for an in-progress checkpoint to finish
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Closing the channel wakes the waiting thread
        self.shutdown_tx.take();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("checkpoint: thread panicked");
            }
        }
    }
}

impl Drop for CheckpointLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Persist one copy of `store` to `path`
///
/// Returns the number of users written.
pub fn checkpoint(store: &UserStore, path: &Path) -> Result<usize> {
    tracing::trace!("checkpoint: beginning dump to {}", path.display());
    store.dump(path)
}

fn run(
    store: Arc<UserStore>,
    path: PathBuf,
    interval: Duration,
    shutdown_rx: Receiver<()>,
    stats: Arc<CheckpointStats>,
) {
    tracing::info!(
        "checkpoint: persisting to {} every {:?}",
        path.display(),
        interval
    );

    loop {
        match checkpoint(&store, &path) {
            Ok(count) => {
                stats.completed.fetch_add(1, Ordering::AcqRel);
                tracing::debug!("checkpoint: wrote {} users", count);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::AcqRel);
                tracing::warn!("checkpoint: failed to persist {}: {}", path.display(), e);
            }
        }

        match shutdown_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::info!("checkpoint: stopped");
}
