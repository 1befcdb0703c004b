//! Engine Module
//!
//! The service core that owns every shared component.
//!
//! ## Responsibilities
//! - Load the snapshot on startup (a missing file is a fresh install,
//!   a lone backup is recovered)
//! - Run the checkpoint loop for the lifetime of the engine
//! - Validate requests before they reach the store
//! - Track request statistics and admission state
//! - Write a final checkpoint on close

use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::admission::AdmissionCounter;
use crate::checkpoint::{self, CheckpointLoop, CheckpointStats};
use crate::config::Config;
use crate::error::Result;
use crate::protocol::{Command, MonitorReport, Response, Status};
use crate::snapshot;
use crate::stats::{self, Counters};
use crate::store::UserStore;
use crate::validator;

/// The main service engine
///
/// One instance is created at startup and shared (`Arc<Engine>`) with every
/// connection handler. There is no global state.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Identifier → name store (internal RwLock)
    store: Arc<UserStore>,

    /// Request statistics
    counters: Counters,

    /// In-flight connection ceiling, `None` when `max_connections == 0`
    admission: Option<Arc<AdmissionCounter>>,

    /// Background checkpoint thread, taken on close
    checkpoint: Mutex<Option<CheckpointLoop>>,

    /// Outcome counters of the checkpoint thread
    checkpoint_stats: Arc<CheckpointStats>,
}

impl Engine {
    /// Open an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the snapshot directory
    /// 2. Load the snapshot, or its backup when only the backup exists
    /// 3. Start the checkpoint loop
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        if let Some(dir) = config.dump_file.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let store = Arc::new(UserStore::new());
        let backup = snapshot::backup_path(&config.dump_file);
        match store.load(&config.dump_file) {
            Ok(count) => {
                tracing::info!("Loaded {} users from {}", count, config.dump_file.display());
                if backup.exists() {
                    tracing::warn!(
                        "Backup snapshot {} left by a failed write; restore it manually if needed",
                        backup.display()
                    );
                }
            }
            Err(e) if e.is_not_found() => Self::recover(&store, &config.dump_file, &backup)?,
            Err(e) => return Err(e),
        }

        let admission = match config.max_connections {
            0 => None,
            max => Some(Arc::new(AdmissionCounter::new(max))),
        };

        let checkpoint = CheckpointLoop::spawn(
            Arc::clone(&store),
            config.dump_file.clone(),
            config.checkpoint_interval,
        )?;
        let checkpoint_stats = Arc::clone(checkpoint.stats());

        Ok(Self {
            config,
            store,
            counters: Counters::new(stats::SERVER_KEYS),
            admission,
            checkpoint: Mutex::new(Some(checkpoint)),
            checkpoint_stats,
        })
    }

    /// Fall back to the backup when the primary snapshot is missing
    ///
    /// A write that failed after renaming the primary leaves only the
    /// backup. Its users are loaded so the next checkpoints rewrite the
    /// primary from them. An unreadable backup refuses startup and stays
    /// on disk untouched.
    fn recover(store: &UserStore, dump_file: &Path, backup: &Path) -> Result<()> {
        match store.load(backup) {
            Ok(count) => {
                tracing::warn!(
                    "No snapshot at {}, recovered {} users from backup {}",
                    dump_file.display(),
                    count,
                    backup.display()
                );
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::info!("No snapshot at {}, starting empty", dump_file.display());
                Ok(())
            }
            Err(e) => {
                tracing::error!("Backup snapshot {} is unreadable: {}", backup.display(), e);
                Err(e)
            }
        }
    }

    /// Open with a snapshot path (convenience method)
    ///
    /// Uses default config with the specified dump file
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().dump_file(path).build())
    }

    /// Execute a command
    ///
    /// Identifiers and names are validated here; invalid input is answered
    /// with BAD_REQUEST and never reaches the store.
    pub fn execute(&self, command: Command) -> Response {
        let response = match command {
            Command::Get { id } => {
                self.counters.increment(stats::GET_KEY, 1);
                self.get(&id)
            }
            Command::Set { id, name } => {
                self.counters.increment(stats::SET_KEY, 1);
                self.set(id, name)
            }
            Command::Delete { id } => {
                self.counters.increment(stats::DELETE_KEY, 1);
                self.delete(&id)
            }
            Command::Ping => Response::ok(Some(b"PONG".to_vec())),
            Command::Monitor => self.monitor(),
        };

        match response.status {
            Status::Ok => self.counters.increment(stats::OK_KEY, 1),
            Status::NotFound => self.counters.increment(stats::NOT_FOUND_KEY, 1),
            Status::BadRequest => self.counters.increment(stats::BAD_REQUEST_KEY, 1),
            Status::Error => self.counters.increment(stats::ERROR_KEY, 1),
            Status::Busy => self.counters.increment(stats::BUSY_KEY, 1),
        }

        response
    }

    fn get(&self, id: &str) -> Response {
        if !validator::is_valid_identifier(id) {
            tracing::debug!("GET rejected: invalid identifier {:?}", id);
            return Response::bad_request("invalid identifier");
        }

        match self.store.name(id) {
            Some(name) => Response::ok(Some(name.into_bytes())),
            None => Response::not_found(),
        }
    }

    fn set(&self, id: String, name: String) -> Response {
        if !validator::is_valid_identifier(&id) {
            tracing::debug!("SET rejected: invalid identifier {:?}", id);
            return Response::bad_request("invalid identifier");
        }
        if !validator::is_valid_name(&name) {
            tracing::debug!("SET rejected: invalid name {:?}", name);
            return Response::bad_request("invalid name");
        }

        self.store.add(id, name);
        Response::ok(None)
    }

    fn delete(&self, id: &str) -> Response {
        if !validator::is_valid_identifier(id) {
            tracing::debug!("DEL rejected: invalid identifier {:?}", id);
            return Response::bad_request("invalid identifier");
        }

        self.store.delete(id);
        Response::ok(None)
    }

    fn monitor(&self) -> Response {
        match serde_json::to_vec(&self.monitor_report()) {
            Ok(payload) => Response::ok(Some(payload)),
            Err(e) => {
                tracing::error!("Failed to encode monitor report: {}", e);
                Response::error(&e.to_string())
            }
        }
    }

    /// Current statistics, admission state and checkpoint outcomes
    pub fn monitor_report(&self) -> MonitorReport {
        MonitorReport {
            counters: self.counters.copy(),
            users: self.store.len(),
            in_flight: self.admission.as_ref().map(|a| a.current()),
            checkpoints_completed: self.checkpoint_stats.completed(),
            checkpoints_failed: self.checkpoint_stats.failed(),
        }
    }

    /// Persist the store now, outside the regular cadence
    ///
    /// Returns the number of users written.
    pub fn checkpoint(&self) -> Result<usize> {
        checkpoint::checkpoint(&self.store, &self.config.dump_file)
    }

    /// Stop the checkpoint loop and write a final checkpoint
    ///
    /// Calling close more than once is a no-op.
    pub fn close(&self) -> Result<()> {
        let running = self.checkpoint.lock().take();

        if let Some(checkpoint_loop) = running {
            checkpoint_loop.shutdown();
            let count = self.checkpoint()?;
            tracing::info!(
                "Final checkpoint wrote {} users to {}",
                count,
                self.config.dump_file.display()
            );
        }

        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the user store
    pub fn store(&self) -> &UserStore {
        &self.store
    }

    /// Get the request counters
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Get the admission counter, if admission control is enabled
    pub fn admission(&self) -> Option<&Arc<AdmissionCounter>> {
        self.admission.as_ref()
    }

    /// Get the checkpoint outcome counters
    pub fn checkpoint_stats(&self) -> &CheckpointStats {
        &self.checkpoint_stats
    }

    /// Get the snapshot path
    pub fn dump_file(&self) -> &Path {
        &self.config.dump_file
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
