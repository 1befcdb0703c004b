//! Store Module
//!
//! In-memory identifier → name map shared by every request handler and the
//! checkpoint loop.
//!
//! ## Responsibilities
//! - Concurrent add/lookup/exists/delete
//! - Point-in-time copies for checkpointing
//! - Loading a snapshot at startup
//!
//! ## Concurrency
//! One `RwLock` around a `HashMap`:
//! - Mutations (add/delete/load merge) take the write lock
//! - Reads (name/exists/snapshot copy/len) take the read lock
//! - Disk I/O never happens while the lock is held
//!
//! The store does not validate its input. Callers check identifiers and
//! names with [`crate::validator`] before calling `add`.

mod users;

pub use users::UserStore;
