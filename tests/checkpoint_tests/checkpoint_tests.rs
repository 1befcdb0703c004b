//! Checkpoint Loop Tests
//!
//! These tests verify:
//! - The first checkpoint runs immediately
//! - Later writes reach disk on the next cycle
//! - Failures are counted and retried, not fatal
//! - Shutdown is prompt and joins the thread

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use authstore::checkpoint::{self, CheckpointLoop};
use authstore::snapshot::{self, UserMap};
use authstore::UserStore;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const ALICE: &str = "550e8400-e29b-41d4-a716-446655440000";
const BOB: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";

fn setup() -> (TempDir, PathBuf, Arc<UserStore>) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("users.json");
    (temp_dir, path, Arc::new(UserStore::new()))
}

/// Poll `condition` until it holds or five seconds pass
fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn on_disk(path: &PathBuf) -> Option<UserMap> {
    snapshot::read(path).ok()
}

// =============================================================================
// Single Checkpoint Tests
// =============================================================================

#[test]
fn test_checkpoint_writes_store_contents() {
    let (_temp, path, store) = setup();
    store.add(ALICE, "Al");
    store.add(BOB, "Bob");

    let count = checkpoint::checkpoint(&store, &path).unwrap();

    assert_eq!(count, 2);
    assert_eq!(snapshot::read(&path).unwrap(), store.snapshot());
}

#[test]
fn test_checkpoint_empty_store() {
    let (_temp, path, store) = setup();

    assert_eq!(checkpoint::checkpoint(&store, &path).unwrap(), 0);
    assert!(snapshot::read(&path).unwrap().is_empty());
}

#[test]
fn test_checkpoint_into_missing_directory_fails() {
    let (temp, _path, store) = setup();
    let path = temp.path().join("missing").join("users.json");

    assert!(checkpoint::checkpoint(&store, &path).is_err());
}

// =============================================================================
// Loop Tests
// =============================================================================

#[test]
fn test_first_checkpoint_runs_immediately() {
    let (_temp, path, store) = setup();
    store.add(ALICE, "Al");

    // Interval far longer than the test; only the initial cycle can write
    let checkpoint_loop =
        CheckpointLoop::spawn(Arc::clone(&store), &path, Duration::from_secs(3600)).unwrap();

    assert!(wait_until(|| checkpoint_loop.stats().completed() == 1));
    assert_eq!(snapshot::read(&path).unwrap(), store.snapshot());

    checkpoint_loop.shutdown();
}

#[test]
fn test_later_writes_reach_disk() {
    let (_temp, path, store) = setup();
    let checkpoint_loop =
        CheckpointLoop::spawn(Arc::clone(&store), &path, Duration::from_millis(20)).unwrap();

    store.add(ALICE, "Al");
    store.add(BOB, "Bob");

    let expected = store.snapshot();
    assert!(wait_until(|| on_disk(&path).as_ref() == Some(&expected)));

    checkpoint_loop.shutdown();
    assert!(!snapshot::backup_path(&path).exists());
}

#[test]
fn test_failed_checkpoints_are_counted_and_retried() {
    let (temp, _path, store) = setup();
    let dir = temp.path().join("later");
    let path = dir.join("users.json");
    store.add(ALICE, "Al");

    let checkpoint_loop =
        CheckpointLoop::spawn(Arc::clone(&store), &path, Duration::from_millis(20)).unwrap();

    assert!(wait_until(|| checkpoint_loop.stats().failed() >= 2));
    assert_eq!(checkpoint_loop.stats().completed(), 0);

    fs::create_dir(&dir).unwrap();

    assert!(wait_until(|| checkpoint_loop.stats().completed() >= 1));
    assert_eq!(snapshot::read(&path).unwrap(), store.snapshot());

    checkpoint_loop.shutdown();
}

#[test]
fn test_shutdown_does_not_wait_for_interval() {
    let (_temp, path, store) = setup();
    let checkpoint_loop =
        CheckpointLoop::spawn(Arc::clone(&store), &path, Duration::from_secs(3600)).unwrap();
    assert!(wait_until(|| checkpoint_loop.stats().completed() == 1));

    let start = Instant::now();
    checkpoint_loop.shutdown();

    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_drop_stops_loop() {
    let (_temp, path, store) = setup();
    let stats = {
        let checkpoint_loop =
            CheckpointLoop::spawn(Arc::clone(&store), &path, Duration::from_millis(10)).unwrap();
        let stats = Arc::clone(checkpoint_loop.stats());
        stats
    };

    // The thread has been joined; no more cycles can run
    let completed = stats.completed();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(stats.completed(), completed);
}

#[test]
fn test_writers_are_not_blocked_between_checkpoints() {
    let (_temp, path, store) = setup();
    let checkpoint_loop =
        CheckpointLoop::spawn(Arc::clone(&store), &path, Duration::from_millis(5)).unwrap();

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..250 {
                    store.add(format!("00000000-0000-4000-8000-{:04x}{:08x}", t, i), "Writer");
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    assert_eq!(store.len(), 1000);

    let expected = store.snapshot();
    assert!(wait_until(|| on_disk(&path).as_ref() == Some(&expected)));

    checkpoint_loop.shutdown();
}
