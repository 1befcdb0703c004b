//! Tests for Engine
//!
//! These tests verify:
//! - Startup (config errors, missing snapshot, malformed snapshot, backup recovery)
//! - Command execution with validation
//! - Request statistics and the MONITOR report
//! - Final checkpoint on close and reload on reopen

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use authstore::config::Config;
use authstore::engine::Engine;
use authstore::protocol::{Command, MonitorReport, Status};
use authstore::snapshot::{self, UserMap};
use authstore::stats;
use authstore::StoreError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const ALICE: &str = "550e8400-e29b-41d4-a716-446655440000";
const BOB: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";

fn config_in(temp_dir: &TempDir) -> Config {
    Config::builder()
        .dump_file(temp_dir.path().join("users.json"))
        // Only the initial and final checkpoints run during a test
        .checkpoint_interval(Duration::from_secs(3600))
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_in(&temp_dir)).unwrap();
    (temp_dir, engine)
}

fn set(id: &str, name: &str) -> Command {
    Command::Set {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn get(id: &str) -> Command {
    Command::Get { id: id.to_string() }
}

// =============================================================================
// Startup Tests
// =============================================================================

#[test]
fn test_open_without_dump_file_fails() {
    let config = Config::builder().build();
    assert!(matches!(Engine::open(config), Err(StoreError::Config(_))));
}

#[test]
fn test_open_with_zero_interval_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .dump_file(temp_dir.path().join("users.json"))
        .checkpoint_interval(Duration::ZERO)
        .build();

    assert!(matches!(Engine::open(config), Err(StoreError::Config(_))));
}

#[test]
fn test_open_missing_snapshot_starts_empty() {
    let (_temp, engine) = setup_temp_engine();
    assert!(engine.store().is_empty());
}

#[test]
fn test_open_creates_snapshot_directory() {
    let temp_dir = TempDir::new().unwrap();
    let dump_file = temp_dir.path().join("nested").join("dir").join("users.json");

    let engine = Engine::open_path(&dump_file).unwrap();
    engine.close().unwrap();

    assert!(dump_file.exists());
}

#[test]
fn test_open_loads_existing_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);
    let mut saved = UserMap::new();
    saved.insert(ALICE.to_string(), "Al".to_string());
    snapshot::write(&config.dump_file, &saved).unwrap();

    let engine = Engine::open(config).unwrap();

    assert_eq!(engine.store().snapshot(), saved);
}

#[test]
fn test_open_malformed_snapshot_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);
    fs::write(&config.dump_file, b"{\"cut off").unwrap();

    assert!(matches!(Engine::open(config), Err(StoreError::Decode(_))));
}

#[test]
fn test_open_recovers_lone_backup() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);
    let dump_file = config.dump_file.clone();
    let mut saved = UserMap::new();
    saved.insert(BOB.to_string(), "Bob".to_string());
    snapshot::write(&snapshot::backup_path(&dump_file), &saved).unwrap();

    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.store().snapshot(), saved);

    // The first checkpoint creates the primary, the second rotates it over the backup
    engine.checkpoint().unwrap();
    engine.checkpoint().unwrap();

    assert_eq!(snapshot::read(&dump_file).unwrap(), saved);
    assert_eq!(engine.store().name(BOB), Some("Bob".to_string()));
}

#[test]
fn test_recovered_backup_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let mut saved = UserMap::new();
    saved.insert(BOB.to_string(), "Bob".to_string());
    let dump_file = config_in(&temp_dir).dump_file;
    snapshot::write(&snapshot::backup_path(&dump_file), &saved).unwrap();

    let engine = Engine::open(config_in(&temp_dir)).unwrap();
    engine.checkpoint().unwrap();
    engine.checkpoint().unwrap();
    engine.close().unwrap();

    let engine = Engine::open(config_in(&temp_dir)).unwrap();
    assert_eq!(engine.store().snapshot(), saved);
}

#[test]
fn test_open_with_malformed_lone_backup_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);
    let backup = snapshot::backup_path(&config.dump_file);
    fs::write(&backup, b"{\"cut off").unwrap();

    assert!(matches!(Engine::open(config), Err(StoreError::Decode(_))));
    assert_eq!(fs::read(&backup).unwrap(), b"{\"cut off");
}

#[test]
fn test_open_prefers_snapshot_over_backup() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir);
    let mut primary = UserMap::new();
    primary.insert(ALICE.to_string(), "Al".to_string());
    let mut stale = UserMap::new();
    stale.insert(BOB.to_string(), "Bob".to_string());
    snapshot::write(&config.dump_file, &primary).unwrap();
    snapshot::write(&snapshot::backup_path(&config.dump_file), &stale).unwrap();

    let engine = Engine::open(config).unwrap();

    assert_eq!(engine.store().snapshot(), primary);
}

#[test]
fn test_admission_disabled_by_default() {
    let (_temp, engine) = setup_temp_engine();
    assert!(engine.admission().is_none());
}

#[test]
fn test_admission_enabled_with_max_connections() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .dump_file(temp_dir.path().join("users.json"))
        .max_connections(8)
        .build();

    let engine = Engine::open(config).unwrap();

    assert_eq!(engine.admission().map(|a| a.max()), Some(8));
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_execute_set_then_get() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(engine.execute(set(ALICE, "Jean Luc")).status, Status::Ok);

    let response = engine.execute(get(ALICE));
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.text(), "Jean Luc");
}

#[test]
fn test_execute_get_unknown_is_not_found() {
    let (_temp, engine) = setup_temp_engine();

    let response = engine.execute(get(ALICE));

    assert_eq!(response.status, Status::NotFound);
    assert_eq!(engine.counters().get(stats::NOT_FOUND_KEY), 1);
}

#[test]
fn test_execute_invalid_identifier_is_bad_request() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(engine.execute(set("not-a-uuid", "Al")).status, Status::BadRequest);
    assert_eq!(engine.execute(get("not-a-uuid")).status, Status::BadRequest);
    assert_eq!(
        engine
            .execute(Command::Delete {
                id: "not-a-uuid".to_string()
            })
            .status,
        Status::BadRequest
    );

    assert!(engine.store().is_empty());
    assert_eq!(engine.counters().get(stats::BAD_REQUEST_KEY), 3);
}

#[test]
fn test_execute_invalid_name_never_reaches_store() {
    let (_temp, engine) = setup_temp_engine();

    let response = engine.execute(set(ALICE, "John3"));

    assert_eq!(response.status, Status::BadRequest);
    assert_eq!(response.text(), "invalid name");
    assert!(!engine.store().exists(ALICE));
}

#[test]
fn test_execute_invalid_name_keeps_previous_value() {
    let (_temp, engine) = setup_temp_engine();
    engine.execute(set(ALICE, "Al"));

    engine.execute(set(ALICE, "A"));

    assert_eq!(engine.store().name(ALICE), Some("Al".to_string()));
}

#[test]
fn test_execute_delete() {
    let (_temp, engine) = setup_temp_engine();
    engine.execute(set(ALICE, "Al"));

    let response = engine.execute(Command::Delete {
        id: ALICE.to_string(),
    });

    assert_eq!(response.status, Status::Ok);
    assert_eq!(engine.execute(get(ALICE)).status, Status::NotFound);
}

#[test]
fn test_execute_delete_unknown_is_ok() {
    let (_temp, engine) = setup_temp_engine();

    let response = engine.execute(Command::Delete {
        id: ALICE.to_string(),
    });

    assert_eq!(response.status, Status::Ok);
}

#[test]
fn test_execute_ping() {
    let (_temp, engine) = setup_temp_engine();

    let response = engine.execute(Command::Ping);

    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.text(), "PONG");
}

// =============================================================================
// Statistics Tests
// =============================================================================

#[test]
fn test_counters_track_commands_and_outcomes() {
    let (_temp, engine) = setup_temp_engine();

    engine.execute(set(ALICE, "Al"));
    engine.execute(set(BOB, "B"));
    engine.execute(get(ALICE));
    engine.execute(get(BOB));

    let counters = engine.counters();
    assert_eq!(counters.get(stats::SET_KEY), 2);
    assert_eq!(counters.get(stats::GET_KEY), 2);
    assert_eq!(counters.get(stats::OK_KEY), 2);
    assert_eq!(counters.get(stats::BAD_REQUEST_KEY), 1);
    assert_eq!(counters.get(stats::NOT_FOUND_KEY), 1);
}

#[test]
fn test_monitor_report() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .dump_file(temp_dir.path().join("users.json"))
        .checkpoint_interval(Duration::from_secs(3600))
        .max_connections(4)
        .build();
    let engine = Engine::open(config).unwrap();
    engine.execute(set(ALICE, "Al"));
    engine.execute(set(BOB, "Bob"));

    let response = engine.execute(Command::Monitor);
    assert_eq!(response.status, Status::Ok);

    let report: MonitorReport = serde_json::from_slice(&response.payload.unwrap()).unwrap();
    assert_eq!(report.users, 2);
    assert_eq!(report.in_flight, Some(0));
    assert_eq!(report.counters[stats::SET_KEY], 2);
    assert_eq!(report.checkpoints_failed, 0);
}

#[test]
fn test_monitor_report_without_admission() {
    let (_temp, engine) = setup_temp_engine();

    let report = engine.monitor_report();

    assert_eq!(report.in_flight, None);
    assert_eq!(report.counters.len(), stats::SERVER_KEYS.len());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_close_writes_final_checkpoint() {
    let (_temp, engine) = setup_temp_engine();
    engine.execute(set(ALICE, "Al"));
    engine.execute(set(BOB, "Bob"));

    engine.close().unwrap();

    let on_disk = snapshot::read(engine.dump_file()).unwrap();
    assert_eq!(on_disk, engine.store().snapshot());
    assert!(!snapshot::backup_path(engine.dump_file()).exists());
}

#[test]
fn test_manual_checkpoint() {
    let (_temp, engine) = setup_temp_engine();
    engine.execute(set(ALICE, "Al"));

    assert_eq!(engine.checkpoint().unwrap(), 1);

    let on_disk = snapshot::read(engine.dump_file()).unwrap();
    assert_eq!(on_disk.get(ALICE), Some(&"Al".to_string()));
}

#[test]
fn test_close_twice_is_noop() {
    let (_temp, engine) = setup_temp_engine();

    engine.close().unwrap();
    engine.close().unwrap();
}

#[test]
fn test_reopen_restores_users() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(config_in(&temp_dir)).unwrap();
        engine.execute(set(ALICE, "Jean Luc"));
        engine.execute(set(BOB, "Bob"));
        engine.execute(Command::Delete {
            id: BOB.to_string(),
        });
        engine.close().unwrap();
    }

    let engine = Engine::open(config_in(&temp_dir)).unwrap();

    assert_eq!(engine.store().len(), 1);
    assert_eq!(engine.store().name(ALICE), Some("Jean Luc".to_string()));
}

#[test]
fn test_periodic_checkpoint_runs() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .dump_file(temp_dir.path().join("users.json"))
        .checkpoint_interval(Duration::from_millis(20))
        .build();
    let engine = Engine::open(config).unwrap();
    engine.execute(set(ALICE, "Al"));

    let mut written = false;
    for _ in 0..500 {
        if let Ok(users) = snapshot::read(engine.dump_file()) {
            if users.contains_key(ALICE) {
                written = true;
                break;
            }
        }
        thread::sleep(Duration::from_millis(10));
    }

    assert!(written);
    assert_eq!(engine.checkpoint_stats().failed(), 0);
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_concurrent_execute() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..50 {
                    let id = format!("00000000-0000-4000-8000-{:04x}{:08x}", t, i);
                    assert_eq!(engine.execute(set(&id, "Writer")).status, Status::Ok);
                    assert_eq!(engine.execute(get(&id)).text(), "Writer");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.store().len(), 400);
    assert_eq!(engine.counters().get(stats::OK_KEY), 800);
}
