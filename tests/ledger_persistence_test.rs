//! Ledger persistence tests
//!
//! Snapshot round-trips, the Parquet export written beside it, and rejection
//! of damaged files.

use std::fs::File;

use cyclefit::executor::Checkpoint;
use cyclefit::ledger::{CycleRecord, StateLedger};
use cyclefit::trajectory::{Sample, Trajectory};
use cyclefit::Error;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::json;
use tempfile::TempDir;

fn trajectory() -> Trajectory {
    Trajectory::from_samples((0..10).map(|i| Sample {
        relative_time: f64::from(i),
        current: 1.0,
        voltage: 4.0 - f64::from(i) * 0.01,
        discharge_capacity: f64::from(i) / 360.0,
        step: 4,
    }))
}

fn ledger_with(cycles: u32) -> StateLedger {
    let mut ledger = StateLedger::new(Checkpoint(json!({"cycle": -1})));
    for i in 0..cycles {
        let record = CycleRecord::builder(i)
            .non_degradation_score(0.1 * f64::from(i))
            .degradation_score(0.2 * f64::from(i))
            .real_capacity(4.8)
            .build();
        ledger
            .commit_cycle(
                i as usize,
                record,
                Checkpoint(json!({"cycle": i})),
                trajectory(),
            )
            .unwrap();
    }
    ledger
}

#[test]
fn test_persist_then_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cfg_state.json");
    let ledger = ledger_with(3);

    ledger.persist(&path).unwrap();
    let loaded = StateLedger::load(&path).unwrap().unwrap();

    assert_eq!(loaded, ledger);
    assert_eq!(loaded.last_checkpoint(), &Checkpoint(json!({"cycle": 2})));
    assert_eq!(loaded.first_trajectory(), Some(&trajectory()));
}

#[test]
fn test_load_missing_ledger_is_none() {
    let dir = TempDir::new().unwrap();
    assert!(StateLedger::load(dir.path().join("absent.json")).unwrap().is_none());
}

#[test]
fn test_persist_replaces_previous_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cfg_state.json");
    ledger_with(1).persist(&path).unwrap();
    ledger_with(4).persist(&path).unwrap();

    assert_eq!(StateLedger::load(&path).unwrap().unwrap().len(), 4);
    // No temporary files left behind
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_export_contains_one_row_per_cycle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cfg_state.json");
    ledger_with(5).persist(&path).unwrap();

    let export = StateLedger::export_path(&path);
    assert!(export.exists());
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(export).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let rows: usize = reader.map(|batch| batch.unwrap().num_rows()).sum();
    assert_eq!(rows, 5);
}

#[test]
fn test_corrupt_snapshot_is_storage_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cfg_state.json");
    std::fs::write(&path, b"{ half a ledger").unwrap();

    let result = StateLedger::load(&path);
    assert!(matches!(result, Err(Error::StorageError(msg)) if msg.contains("Corrupt ledger")));
}

#[test]
fn test_gapped_snapshot_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cfg_state.json");
    ledger_with(3).persist(&path).unwrap();

    let mut doc: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let records = doc["records"].as_array_mut().unwrap();
    records.remove(1);
    std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

    assert!(matches!(StateLedger::load(&path), Err(Error::StorageError(_))));
}
