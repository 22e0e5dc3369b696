//! Durable pre-change snapshots backing the revert path.
//!
//! One JSON record per tunable key, kept in a state directory that survives
//! process exit. Presence of a record is itself meaningful: a key with no
//! record was never modified (or was already reverted), so revert leaves it
//! alone. `save` captures at most once per activation cycle; a second apply
//! without an intervening revert keeps the original record untouched,
//! otherwise the true pre-change value would be lost and revert would be
//! unsafe.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::{Result, SavedSnapshot, TunableValue, TuneError};

/// Default location of the snapshot records.
pub const DEFAULT_STATE_DIR: &str = "/var/lib/saptuner/saved_state";

#[derive(Debug)]
pub struct SavedStateStore {
    dir: PathBuf,
}

impl SavedStateStore {
    /// Open (creating if needed) the state directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            TuneError::StorageUnavailable(format!(
                "cannot create state directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    fn record_path(&self, key: &str) -> PathBuf {
        // Keys are dotted sysctl-style names, safe as file names.
        self.dir.join(format!("{}.json", key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.record_path(key).exists()
    }

    /// Capture `value` under `key` unless a snapshot already exists.
    ///
    /// The record is written to a temp file in the state directory, synced,
    /// and renamed into place so a crash mid-write never leaves a truncated
    /// record behind.
    pub fn save(&self, key: &str, value: &TunableValue) -> Result<()> {
        let path = self.record_path(key);
        if path.exists() {
            debug!("snapshot for '{}' already present, keeping the original", key);
            return Ok(());
        }

        let record = SavedSnapshot {
            key: key.to_string(),
            value: value.clone(),
            saved_at: Utc::now(),
        };
        let serialized = serde_json::to_vec_pretty(&record).map_err(|e| {
            TuneError::StorageUnavailable(format!("cannot serialize snapshot for '{}': {}", key, e))
        })?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| {
            TuneError::StorageUnavailable(format!(
                "cannot create temp file in '{}': {}",
                self.dir.display(),
                e
            ))
        })?;
        tmp.write_all(&serialized).map_err(|e| {
            TuneError::StorageUnavailable(format!("cannot write snapshot for '{}': {}", key, e))
        })?;
        tmp.as_file().sync_all().map_err(|e| {
            TuneError::StorageUnavailable(format!("cannot sync snapshot for '{}': {}", key, e))
        })?;
        tmp.persist(&path).map_err(|e| {
            TuneError::StorageUnavailable(format!("cannot persist snapshot for '{}': {}", key, e))
        })?;

        debug!("saved snapshot {}={}", key, value);
        Ok(())
    }

    /// Return the stored value for `key` without deleting it.
    pub fn restore(&self, key: &str) -> Result<Option<TunableValue>> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path).map_err(|e| {
            TuneError::StorageUnavailable(format!("cannot read snapshot for '{}': {}", key, e))
        })?;
        let record: SavedSnapshot = serde_json::from_slice(&data).map_err(|e| {
            TuneError::StorageUnavailable(format!("corrupt snapshot record for '{}': {}", key, e))
        })?;
        Ok(Some(record.value))
    }

    /// Delete the snapshot for `key` so the next activation starts a fresh
    /// capture cycle. Idempotent.
    pub fn clear(&self, key: &str) -> Result<()> {
        let path = self.record_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                TuneError::StorageUnavailable(format!(
                    "cannot delete snapshot for '{}': {}",
                    key, e
                ))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SemLimits;
    use tempfile::TempDir;

    #[test]
    fn save_restore_clear_cycle() {
        let dir = TempDir::new().unwrap();
        let store = SavedStateStore::open(dir.path()).unwrap();

        store
            .save("kernel.shmmax", &TunableValue::Scalar(65536))
            .unwrap();
        assert!(store.contains("kernel.shmmax"));
        assert_eq!(
            store.restore("kernel.shmmax").unwrap(),
            Some(TunableValue::Scalar(65536))
        );

        // restore does not consume the record
        assert!(store.contains("kernel.shmmax"));

        store.clear("kernel.shmmax").unwrap();
        assert_eq!(store.restore("kernel.shmmax").unwrap(), None);
    }

    #[test]
    fn second_save_keeps_the_original_value() {
        let dir = TempDir::new().unwrap();
        let store = SavedStateStore::open(dir.path()).unwrap();

        store.save("vm.max_map_count", &TunableValue::Scalar(65530)).unwrap();
        store.save("vm.max_map_count", &TunableValue::Scalar(2000000)).unwrap();

        assert_eq!(
            store.restore("vm.max_map_count").unwrap(),
            Some(TunableValue::Scalar(65530))
        );
    }

    #[test]
    fn records_survive_reopening_the_store() {
        let dir = TempDir::new().unwrap();
        let sem = SemLimits {
            semmsl: 250,
            semmns: 256000,
            semopm: 32,
            semmni: 128,
        };
        {
            let store = SavedStateStore::open(dir.path()).unwrap();
            store.save("kernel.sem", &TunableValue::Sem(sem)).unwrap();
        }
        let store = SavedStateStore::open(dir.path()).unwrap();
        assert_eq!(
            store.restore("kernel.sem").unwrap(),
            Some(TunableValue::Sem(sem))
        );
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = SavedStateStore::open(dir.path()).unwrap();
        store.clear("never.saved").unwrap();
        store.clear("never.saved").unwrap();
    }

    #[test]
    fn corrupt_record_reports_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = SavedStateStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("kernel.shmall.json"), b"not json").unwrap();

        match store.restore("kernel.shmall") {
            Err(TuneError::StorageUnavailable(_)) => {}
            other => panic!("expected StorageUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn open_fails_when_dir_is_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("state");
        fs::write(&blocker, b"").unwrap();

        match SavedStateStore::open(&blocker) {
            Err(TuneError::StorageUnavailable(_)) => {}
            other => panic!("expected StorageUnavailable, got {:?}", other),
        }
    }
}
