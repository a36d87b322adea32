//! JSON-file-backed flag store.
//!
//! The whole store is one JSON document mapping flat keys
//! (`business:booking:phone`) to flag rows. It is loaded once at open and
//! written through on every `put` via a temp-file rename, so a crash mid-run
//! leaves either the old or the new document, never a torn one. Runs are
//! single-writer by design (one scheduled invocation at a time).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use bookping_core::{BookingKey, FlagRecord};
use tracing::info;

use crate::{FlagStore, StoreError, StoreKey};

pub struct JsonFileFlagStore {
    path: PathBuf,
    /// BTreeMap so the on-disk document has a stable key order.
    rows: RwLock<BTreeMap<String, FlagRecord>>,
}

impl JsonFileFlagStore {
    /// Open a store at `path`, creating parent directories and starting from
    /// an empty document when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let rows: BTreeMap<String, FlagRecord> = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };

        info!(path = %path.display(), rows = rows.len(), "opened flag store");
        Ok(Self {
            path,
            rows: RwLock::new(rows),
        })
    }

    /// Serialize the current map and atomically replace the store file.
    fn flush(&self, rows: &BTreeMap<String, FlagRecord>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(rows)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl FlagStore for JsonFileFlagStore {
    async fn get(&self, booking: &BookingKey, phone: &str) -> Result<Option<FlagRecord>, StoreError> {
        let rows = self.rows.read().expect("flag store lock poisoned");
        Ok(rows.get(&StoreKey::new(booking, phone).as_flat()).copied())
    }

    async fn put(&self, booking: &BookingKey, phone: &str, record: &FlagRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.write().expect("flag store lock poisoned");
        rows.insert(StoreKey::new(booking, phone).as_flat(), *record);
        self.flush(&rows)
    }

    async fn healthcheck(&self) -> Result<(), StoreError> {
        // The parent directory must be writable; probe with the temp path.
        let probe = self.path.with_extension("json.probe");
        std::fs::write(&probe, b"ok")
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", self.path.display())))?;
        std::fs::remove_file(&probe).ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookping_core::FlagKind;

    #[tokio::test]
    async fn round_trip_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        let key = BookingKey::new("S1", "42");

        {
            let store = JsonFileFlagStore::open(&path).unwrap();
            let mut record = FlagRecord::default();
            record.set(FlagKind::ConfirmSent, true);
            store.put(&key, "010-1111-2222", &record).await.unwrap();
        }

        let reopened = JsonFileFlagStore::open(&path).unwrap();
        let loaded = reopened.get(&key, "010-1111-2222").await.unwrap().unwrap();
        assert!(loaded.get(FlagKind::ConfirmSent));
        assert!(!loaded.get(FlagKind::ReminderSent));
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileFlagStore::open(dir.path().join("nested/flags.json")).unwrap();
        let key = BookingKey::new("S1", "1");
        assert!(store.get(&key, "010-0000-0000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn healthcheck_ok_on_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileFlagStore::open(dir.path().join("flags.json")).unwrap();
        store.healthcheck().await.unwrap();
    }

    #[tokio::test]
    async fn rows_written_before_new_flags_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        std::fs::write(&path, r#"{"S1:42:010-1111-2222": {"confirm_sent": true}}"#).unwrap();

        let store = JsonFileFlagStore::open(&path).unwrap();
        let key = BookingKey::new("S1", "42");
        let loaded = store.get(&key, "010-1111-2222").await.unwrap().unwrap();
        assert!(loaded.confirm_sent);
        assert!(!loaded.cancel_notice_sent);
    }
}
