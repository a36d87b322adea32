//! In-memory flag store for tests and dry runs.

use std::collections::HashMap;
use std::sync::RwLock;

use bookping_core::{BookingKey, FlagRecord};

use crate::{FlagStore, StoreError, StoreKey};

/// `RwLock<HashMap>`-backed store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryFlagStore {
    rows: RwLock<HashMap<StoreKey, FlagRecord>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held (test helper).
    pub fn len(&self) -> usize {
        self.rows.read().expect("flag store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl FlagStore for MemoryFlagStore {
    async fn get(&self, booking: &BookingKey, phone: &str) -> Result<Option<FlagRecord>, StoreError> {
        let rows = self.rows.read().expect("flag store lock poisoned");
        Ok(rows.get(&StoreKey::new(booking, phone)).copied())
    }

    async fn put(&self, booking: &BookingKey, phone: &str, record: &FlagRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.write().expect("flag store lock poisoned");
        rows.insert(StoreKey::new(booking, phone), *record);
        Ok(())
    }

    async fn healthcheck(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
