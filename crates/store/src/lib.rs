//! Flag store: persisted per-booking notification flags.
//!
//! This crate provides:
//! - `FlagStore` trait: the narrow read/write contract the rule engine consumes
//! - `MemoryFlagStore`: in-memory store for tests and dry runs
//! - `JsonFileFlagStore`: single-writer JSON file persistence

pub mod error;
pub mod file;
pub mod memory;

use bookping_core::{BookingKey, FlagRecord};

pub use error::StoreError;
pub use file::JsonFileFlagStore;
pub use memory::MemoryFlagStore;

/// Flag-store row key: `(booking_key, phone)`.
///
/// The phone is part of the identity on purpose — the legacy data model
/// tracks each booking+phone pair as its own row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub booking: BookingKey,
    pub phone: String,
}

impl StoreKey {
    pub fn new(booking: &BookingKey, phone: &str) -> Self {
        Self {
            booking: booking.clone(),
            phone: phone.to_string(),
        }
    }

    /// Flat string form used as the JSON map key: `business:booking:phone`.
    pub fn as_flat(&self) -> String {
        format!("{}:{}", self.booking, self.phone)
    }
}

/// The narrow read/write contract the rule engine consumes.
///
/// Rows are created on first-seen bookings and updated in place; the core
/// never deletes them. Runs are not concurrent with each other, so there is
/// no locking discipline beyond per-row idempotent writes.
#[async_trait::async_trait]
pub trait FlagStore: Send + Sync {
    /// Look up the flag row for a booking+phone pair, `None` if never seen.
    async fn get(&self, booking: &BookingKey, phone: &str) -> Result<Option<FlagRecord>, StoreError>;

    /// Insert or replace the flag row for a booking+phone pair.
    async fn put(&self, booking: &BookingKey, phone: &str, record: &FlagRecord) -> Result<(), StoreError>;

    /// Verify the store is reachable. Called once at run start; a failure
    /// here is fatal for the run.
    async fn healthcheck(&self) -> Result<(), StoreError>;
}
