//! Per-booking evaluation context.

use chrono::NaiveDateTime;

use bookping_core::{BookingRecord, FlagRecord};

/// Everything condition evaluators may read for one booking in one run.
///
/// Built fresh each invocation from durable state; never persisted. The
/// flag row is the one read at the start of the booking's evaluation —
/// conditions of every rule see this same snapshot, so permuting the rule
/// list cannot change which rules match. Actions, by contrast, read the
/// store live (see the engine).
#[derive(Debug, Clone)]
pub struct BookingContext {
    pub booking: BookingRecord,
    /// `None` when no flag row exists yet — absence itself is observable
    /// (`booking-not-yet-seen`).
    pub flags: Option<FlagRecord>,
    /// Injected run wall-clock time (local), for deterministic tests.
    pub now: NaiveDateTime,
}

impl BookingContext {
    pub fn new(booking: BookingRecord, flags: Option<FlagRecord>, now: NaiveDateTime) -> Self {
        Self {
            booking,
            flags,
            now,
        }
    }

    /// The flag row, or an all-false synthetic record if none exists.
    pub fn flags_or_default(&self) -> FlagRecord {
        self.flags.unwrap_or_default()
    }

    /// Booking identity for logs: `business:booking:phone`.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.booking.key, self.booking.phone)
    }
}
