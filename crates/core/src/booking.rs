//! Booking record model: one reservation snapshot from the booking source.
//!
//! A booking is identified by `(business_id, booking_id)` — booking IDs are
//! unique only within a business. The flag-store lookup key additionally
//! includes the customer phone, matching the legacy data model (two phones
//! on the same booking are tracked as independent rows).

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ── Booking identity ────────────────────────────────────────────────

/// Durable booking identity: `(business_id, booking_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingKey {
    pub business_id: String,
    pub booking_id: String,
}

impl BookingKey {
    pub fn new(business_id: impl Into<String>, booking_id: impl Into<String>) -> Self {
        Self {
            business_id: business_id.into(),
            booking_id: booking_id.into(),
        }
    }
}

impl fmt::Display for BookingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.business_id, self.booking_id)
    }
}

// ── Booking status ──────────────────────────────────────────────────

/// Reservation status as reported by the booking source.
///
/// Unrecognized upstream strings map to `Unknown` instead of failing the
/// record — a single odd booking must never abort a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Completed,
    Cancelled,
    Unknown,
}

impl BookingStatus {
    /// Parse an upstream status string, mapping anything unrecognized to `Unknown`.
    pub fn from_source(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => BookingStatus::Confirmed,
            "completed" => BookingStatus::Completed,
            "cancelled" | "canceled" => BookingStatus::Cancelled,
            _ => BookingStatus::Unknown,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::Unknown => write!(f, "unknown"),
        }
    }
}

// ── Booking record ──────────────────────────────────────────────────

/// Immutable snapshot of one reservation, as fetched at the start of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub key: BookingKey,
    /// Customer contact in canonical `NNN-NNNN-NNNN` form.
    pub phone: String,
    pub name: String,
    /// Local reservation timestamp. `None` when the upstream value was
    /// missing or unparsable; time-based conditions then never match.
    pub reserve_at: Option<NaiveDateTime>,
    pub status: BookingStatus,
    /// Free-text option labels attached by the customer at booking time.
    #[serde(default)]
    pub option_tags: Vec<String>,
}

// ── Canonicalization helpers ────────────────────────────────────────

/// Normalize a phone number to `NNN-NNNN-NNNN`.
///
/// Digit-only 11-digit input is reformatted (`01011112222` → `010-1111-2222`);
/// anything else is returned trimmed as-is so an odd upstream value still
/// yields a stable flag-store key.
pub fn canonical_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 11 {
        format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..])
    } else {
        raw.trim().to_string()
    }
}

/// Formats accepted for timezone-naive reservation timestamps.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an upstream reservation timestamp into local naive time.
///
/// Accepts both timezone-naive strings and RFC 3339 timezone-aware strings;
/// aware inputs are converted to the run's local timezone and the offset
/// dropped. Returns `None` on anything unparsable — callers treat a missing
/// timestamp as "time conditions never match", not as an error.
pub fn parse_reserve_at(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(aware) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(aware.with_timezone(&Local).naive_local());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(naive);
        }
    }
    None
}
