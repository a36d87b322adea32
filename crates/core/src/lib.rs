//! Shared data model and configuration for the bookping workspace.
//!
//! This crate provides:
//! - `BookingRecord` / `BookingKey`: one reservation snapshot, the unit of work
//! - `FlagRecord` / `FlagKind`: persisted per-booking notification flags
//! - Phone and reservation-timestamp canonicalization helpers
//! - Env-driven runner configuration

pub mod booking;
pub mod config;
pub mod flags;

pub use booking::{canonical_phone, parse_reserve_at, BookingKey, BookingRecord, BookingStatus};
pub use config::{BookingSourceConfig, Config, DigestConfig, SmsConfig};
pub use flags::{FlagKind, FlagRecord};
