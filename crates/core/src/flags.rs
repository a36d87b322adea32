//! Persisted per-booking notification flags.
//!
//! A `FlagRecord` is the single source of truth for "has this notification
//! already been sent for this booking+phone pair". The flag set is a fixed
//! shape of named booleans rather than an open map, so `set-flag` /
//! `flag-is-unset` references are checked when rules load. Absent JSON keys
//! deserialize to `false`, so adding a flag needs no row migration.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Flag kinds ──────────────────────────────────────────────────────

/// The closed set of notification flags a rule may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagKind {
    ConfirmSent,
    ReminderSent,
    ReviewRequestSent,
    OptionNoticeSent,
    CancelNoticeSent,
}

impl FlagKind {
    /// All known flag kinds, in declaration order.
    pub const ALL: &'static [FlagKind] = &[
        FlagKind::ConfirmSent,
        FlagKind::ReminderSent,
        FlagKind::ReviewRequestSent,
        FlagKind::OptionNoticeSent,
        FlagKind::CancelNoticeSent,
    ];
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagKind::ConfirmSent => write!(f, "confirm-sent"),
            FlagKind::ReminderSent => write!(f, "reminder-sent"),
            FlagKind::ReviewRequestSent => write!(f, "review-request-sent"),
            FlagKind::OptionNoticeSent => write!(f, "option-notice-sent"),
            FlagKind::CancelNoticeSent => write!(f, "cancel-notice-sent"),
        }
    }
}

// ── Flag record ─────────────────────────────────────────────────────

/// One flag-store row, keyed externally by `(BookingKey, phone)`.
///
/// Rows are created on first-seen bookings, updated in place by actions,
/// and never deleted by the core (archival is an external concern).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRecord {
    #[serde(default)]
    pub confirm_sent: bool,
    #[serde(default)]
    pub reminder_sent: bool,
    #[serde(default)]
    pub review_request_sent: bool,
    #[serde(default)]
    pub option_notice_sent: bool,
    #[serde(default)]
    pub cancel_notice_sent: bool,
}

impl FlagRecord {
    /// Read one flag by kind.
    pub fn get(&self, kind: FlagKind) -> bool {
        match kind {
            FlagKind::ConfirmSent => self.confirm_sent,
            FlagKind::ReminderSent => self.reminder_sent,
            FlagKind::ReviewRequestSent => self.review_request_sent,
            FlagKind::OptionNoticeSent => self.option_notice_sent,
            FlagKind::CancelNoticeSent => self.cancel_notice_sent,
        }
    }

    /// Write one flag by kind.
    pub fn set(&mut self, kind: FlagKind, value: bool) {
        match kind {
            FlagKind::ConfirmSent => self.confirm_sent = value,
            FlagKind::ReminderSent => self.reminder_sent = value,
            FlagKind::ReviewRequestSent => self.review_request_sent = value,
            FlagKind::OptionNoticeSent => self.option_notice_sent = value,
            FlagKind::CancelNoticeSent => self.cancel_notice_sent = value,
        }
    }
}
