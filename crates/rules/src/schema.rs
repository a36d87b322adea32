//! YAML DSL schema types with serde deserialization.
//!
//! Defines the rule document hierarchy:
//! - `RuleFile`: one YAML document holding an ordered list of rules
//! - `RuleDefinition`: name, enabled flag, conditions (AND), actions (ordered)
//! - `ConditionSpec` / `ActionSpec`: closed tagged unions dispatched on the
//!   `type` field
//!
//! Because the condition and action sets are closed enums, an unknown `type`
//! or malformed params is a deserialization error — configuration typos
//! surface at load time, before any booking is processed.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use bookping_core::{BookingStatus, FlagKind};

use crate::audit::LogLevel;

// ── Rule file (one YAML document) ───────────────────────────────────

/// A rule file: an ordered list of rule definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFile {
    pub rules: Vec<RuleDefinition>,
}

// ── Rule definition ─────────────────────────────────────────────────

/// One named rule: AND-combined conditions and an ordered action list.
///
/// There is deliberately no OR/NOT/nesting — alternation is expressed by
/// writing multiple rules, and every matching rule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique, human-readable name used for logging and audit.
    pub name: String,
    /// Disabled rules are skipped entirely, including condition evaluation.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// All conditions must pass (empty list matches every booking).
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
    /// Executed in order on match; failures do not stop later actions.
    pub actions: Vec<ActionSpec>,
}

fn default_true() -> bool {
    true
}

// ── Conditions ──────────────────────────────────────────────────────

/// Closed set of condition evaluators, dispatched on `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ConditionSpec {
    /// True iff no flag row exists for `(booking_key, phone)`.
    BookingNotYetSeen,
    /// True iff `now <= reserve_at` and `reserve_at - now < hours`.
    /// Exactly at `reserve_at` still counts; past bookings never match.
    TimeBeforeReservation { hours: i64 },
    /// True iff the named flag is false (or the row is absent).
    FlagIsUnset { flag: FlagKind },
    /// True iff the run's local hour equals `hour` (0-23).
    HourEquals { hour: u32 },
    /// True iff the booking status equals `status`.
    StatusEquals { status: BookingStatus },
    /// True iff any keyword is a substring of any option tag.
    HasAnyKeyword { keywords: Vec<String> },
    /// True iff at least `min_count` option tags match any keyword.
    /// A tag contributes at most 1 however many keywords hit it.
    HasMinDistinctKeywordMatches {
        keywords: Vec<String>,
        min_count: usize,
    },
    /// True iff the date portion of `reserve_at` falls within
    /// `[start_date, end_date]` inclusive.
    DateInRange {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

// ── Actions ─────────────────────────────────────────────────────────

/// Closed set of action executors, dispatched on `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionSpec {
    /// Render the named template and deliver it through the named channel.
    /// Never touches the flag store — flag updates are a separate action so
    /// "sent but not yet marked sent" stays representable and auditable.
    SendNotification {
        channel: String,
        template: String,
        #[serde(default)]
        params: HashMap<String, String>,
    },
    /// Insert an all-false flag row iff none exists. A pre-existing row is
    /// left untouched.
    CreateFlagRow,
    /// Write one flag. The store write is skipped (still a success) when the
    /// stored value already equals `value` — the single dedup mechanism.
    SetFlag { flag: FlagKind, value: bool },
    /// Append a structured audit entry. Never fails.
    EmitLog { status: LogLevel, message: String },
}

impl ActionSpec {
    /// Stable action kind name used in reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionSpec::SendNotification { .. } => "send-notification",
            ActionSpec::CreateFlagRow => "create-flag-row",
            ActionSpec::SetFlag { .. } => "set-flag",
            ActionSpec::EmitLog { .. } => "emit-log",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIRM_RULE_YAML: &str = r#"
rules:
  - name: confirm-sms
    enabled: true
    conditions:
      - type: booking-not-yet-seen
      - type: status-equals
        status: confirmed
    actions:
      - type: create-flag-row
      - type: send-notification
        channel: sms
        template: confirm
        params:
          shop_name: Studio One
      - type: set-flag
        flag: confirm-sent
        value: true
"#;

    #[test]
    fn parse_confirm_rule() {
        let file: RuleFile = serde_yaml::from_str(CONFIRM_RULE_YAML).unwrap();
        assert_eq!(file.rules.len(), 1);

        let rule = &file.rules[0];
        assert_eq!(rule.name, "confirm-sms");
        assert!(rule.enabled);
        assert_eq!(rule.conditions.len(), 2);
        assert_eq!(rule.conditions[0], ConditionSpec::BookingNotYetSeen);
        assert_eq!(
            rule.conditions[1],
            ConditionSpec::StatusEquals {
                status: BookingStatus::Confirmed
            }
        );

        assert_eq!(rule.actions.len(), 3);
        assert_eq!(rule.actions[0], ActionSpec::CreateFlagRow);
        match &rule.actions[1] {
            ActionSpec::SendNotification {
                channel,
                template,
                params,
            } => {
                assert_eq!(channel, "sms");
                assert_eq!(template, "confirm");
                assert_eq!(params["shop_name"], "Studio One");
            }
            other => panic!("expected send-notification, got {other:?}"),
        }
        assert_eq!(
            rule.actions[2],
            ActionSpec::SetFlag {
                flag: FlagKind::ConfirmSent,
                value: true
            }
        );
    }

    #[test]
    fn enabled_defaults_to_true() {
        let yaml = r#"
rules:
  - name: minimal
    actions:
      - type: create-flag-row
"#;
        let file: RuleFile = serde_yaml::from_str(yaml).unwrap();
        assert!(file.rules[0].enabled);
        assert!(file.rules[0].conditions.is_empty());
    }

    #[test]
    fn unknown_condition_type_rejected() {
        let yaml = r#"
rules:
  - name: typo
    conditions:
      - type: booking-not-yet-sean
    actions:
      - type: create-flag-row
"#;
        assert!(serde_yaml::from_str::<RuleFile>(yaml).is_err());
    }

    #[test]
    fn unknown_action_type_rejected() {
        let yaml = r#"
rules:
  - name: typo
    actions:
      - type: send-sms-directly
"#;
        assert!(serde_yaml::from_str::<RuleFile>(yaml).is_err());
    }

    #[test]
    fn malformed_params_rejected() {
        // hours must be an integer
        let yaml = r#"
rules:
  - name: bad-hours
    conditions:
      - type: time-before-reservation
        hours: soon
    actions:
      - type: create-flag-row
"#;
        assert!(serde_yaml::from_str::<RuleFile>(yaml).is_err());
    }

    #[test]
    fn unknown_flag_name_rejected() {
        let yaml = r#"
rules:
  - name: bad-flag
    actions:
      - type: set-flag
        flag: totally-new-flag
        value: true
"#;
        assert!(serde_yaml::from_str::<RuleFile>(yaml).is_err());
    }

    #[test]
    fn date_range_parses_naive_dates() {
        let yaml = r#"
rules:
  - name: season
    conditions:
      - type: date-in-range
        start_date: 2026-09-01
        end_date: 2026-09-30
    actions:
      - type: emit-log
        status: info
        message: in season
"#;
        let file: RuleFile = serde_yaml::from_str(yaml).unwrap();
        match &file.rules[0].conditions[0] {
            ConditionSpec::DateInRange {
                start_date,
                end_date,
            } => {
                assert_eq!(start_date.to_string(), "2026-09-01");
                assert_eq!(end_date.to_string(), "2026-09-30");
            }
            other => panic!("expected date-in-range, got {other:?}"),
        }
    }

    #[test]
    fn action_kind_names() {
        assert_eq!(ActionSpec::CreateFlagRow.kind(), "create-flag-row");
        assert_eq!(
            ActionSpec::SetFlag {
                flag: FlagKind::ConfirmSent,
                value: true
            }
            .kind(),
            "set-flag"
        );
    }

    #[test]
    fn round_trip() {
        let file: RuleFile = serde_yaml::from_str(CONFIRM_RULE_YAML).unwrap();
        let yaml = serde_yaml::to_string(&file).unwrap();
        let file2: RuleFile = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(file, file2);
    }
}
