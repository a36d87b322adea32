//! Run report aggregation.
//!
//! The engine records, per booking, per rule, per action, what happened.
//! The report is sufficient for the run driver to render a human-readable
//! digest without re-deriving any engine internals.

use serde::Serialize;

use bookping_core::BookingKey;

// ── Per-action outcome ──────────────────────────────────────────────

/// Outcome of one executed action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    /// Stable action kind (`send-notification`, `set-flag`, ...).
    pub action: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn success(action: &str) -> Self {
        Self {
            action: action.to_string(),
            success: true,
            error: None,
        }
    }

    pub fn failure(action: &str, error: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            success: false,
            error: Some(error.into()),
        }
    }
}

// ── Per-rule report ─────────────────────────────────────────────────

/// Outcome of evaluating one rule against one booking.
#[derive(Debug, Clone, Serialize)]
pub struct RuleReport {
    pub rule: String,
    pub matched: bool,
    /// Empty unless the rule matched; preserves configured action order.
    pub actions: Vec<ActionOutcome>,
}

impl RuleReport {
    pub fn not_matched(rule: &str) -> Self {
        Self {
            rule: rule.to_string(),
            matched: false,
            actions: Vec::new(),
        }
    }

    pub fn matched(rule: &str, actions: Vec<ActionOutcome>) -> Self {
        Self {
            rule: rule.to_string(),
            matched: true,
            actions,
        }
    }
}

// ── Per-booking report ──────────────────────────────────────────────

/// All rule outcomes for one booking, or the error that prevented its
/// evaluation (a failed flag-store read isolates to this booking only).
#[derive(Debug, Clone, Serialize)]
pub struct BookingReport {
    pub booking: BookingKey,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub rules: Vec<RuleReport>,
}

// ── Run report ──────────────────────────────────────────────────────

/// Aggregated report for one scheduled invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub bookings: Vec<BookingReport>,
}

impl RunReport {
    pub fn bookings_processed(&self) -> usize {
        self.bookings.len()
    }

    pub fn rules_matched(&self) -> usize {
        self.bookings
            .iter()
            .flat_map(|b| &b.rules)
            .filter(|r| r.matched)
            .count()
    }

    /// Count of successful `send-notification` actions.
    pub fn notifications_sent(&self) -> usize {
        self.action_outcomes()
            .filter(|a| a.action == "send-notification" && a.success)
            .count()
    }

    pub fn action_failures(&self) -> usize {
        self.action_outcomes().filter(|a| !a.success).count()
    }

    /// Bookings that could not be evaluated at all (store read failures).
    pub fn booking_errors(&self) -> usize {
        self.bookings.iter().filter(|b| b.error.is_some()).count()
    }

    fn action_outcomes(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.bookings
            .iter()
            .flat_map(|b| &b.rules)
            .flat_map(|r| &r.actions)
    }

    /// Render a digest suitable for a chat notification.
    ///
    /// Operators never see raw errors here beyond named per-action failures.
    pub fn render_digest(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "bookping run: {} bookings, {} rules matched, {} notifications sent\n",
            self.bookings_processed(),
            self.rules_matched(),
            self.notifications_sent(),
        ));

        let failures = self.action_failures();
        let errors = self.booking_errors();
        if failures == 0 && errors == 0 {
            out.push_str("no failures");
            return out;
        }

        out.push_str(&format!("{failures} action failures, {errors} booking errors\n"));
        for booking in &self.bookings {
            if let Some(err) = &booking.error {
                out.push_str(&format!("- {}:{}: {err}\n", booking.booking, booking.phone));
            }
            for rule in &booking.rules {
                for action in rule.actions.iter().filter(|a| !a.success) {
                    out.push_str(&format!(
                        "- {}:{} [{}] {} failed: {}\n",
                        booking.booking,
                        booking.phone,
                        rule.rule,
                        action.action,
                        action.error.as_deref().unwrap_or("unknown"),
                    ));
                }
            }
        }
        out.trim_end().to_string()
    }
}
