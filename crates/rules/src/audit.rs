//! In-memory structured audit log for rule execution.
//!
//! Stores per-rule log entries capped at a configurable maximum (default 500)
//! with FIFO eviction. This is what the `emit-log` action appends to, and the
//! engine records its own phases here as well. Uses `std::sync::RwLock` so it
//! can be read from sync reporting code while the async engine writes.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity level for audit log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Numeric severity for comparison (higher = more severe).
    pub fn as_severity(&self) -> u8 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
        }
    }
}

/// Phase of rule execution that produced the log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    ConditionCheck,
    ActionExec,
    Notification,
    FlagWrite,
    /// Entries appended by the `emit-log` action.
    Custom,
    Complete,
}

/// A single audit log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub rule_name: String,
    pub level: LogLevel,
    pub phase: ExecutionPhase,
    pub message: String,
    /// Booking identity (`business:booking:phone`) when the entry concerns
    /// a specific booking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<String>,
}

/// In-memory per-rule audit log with FIFO eviction.
pub struct AuditLog {
    entries: RwLock<HashMap<String, VecDeque<LogEntry>>>,
    max_entries_per_rule: usize,
}

impl AuditLog {
    /// Create a new audit log with the default cap of 500 entries per rule.
    pub fn new() -> Self {
        Self::with_max_entries(500)
    }

    /// Create a new audit log with a custom per-rule entry cap.
    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries_per_rule: max,
        }
    }

    /// Append a log entry for a rule.
    pub fn log(
        &self,
        rule_name: &str,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
        booking: Option<String>,
    ) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            rule_name: rule_name.to_string(),
            level,
            phase,
            message: message.into(),
            booking,
        };

        let mut guard = self.entries.write().expect("audit log lock poisoned");
        let deque = guard.entry(rule_name.to_string()).or_default();
        deque.push_back(entry);
        while deque.len() > self.max_entries_per_rule {
            deque.pop_front();
        }
    }

    /// Entries for a rule at or above `min_level`, newest first, up to `limit`.
    pub fn query(&self, rule_name: &str, min_level: LogLevel, limit: usize) -> Vec<LogEntry> {
        let guard = self.entries.read().expect("audit log lock poisoned");
        let Some(deque) = guard.get(rule_name) else {
            return Vec::new();
        };

        deque
            .iter()
            .rev()
            .filter(|e| e.level.as_severity() >= min_level.as_severity())
            .take(limit)
            .cloned()
            .collect()
    }

    /// Clear all log entries for a specific rule.
    pub fn clear(&self, rule_name: &str) {
        let mut guard = self.entries.write().expect("audit log lock poisoned");
        guard.remove(rule_name);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_log_and_query() {
        let log = AuditLog::new();
        log.log("r1", LogLevel::Info, ExecutionPhase::ConditionCheck, "checking", None);
        log.log("r1", LogLevel::Debug, ExecutionPhase::ActionExec, "sending", None);
        log.log("r1", LogLevel::Warning, ExecutionPhase::Notification, "slow gateway", None);

        let entries = log.query("r1", LogLevel::Debug, 100);
        assert_eq!(entries.len(), 3);
        // Newest first
        assert_eq!(entries[0].phase, ExecutionPhase::Notification);
        assert_eq!(entries[2].phase, ExecutionPhase::ConditionCheck);
    }

    #[test]
    fn level_filter() {
        let log = AuditLog::new();
        log.log("r1", LogLevel::Debug, ExecutionPhase::ActionExec, "debug", None);
        log.log("r1", LogLevel::Info, ExecutionPhase::ActionExec, "info", None);
        log.log("r1", LogLevel::Warning, ExecutionPhase::ActionExec, "warn", None);
        log.log("r1", LogLevel::Error, ExecutionPhase::ActionExec, "error", None);

        let entries = log.query("r1", LogLevel::Warning, 100);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.level.as_severity() >= 2));
    }

    #[test]
    fn fifo_eviction() {
        let log = AuditLog::with_max_entries(3);
        for i in 1..=4 {
            log.log("r1", LogLevel::Info, ExecutionPhase::ActionExec, format!("msg {i}"), None);
        }

        let entries = log.query("r1", LogLevel::Debug, 100);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "msg 4");
        assert_eq!(entries[2].message, "msg 2");
    }

    #[test]
    fn per_rule_isolation() {
        let log = AuditLog::new();
        log.log("r1", LogLevel::Info, ExecutionPhase::ActionExec, "r1 msg", None);
        log.log("r2", LogLevel::Error, ExecutionPhase::Custom, "r2 msg", None);

        assert_eq!(log.query("r1", LogLevel::Debug, 100).len(), 1);
        assert_eq!(log.query("r2", LogLevel::Debug, 100).len(), 1);
        assert!(log.query("r3", LogLevel::Debug, 100).is_empty());
    }

    #[test]
    fn clear_removes_rule_entries() {
        let log = AuditLog::new();
        log.log("r1", LogLevel::Info, ExecutionPhase::ActionExec, "msg", None);
        log.clear("r1");
        assert!(log.query("r1", LogLevel::Debug, 100).is_empty());
    }

    #[test]
    fn booking_identity_recorded() {
        let log = AuditLog::new();
        log.log(
            "r1",
            LogLevel::Info,
            ExecutionPhase::Custom,
            "manual entry",
            Some("S1:42:010-1111-2222".to_string()),
        );
        let entries = log.query("r1", LogLevel::Debug, 1);
        assert_eq!(entries[0].booking.as_deref(), Some("S1:42:010-1111-2222"));
    }

    #[test]
    fn severity_ordering() {
        assert!(LogLevel::Debug.as_severity() < LogLevel::Info.as_severity());
        assert!(LogLevel::Info.as_severity() < LogLevel::Warning.as_severity());
        assert!(LogLevel::Warning.as_severity() < LogLevel::Error.as_severity());
    }
}
