//! Booking notification YAML DSL rule engine.
//!
//! This crate provides:
//! - YAML-based rule definition with serde deserialization (closed
//!   condition/action sets, so typos fail at load time)
//! - Filesystem loader with load-time validation of channel, template,
//!   and flag references
//! - Pure condition evaluators over a per-booking context
//! - The rule engine: per booking, per enabled rule, AND-combined
//!   conditions, then in-order actions with per-action failure isolation
//! - Run report aggregation and the audit log backing `emit-log`

use std::collections::HashMap;

pub mod audit;
pub mod conditions;
pub mod context;
pub mod engine;
pub mod loader;
pub mod report;
pub mod schema;

pub use audit::{AuditLog, ExecutionPhase, LogLevel};
pub use context::BookingContext;
pub use engine::Engine;
pub use loader::{load_rules, RuleError};
pub use report::{ActionOutcome, BookingReport, RuleReport, RunReport};
pub use schema::{ActionSpec, ConditionSpec, RuleDefinition, RuleFile};

/// Template name → template source, as loaded from configuration.
pub type TemplateTable = HashMap<String, String>;
