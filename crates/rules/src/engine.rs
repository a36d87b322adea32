//! The rule engine.
//!
//! For each booking, for each enabled rule: evaluate conditions (AND,
//! short-circuit on first false), and if all pass execute the actions in
//! order, isolating failures per action. Multiple rules may match the same
//! booking; all matching rules execute.
//!
//! Conditions evaluate against the flag-row snapshot read at the start of
//! the booking — so permuting the rule list never changes which rules match
//! within one run. Actions read the flag store live, so `create-flag-row`
//! stays idempotent against a row created by an earlier action in the same
//! run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use bookping_core::{BookingRecord, FlagKind, FlagRecord};
use bookping_notify::{BookingInfo, ChannelSet, Notification, RuleInfo, TemplateContext, TemplateRenderer};
use bookping_store::FlagStore;

use crate::audit::{AuditLog, ExecutionPhase, LogLevel};
use crate::conditions;
use crate::context::BookingContext;
use crate::report::{ActionOutcome, BookingReport, RuleReport, RunReport};
use crate::schema::{ActionSpec, RuleDefinition};
use crate::TemplateTable;

/// Orchestrates condition evaluation and action execution over one run.
pub struct Engine {
    store: Arc<dyn FlagStore>,
    channels: ChannelSet,
    /// Template name → template source, validated at rule load.
    templates: TemplateTable,
    renderer: TemplateRenderer,
    audit: AuditLog,
}

impl Engine {
    pub fn new(
        store: Arc<dyn FlagStore>,
        channels: ChannelSet,
        templates: TemplateTable,
    ) -> Self {
        Self {
            store,
            channels,
            templates,
            renderer: TemplateRenderer::new(),
            audit: AuditLog::new(),
        }
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Evaluate every booking against every rule, strictly sequentially:
    /// bookings in input order, rules in configuration order, actions in
    /// configuration order. `now` is injected for deterministic tests.
    pub async fn process(
        &self,
        bookings: &[BookingRecord],
        rules: &[RuleDefinition],
        now: NaiveDateTime,
    ) -> RunReport {
        let mut report = RunReport::default();
        for booking in bookings {
            report
                .bookings
                .push(self.process_booking(booking, rules, now).await);
        }
        info!(
            bookings = report.bookings_processed(),
            matched = report.rules_matched(),
            sent = report.notifications_sent(),
            failures = report.action_failures(),
            "run complete"
        );
        report
    }

    async fn process_booking(
        &self,
        booking: &BookingRecord,
        rules: &[RuleDefinition],
        now: NaiveDateTime,
    ) -> BookingReport {
        // One snapshot read per booking; a failure here isolates to this
        // booking and the run continues.
        let flags = match self.store.get(&booking.key, &booking.phone).await {
            Ok(flags) => flags,
            Err(e) => {
                error!(booking = %booking.key, phone = %booking.phone, error = %e, "flag store read failed");
                return BookingReport {
                    booking: booking.key.clone(),
                    phone: booking.phone.clone(),
                    error: Some(e.to_string()),
                    rules: Vec::new(),
                };
            }
        };

        let ctx = BookingContext::new(booking.clone(), flags, now);

        let mut rule_reports = Vec::new();
        for rule in rules {
            // Disabled rules are skipped entirely, conditions included.
            if !rule.enabled {
                continue;
            }
            rule_reports.push(self.evaluate_rule(rule, &ctx).await);
        }

        BookingReport {
            booking: booking.key.clone(),
            phone: booking.phone.clone(),
            error: None,
            rules: rule_reports,
        }
    }

    async fn evaluate_rule(&self, rule: &RuleDefinition, ctx: &BookingContext) -> RuleReport {
        // AND with short-circuit: conditions after the first false are not
        // evaluated (observable in logs, nothing else — evaluators are pure).
        for (index, condition) in rule.conditions.iter().enumerate() {
            if !conditions::evaluate(condition, ctx) {
                debug!(rule = %rule.name, booking = %ctx.identity(), index, "condition failed, rule skipped");
                return RuleReport::not_matched(&rule.name);
            }
        }

        self.audit.log(
            &rule.name,
            LogLevel::Info,
            ExecutionPhase::ConditionCheck,
            "all conditions passed",
            Some(ctx.identity()),
        );

        let mut outcomes = Vec::with_capacity(rule.actions.len());
        for action in &rule.actions {
            let outcome = self.execute_action(rule, action, ctx).await;
            if !outcome.success {
                // Recorded and logged; the rule's remaining actions still run.
                error!(
                    rule = %rule.name,
                    action = %outcome.action,
                    booking = %ctx.identity(),
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "action failed"
                );
            }
            outcomes.push(outcome);
        }

        self.audit.log(
            &rule.name,
            LogLevel::Info,
            ExecutionPhase::Complete,
            format!("{} actions executed", outcomes.len()),
            Some(ctx.identity()),
        );

        RuleReport::matched(&rule.name, outcomes)
    }

    async fn execute_action(
        &self,
        rule: &RuleDefinition,
        action: &ActionSpec,
        ctx: &BookingContext,
    ) -> ActionOutcome {
        match action {
            ActionSpec::SendNotification {
                channel,
                template,
                params,
            } => self.send_notification(rule, ctx, channel, template, params).await,
            ActionSpec::CreateFlagRow => self.create_flag_row(ctx).await,
            ActionSpec::SetFlag { flag, value } => self.set_flag(ctx, *flag, *value).await,
            ActionSpec::EmitLog { status, message } => {
                self.audit.log(
                    &rule.name,
                    *status,
                    ExecutionPhase::Custom,
                    message.clone(),
                    Some(ctx.identity()),
                );
                ActionOutcome::success("emit-log")
            }
        }
    }

    /// Render the named template and deliver it. Deliberately does not touch
    /// the flag store — marking "sent" is a separate `set-flag` action.
    async fn send_notification(
        &self,
        rule: &RuleDefinition,
        ctx: &BookingContext,
        channel: &str,
        template: &str,
        params: &HashMap<String, String>,
    ) -> ActionOutcome {
        const KIND: &str = "send-notification";

        let Some(source) = self.templates.get(template) else {
            // Caught at load time under the normal path; still a clean
            // failure if the engine is driven with unvalidated rules.
            return ActionOutcome::failure(KIND, format!("unknown template '{template}'"));
        };

        let template_ctx = TemplateContext {
            rule: RuleInfo {
                name: rule.name.clone(),
            },
            booking: BookingInfo {
                business_id: ctx.booking.key.business_id.clone(),
                booking_id: ctx.booking.key.booking_id.clone(),
                name: ctx.booking.name.clone(),
                phone: ctx.booking.phone.clone(),
                reserve_at: ctx
                    .booking
                    .reserve_at
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default(),
                status: ctx.booking.status.to_string(),
                option_tags: ctx.booking.option_tags.clone(),
            },
            params: params.clone(),
            now: ctx.now.format("%Y-%m-%d %H:%M").to_string(),
        };

        let body = match self.renderer.render(source, &template_ctx) {
            Ok(body) => body,
            Err(e) => return ActionOutcome::failure(KIND, e.to_string()),
        };

        let notification = Notification::new("", body)
            .with_meta("phone", &ctx.booking.phone)
            .with_meta("rule", &rule.name)
            .with_meta("booking", ctx.booking.key.to_string());

        match self.channels.send(channel, &notification).await {
            Ok(()) => {
                self.audit.log(
                    &rule.name,
                    LogLevel::Info,
                    ExecutionPhase::Notification,
                    format!("sent '{template}' via {channel}"),
                    Some(ctx.identity()),
                );
                ActionOutcome::success(KIND)
            }
            Err(e) => {
                self.audit.log(
                    &rule.name,
                    LogLevel::Error,
                    ExecutionPhase::Notification,
                    format!("{channel} delivery failed: {e}"),
                    Some(ctx.identity()),
                );
                ActionOutcome::failure(KIND, e.to_string())
            }
        }
    }

    /// Insert an all-false flag row iff none exists. Reads the store live so
    /// a row created earlier in this same run is left untouched.
    async fn create_flag_row(&self, ctx: &BookingContext) -> ActionOutcome {
        const KIND: &str = "create-flag-row";

        match self.store.get(&ctx.booking.key, &ctx.booking.phone).await {
            Ok(Some(_)) => ActionOutcome::success(KIND),
            Ok(None) => {
                match self
                    .store
                    .put(&ctx.booking.key, &ctx.booking.phone, &FlagRecord::default())
                    .await
                {
                    Ok(()) => ActionOutcome::success(KIND),
                    Err(e) => ActionOutcome::failure(KIND, e.to_string()),
                }
            }
            Err(e) => ActionOutcome::failure(KIND, e.to_string()),
        }
    }

    /// Write one flag, skipping the store write when the stored value already
    /// equals `value`. The skip is still a success — this write-if-different
    /// is the dedup mechanism that prevents re-sends across runs.
    async fn set_flag(&self, ctx: &BookingContext, flag: FlagKind, value: bool) -> ActionOutcome {
        const KIND: &str = "set-flag";

        let current = match self.store.get(&ctx.booking.key, &ctx.booking.phone).await {
            Ok(row) => row,
            Err(e) => return ActionOutcome::failure(KIND, e.to_string()),
        };

        let mut record = current.unwrap_or_default();
        if current.is_some() && record.get(flag) == value {
            debug!(booking = %ctx.identity(), %flag, value, "flag already set, write skipped");
            return ActionOutcome::success(KIND);
        }

        record.set(flag, value);
        match self.store.put(&ctx.booking.key, &ctx.booking.phone, &record).await {
            Ok(()) => ActionOutcome::success(KIND),
            Err(e) => {
                warn!(booking = %ctx.identity(), %flag, error = %e, "flag write failed");
                ActionOutcome::failure(KIND, e.to_string())
            }
        }
    }
}
