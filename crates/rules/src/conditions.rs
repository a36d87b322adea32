//! Pure condition evaluators.
//!
//! Each evaluator is a total function of `(BookingContext, params)` — no side
//! effects, and no panics on odd booking data. Missing or unparsable fields
//! make the condition fail (fail-closed), never the run.

use chrono::{Duration, Timelike};

use crate::context::BookingContext;
use crate::schema::ConditionSpec;

/// Evaluate one condition against a booking context.
pub fn evaluate(spec: &ConditionSpec, ctx: &BookingContext) -> bool {
    match spec {
        ConditionSpec::BookingNotYetSeen => ctx.flags.is_none(),

        ConditionSpec::TimeBeforeReservation { hours } => {
            // Half-open on the near side: exactly at reserve_at still counts
            // as "before"; a booking already in the past never matches.
            // `try_hours` keeps the evaluator total: an `hours` value outside
            // the representable range fails the condition, not the run.
            match (ctx.booking.reserve_at, Duration::try_hours(*hours)) {
                (Some(at), Some(window)) => ctx.now <= at && at - ctx.now < window,
                _ => false,
            }
        }

        ConditionSpec::FlagIsUnset { flag } => !ctx.flags_or_default().get(*flag),

        ConditionSpec::HourEquals { hour } => ctx.now.hour() == *hour,

        ConditionSpec::StatusEquals { status } => ctx.booking.status == *status,

        ConditionSpec::HasAnyKeyword { keywords } => ctx
            .booking
            .option_tags
            .iter()
            .any(|tag| keywords.iter().any(|kw| !kw.is_empty() && tag.contains(kw))),

        ConditionSpec::HasMinDistinctKeywordMatches {
            keywords,
            min_count,
        } => {
            if keywords.is_empty() || ctx.booking.option_tags.is_empty() {
                return false;
            }
            // Each option tag contributes at most 1 regardless of how many
            // keywords match within it.
            let matched = ctx
                .booking
                .option_tags
                .iter()
                .filter(|tag| keywords.iter().any(|kw| !kw.is_empty() && tag.contains(kw)))
                .count();
            matched >= *min_count
        }

        ConditionSpec::DateInRange {
            start_date,
            end_date,
        } => match ctx.booking.reserve_at {
            Some(at) => {
                let date = at.date();
                date >= *start_date && date <= *end_date
            }
            None => false,
        },
    }
}
