//! Notification transports for booking notifications.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - SMS gateway and chat-webhook notifier implementations
//! - Minijinja template rendering for message bodies
//! - `ChannelSet`: a name-keyed channel registry consumed by the rule engine

pub mod channels;
pub mod sms;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use channels::ChannelSet;
pub use sms::SmsNotifier;
pub use templating::{BookingInfo, RuleInfo, TemplateContext, TemplateRenderer};
pub use traits::{Notification, Notifier, NotifyError};
pub use webhook::WebhookNotifier;
