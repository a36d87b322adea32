//! Name-keyed channel registry.
//!
//! The rule engine resolves `send-notification` channels against this set.
//! Channel names are validated when rules load, so an unknown name here at
//! send time means a programming error, reported as `UnknownChannel`.

use std::collections::HashMap;

use crate::traits::{Notification, Notifier, NotifyError};

/// Registry of notification channels keyed by name.
#[derive(Default)]
pub struct ChannelSet {
    channels: HashMap<String, Box<dyn Notifier>>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel under a name. Replaces any existing channel
    /// with the same name.
    pub fn register(&mut self, name: impl Into<String>, notifier: Box<dyn Notifier>) {
        self.channels.insert(name.into(), notifier);
    }

    /// Check whether a channel name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// All registered channel names, sorted for stable error messages.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Deliver a notification through the named channel.
    pub async fn send(&self, name: &str, notification: &Notification) -> Result<(), NotifyError> {
        let channel = self
            .channels
            .get(name)
            .ok_or_else(|| NotifyError::UnknownChannel(name.to_string()))?;

        let start = std::time::Instant::now();
        let result = channel.send(notification).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => tracing::info!(
                channel = name,
                duration_ms,
                "Notification delivered"
            ),
            Err(e) => tracing::warn!(
                channel = name,
                error = %e,
                duration_ms,
                "Notification delivery failed"
            ),
        }
        result
    }
}
