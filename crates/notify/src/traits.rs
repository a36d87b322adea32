//! Notifier trait definition and shared error types.

use std::collections::HashMap;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    /// Short subject/title (webhook payloads; ignored by SMS).
    pub subject: String,
    /// The rendered body content.
    pub body: String,
    /// Delivery metadata: `phone` (SMS receiver), `rule`, `booking`.
    pub metadata: HashMap<String, String>,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Test connectivity with a sample notification.
    async fn test(&self) -> Result<(), NotifyError> {
        let test_notification = Notification::new(
            "[TEST] bookping connectivity check",
            "This is a test notification from bookping.",
        )
        .with_meta("rule", "test-rule");
        self.send(&test_notification).await
    }

    /// Human-readable name for this channel (e.g., "sms", "webhook").
    fn channel_name(&self) -> &str;
}
