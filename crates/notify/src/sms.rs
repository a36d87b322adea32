//! SMS gateway notifier.
//!
//! Delivers notifications through an HTTP SMS gateway. The receiver phone
//! number travels in the notification metadata (`phone`), since the same
//! channel serves every booking in a run.

use crate::traits::{Notification, Notifier, NotifyError};

/// Sends SMS messages via a JSON HTTP gateway.
#[derive(Debug)]
pub struct SmsNotifier {
    api_url: String,
    api_key: String,
    sender: String,
    client: reqwest::Client,
}

impl SmsNotifier {
    /// Creates a new `SmsNotifier` from configuration values.
    ///
    /// If `api_key` starts with `${`, the value between `${` and `}` is
    /// resolved as an environment variable name. Returns
    /// [`NotifyError::Config`] if the key is empty or the env var is missing.
    pub fn from_config(
        api_url: String,
        api_key: String,
        sender: String,
    ) -> Result<Self, NotifyError> {
        let resolved_key = if api_key.starts_with("${") {
            let var_name = api_key
                .strip_prefix("${")
                .and_then(|s| s.strip_suffix('}'))
                .ok_or_else(|| {
                    NotifyError::Config(format!("Malformed env var reference: {api_key}"))
                })?;
            std::env::var(var_name).map_err(|_| {
                NotifyError::Config(format!("Environment variable '{var_name}' is not set"))
            })?
        } else {
            api_key
        };

        if resolved_key.is_empty() {
            return Err(NotifyError::Config(
                "SMS API key must not be empty".to_string(),
            ));
        }
        if sender.is_empty() {
            return Err(NotifyError::Config(
                "SMS sender number must not be empty".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            api_key: resolved_key,
            sender,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for SmsNotifier {
    /// Sends the notification body as an SMS to the phone in the metadata.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let receiver = notification
            .metadata
            .get("phone")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                NotifyError::Config("SMS notification missing receiver phone".to_string())
            })?;

        let body = serde_json::json!({
            "key": self.api_key,
            "sender": self.sender,
            "receiver": receiver,
            "msg": notification.body,
        });

        tracing::debug!(receiver = %receiver, "Sending SMS notification");

        let response = self.client.post(&self.api_url).json(&body).send().await?;
        let status = response.status();

        // Handle rate limiting (HTTP 429).
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(30);
            return Err(NotifyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(NotifyError::Config(format!(
                "SMS gateway returned {status}: {body_text}"
            )));
        }

        // Gateways report per-message errors in the body even on HTTP 200.
        let resp_body: serde_json::Value = response.json().await?;
        if let Some(code) = resp_body.get("result_code").and_then(|v| v.as_i64()) {
            if code < 0 {
                let message = resp_body
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown gateway error");
                return Err(NotifyError::Config(format!(
                    "SMS gateway error {code}: {message}"
                )));
            }
        }

        tracing::info!(receiver = %receiver, "SMS notification sent");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "sms"
    }
}
