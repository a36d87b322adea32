//! Env-driven runner configuration.
//!
//! All settings come from environment variables (optionally via a `.env`
//! file). The session cookie is produced by the external browser-auth
//! collaborator; this config only carries it to the booking-source client.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: BookingSourceConfig,
    pub sms: SmsConfig,
    pub digest: DigestConfig,
    /// Directory containing rule YAML files.
    pub rules_dir: PathBuf,
    /// YAML file mapping template names to minijinja sources.
    pub templates_path: PathBuf,
    /// Path of the JSON flag-store file.
    pub store_path: PathBuf,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            source: BookingSourceConfig::from_env(),
            sms: SmsConfig::from_env(),
            digest: DigestConfig::from_env(),
            rules_dir: PathBuf::from(env_or("BOOKPING_RULES_DIR", "rules")),
            templates_path: PathBuf::from(env_or("BOOKPING_TEMPLATES_PATH", "templates.yml")),
            store_path: PathBuf::from(env_or("BOOKPING_STORE_PATH", "data/flags.json")),
        }
    }
}

// ── Booking source ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSourceConfig {
    /// Base URL of the reservation platform API.
    pub base_url: String,
    /// Authenticated session cookie string, produced externally.
    pub session_cookie: Option<String>,
    /// Business IDs whose bookings are fetched each run.
    pub business_ids: Vec<String>,
}

impl BookingSourceConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_or("BOOKING_API_BASE", "https://booking.example.com/api"),
            session_cookie: env_opt("BOOKING_SESSION_COOKIE"),
            business_ids: env_or("BOOKING_BUSINESS_IDS", "")
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

// ── SMS gateway ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    /// Registered sender number.
    pub sender: Option<String>,
}

impl SmsConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: env_or("SMS_API_URL", "https://sms-gateway.example.com/send"),
            api_key: env_opt("SMS_API_KEY"),
            sender: env_opt("SMS_SENDER"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.sender.is_some()
    }
}

// ── Run digest ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Chat webhook that receives the per-run digest. Optional: without it
    /// the digest is only logged.
    pub webhook_url: Option<String>,
}

impl DigestConfig {
    pub fn from_env() -> Self {
        Self {
            webhook_url: env_opt("DIGEST_WEBHOOK_URL"),
        }
    }
}
