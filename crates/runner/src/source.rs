//! Booking source: fetching the run's booking snapshot.
//!
//! The runner talks to the reservation platform's JSON API using a session
//! cookie produced by an external browser-auth step. Upstream records are
//! mapped into `BookingRecord`s leniently: a malformed timestamp or status
//! on one booking degrades that record, never the fetch.

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, info, warn};

use bookping_core::{
    canonical_phone, parse_reserve_at, BookingKey, BookingRecord, BookingStatus,
    BookingSourceConfig,
};

/// Where a run's bookings come from.
///
/// A failure here is fatal for the run: with no booking snapshot there is
/// nothing to evaluate.
#[async_trait::async_trait]
pub trait BookingSource: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<Vec<BookingRecord>>;
}

// ── Upstream wire shape ─────────────────────────────────────────────

/// One booking as the platform API returns it.
#[derive(Debug, Deserialize)]
struct UpstreamBooking {
    #[serde(rename = "bookingId")]
    booking_id: serde_json::Value,
    #[serde(default)]
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(rename = "reserveDatetime", default)]
    reserve_datetime: Option<String>,
    #[serde(rename = "bookingStatus", default)]
    booking_status: Option<String>,
    #[serde(rename = "bookingOptions", default)]
    booking_options: Vec<UpstreamOption>,
}

#[derive(Debug, Deserialize)]
struct UpstreamOption {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamPage {
    #[serde(default)]
    bookings: Vec<UpstreamBooking>,
}

// ── HTTP source ─────────────────────────────────────────────────────

/// Fetches bookings from the platform API, one request per business ID.
pub struct HttpBookingSource {
    config: BookingSourceConfig,
    client: reqwest::Client,
}

impl HttpBookingSource {
    pub fn new(config: BookingSourceConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_business(&self, business_id: &str) -> anyhow::Result<Vec<BookingRecord>> {
        let url = format!(
            "{}/business/{business_id}/bookings",
            self.config.base_url.trim_end_matches('/')
        );

        let mut request = self.client.get(&url);
        if let Some(cookie) = &self.config.session_cookie {
            request = request.header(reqwest::header::COOKIE, cookie.as_str());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("booking fetch failed for business {business_id}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("booking API returned {status} for business {business_id}");
        }

        let page: UpstreamPage = response
            .json()
            .await
            .with_context(|| format!("malformed booking payload for business {business_id}"))?;

        let records = page
            .bookings
            .into_iter()
            .map(|raw| map_booking(business_id, raw))
            .collect::<Vec<_>>();

        debug!(business_id, count = records.len(), "bookings fetched");
        Ok(records)
    }
}

#[async_trait::async_trait]
impl BookingSource for HttpBookingSource {
    async fn fetch(&self) -> anyhow::Result<Vec<BookingRecord>> {
        let mut all = Vec::new();
        for business_id in &self.config.business_ids {
            all.extend(self.fetch_business(business_id).await?);
        }
        info!(bookings = all.len(), businesses = self.config.business_ids.len(), "booking snapshot loaded");
        Ok(all)
    }
}

/// Map one upstream record. Bad fields degrade (unparsable time → `None`,
/// odd status → `Unknown`) so a single weird booking cannot abort the run.
fn map_booking(business_id: &str, raw: UpstreamBooking) -> BookingRecord {
    // IDs arrive as either a JSON number or a string depending on endpoint
    // version.
    let booking_id = match &raw.booking_id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let reserve_at = raw.reserve_datetime.as_deref().and_then(|s| {
        let parsed = parse_reserve_at(s);
        if parsed.is_none() {
            warn!(business_id, booking_id = %booking_id, raw = s, "unparsable reservation time");
        }
        parsed
    });

    let status = raw
        .booking_status
        .as_deref()
        .map(BookingStatus::from_source)
        .unwrap_or(BookingStatus::Unknown);

    BookingRecord {
        key: BookingKey::new(business_id, booking_id),
        phone: canonical_phone(&raw.phone),
        name: raw.name,
        reserve_at,
        status,
        option_tags: raw
            .booking_options
            .into_iter()
            .map(|o| o.name)
            .filter(|n| !n.is_empty())
            .collect(),
    }
}
