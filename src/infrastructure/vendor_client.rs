//! Vendor API client: paginated catalog fetch with rate limiting and
//! response-shape normalization.
//!
//! The vendor has answered with both a bare JSON array and an object wrapping
//! the array in a `list` field; both are accepted and resolved once here, at
//! the fetch boundary. Any other body shape counts as zero items for that
//! page and is logged, never raised. Retries are deliberately absent at this
//! layer; a failed request fails the run and the orchestrator's checkpoint
//! discipline handles the rest.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::application::orchestrator::ProductFetcher;
use crate::domain::errors::SyncError;
use crate::domain::sync::FetchOutcome;
use crate::infrastructure::config::{SyncConfig, VendorConfig};

/// Recognized top-level response shapes, resolved once per page.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VendorPayload {
    Bare(Vec<Value>),
    Wrapped { list: Vec<Value> },
    Unrecognized(Value),
}

impl VendorPayload {
    /// Items for the page, or `None` when the shape is not recognized.
    fn into_items(self) -> Option<Vec<Value>> {
        match self {
            Self::Bare(items) => Some(items),
            Self::Wrapped { list } => Some(list),
            Self::Unrecognized(_) => None,
        }
    }
}

pub struct VendorClient {
    http: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    base_url: String,
    page_size: u32,
    max_pages: u32,
    snapshot_dir: Option<PathBuf>,
}

impl VendorClient {
    pub fn new(vendor: &VendorConfig, sync: &SyncConfig) -> Result<Self, anyhow::Error> {
        use anyhow::Context;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("storename"),
            HeaderValue::from_str(&vendor.store_name).context("Invalid store name header")?,
        );
        headers.insert(
            HeaderName::from_static("apikey"),
            HeaderValue::from_str(&vendor.api_key).context("Invalid api key header")?,
        );
        headers.insert(
            HeaderName::from_static("apisecret"),
            HeaderValue::from_str(&vendor.api_secret).context("Invalid api secret header")?,
        );

        let http = Client::builder()
            .timeout(Duration::from_secs(vendor.request_timeout_seconds))
            .default_headers(headers)
            .gzip(true)
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(vendor.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );

        Ok(Self {
            http,
            rate_limiter: RateLimiter::direct(quota),
            base_url: vendor.base_url.clone(),
            page_size: vendor.page_size,
            max_pages: vendor.max_pages,
            snapshot_dir: sync.snapshot_dir.clone(),
        })
    }

    fn page_url(&self, page: u32, since: Option<DateTime<Utc>>) -> Result<Url, SyncError> {
        let mut url = Url::parse(&format!("{}/products", self.base_url.trim_end_matches('/')))
            .map_err(|e| SyncError::vendor_transport(format!("invalid vendor base url: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &page.to_string());
            pairs.append_pair("limit", &self.page_size.to_string());
            if let Some(since) = since {
                pairs.append_pair(
                    "updatedAfter",
                    &since.to_rfc3339_opts(SecondsFormat::Secs, true),
                );
            }
        }
        Ok(url)
    }

    async fn fetch_page(&self, url: Url) -> Result<VendorPayload, SyncError> {
        self.rate_limiter.until_ready().await;

        debug!(%url, "requesting vendor page");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::vendor_transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Keep the raw body: vendor error payloads are the only clue to
            // what went wrong on their side.
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::vendor_status(status.as_u16(), body));
        }

        response
            .json::<VendorPayload>()
            .await
            .map_err(|e| SyncError::vendor_transport(format!("body decode failed: {e}")))
    }

    /// Archive the raw payload for diagnostics. Never fatal.
    async fn archive_snapshot(&self, items: &[Value]) {
        let Some(dir) = &self.snapshot_dir else {
            return;
        };

        let path = dir.join(format!("vendor-raw-{}.json", Utc::now().timestamp_millis()));
        let result = async {
            tokio::fs::create_dir_all(dir).await?;
            let body = serde_json::to_vec_pretty(items)?;
            tokio::fs::write(&path, body).await?;
            Ok::<_, anyhow::Error>(())
        }
        .await;

        match result {
            Ok(()) => info!(path = %path.display(), "archived raw vendor snapshot"),
            Err(err) => warn!(%err, "failed to archive vendor snapshot"),
        }
    }
}

#[async_trait]
impl ProductFetcher for VendorClient {
    async fn fetch(&self, since: Option<DateTime<Utc>>) -> Result<FetchOutcome, SyncError> {
        let mut outcome = FetchOutcome::default();
        let mut page = 1u32;

        loop {
            if page > self.max_pages {
                warn!(
                    max_pages = self.max_pages,
                    "page cap reached before a short page, stopping fetch"
                );
                break;
            }

            let url = self.page_url(page, since)?;
            let payload = self.fetch_page(url).await?;
            outcome.pages_fetched += 1;

            let items = match payload.into_items() {
                Some(items) => items,
                None => {
                    warn!(page, "unrecognized vendor response shape, treating page as empty");
                    outcome.unrecognized_pages += 1;
                    Vec::new()
                }
            };

            let count = items.len();
            debug!(page, count, "vendor page fetched");
            outcome.items.extend(items);

            // Short page means last page.
            if (count as u32) < self.page_size {
                break;
            }
            page += 1;
        }

        info!(
            pages = outcome.pages_fetched,
            items = outcome.items.len(),
            unrecognized = outcome.unrecognized_pages,
            "vendor fetch complete"
        );

        self.archive_snapshot(&outcome.items).await;
        Ok(outcome)
    }
}
