//! Primary portfolio collection over its public JSON API.
//!
//! Endpoint: GET {base}/v2/portfolio/feed?limit=..&before_ts=..&before_id=..
//! Returns current-schema entries mixed with pre-migration artwork rows.
//! Pagination is keyset-based; the opaque cursor handed to callers encodes
//! "timestamp:id" of the last row, base64.

use super::types::{PortfolioEntry, PortfolioResponse, RawRecord};
use super::{ItemSource, SourcePage};
use crate::feed::types::FilterConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use std::time::Duration;

pub const PORTFOLIO_SOURCE_ID: &str = "portfolio";

/// Keyset position inside the portfolio collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeysetCursor {
    before_ts: i64,
    before_id: u64,
}

fn encode_cursor(before_ts: i64, before_id: u64) -> String {
    general_purpose::STANDARD.encode(format!("{}:{}", before_ts, before_id))
}

fn decode_cursor(cursor: &str) -> Option<KeysetCursor> {
    let decoded = general_purpose::STANDARD.decode(cursor).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (ts, id) = text.split_once(':')?;
    Some(KeysetCursor {
        before_ts: ts.parse().ok()?,
        before_id: id.parse().ok()?,
    })
}

/// Parse a portfolio feed response body. Public for unit testing with fixtures.
pub fn parse_portfolio_response(json: &str) -> Result<(Vec<RawRecord>, bool)> {
    let resp: PortfolioResponse =
        serde_json::from_str(json).context("failed to parse portfolio feed JSON")?;

    let records = resp
        .entries
        .into_iter()
        .map(|entry| match entry {
            PortfolioEntry::Current(r) => RawRecord::Portfolio(r),
            PortfolioEntry::Legacy(r) => RawRecord::LegacyArtwork(r),
        })
        .collect();

    Ok((records, resp.has_more))
}

/// Keyset position of a record, for minting the next cursor. Current-schema
/// rows sort by RFC3339 timestamp, legacy rows by their epoch-seconds column.
fn record_keyset(record: &RawRecord) -> (i64, u64) {
    match record {
        RawRecord::Portfolio(r) => {
            let ts = chrono::DateTime::parse_from_rfc3339(&r.created_at)
                .map(|dt| dt.timestamp())
                .unwrap_or(0);
            let id = r.id.trim_start_matches("pf-").parse().unwrap_or(0);
            (ts, id)
        }
        RawRecord::LegacyArtwork(r) => (r.created, r.artwork_id),
        RawRecord::Discover(_) => (0, 0),
    }
}

pub struct PortfolioApi {
    client: Client,
    base_url: String,
}

impl PortfolioApi {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("failed to build portfolio HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_url(&self, filters: &FilterConfig, limit: usize, cursor: Option<&str>) -> String {
        let mut url = format!("{}/v2/portfolio/feed?limit={}", self.base_url, limit);
        if filters.portfolio_only {
            url.push_str("&visibility=portfolio");
        }
        if !filters.tags.is_empty() {
            url.push_str("&tags=");
            url.push_str(&filters.tags.join(","));
        }
        if let Some(ks) = cursor.and_then(decode_cursor) {
            url.push_str(&format!("&before_ts={}&before_id={}", ks.before_ts, ks.before_id));
        }
        url
    }
}

#[async_trait]
impl ItemSource for PortfolioApi {
    fn id(&self) -> &str {
        PORTFOLIO_SOURCE_ID
    }

    async fn fetch_page(
        &mut self,
        filters: &FilterConfig,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<SourcePage> {
        let url = self.build_url(filters, limit, cursor);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("portfolio feed request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("portfolio feed {}: {}", status, body);
        }

        let body = resp.text().await.context("failed to read portfolio feed body")?;
        let (records, has_more) = parse_portfolio_response(&body)?;

        let next_cursor = if has_more {
            records.last().map(|r| {
                let (ts, id) = record_keyset(r);
                encode_cursor(ts, id)
            })
        } else {
            None
        };

        Ok(SourcePage { records, next_cursor })
    }
}
