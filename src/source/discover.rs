//! Secondary discover-only collection.
//!
//! Endpoint: GET {base}/discover/items?pageSize=..&pageToken=..
//! camelCase payload, epoch-millis timestamps. The backend issues its own
//! page tokens; they pass through untouched as the opaque cursor.

use super::types::{DiscoverResponse, RawRecord};
use super::{ItemSource, SourcePage};
use crate::feed::types::FilterConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DISCOVER_SOURCE_ID: &str = "discover";

/// Parse a discover response body. Public for unit testing with fixtures.
pub fn parse_discover_response(json: &str) -> Result<(Vec<RawRecord>, Option<String>)> {
    let resp: DiscoverResponse =
        serde_json::from_str(json).context("failed to parse discover JSON")?;

    // An empty-string token means the same as absent.
    let next = resp.next_page_token.filter(|t| !t.is_empty());
    let records = resp.items.into_iter().map(RawRecord::Discover).collect();
    Ok((records, next))
}

pub struct DiscoverApi {
    client: Client,
    base_url: String,
}

impl DiscoverApi {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("failed to build discover HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ItemSource for DiscoverApi {
    fn id(&self) -> &str {
        DISCOVER_SOURCE_ID
    }

    async fn fetch_page(
        &mut self,
        filters: &FilterConfig,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<SourcePage> {
        let mut url = format!("{}/discover/items?pageSize={}", self.base_url, limit);
        if !filters.tags.is_empty() {
            url.push_str("&labels=");
            url.push_str(&filters.tags.join(","));
        }
        if let Some(token) = cursor {
            url.push_str("&pageToken=");
            url.push_str(token);
        }

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("discover request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("discover {}: {}", status, body);
        }

        let body = resp.text().await.context("failed to read discover body")?;
        let (records, next_cursor) = parse_discover_response(&body)?;

        Ok(SourcePage { records, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_discover_page() {
        let json = r#"{
            "items": [
                {
                    "itemId": "dv-301",
                    "mediaKind": "video",
                    "media": {
                        "video": "https://cdn.example.com/dv-301.mp4",
                        "thumb": "https://cdn.example.com/dv-301-poster.jpg"
                    },
                    "creatorId": "c-88",
                    "creatorName": "Jun Sato",
                    "stats": {"likes": 310, "comments": 42},
                    "publishedAt": 1753948800000,
                    "labels": ["ink", "animation"],
                    "forSale": false,
                    "aiGenerated": false
                }
            ],
            "nextPageToken": "tok-2"
        }"#;

        let (records, next) = parse_discover_response(json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(next.as_deref(), Some("tok-2"));

        let RawRecord::Discover(r) = &records[0] else {
            panic!("expected discover record");
        };
        assert_eq!(r.item_id, "dv-301");
        assert_eq!(r.media_kind, "video");
        assert_eq!(r.media.thumb.as_deref(), Some("https://cdn.example.com/dv-301-poster.jpg"));
        assert_eq!(r.stats.likes, 310);
    }

    #[test]
    fn test_empty_token_means_exhausted() {
        let json = r#"{"items": [], "nextPageToken": ""}"#;
        let (records, next) = parse_discover_response(json).unwrap();
        assert!(records.is_empty());
        assert_eq!(next, None);
    }
}
