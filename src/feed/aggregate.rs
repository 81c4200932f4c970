//! Multi-source page assembly.
//!
//! All live sources are polled concurrently, each behind its own timeout.
//! Results are applied in the fixed priority order of the source list, so
//! the merged page is deterministic no matter which request resolves first.
//! A slow or broken source degrades to an empty contribution; the page only
//! fails as a whole when every attempted source failed.

use crate::error::FeedError;
use crate::feed::normalize::{normalize, NormalizePolicy, RejectReason};
use crate::feed::types::{Cursor, FeedItem, FilterConfig, SourceId};
use crate::source::{ItemSource, SourcePage};
use futures_util::future::join_all;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Bounded per-source item limit per fetch cycle.
    pub per_source_limit: usize,
    pub source_timeout_ms: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            per_source_limit: 30,
            source_timeout_ms: 8_000,
        }
    }
}

/// Per-source tallies for one fetch cycle.
#[derive(Debug)]
pub struct SourceStats {
    pub source: SourceId,
    pub fetched: usize,
    pub rejected: usize,
    pub deduplicated: usize,
    pub outcome: FetchOutcome,
}

#[derive(Debug)]
pub enum FetchOutcome {
    Ok,
    /// Source failed or timed out; its contribution degraded to empty.
    Degraded(FeedError),
    /// Source already reported a null cursor; not polled this cycle.
    Exhausted,
}

/// Items surviving normalization plus updated cursor state.
#[derive(Debug, Default)]
pub struct AggregatedPage {
    pub items: Vec<FeedItem>,
    pub cursors: HashMap<SourceId, Option<Cursor>>,
    pub stats: Vec<SourceStats>,
    /// Sum of per-source limits actually requested this cycle.
    pub requested: usize,
}

impl AggregatedPage {
    pub fn any_live_cursor(&self) -> bool {
        self.cursors.values().any(|c| c.is_some())
    }
}

enum FetchResult {
    Page(SourcePage),
    TimedOut,
    Failed(String),
    Skipped,
}

pub async fn fetch_page(
    sources: &mut [Box<dyn ItemSource>],
    filters: &FilterConfig,
    cursors: &HashMap<SourceId, Option<Cursor>>,
    policy: &NormalizePolicy,
    cfg: &AggregatorConfig,
) -> Result<AggregatedPage, FeedError> {
    let timeout = Duration::from_millis(cfg.source_timeout_ms);
    let limit = cfg.per_source_limit;

    let fetches = sources.iter_mut().map(|source| {
        let sid = source.id().to_string();
        // Missing entry = never fetched; Some(None) = exhausted.
        let cursor_state = cursors.get(&sid).cloned();
        async move {
            match cursor_state {
                Some(None) => (sid, FetchResult::Skipped),
                other => {
                    let cursor = other.flatten();
                    let fetch = source.fetch_page(filters, limit, cursor.as_deref());
                    match tokio::time::timeout(timeout, fetch).await {
                        Err(_) => (sid, FetchResult::TimedOut),
                        Ok(Err(e)) => (sid, FetchResult::Failed(format!("{:#}", e))),
                        Ok(Ok(page)) => (sid, FetchResult::Page(page)),
                    }
                }
            }
        }
    });

    // join_all keeps the source-priority order regardless of resolution timing.
    let results = join_all(fetches).await;

    let mut page = AggregatedPage::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut attempted = 0usize;
    let mut failed = 0usize;

    for (sid, result) in results {
        let mut stats = SourceStats {
            source: sid.clone(),
            fetched: 0,
            rejected: 0,
            deduplicated: 0,
            outcome: FetchOutcome::Ok,
        };

        match result {
            FetchResult::Skipped => {
                stats.outcome = FetchOutcome::Exhausted;
                page.cursors.insert(sid, None);
            }
            FetchResult::TimedOut => {
                attempted += 1;
                failed += 1;
                tracing::warn!(
                    source = %sid,
                    timeout_ms = cfg.source_timeout_ms,
                    "source timed out, degrading to empty contribution"
                );
                stats.outcome = FetchOutcome::Degraded(FeedError::SourceTimeout {
                    source: sid.clone(),
                    timeout_ms: cfg.source_timeout_ms,
                });
                page.requested += limit;
                // Keep the previous cursor so a retry can resume.
                if let Some(prev) = cursors.get(&sid) {
                    page.cursors.insert(sid, prev.clone());
                }
            }
            FetchResult::Failed(message) => {
                attempted += 1;
                failed += 1;
                tracing::warn!(
                    source = %sid,
                    error = %message,
                    "source fetch failed, degrading to empty contribution"
                );
                stats.outcome = FetchOutcome::Degraded(FeedError::SourceError {
                    source: sid.clone(),
                    message,
                });
                page.requested += limit;
                if let Some(prev) = cursors.get(&sid) {
                    page.cursors.insert(sid, prev.clone());
                }
            }
            FetchResult::Page(source_page) => {
                attempted += 1;
                page.requested += limit;
                stats.fetched = source_page.records.len();

                for record in source_page.records {
                    match normalize(record, policy) {
                        Ok(item) => {
                            if seen.insert(item.id.clone()) {
                                page.items.push(item);
                            } else {
                                stats.deduplicated += 1;
                            }
                        }
                        Err(reason) => {
                            stats.rejected += 1;
                            log_reject(&sid, &reason);
                        }
                    }
                }
                page.cursors.insert(sid, source_page.next_cursor);
            }
        }

        page.stats.push(stats);
    }

    if attempted > 0 && failed == attempted {
        return Err(FeedError::PageUnavailable);
    }

    tracing::debug!(
        items = page.items.len(),
        sources = page.stats.len(),
        "aggregated page assembled"
    );

    Ok(page)
}

fn log_reject(source: &str, reason: &RejectReason) {
    tracing::debug!(source = %source, reason = ?reason, "record rejected");
}
