pub mod discover;
pub mod portfolio;
pub mod types;

use crate::feed::types::{Cursor, FilterConfig};
use anyhow::Result;
use async_trait::async_trait;
use types::RawRecord;

/// One page from a single backing store.
#[derive(Debug, Default)]
pub struct SourcePage {
    pub records: Vec<RawRecord>,
    /// `None` means the store has nothing past this page.
    pub next_cursor: Option<Cursor>,
}

/// A backing collection the aggregator can page through. Implementations own
/// their cursor format; callers treat cursors as opaque strings.
#[async_trait]
pub trait ItemSource: Send + Sync {
    fn id(&self) -> &str;

    async fn fetch_page(
        &mut self,
        filters: &FilterConfig,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<SourcePage>;
}
