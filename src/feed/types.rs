use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

/// Canonical feed item, provider-agnostic. Immutable once produced by the
/// normalizer for a given fetch; re-ranking reorders items, it never rewrites
/// their fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub id: String,
    pub kind: ItemKind,
    pub media: MediaRef,
    pub author: AuthorRef,
    pub engagement: EngagementCounters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub flags: ItemFlags,
    pub tags: BTreeSet<String>,
    /// List price in major units, when the item is offered for sale.
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Image,
    Video,
    Ad,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaRef {
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub poster_url: Option<String>,
}

impl MediaRef {
    pub fn is_empty(&self) -> bool {
        self.image_url.is_none() && self.video_url.is_none() && self.poster_url.is_none()
    }

    /// The URL a tile displays first: poster for videos, else the image.
    pub fn display_url(&self) -> Option<&str> {
        self.poster_url
            .as_deref()
            .or(self.image_url.as_deref())
            .or(self.video_url.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorRef {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngagementCounters {
    pub likes: u32,
    pub comments: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemFlags {
    pub for_sale: bool,
    pub sold: bool,
    pub ai_assisted: bool,
}

/// Source identifier, matching `ItemSource::id()`.
pub type SourceId = String;

/// Opaque pagination pointer. Produced and interpreted only by the source
/// that returned it.
pub type Cursor = String;

/// Result of one fetch cycle across all sources. `cursors[s] = None` means
/// source `s` is exhausted.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub cursors: HashMap<SourceId, Option<Cursor>>,
    pub has_more: bool,
}

/// Query shape passed down to every source. Sources use it as a query hint;
/// the normalizer enforces it item by item.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    /// Only surface records published to the author's portfolio.
    pub portfolio_only: bool,
    /// Restrict to records carrying any of these tags (empty = no restriction).
    pub tags: Vec<String>,
}
