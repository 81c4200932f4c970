use serde::Deserialize;

/// Raw records as returned by the backing stores, before normalization.
/// One variant per backend schema; the normalizer owns the mapping from each
/// variant into the canonical item model.

#[derive(Debug, Clone)]
pub enum RawRecord {
    Portfolio(PortfolioRecord),
    Discover(DiscoverRecord),
    LegacyArtwork(LegacyArtworkRecord),
}

impl RawRecord {
    /// Stable identity key used for cross-source de-duplication.
    pub fn id(&self) -> String {
        match self {
            RawRecord::Portfolio(r) => r.id.clone(),
            RawRecord::Discover(r) => r.item_id.clone(),
            RawRecord::LegacyArtwork(r) => format!("legacy-{}", r.artwork_id),
        }
    }
}

// ── Portfolio API response types ──────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PortfolioResponse {
    #[serde(default)]
    pub entries: Vec<PortfolioEntry>,
    #[serde(default)]
    pub has_more: bool,
}

/// The portfolio collection still serves rows written by the previous
/// backend alongside current ones; the two shapes share no required fields,
/// so an untagged enum sorts them out at parse time.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortfolioEntry {
    Current(PortfolioRecord),
    Legacy(LegacyArtworkRecord),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioRecord {
    pub id: String,
    /// "artwork", "event", "product". Only artworks belong in the feed.
    #[serde(default = "default_record_type")]
    pub record_type: String,
    /// "portfolio" or "unlisted".
    #[serde(default = "default_visibility")]
    pub visibility: String,
    pub artist: PortfolioArtist,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub comment_count: u32,
    /// RFC3339.
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub for_sale: bool,
    #[serde(default)]
    pub sold: bool,
    #[serde(default)]
    pub ai_assisted: bool,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_record_type() -> String {
    "artwork".to_string()
}

fn default_visibility() -> String {
    "portfolio".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioArtist {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Rows from the pre-migration artwork table. Epoch-seconds timestamps,
/// numeric ids, and a price column of unrecorded unit.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyArtworkRecord {
    pub artwork_id: u64,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub artist_id: Option<u64>,
    #[serde(default)]
    pub img: Option<String>,
    /// Epoch seconds.
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub is_sold: bool,
    #[serde(default)]
    pub price: Option<f64>,
}

// ── Discover API response types ───────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResponse {
    #[serde(default)]
    pub items: Vec<DiscoverRecord>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverRecord {
    pub item_id: String,
    /// "image", "video", "ad".
    #[serde(default = "default_media_kind")]
    pub media_kind: String,
    #[serde(default)]
    pub media: DiscoverMedia,
    pub creator_id: String,
    #[serde(default)]
    pub creator_name: String,
    #[serde(default)]
    pub creator_avatar: Option<String>,
    #[serde(default)]
    pub stats: DiscoverStats,
    /// Epoch milliseconds.
    #[serde(default)]
    pub published_at: i64,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub for_sale: bool,
    #[serde(default)]
    pub sold: bool,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default)]
    pub listed_price: Option<f64>,
}

fn default_media_kind() -> String {
    "image".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverMedia {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverStats {
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub comments: u32,
}
