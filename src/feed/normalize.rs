//! Mapping from raw backend records into the canonical item model.
//!
//! Normalization is a pure classification: a record either maps to a
//! `FeedItem` or is rejected with a reason. Rejections are counted by the
//! aggregator for diagnostics and never propagate as errors.

use crate::feed::types::{
    AuthorRef, EngagementCounters, FeedItem, ItemFlags, ItemKind, MediaRef,
};
use crate::source::types::{DiscoverRecord, LegacyArtworkRecord, PortfolioRecord, RawRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Why a record was excluded from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// No usable media reference at all.
    MissingMedia,
    /// Record is of a type that never belongs in the feed (event, product).
    NonFeedKind(String),
    /// Display image is hosted on a banned stock-photo domain.
    BannedImageHost(String),
    /// Record is not portfolio-visible while only portfolio items were requested.
    NotPortfolio,
}

#[derive(Debug, Clone)]
pub struct NormalizePolicy {
    pub banned_image_hosts: Vec<String>,
    pub portfolio_only: bool,
    /// Prices above this are assumed to be stored in minor units and are
    /// divided by 100. This is a known data-quality workaround for mixed
    /// legacy rows, not a guarantee; the threshold is configurable because
    /// upstream intent is ambiguous.
    pub minor_units_threshold: f64,
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        Self {
            banned_image_hosts: Vec::new(),
            portfolio_only: false,
            minor_units_threshold: 1000.0,
        }
    }
}

pub fn normalize(record: RawRecord, policy: &NormalizePolicy) -> Result<FeedItem, RejectReason> {
    match record {
        RawRecord::Portfolio(r) => normalize_portfolio(r, policy),
        RawRecord::Discover(r) => normalize_discover(r, policy),
        RawRecord::LegacyArtwork(r) => normalize_legacy(r, policy),
    }
}

fn normalize_portfolio(
    r: PortfolioRecord,
    policy: &NormalizePolicy,
) -> Result<FeedItem, RejectReason> {
    if r.record_type != "artwork" {
        return Err(RejectReason::NonFeedKind(r.record_type));
    }
    if policy.portfolio_only && r.visibility != "portfolio" {
        return Err(RejectReason::NotPortfolio);
    }

    let media = MediaRef {
        image_url: r.image_url,
        video_url: r.video_url,
        poster_url: r.poster_url,
    };
    let kind = classify_media(&media)?;
    check_banned_host(&media, policy)?;

    let created_at = parse_rfc3339(&r.created_at);
    let updated_at = r
        .updated_at
        .as_deref()
        .map(parse_rfc3339)
        .unwrap_or(created_at);

    Ok(FeedItem {
        id: r.id,
        kind,
        media,
        author: AuthorRef {
            id: r.artist.id,
            display_name: r.artist.name,
            avatar_url: r.artist.avatar_url,
        },
        engagement: EngagementCounters {
            likes: r.like_count,
            comments: r.comment_count,
        },
        created_at,
        updated_at,
        flags: ItemFlags {
            for_sale: r.for_sale,
            sold: r.sold,
            ai_assisted: r.ai_assisted,
        },
        tags: r.tags.into_iter().collect(),
        price: normalize_price(r.price, policy.minor_units_threshold),
    })
}

fn normalize_discover(
    r: DiscoverRecord,
    policy: &NormalizePolicy,
) -> Result<FeedItem, RejectReason> {
    let media = MediaRef {
        image_url: r.media.image,
        video_url: r.media.video,
        poster_url: r.media.thumb,
    };

    let kind = match r.media_kind.as_str() {
        "ad" => {
            if media.is_empty() {
                return Err(RejectReason::MissingMedia);
            }
            ItemKind::Ad
        }
        // A declared video needs a direct locator or a poster to derive one.
        "video" => {
            if media.video_url.is_none() && media.poster_url.is_none() {
                return Err(RejectReason::MissingMedia);
            }
            ItemKind::Video
        }
        _ => classify_media(&media)?,
    };
    check_banned_host(&media, policy)?;

    let published = DateTime::from_timestamp_millis(r.published_at).unwrap_or(DateTime::UNIX_EPOCH);

    Ok(FeedItem {
        id: r.item_id,
        kind,
        media,
        author: AuthorRef {
            id: r.creator_id,
            display_name: r.creator_name,
            avatar_url: r.creator_avatar,
        },
        engagement: EngagementCounters {
            likes: r.stats.likes,
            comments: r.stats.comments,
        },
        created_at: published,
        updated_at: published,
        flags: ItemFlags {
            for_sale: r.for_sale,
            sold: r.sold,
            ai_assisted: r.ai_generated,
        },
        tags: r.labels.into_iter().collect(),
        price: normalize_price(r.listed_price, policy.minor_units_threshold),
    })
}

fn normalize_legacy(
    r: LegacyArtworkRecord,
    policy: &NormalizePolicy,
) -> Result<FeedItem, RejectReason> {
    let media = MediaRef {
        image_url: r.img,
        video_url: None,
        poster_url: None,
    };
    if media.is_empty() {
        return Err(RejectReason::MissingMedia);
    }
    check_banned_host(&media, policy)?;

    let created = DateTime::from_timestamp(r.created, 0).unwrap_or(DateTime::UNIX_EPOCH);
    let price = normalize_price(r.price, policy.minor_units_threshold);

    Ok(FeedItem {
        id: format!("legacy-{}", r.artwork_id),
        kind: ItemKind::Image,
        media,
        author: AuthorRef {
            id: r
                .artist_id
                .map(|id| format!("legacy-artist-{}", id))
                .unwrap_or_else(|| format!("legacy-artist-{}", slug(&r.artist_name))),
            display_name: r.artist_name,
            avatar_url: None,
        },
        engagement: EngagementCounters::default(),
        created_at: created,
        updated_at: created,
        flags: ItemFlags {
            for_sale: price.is_some() && !r.is_sold,
            sold: r.is_sold,
            ai_assisted: false,
        },
        tags: BTreeSet::new(),
        price,
    })
}

fn classify_media(media: &MediaRef) -> Result<ItemKind, RejectReason> {
    if media.video_url.is_some() {
        return Ok(ItemKind::Video);
    }
    if media.image_url.is_some() || media.poster_url.is_some() {
        return Ok(ItemKind::Image);
    }
    Err(RejectReason::MissingMedia)
}

fn check_banned_host(media: &MediaRef, policy: &NormalizePolicy) -> Result<(), RejectReason> {
    let Some(url) = media.display_url() else {
        return Ok(());
    };
    let Some(host) = host_of(url) else {
        return Ok(());
    };
    for banned in &policy.banned_image_hosts {
        if host == *banned || host.ends_with(&format!(".{}", banned)) {
            return Err(RejectReason::BannedImageHost(host.to_string()));
        }
    }
    Ok(())
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, r)| r)?;
    let host = rest.split(['/', '?']).next()?;
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Minor-units heuristic. See `NormalizePolicy::minor_units_threshold`.
fn normalize_price(price: Option<f64>, threshold: f64) -> Option<f64> {
    price.map(|p| if p > threshold { p / 100.0 } else { p })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}
