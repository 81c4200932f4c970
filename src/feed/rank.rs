//! Scoring and ordering for items that have not been displayed yet.
//!
//! Two strategies: engagement-weighted scoring once counters are available
//! for a meaningful share of the batch, and a recency fallback that simply
//! favors followed authors. Both are followed by an author-spacing pass so
//! one prolific author cannot occupy a run of consecutive tiles.

use crate::feed::types::{EngagementCounters, FeedItem};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMode {
    Engagement,
    Recency,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Hours for the time-decay denominator: score halves at this age.
    pub half_life_hours: f64,
    /// Comments count this many times a like.
    pub comment_weight: f64,
    /// Fixed additive boost for followed authors in engagement mode.
    pub follow_bonus: f64,
    /// Minimum positions between two items by the same author.
    pub min_author_gap: usize,
    /// Engagement mode engages once at least this fraction of the batch has
    /// counters from the engagement index.
    pub engagement_coverage_min: f64,
    /// "auto", "engagement", or "recency".
    pub mode: String,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            half_life_hours: 24.0,
            comment_weight: 2.0,
            follow_bonus: 0.5,
            min_author_gap: 3,
            engagement_coverage_min: 0.3,
            mode: "auto".to_string(),
        }
    }
}

/// Pick a strategy for this batch based on engagement-index coverage.
pub fn select_mode(
    items: &[FeedItem],
    overlay: &HashMap<String, EngagementCounters>,
    cfg: &RankingConfig,
) -> RankMode {
    match cfg.mode.as_str() {
        "engagement" => return RankMode::Engagement,
        "recency" => return RankMode::Recency,
        _ => {}
    }
    if items.is_empty() {
        return RankMode::Recency;
    }
    let covered = items.iter().filter(|i| overlay.contains_key(&i.id)).count();
    let coverage = covered as f64 / items.len() as f64;
    if coverage >= cfg.engagement_coverage_min {
        RankMode::Engagement
    } else {
        RankMode::Recency
    }
}

/// Order a batch of not-yet-displayed items. Returns the mode actually used.
pub fn rank(
    mut items: Vec<FeedItem>,
    overlay: &HashMap<String, EngagementCounters>,
    followed: &HashSet<String>,
    now: DateTime<Utc>,
    cfg: &RankingConfig,
) -> (RankMode, Vec<FeedItem>) {
    let mode = select_mode(&items, overlay, cfg);

    match mode {
        RankMode::Engagement => {
            let mut scored: Vec<(FeedItem, f64)> = items
                .drain(..)
                .map(|item| {
                    let score = engagement_score(&item, overlay, followed, now, cfg);
                    (item, score)
                })
                .collect();
            scored.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.0.created_at.cmp(&a.0.created_at))
                    .then_with(|| a.0.id.cmp(&b.0.id))
            });
            items = scored.into_iter().map(|(item, _)| item).collect();
        }
        RankMode::Recency => {
            items.sort_by(|a, b| {
                let a_followed = followed.contains(&a.author.id);
                let b_followed = followed.contains(&b.author.id);
                b_followed
                    .cmp(&a_followed)
                    .then_with(|| b.created_at.cmp(&a.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
    }

    (mode, space_out_authors(items, cfg.min_author_gap))
}

/// Weighted combination of recency decay, counters, and a follow boost.
fn engagement_score(
    item: &FeedItem,
    overlay: &HashMap<String, EngagementCounters>,
    followed: &HashSet<String>,
    now: DateTime<Utc>,
    cfg: &RankingConfig,
) -> f64 {
    let counters = overlay.get(&item.id).copied().unwrap_or(item.engagement);

    let age_hours = (now - item.created_at).num_minutes().max(0) as f64 / 60.0;
    let time_decay = 1.0 / (1.0 + age_hours / cfg.half_life_hours);

    let engagement =
        counters.likes as f64 + cfg.comment_weight * counters.comments as f64;
    let boost = 1.0 + (1.0 + engagement).ln();

    let mut score = time_decay * boost;
    if followed.contains(&item.author.id) {
        score += cfg.follow_bonus;
    }
    score
}

/// Demote items whose author appeared within the previous `min_gap`
/// positions, reinserting them at the next position where the spacing
/// holds. Items are never dropped; when the remaining tail is a single
/// author the run is emitted as-is. Running the pass on its own output
/// leaves it unchanged.
pub fn space_out_authors(items: Vec<FeedItem>, min_gap: usize) -> Vec<FeedItem> {
    if min_gap == 0 {
        return items;
    }

    let conflicts = |out: &[FeedItem], author: &str| {
        out.iter().rev().take(min_gap).any(|it| it.author.id == author)
    };

    let mut out: Vec<FeedItem> = Vec::with_capacity(items.len());
    let mut deferred: VecDeque<FeedItem> = VecDeque::new();
    let mut input: VecDeque<FeedItem> = items.into();

    loop {
        // Longest-waiting demoted item that fits here goes first.
        if let Some(pos) = deferred
            .iter()
            .position(|it| !conflicts(&out, &it.author.id))
        {
            let item = deferred.remove(pos).expect("position came from iter");
            out.push(item);
            continue;
        }
        match input.pop_front() {
            Some(item) => {
                if conflicts(&out, &item.author.id) {
                    deferred.push_back(item);
                } else {
                    out.push(item);
                }
            }
            None => match deferred.pop_front() {
                Some(item) => out.push(item),
                None => break,
            },
        }
    }

    out
}
