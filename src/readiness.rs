//! Loading-overlay dismissal and per-tile media retry.
//!
//! The gate watches the first screenful of merged items and dismisses the
//! overlay when enough of their media has settled, or unconditionally once
//! the hard timeout passes ("show whatever loaded"). Media errors retry on
//! a bounded backoff schedule; a tile that exhausts its attempts settles as
//! given-up so one dead image cannot hold the overlay open.

use crate::feed::types::{FeedItem, ItemKind};
use rand::Rng;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// How many leading items make up the first screen. Device-dependent;
    /// the presentation layer supplies it.
    pub first_screen_items: usize,
    /// Minimum number of merged items before the overlay may dismiss.
    pub min_items: usize,
    /// Fraction of each media total that must be settled.
    pub ready_ratio: f64,
    /// After this long the overlay dismisses regardless of readiness.
    pub hard_timeout_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            first_screen_items: 24,
            min_items: 10,
            ready_ratio: 0.9,
            hard_timeout_ms: 8_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expectation {
    Image,
    Poster,
}

#[derive(Debug)]
pub struct ReadinessGate {
    cfg: ReadinessConfig,
    opened_at: Option<Instant>,
    expectations: HashMap<String, Expectation>,
    settled: HashSet<String>,
    items_present: usize,
    revealed: bool,
}

impl ReadinessGate {
    pub fn new(cfg: ReadinessConfig) -> Self {
        Self {
            cfg,
            opened_at: None,
            expectations: HashMap::new(),
            settled: HashSet::new(),
            items_present: 0,
            revealed: false,
        }
    }

    /// Recompute the watched set from the first screenful of the merged
    /// list. The timeout clock starts at the first call.
    pub fn track(&mut self, merged: &[FeedItem], now: Instant) {
        self.opened_at.get_or_insert(now);
        self.items_present = merged.len();
        for item in merged.iter().take(self.cfg.first_screen_items) {
            let expectation = match item.kind {
                ItemKind::Video => Expectation::Poster,
                ItemKind::Image | ItemKind::Ad => Expectation::Image,
            };
            self.expectations.entry(item.id.clone()).or_insert(expectation);
        }
    }

    pub fn on_media_ready(&mut self, id: &str) {
        if self.expectations.contains_key(id) {
            self.settled.insert(id.to_string());
        }
    }

    /// A tile's media retries ran out; count the slot as settled.
    pub fn on_media_gave_up(&mut self, id: &str) {
        if self.expectations.contains_key(id) {
            self.settled.insert(id.to_string());
        }
    }

    /// Latching readiness query.
    pub fn is_ready(&mut self, now: Instant) -> bool {
        if self.revealed {
            return true;
        }
        let Some(opened) = self.opened_at else {
            return false;
        };

        if now.duration_since(opened) >= Duration::from_millis(self.cfg.hard_timeout_ms) {
            tracing::debug!("readiness hard timeout elapsed, revealing");
            self.revealed = true;
            return true;
        }

        if self.items_present < self.cfg.min_items {
            return false;
        }

        let (images_total, images_settled, posters_total, posters_settled) = self.counts();
        if ratio_met(images_settled, images_total, self.cfg.ready_ratio)
            && ratio_met(posters_settled, posters_total, self.cfg.ready_ratio)
        {
            self.revealed = true;
        }
        self.revealed
    }

    /// (images total, images settled, posters total, posters settled).
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let mut totals = (0usize, 0usize);
        let mut settled = (0usize, 0usize);
        for (id, expectation) in &self.expectations {
            let done = self.settled.contains(id);
            match expectation {
                Expectation::Image => {
                    totals.0 += 1;
                    if done {
                        settled.0 += 1;
                    }
                }
                Expectation::Poster => {
                    totals.1 += 1;
                    if done {
                        settled.1 += 1;
                    }
                }
            }
        }
        (totals.0, settled.0, totals.1, settled.1)
    }
}

fn ratio_met(settled: usize, total: usize, ratio: f64) -> bool {
    if total == 0 {
        return true;
    }
    settled as f64 / total as f64 >= ratio
}

// ── Media retry ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Uniform random extra, spreading simultaneous retries apart.
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 400,
            max_delay_ms: 5_000,
            jitter_ms: 150,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDisposition {
    RetryAt(Instant),
    GaveUp,
}

/// Per-tile error bookkeeping against the bounded backoff schedule.
#[derive(Debug)]
pub struct MediaTracker {
    cfg: RetryConfig,
    attempts: HashMap<String, u32>,
}

impl MediaTracker {
    pub fn new(cfg: RetryConfig) -> Self {
        Self {
            cfg,
            attempts: HashMap::new(),
        }
    }

    /// Record a load error. Either schedules the next attempt or declares
    /// the tile terminally failed.
    pub fn on_error(&mut self, id: &str, now: Instant) -> MediaDisposition {
        let attempt = self.attempts.entry(id.to_string()).or_insert(0);
        *attempt += 1;
        if *attempt >= self.cfg.max_attempts {
            tracing::debug!(tile = %id, attempts = *attempt, "media retries exhausted");
            return MediaDisposition::GaveUp;
        }
        let backoff = self
            .cfg
            .base_delay_ms
            .saturating_mul(1u64 << (*attempt - 1).min(16))
            .min(self.cfg.max_delay_ms);
        let jitter = if self.cfg.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..self.cfg.jitter_ms)
        } else {
            0
        };
        MediaDisposition::RetryAt(now + Duration::from_millis(backoff + jitter))
    }

    /// Successful load clears the error history.
    pub fn on_success(&mut self, id: &str) {
        self.attempts.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::testutil::item;
    use crate::feed::types::ItemKind;

    fn gate(first_screen: usize, min_items: usize, timeout_ms: u64) -> ReadinessGate {
        ReadinessGate::new(ReadinessConfig {
            first_screen_items: first_screen,
            min_items,
            ready_ratio: 0.9,
            hard_timeout_ms: timeout_ms,
        })
    }

    #[test]
    fn test_reveals_at_ninety_percent() {
        let items: Vec<_> = (0..45).map(|i| item(&format!("i{i}"), "a", i)).collect();
        let mut g = gate(45, 10, 60_000);
        let t0 = Instant::now();
        g.track(&items, t0);

        for i in 0..40 {
            g.on_media_ready(&format!("i{i}"));
        }
        assert!(!g.is_ready(t0 + Duration::from_millis(100)));

        g.on_media_ready("i40");
        // 41/45 > 0.9
        assert!(g.is_ready(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn test_hard_timeout_reveals_regardless() {
        let items: Vec<_> = (0..45).map(|i| item(&format!("i{i}"), "a", i)).collect();
        let mut g = gate(45, 10, 3_000);
        let t0 = Instant::now();
        g.track(&items, t0);
        for i in 0..10 {
            g.on_media_ready(&format!("i{i}"));
        }
        assert!(!g.is_ready(t0 + Duration::from_millis(2_900)));
        assert!(g.is_ready(t0 + Duration::from_secs(4)));
    }

    #[test]
    fn test_minimum_item_count_gates_reveal() {
        let items: Vec<_> = (0..5).map(|i| item(&format!("i{i}"), "a", i)).collect();
        let mut g = gate(24, 10, 60_000);
        let t0 = Instant::now();
        g.track(&items, t0);
        for i in 0..5 {
            g.on_media_ready(&format!("i{i}"));
        }
        // Everything settled but too few items on screen.
        assert!(!g.is_ready(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_videos_count_against_poster_total() {
        let mut items: Vec<_> = (0..10).map(|i| item(&format!("i{i}"), "a", i)).collect();
        items[0].kind = ItemKind::Video;
        items[1].kind = ItemKind::Video;

        let mut g = gate(24, 1, 60_000);
        g.track(&items, Instant::now());
        let (images_total, _, posters_total, _) = g.counts();
        assert_eq!(images_total, 8);
        assert_eq!(posters_total, 2);
    }

    #[test]
    fn test_gave_up_counts_as_settled() {
        let items: Vec<_> = (0..10).map(|i| item(&format!("i{i}"), "a", i)).collect();
        let mut g = gate(24, 1, 60_000);
        let t0 = Instant::now();
        g.track(&items, t0);
        for i in 0..9 {
            g.on_media_ready(&format!("i{i}"));
        }
        assert!(!g.is_ready(t0 + Duration::from_millis(10)));
        g.on_media_gave_up("i9");
        assert!(g.is_ready(t0 + Duration::from_millis(20)));
    }

    #[test]
    fn test_readiness_latches() {
        let items: Vec<_> = (0..10).map(|i| item(&format!("i{i}"), "a", i)).collect();
        let mut g = gate(24, 1, 1_000);
        let t0 = Instant::now();
        g.track(&items, t0);
        assert!(g.is_ready(t0 + Duration::from_secs(2)));
        // Later merges never re-hide the content.
        let more: Vec<_> = (0..50).map(|i| item(&format!("j{i}"), "b", i)).collect();
        g.track(&more, t0 + Duration::from_secs(3));
        assert!(g.is_ready(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn test_retry_schedule_backs_off_then_gives_up() {
        let mut tracker = MediaTracker::new(RetryConfig {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 5_000,
            jitter_ms: 0,
        });
        let t0 = Instant::now();

        let first = tracker.on_error("x", t0);
        assert_eq!(first, MediaDisposition::RetryAt(t0 + Duration::from_millis(100)));
        let second = tracker.on_error("x", t0);
        assert_eq!(second, MediaDisposition::RetryAt(t0 + Duration::from_millis(200)));
        let third = tracker.on_error("x", t0);
        assert_eq!(third, MediaDisposition::GaveUp);
    }

    #[test]
    fn test_retry_success_resets_history() {
        let mut tracker = MediaTracker::new(RetryConfig {
            max_attempts: 2,
            base_delay_ms: 100,
            max_delay_ms: 5_000,
            jitter_ms: 0,
        });
        let t0 = Instant::now();
        tracker.on_error("x", t0);
        tracker.on_success("x");
        assert!(matches!(
            tracker.on_error("x", t0),
            MediaDisposition::RetryAt(_)
        ));
    }
}
