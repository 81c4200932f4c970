//! The feed session: one mounted discovery view.
//!
//! Owns the display state, per-source cursors, the pagination controller,
//! the layout engine and the readiness gate, and wires them together behind
//! the surface the presentation layer consumes. All display-state mutation
//! funnels through here; nothing else holds a reference to it.

use crate::config::Config;
use crate::error::FeedError;
use crate::feed::aggregate::{self, AggregatorConfig};
use crate::feed::merge::DisplayState;
use crate::feed::normalize::NormalizePolicy;
use crate::feed::pagination::{LoadReject, PaginationController};
use crate::feed::rank::{rank, RankMode, RankingConfig};
use crate::feed::types::{Cursor, EngagementCounters, FeedItem, FeedPage, FilterConfig, SourceId};
use crate::layout::MasonryEngine;
use crate::readiness::{MediaDisposition, MediaTracker, ReadinessConfig, ReadinessGate};
use crate::social::{EngagementIndex, FollowGraph};
use crate::source::ItemSource;
use chrono::Utc;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// What a load trigger produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded {
        appended: usize,
        total: usize,
        mode: RankMode,
    },
    /// Trigger arrived inside the cooldown window; no fetch happened.
    CoolingDown,
    /// A load is already in flight.
    AlreadyLoading,
    /// Every source reported a dead cursor and the last page was empty.
    Exhausted,
    /// The fetch completed but its ticket had been superseded; the page
    /// was discarded.
    Superseded,
}

pub struct FeedSession {
    aggregator_cfg: AggregatorConfig,
    ranking_cfg: RankingConfig,
    readiness_cfg: ReadinessConfig,
    banned_image_hosts: Vec<String>,
    minor_units_threshold: f64,
    engagement_timeout_ms: u64,

    sources: Vec<Box<dyn ItemSource>>,
    follow_graph: Box<dyn FollowGraph>,
    engagement: Box<dyn EngagementIndex>,

    filters: FilterConfig,
    display: DisplayState,
    cursors: HashMap<SourceId, Option<Cursor>>,
    last_page: FeedPage,
    controller: PaginationController,
    layout: MasonryEngine,
    gate: ReadinessGate,
    media: MediaTracker,
}

impl FeedSession {
    pub fn new(
        cfg: &Config,
        sources: Vec<Box<dyn ItemSource>>,
        follow_graph: Box<dyn FollowGraph>,
        engagement: Box<dyn EngagementIndex>,
    ) -> Self {
        Self {
            aggregator_cfg: cfg.aggregator.clone(),
            ranking_cfg: cfg.ranking.clone(),
            readiness_cfg: cfg.readiness.clone(),
            banned_image_hosts: cfg.normalize.banned_image_hosts.clone(),
            minor_units_threshold: cfg.normalize.minor_units_threshold,
            engagement_timeout_ms: cfg.engagement_timeout_ms,
            sources,
            follow_graph,
            engagement,
            filters: FilterConfig::default(),
            display: DisplayState::default(),
            cursors: HashMap::new(),
            last_page: FeedPage::default(),
            controller: PaginationController::new(cfg.pagination.clone()),
            layout: MasonryEngine::new(cfg.layout.clone(), cfg.viewport_width),
            gate: ReadinessGate::new(cfg.readiness.clone()),
            media: MediaTracker::new(cfg.media_retry.clone()),
        }
    }

    /// Start a fresh session with new filters. Display state, cursors and
    /// the readiness clock all reset; the first page loads immediately.
    pub async fn load_initial(&mut self, filters: FilterConfig) -> Result<LoadOutcome, FeedError> {
        self.filters = filters;
        self.display = DisplayState::default();
        self.cursors.clear();
        self.last_page = FeedPage::default();
        self.controller.reset();
        self.gate = ReadinessGate::new(self.readiness_cfg.clone());
        self.load_more_at(Instant::now()).await
    }

    pub async fn load_more(&mut self) -> Result<LoadOutcome, FeedError> {
        self.load_more_at(Instant::now()).await
    }

    /// Load trigger with an explicit clock, so cooldown and watchdog
    /// behavior can be driven in tests.
    pub async fn load_more_at(&mut self, now: Instant) -> Result<LoadOutcome, FeedError> {
        let ticket = match self.controller.try_begin(now) {
            Ok(ticket) => ticket,
            Err(LoadReject::CoolingDown) => return Ok(LoadOutcome::CoolingDown),
            Err(LoadReject::AlreadyLoading) => return Ok(LoadOutcome::AlreadyLoading),
            Err(LoadReject::Exhausted) => return Ok(LoadOutcome::Exhausted),
        };

        let policy = NormalizePolicy {
            banned_image_hosts: self.banned_image_hosts.clone(),
            portfolio_only: self.filters.portfolio_only,
            minor_units_threshold: self.minor_units_threshold,
        };

        let page = match aggregate::fetch_page(
            &mut self.sources,
            &self.filters,
            &self.cursors,
            &policy,
            &self.aggregator_cfg,
        )
        .await
        {
            Ok(page) => page,
            Err(err) => {
                self.controller.fail(ticket);
                return Err(err);
            }
        };

        let applied = self.controller.complete(
            ticket,
            page.any_live_cursor(),
            page.items.len(),
            page.requested,
        );
        if !applied {
            tracing::debug!("fetch superseded, dropping page");
            return Ok(LoadOutcome::Superseded);
        }
        self.cursors.extend(page.cursors);
        self.last_page = FeedPage {
            items: page.items,
            cursors: self.cursors.clone(),
            has_more: !self.controller.is_exhausted(),
        };

        // Items already on screen stay exactly where they are; only the
        // rest get scored and appended.
        let (_, fresh) = self.display.partition_new(self.last_page.items.clone());
        let overlay = self.engagement_overlay(&fresh).await;
        let followed = self.follow_graph.followed_author_ids();
        let (mode, ranked) = rank(fresh, &overlay, &followed, Utc::now(), &self.ranking_cfg);
        let appended = self.display.absorb(ranked);

        self.layout.relayout(&self.display.ordered_items);
        self.display.slots = self.layout.layout().slots.clone();
        self.gate.track(&self.display.ordered_items, now);

        tracing::info!(
            appended,
            total = self.display.len(),
            mode = ?mode,
            has_more = !self.controller.is_exhausted(),
            "page merged"
        );

        if appended == 0 && self.controller.is_exhausted() {
            return Ok(LoadOutcome::Exhausted);
        }
        Ok(LoadOutcome::Loaded {
            appended,
            total: self.display.len(),
            mode,
        })
    }

    /// Best-effort engagement counters, bounded so a slow index can never
    /// hold up a page.
    async fn engagement_overlay(
        &self,
        items: &[FeedItem],
    ) -> HashMap<String, EngagementCounters> {
        if items.is_empty() {
            return HashMap::new();
        }
        let ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
        let budget = Duration::from_millis(self.engagement_timeout_ms);
        match tokio::time::timeout(budget, self.engagement.get(&ids)).await {
            Ok(map) => map,
            Err(_) => {
                tracing::debug!("engagement index timed out, ranking without counters");
                HashMap::new()
            }
        }
    }

    pub fn current_layout(&self) -> &DisplayState {
        &self.display
    }

    /// Result of the most recent fetch cycle: the items it carried, the
    /// cursor state after it, and whether more is available.
    pub fn last_page(&self) -> &FeedPage {
        &self.last_page
    }

    pub fn has_more(&self) -> bool {
        !self.controller.is_exhausted()
    }

    pub fn is_ready(&mut self, now: Instant) -> bool {
        self.gate.is_ready(now)
    }

    /// One-shot recoverable notice from the stuck-load watchdog.
    pub fn take_stuck_notice(&mut self) -> Option<FeedError> {
        self.controller.take_stuck_notice()
    }

    // ── Rendering-layer signals ──────────────────────────────────────

    pub fn on_media_ready(&mut self, id: &str) {
        self.media.on_success(id);
        self.gate.on_media_ready(id);
    }

    /// Returns when (or whether) the tile should retry its media load.
    pub fn on_media_error(&mut self, id: &str, now: Instant) -> MediaDisposition {
        let disposition = self.media.on_error(id, now);
        if disposition == MediaDisposition::GaveUp {
            self.gate.on_media_gave_up(id);
        }
        disposition
    }

    pub fn on_tile_size_change(&mut self, id: &str, height: f32, now: Instant) {
        self.layout.on_size_change(id, height, now);
    }

    pub fn set_viewport_width(&mut self, width: f32, now: Instant) {
        self.layout.set_viewport_width(width, now);
    }

    /// Drive due debounced work (layout reflow). Returns true when tile
    /// positions changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let reflowed = self.layout.poll_reflow(&self.display.ordered_items, now);
        if reflowed {
            self.display.slots = self.layout.layout().slots.clone();
        }
        reflowed
    }
}
