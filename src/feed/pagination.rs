//! Load-cycle state machine: cooldown, stuck-load watchdog, ticketing, and
//! the end-of-stream decision.
//!
//! Triggers arrive from the layout sentinel and from manual refresh, often
//! together; the cooldown window absorbs the duplicates. Every accepted
//! trigger gets a ticket, and results are only applied when their ticket is
//! still current — a superseded fetch is dropped on completion, not acted
//! upon.

use crate::error::FeedError;
use serde::Deserialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Minimum spacing between accepted load triggers.
    pub cooldown_ms: u64,
    /// A load older than this is declared stuck and force-reset.
    pub watchdog_ceiling_ms: u64,
    /// A cursor-less page at or above this fraction of the requested size
    /// keeps the stream alive. Carried over from the previous system as a
    /// tunable; 0.0 recovers the maximally conservative policy of only
    /// declaring exhaustion on an empty page.
    pub partial_page_keep_ratio: f64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 500,
            watchdog_ceiling_ms: 30_000,
            partial_page_keep_ratio: 0.5,
        }
    }
}

/// Why a trigger was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadReject {
    CoolingDown,
    AlreadyLoading,
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Loading { since: Instant, ticket: u64 },
}

#[derive(Debug)]
pub struct PaginationController {
    cfg: PaginationConfig,
    phase: Phase,
    last_trigger: Option<Instant>,
    exhausted: bool,
    next_ticket: u64,
    stuck_notice: Option<FeedError>,
}

impl PaginationController {
    pub fn new(cfg: PaginationConfig) -> Self {
        Self {
            cfg,
            phase: Phase::Idle,
            last_trigger: None,
            exhausted: false,
            next_ticket: 0,
            stuck_notice: None,
        }
    }

    /// Accept or reject a load trigger. On acceptance the controller moves
    /// to Loading and hands back the ticket the eventual completion must
    /// present.
    pub fn try_begin(&mut self, now: Instant) -> Result<u64, LoadReject> {
        if let Phase::Loading { since, ticket } = self.phase {
            let elapsed = now.duration_since(since);
            if elapsed < Duration::from_millis(self.cfg.watchdog_ceiling_ms) {
                return Err(LoadReject::AlreadyLoading);
            }
            // Watchdog: the in-flight load is presumed dead. Reset so the
            // surface can offer a retry instead of spinning forever.
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                ticket,
                "load watchdog fired, resetting stuck load"
            );
            self.stuck_notice = Some(FeedError::LoadStuck {
                elapsed_ms: elapsed.as_millis() as u64,
            });
            self.phase = Phase::Idle;
        }

        if self.exhausted {
            return Err(LoadReject::Exhausted);
        }

        if let Some(last) = self.last_trigger {
            if now.duration_since(last) < Duration::from_millis(self.cfg.cooldown_ms) {
                return Err(LoadReject::CoolingDown);
            }
        }

        self.next_ticket += 1;
        self.last_trigger = Some(now);
        self.phase = Phase::Loading {
            since: now,
            ticket: self.next_ticket,
        };
        Ok(self.next_ticket)
    }

    /// Apply a successful page. Returns false when the ticket was
    /// superseded (watchdog reset or newer load); the caller must then
    /// discard the page.
    pub fn complete(
        &mut self,
        ticket: u64,
        any_live_cursor: bool,
        items_returned: usize,
        requested: usize,
    ) -> bool {
        match self.phase {
            Phase::Loading { ticket: t, .. } if t == ticket => {
                self.phase = Phase::Idle;
                self.exhausted = !decide_has_more(
                    any_live_cursor,
                    items_returned,
                    requested,
                    self.cfg.partial_page_keep_ratio,
                );
                true
            }
            _ => false,
        }
    }

    /// Record a failed load. Failure is surfaced for retry, never treated
    /// as exhaustion. Returns false for superseded tickets.
    pub fn fail(&mut self, ticket: u64) -> bool {
        match self.phase {
            Phase::Loading { ticket: t, .. } if t == ticket => {
                self.phase = Phase::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// One-shot watchdog notice for the surface layer.
    pub fn take_stuck_notice(&mut self) -> Option<FeedError> {
        self.stuck_notice.take()
    }

    /// Fresh session (new filters): cursors are gone, so exhaustion and
    /// cooldown history reset with them.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.last_trigger = None;
        self.exhausted = false;
        self.stuck_notice = None;
    }
}

/// End-of-stream policy. Any live cursor keeps the stream alive; an empty
/// page with only dead cursors ends it. In between — items but no cursor
/// signal — the keep ratio decides, and a zero-item page with a live cursor
/// is explicitly "try once more", not exhaustion.
pub fn decide_has_more(
    any_live_cursor: bool,
    items_returned: usize,
    requested: usize,
    keep_ratio: f64,
) -> bool {
    if any_live_cursor {
        return true;
    }
    if items_returned == 0 {
        return false;
    }
    let threshold = ((requested as f64) * keep_ratio).ceil() as usize;
    items_returned >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(cooldown_ms: u64, watchdog_ms: u64) -> PaginationController {
        PaginationController::new(PaginationConfig {
            cooldown_ms,
            watchdog_ceiling_ms: watchdog_ms,
            partial_page_keep_ratio: 0.5,
        })
    }

    #[test]
    fn test_second_trigger_within_cooldown_rejected() {
        let mut c = controller(500, 30_000);
        let t0 = Instant::now();
        let ticket = c.try_begin(t0).unwrap();
        assert!(c.complete(ticket, true, 10, 10));

        let t1 = t0 + Duration::from_millis(100);
        assert_eq!(c.try_begin(t1), Err(LoadReject::CoolingDown));

        let t2 = t0 + Duration::from_millis(600);
        assert!(c.try_begin(t2).is_ok());
    }

    #[test]
    fn test_concurrent_trigger_rejected_while_loading() {
        let mut c = controller(500, 30_000);
        let t0 = Instant::now();
        c.try_begin(t0).unwrap();
        let t1 = t0 + Duration::from_millis(800);
        assert_eq!(c.try_begin(t1), Err(LoadReject::AlreadyLoading));
    }

    #[test]
    fn test_watchdog_resets_stuck_load() {
        let mut c = controller(500, 30_000);
        let t0 = Instant::now();
        let stale = c.try_begin(t0).unwrap();

        let t1 = t0 + Duration::from_secs(31);
        let fresh = c.try_begin(t1).unwrap();
        assert_ne!(stale, fresh);
        assert!(matches!(
            c.take_stuck_notice(),
            Some(FeedError::LoadStuck { .. })
        ));
        assert!(c.take_stuck_notice().is_none());

        // The stale fetch finally lands; its result must be dropped.
        assert!(!c.complete(stale, true, 10, 10));
        assert!(c.complete(fresh, true, 10, 10));
    }

    #[test]
    fn test_failure_is_not_exhaustion() {
        let mut c = controller(0, 30_000);
        let t0 = Instant::now();
        let ticket = c.try_begin(t0).unwrap();
        assert!(c.fail(ticket));
        assert!(!c.is_exhausted());
        assert!(c.try_begin(t0 + Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_exhaustion_blocks_further_triggers() {
        let mut c = controller(0, 30_000);
        let t0 = Instant::now();
        let ticket = c.try_begin(t0).unwrap();
        assert!(c.complete(ticket, false, 0, 10));
        assert!(c.is_exhausted());
        assert_eq!(
            c.try_begin(t0 + Duration::from_secs(1)),
            Err(LoadReject::Exhausted)
        );

        c.reset();
        assert!(c.try_begin(t0 + Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_has_more_live_cursor_wins() {
        assert!(decide_has_more(true, 0, 10, 0.5));
        assert!(decide_has_more(true, 3, 10, 0.5));
    }

    #[test]
    fn test_has_more_empty_page_dead_cursors_ends_stream() {
        assert!(!decide_has_more(false, 0, 10, 0.5));
    }

    #[test]
    fn test_has_more_partial_page_keep_ratio() {
        // 5 of 10 meets the 0.5 ratio; 4 does not.
        assert!(decide_has_more(false, 5, 10, 0.5));
        assert!(!decide_has_more(false, 4, 10, 0.5));
        // Ratio 0.0: any non-empty page keeps going.
        assert!(decide_has_more(false, 1, 10, 0.0));
    }
}
