pub mod masonry;

use crate::feed::types::FeedItem;
use masonry::{column_count, compute_layout, Breakpoint, Layout};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub gap: f32,
    pub breakpoints: Vec<Breakpoint>,
    /// Height deltas at or below this are measurement noise and ignored.
    pub noise_threshold: f32,
    /// Quiet period after the last size change before positions recompute.
    pub reflow_debounce_ms: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gap: 12.0,
            breakpoints: vec![
                Breakpoint { min_width: 0.0, columns: 1 },
                Breakpoint { min_width: 600.0, columns: 2 },
                Breakpoint { min_width: 900.0, columns: 3 },
                Breakpoint { min_width: 1200.0, columns: 4 },
            ],
            noise_threshold: 2.0,
            reflow_debounce_ms: 120,
        }
    }
}

/// Stateful wrapper around the pure packing: owns the height cache and the
/// debounced recomputation schedule. Tiles report async size changes at high
/// frequency; positions are only recomputed once the burst settles, never
/// synchronously inside the notification.
#[derive(Debug)]
pub struct MasonryEngine {
    cfg: LayoutConfig,
    viewport_width: f32,
    heights: HashMap<String, f32>,
    layout: Layout,
    reflow_due: Option<Instant>,
}

impl MasonryEngine {
    pub fn new(cfg: LayoutConfig, viewport_width: f32) -> Self {
        Self {
            cfg,
            viewport_width,
            heights: HashMap::new(),
            layout: Layout::default(),
            reflow_due: None,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn columns(&self) -> usize {
        column_count(&self.cfg.breakpoints, self.viewport_width)
    }

    pub fn cached_height(&self, id: &str) -> f32 {
        self.heights.get(id).copied().unwrap_or(0.0)
    }

    /// Immediate recomputation, used when the item list itself changed
    /// (initial load, incremental append). Not debounced: list changes are
    /// low-frequency and the new tiles need slots before they can render.
    pub fn relayout(&mut self, items: &[FeedItem]) {
        self.layout = compute_layout(
            items,
            &self.heights,
            self.columns(),
            self.viewport_width,
            self.cfg.gap,
        );
        self.reflow_due = None;
    }

    /// A tile reported its rendered height. Sub-threshold jitter is
    /// ignored; a real change updates the cache and arms the debounce.
    pub fn on_size_change(&mut self, id: &str, height: f32, now: Instant) {
        let previous = self.cached_height(id);
        if (height - previous).abs() <= self.cfg.noise_threshold {
            return;
        }
        self.heights.insert(id.to_string(), height);
        self.reflow_due = Some(now + Duration::from_millis(self.cfg.reflow_debounce_ms));
    }

    pub fn set_viewport_width(&mut self, width: f32, now: Instant) {
        if (width - self.viewport_width).abs() < f32::EPSILON {
            return;
        }
        self.viewport_width = width;
        self.reflow_due = Some(now + Duration::from_millis(self.cfg.reflow_debounce_ms));
    }

    pub fn reflow_pending(&self) -> bool {
        self.reflow_due.is_some()
    }

    /// Run the recomputation if the debounce window has elapsed. Returns
    /// true when positions were recomputed.
    pub fn poll_reflow(&mut self, items: &[FeedItem], now: Instant) -> bool {
        match self.reflow_due {
            Some(due) if now >= due => {
                self.relayout(items);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::testutil::item;

    fn engine() -> MasonryEngine {
        MasonryEngine::new(LayoutConfig::default(), 1000.0)
    }

    #[test]
    fn test_size_change_schedules_debounced_reflow() {
        let mut eng = engine();
        let items = vec![item("a", "x", 1), item("b", "y", 2)];
        eng.relayout(&items);

        let t0 = Instant::now();
        eng.on_size_change("a", 240.0, t0);
        assert!(eng.reflow_pending());

        // Too early: nothing happens.
        assert!(!eng.poll_reflow(&items, t0 + Duration::from_millis(50)));
        // Window elapsed: positions recompute with the new height.
        assert!(eng.poll_reflow(&items, t0 + Duration::from_millis(150)));
        assert!(!eng.reflow_pending());
        assert!(eng.layout().container_height >= 240.0);
    }

    #[test]
    fn test_noise_below_threshold_ignored() {
        let mut eng = engine();
        let t0 = Instant::now();
        eng.on_size_change("a", 100.0, t0);
        eng.poll_reflow(&[item("a", "x", 1)], t0 + Duration::from_secs(1));

        eng.on_size_change("a", 101.5, t0 + Duration::from_secs(2));
        assert!(!eng.reflow_pending());
        assert!((eng.cached_height("a") - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_burst_of_changes_collapses_into_one_reflow() {
        let mut eng = engine();
        let items = vec![item("a", "x", 1), item("b", "y", 2)];
        let t0 = Instant::now();

        eng.on_size_change("a", 100.0, t0);
        eng.on_size_change("b", 180.0, t0 + Duration::from_millis(30));
        eng.on_size_change("a", 220.0, t0 + Duration::from_millis(60));

        // Deadline tracks the last change in the burst.
        assert!(!eng.poll_reflow(&items, t0 + Duration::from_millis(130)));
        assert!(eng.poll_reflow(&items, t0 + Duration::from_millis(200)));
        assert!((eng.cached_height("a") - 220.0).abs() < 1e-3);
    }

    #[test]
    fn test_viewport_change_schedules_reflow() {
        let mut eng = engine();
        assert_eq!(eng.columns(), 3);
        let t0 = Instant::now();
        eng.set_viewport_width(1400.0, t0);
        assert_eq!(eng.columns(), 4);
        assert!(eng.reflow_pending());
    }
}
