//! Shortest-column-first masonry packing.
//!
//! Pure geometry: given the ordered item list, the height cache, a column
//! count and the viewport width, produce every tile's slot. Unmeasured
//! tiles pack at height 0 until their media reports a real size. The same
//! inputs always produce the same layout.

use crate::feed::types::FeedItem;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSlot {
    pub column: usize,
    pub top: f32,
    pub left: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Breakpoint {
    pub min_width: f32,
    pub columns: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub slots: HashMap<String, TileSlot>,
    pub column_heights: Vec<f32>,
    pub container_height: f32,
    /// Where the pagination sentinel sits: just below the tallest column.
    pub sentinel_top: f32,
}

/// Columns for a viewport width: the matching breakpoint with the largest
/// `min_width` wins; narrower than everything falls back to one column.
pub fn column_count(breakpoints: &[Breakpoint], viewport_width: f32) -> usize {
    breakpoints
        .iter()
        .filter(|bp| viewport_width >= bp.min_width)
        .max_by(|a, b| {
            a.min_width
                .partial_cmp(&b.min_width)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|bp| bp.columns.max(1))
        .unwrap_or(1)
}

pub fn compute_layout(
    items: &[FeedItem],
    heights: &HashMap<String, f32>,
    columns: usize,
    viewport_width: f32,
    gap: f32,
) -> Layout {
    let columns = columns.max(1);
    let tile_width = ((viewport_width - gap * (columns as f32 + 1.0)) / columns as f32).max(0.0);

    let mut running = vec![0.0f32; columns];
    let mut slots = HashMap::with_capacity(items.len());

    for item in items {
        let col = shortest_column(&running);
        let height = heights.get(&item.id).copied().unwrap_or(0.0);
        slots.insert(
            item.id.clone(),
            TileSlot {
                column: col,
                top: running[col],
                left: gap + col as f32 * (tile_width + gap),
                width: tile_width,
            },
        );
        running[col] += height + gap;
    }

    let tallest = running.iter().copied().fold(0.0f32, f32::max);
    // Drop the trailing gap of the tallest column, if anything was placed.
    let container_height = if slots.is_empty() { 0.0 } else { (tallest - gap).max(0.0) };

    Layout {
        slots,
        column_heights: running,
        container_height,
        sentinel_top: container_height + gap,
    }
}

/// Lowest index wins ties so repeated runs place identically.
fn shortest_column(running: &[f32]) -> usize {
    let mut best = 0;
    for (i, h) in running.iter().enumerate().skip(1) {
        if *h < running[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::testutil::item;

    fn uniform_heights(items: &[FeedItem], h: f32) -> HashMap<String, f32> {
        items.iter().map(|i| (i.id.clone(), h)).collect()
    }

    fn twenty_items() -> Vec<FeedItem> {
        (0..20).map(|i| item(&format!("t{i}"), "a", i)).collect()
    }

    #[test]
    fn test_uniform_heights_fill_columns_evenly() {
        let items = twenty_items();
        let heights = uniform_heights(&items, 100.0);
        let gap = 10.0;
        let layout = compute_layout(&items, &heights, 4, 1000.0, gap);

        for col_height in &layout.column_heights {
            // 5 tiles of 100 plus gaps per column.
            assert!((col_height - 5.0 * (100.0 + gap)).abs() < 1e-3);
        }
        for slot in layout.slots.values() {
            let step = 100.0 + gap;
            let ratio = slot.top / step;
            assert!(
                (ratio - ratio.round()).abs() < 1e-3,
                "top {} is not a multiple of {}",
                slot.top,
                step
            );
        }
        assert!((layout.container_height - (5.0 * 110.0 - gap)).abs() < 1e-3);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let items = twenty_items();
        let mut heights = HashMap::new();
        for (i, it) in items.iter().enumerate() {
            heights.insert(it.id.clone(), 80.0 + (i % 7) as f32 * 40.0);
        }
        let a = compute_layout(&items, &heights, 3, 900.0, 12.0);
        let b = compute_layout(&items, &heights, 3, 900.0, 12.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_balance_bound() {
        // No column may exceed another by more than one tile's height + gap.
        let items = twenty_items();
        let mut heights = HashMap::new();
        let mut max_h = 0.0f32;
        for (i, it) in items.iter().enumerate() {
            let h = 60.0 + ((i * 37) % 200) as f32;
            max_h = max_h.max(h);
            heights.insert(it.id.clone(), h);
        }
        let gap = 8.0;
        let layout = compute_layout(&items, &heights, 4, 1200.0, gap);

        let min = layout.column_heights.iter().copied().fold(f32::MAX, f32::min);
        let max = layout.column_heights.iter().copied().fold(0.0f32, f32::max);
        assert!(max - min <= max_h + gap + 1e-3);
    }

    #[test]
    fn test_each_item_lands_in_current_shortest_column() {
        let items: Vec<FeedItem> = (0..3).map(|i| item(&format!("t{i}"), "a", i)).collect();
        let mut heights = HashMap::new();
        heights.insert("t0".to_string(), 300.0);
        heights.insert("t1".to_string(), 50.0);
        heights.insert("t2".to_string(), 50.0);

        let layout = compute_layout(&items, &heights, 2, 800.0, 10.0);
        // t0 fills column 0; t1 goes to empty column 1; t2 lands back on
        // column 1, the shorter one.
        assert_eq!(layout.slots["t0"].column, 0);
        assert_eq!(layout.slots["t1"].column, 1);
        assert_eq!(layout.slots["t2"].column, 1);
        assert!((layout.slots["t2"].top - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_unmeasured_items_pack_at_zero_height() {
        let items: Vec<FeedItem> = (0..2).map(|i| item(&format!("t{i}"), "a", i)).collect();
        let layout = compute_layout(&items, &HashMap::new(), 1, 500.0, 10.0);
        assert!((layout.slots["t0"].top - 0.0).abs() < 1e-3);
        assert!((layout.slots["t1"].top - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_sentinel_sits_below_tallest_column() {
        let items = twenty_items();
        let heights = uniform_heights(&items, 100.0);
        let layout = compute_layout(&items, &heights, 4, 1000.0, 10.0);
        assert!(layout.sentinel_top > layout.container_height);
        assert!((layout.sentinel_top - (layout.container_height + 10.0)).abs() < 1e-3);
    }

    #[test]
    fn test_column_count_from_breakpoints() {
        let bps = vec![
            Breakpoint { min_width: 0.0, columns: 1 },
            Breakpoint { min_width: 600.0, columns: 2 },
            Breakpoint { min_width: 900.0, columns: 3 },
            Breakpoint { min_width: 1200.0, columns: 4 },
        ];
        assert_eq!(column_count(&bps, 320.0), 1);
        assert_eq!(column_count(&bps, 700.0), 2);
        assert_eq!(column_count(&bps, 1199.0), 3);
        assert_eq!(column_count(&bps, 1920.0), 4);
        assert_eq!(column_count(&[], 1920.0), 1);
    }

    #[test]
    fn test_empty_list_is_empty_layout() {
        let layout = compute_layout(&[], &HashMap::new(), 4, 1000.0, 10.0);
        assert!(layout.slots.is_empty());
        assert!((layout.container_height - 0.0).abs() < 1e-6);
    }
}
