//! Keeping the view and the cue cursor in step with the clock.
//!
//! The judgment line sits `judgment_offset` rows above the bottom edge of
//! the viewport. [`scroll_offset`] places the row of a given tick on that
//! line, [`judgment_row_in_view`] reads it back. [`ScrollSync`] remembers
//! which rows have already crossed the line so a cue fires once per row,
//! however many rows one frame skips.

use crate::layout::ChartLayout;
use std::ops::Range;

/// Visible part of the chart, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Distance from the top of the grid to the top of the view.
    pub scroll_y: f32,
    pub height: f32,
    pub row_height: f32,
}

impl Viewport {
    pub fn new(scroll_y: f32, height: f32, row_height: f32) -> Self {
        Self {
            scroll_y,
            height,
            row_height: if row_height > 0.0 { row_height } else { 1.0 },
        }
    }

    /// Rows at least partly inside the view.
    pub fn visible_rows(&self, row_count: usize) -> Range<usize> {
        let first = (self.scroll_y / self.row_height).floor().max(0.0) as usize;
        let last = ((self.scroll_y + self.height) / self.row_height).ceil().max(0.0) as usize;
        first.min(row_count)..last.min(row_count)
    }

    /// Y of the judgment line, measured from the top of the view. A view
    /// shorter than the offset keeps the line at its top edge.
    pub fn judgment_line_y(&self, layout: &ChartLayout) -> f32 {
        (self.height - layout.judgment_offset() as f32 * self.row_height).max(0.0)
    }

    pub fn with_scroll(self, scroll_y: f32) -> Self {
        Self { scroll_y, ..self }
    }
}

/// Scroll position that puts the row of `tick` on the judgment line.
/// Never negative.
pub fn scroll_offset(tick: i64, layout: &ChartLayout, viewport: &Viewport) -> f32 {
    let row_top = layout.row_for_tick(tick) as f32 * viewport.row_height;
    (row_top - viewport.judgment_line_y(layout)).max(0.0)
}

/// Like [`scroll_offset`], but moves through the row as the tick advances
/// instead of jumping one row at a time. Used while playing.
pub fn smooth_scroll_offset(tick: i64, layout: &ChartLayout, viewport: &Viewport) -> f32 {
    let tpr = layout.ticks_per_row();
    let fraction = tick.max(0).rem_euclid(tpr) as f32 / tpr as f32;
    let row_top = (layout.row_for_tick(tick) as f32 - fraction) * viewport.row_height;
    (row_top - viewport.judgment_line_y(layout)).max(0.0)
}

/// Row whose top edge is under the judgment line, clamped to the grid.
pub fn judgment_row_in_view(layout: &ChartLayout, viewport: &Viewport) -> i64 {
    let line = viewport.scroll_y + viewport.judgment_line_y(layout);
    // Small bias so a position produced by `scroll_offset` reads back as the
    // same row despite float rounding.
    let row = (line / viewport.row_height + 1e-3).floor() as i64;
    row.clamp(0, layout.rows() - 1)
}

/// Tick at the judgment line for the current view.
pub fn tick_in_view(layout: &ChartLayout, viewport: &Viewport) -> i64 {
    layout.tick_for_row(judgment_row_in_view(layout, viewport))
}

/// Tracks which rows have crossed the judgment line.
#[derive(Debug, Clone, Default)]
pub struct ScrollSync {
    /// Last row step (`tick / ticks_per_row`) already reported.
    last_step: Option<i64>,
}

impl ScrollSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget what has fired. The next [`advance`](Self::advance) reports
    /// the row it lands on.
    pub fn reset(&mut self) {
        self.last_step = None;
    }

    /// Position the cursor just before the row of `tick`, so that row and
    /// everything after it fire on the next [`advance`](Self::advance).
    pub fn prime(&mut self, tick: i64, layout: &ChartLayout) {
        self.last_step = Some(tick.div_euclid(layout.ticks_per_row()) - 1);
    }

    /// Rows crossed since the previous call, in increasing tick order. Rows
    /// outside the grid are skipped.
    pub fn advance(&mut self, tick: i64, layout: &ChartLayout) -> Vec<usize> {
        let step = tick.div_euclid(layout.ticks_per_row());
        let first = match self.last_step {
            Some(last) if step <= last => return Vec::new(),
            Some(last) => last + 1,
            None => step,
        };
        self.last_step = Some(step);

        (first..=step)
            .filter_map(|s| layout.row_index(s * layout.ticks_per_row()))
            .collect()
    }
}
