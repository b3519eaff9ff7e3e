//! Chart geometry: rows, ticks and the judgment line.
//!
//! Rows are numbered top-down on screen, so the timeline runs upward: the row
//! of tick 0 sits `judgment_offset` rows above the bottom of the grid and
//! later ticks get smaller row indices.
//!
//! ```text
//! row 0            <- latest ticks (plus padding)
//! ...
//! judgment_row()   <- tick 0
//! ...              <- judgment_offset rows of lead-in
//! row rows-1
//! ```
//!
//! Every row/tick conversion in the crate goes through [`ChartLayout`].

use crate::config::LayoutSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartLayout {
    ticks_per_row: i64,
    judgment_offset: i64,
    rows: i64,
    lane_count: usize,
}

impl ChartLayout {
    /// Build a layout with an explicit row count. `ticks_per_row` and
    /// `lane_count` are raised to at least 1, `rows` to cover the judgment
    /// row.
    pub fn new(ticks_per_row: i64, judgment_offset: i64, rows: i64, lane_count: usize) -> Self {
        let judgment_offset = judgment_offset.max(0);
        Self {
            ticks_per_row: ticks_per_row.max(1),
            judgment_offset,
            rows: rows.max(judgment_offset.saturating_add(1)),
            lane_count: lane_count.max(1),
        }
    }

    /// Size the grid for a sequence whose latest note-on is `max_tick`.
    ///
    /// `rows = max_tick / ticks_per_row + 2 * judgment_offset + padding`.
    /// Without notes the grid gets `empty_rows` rows.
    pub fn for_max_tick(max_tick: Option<i64>, settings: &LayoutSettings) -> Self {
        let ticks_per_row = settings.ticks_per_row.max(1);
        let rows = match max_tick {
            Some(tick) => {
                (tick.max(0) / ticks_per_row)
                    .saturating_add(settings.judgment_offset.saturating_mul(2))
                    .saturating_add(settings.padding_rows)
            }
            None => settings.empty_rows,
        };
        Self::new(ticks_per_row, settings.judgment_offset, rows, settings.lane_count)
    }

    pub fn rows(&self) -> i64 {
        self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows as usize
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn ticks_per_row(&self) -> i64 {
        self.ticks_per_row
    }

    pub fn judgment_offset(&self) -> i64 {
        self.judgment_offset
    }

    /// Row holding tick 0.
    pub fn judgment_row(&self) -> i64 {
        self.rows - 1 - self.judgment_offset
    }

    /// Row containing `tick`. May be negative for ticks past the top of the
    /// grid; check with [`contains_row`](Self::contains_row).
    pub fn row_for_tick(&self, tick: i64) -> i64 {
        self.judgment_row() - tick.div_euclid(self.ticks_per_row)
    }

    /// First tick of `row`, clamped to 0 for lead-in rows.
    pub fn tick_for_row(&self, row: i64) -> i64 {
        ((self.judgment_row() - row) * self.ticks_per_row).max(0)
    }

    pub fn contains_row(&self, row: i64) -> bool {
        (0..self.rows).contains(&row)
    }

    /// Row index of `tick` if it falls inside the grid.
    pub fn row_index(&self, tick: i64) -> Option<usize> {
        let row = self.row_for_tick(tick);
        self.contains_row(row).then_some(row as usize)
    }

    /// Number shown in the row header: rows since tick 0, `None` in the
    /// lead-in below it.
    pub fn row_label(&self, row: i64) -> Option<i64> {
        let value = self.judgment_row() - row;
        (value >= 0).then_some(value)
    }

    /// Tick at the top row of the grid.
    pub fn top_tick(&self) -> i64 {
        self.tick_for_row(0)
    }
}
