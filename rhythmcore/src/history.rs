//! Snapshot undo/redo for chart edits.
//!
//! Before every mutating edit the editor calls
//! [`record_before_edit`](EditHistory::record_before_edit), which stores a
//! full copy of the chart cells and invalidates the redo stack. The chart is
//! sparse, so a snapshot costs one entry per placed note.

use crate::chart::{Cells, Chart};

/// Default number of snapshots kept on the undo stack.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Immutable copy of every cell at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot(Cells);

impl Snapshot {
    pub fn capture(chart: &Chart) -> Self {
        Self(chart.cells().clone())
    }

    pub fn cells(&self) -> &Cells {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct EditHistory {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    limit: usize,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl EditHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Save the chart as it is now, before it gets changed.
    pub fn record_before_edit(&mut self, chart: &Chart) {
        self.undo_stack.push(Snapshot::capture(chart));
        self.redo_stack.clear();
        if self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
        }
    }

    /// Restore the previous state. Returns `false` when there is nothing to
    /// undo.
    pub fn undo(&mut self, chart: &mut Chart) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack.push(Snapshot::capture(chart));
        chart.replace_cells(previous.0);
        true
    }

    /// Re-apply the last undone edit. Returns `false` when there is nothing
    /// to redo.
    pub fn redo(&mut self, chart: &mut Chart) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push(Snapshot::capture(chart));
        chart.replace_cells(next.0);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::NoteCell;
    use crate::config::LayoutSettings;
    use crate::layout::ChartLayout;

    fn chart() -> Chart {
        Chart::new(ChartLayout::for_max_tick(Some(100), &LayoutSettings::default()))
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut chart = chart();
        let mut history = EditHistory::default();
        let before = chart.clone();

        history.record_before_edit(&chart);
        chart.set_cell_at(40, 1, Some(NoteCell::new(61, 50))).unwrap();
        let after = chart.clone();

        assert!(history.undo(&mut chart));
        assert_eq!(chart, before);
        assert!(history.redo(&mut chart));
        assert_eq!(chart, after);
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut chart = chart();
        let mut history = EditHistory::default();
        assert!(!history.undo(&mut chart));
        assert!(!history.redo(&mut chart));
        assert!(chart.is_empty());
    }

    #[test]
    fn test_new_edit_invalidates_redo() {
        let mut chart = chart();
        let mut history = EditHistory::default();

        history.record_before_edit(&chart);
        chart.set_cell_at(10, 0, Some(NoteCell::new(60, 0))).unwrap();
        history.undo(&mut chart);
        assert!(history.can_redo());

        history.record_before_edit(&chart);
        chart.set_cell_at(11, 0, Some(NoteCell::new(60, 0))).unwrap();
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_discards_oldest() {
        let mut chart = chart();
        let mut history = EditHistory::new(3);
        for lane in 0..5 {
            history.record_before_edit(&chart);
            chart.set_cell_at(10, lane, Some(NoteCell::new(60, 0))).unwrap();
        }
        assert_eq!(history.undo_depth(), 3);
        while history.undo(&mut chart) {}
        // The two oldest edits can no longer be undone.
        assert_eq!(chart.len(), 2);
    }
}
