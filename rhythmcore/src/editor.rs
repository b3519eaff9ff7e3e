//! Chart editing: delete, copy, paste and same-row drag.
//!
//! [`Editor`] owns the chart, its undo history and a one-slot clipboard.
//! Each operation either completes fully after recording a snapshot, or
//! leaves chart and history as they were.

use crate::chart::{Chart, NoteCell};
use crate::error::EditError;
use crate::history::EditHistory;
use tracing::debug;

/// A `(row, lane)` position in the chart.
pub type CellPos = (usize, usize);

#[derive(Debug, Clone)]
pub struct Editor {
    chart: Chart,
    history: EditHistory,
    clipboard: Option<NoteCell>,
}

impl Editor {
    pub fn new(chart: Chart, history_limit: usize) -> Self {
        Self {
            chart,
            history: EditHistory::new(history_limit),
            clipboard: None,
        }
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn clipboard(&self) -> Option<NoteCell> {
        self.clipboard
    }

    /// Swap in a freshly built chart. Undo history and clipboard start
    /// empty.
    pub fn replace_chart(&mut self, chart: Chart) {
        self.chart = chart;
        self.history.clear();
        self.clipboard = None;
    }

    fn check(&self, (row, lane): CellPos) -> Result<(), EditError> {
        if self.chart.contains(row, lane) {
            Ok(())
        } else {
            Err(EditError::OutOfBounds { row, lane })
        }
    }

    /// Remove the note at `pos`. An empty cell is left alone and nothing is
    /// recorded.
    pub fn delete(&mut self, pos: CellPos) -> Result<Option<NoteCell>, EditError> {
        self.check(pos)?;
        if !self.chart.is_occupied(pos.0, pos.1) {
            return Ok(None);
        }
        self.history.record_before_edit(&self.chart);
        self.chart.set_cell_at(pos.0, pos.1, None)
    }

    /// Copy the note at `pos` into the clipboard. Not an edit.
    pub fn copy(&mut self, pos: CellPos) -> Result<Option<NoteCell>, EditError> {
        self.check(pos)?;
        let cell = self.chart.cell_at(pos.0, pos.1).copied();
        if cell.is_some() {
            self.clipboard = cell;
        }
        Ok(cell)
    }

    /// Place the clipboard note at `pos`, retimed to that row. Overwrites
    /// whatever was there.
    pub fn paste(&mut self, pos: CellPos) -> Result<NoteCell, EditError> {
        self.check(pos)?;
        let source = self.clipboard.ok_or(EditError::EmptyClipboard)?;
        let cell = NoteCell::new(source.pitch, self.chart.layout().tick_for_row(pos.0 as i64));
        self.history.record_before_edit(&self.chart);
        self.chart.set_cell_at(pos.0, pos.1, Some(cell))?;
        Ok(cell)
    }

    /// Drag the note at `from` onto `to`, exchanging it with whatever `to`
    /// holds. Only sideways moves within one row are allowed.
    ///
    /// Returns `Ok(false)` when `from == to`.
    pub fn swap(&mut self, from: CellPos, to: CellPos) -> Result<bool, EditError> {
        self.check(from)?;
        self.check(to)?;
        if from.0 != to.0 {
            debug!(from = ?from, to = ?to, "rejected cross-row move");
            return Err(EditError::CrossRowMove { from: from.0, to: to.0 });
        }
        let Some(moving) = self.chart.cell_at(from.0, from.1).copied() else {
            return Err(EditError::EmptySource { row: from.0, lane: from.1 });
        };
        if from == to {
            return Ok(false);
        }

        self.history.record_before_edit(&self.chart);
        let displaced = self.chart.set_cell_at(to.0, to.1, Some(moving))?;
        self.chart.set_cell_at(from.0, from.1, displaced)?;
        Ok(true)
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.chart)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutSettings;
    use crate::layout::ChartLayout;
    use crate::midi::NoteEvent;

    fn editor() -> Editor {
        let layout = ChartLayout::for_max_tick(Some(100), &LayoutSettings::default());
        let events = [
            NoteEvent { pitch: 62, tick: 0 },
            NoteEvent { pitch: 64, tick: 0 },
            NoteEvent { pitch: 62, tick: 20 },
        ];
        let (chart, _) = Chart::build(&events, layout);
        Editor::new(chart, 50)
    }

    fn judgment_row(editor: &Editor) -> usize {
        editor.chart().layout().judgment_row() as usize
    }

    #[test]
    fn test_cross_row_drag_is_rejected() {
        let mut editor = editor();
        let row = judgment_row(&editor);
        let before = editor.chart().clone();

        let result = editor.swap((row, 2), (row - 2, 2));
        assert_eq!(result, Err(EditError::CrossRowMove { from: row, to: row - 2 }));
        assert_eq!(editor.chart(), &before);
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_cross_row_drag_from_row_5_to_7() {
        let layout = ChartLayout::new(10, 30, 100, 8);
        let mut chart = Chart::new(layout);
        chart.set_cell_at(5, 2, Some(NoteCell::new(62, layout.tick_for_row(5)))).unwrap();
        let mut editor = Editor::new(chart.clone(), 50);

        assert!(editor.swap((5, 2), (7, 2)).is_err());
        assert_eq!(editor.chart(), &chart);
    }

    #[test]
    fn test_swap_within_row_and_undo() {
        let mut editor = editor();
        let row = judgment_row(&editor);
        let before = editor.chart().clone();

        assert_eq!(editor.swap((row, 2), (row, 4)), Ok(true));
        assert_eq!(editor.chart().cell_at(row, 4).map(|c| c.pitch), Some(62));
        assert_eq!(editor.chart().cell_at(row, 2).map(|c| c.pitch), Some(64));
        let after = editor.chart().clone();

        assert!(editor.undo());
        assert_eq!(editor.chart(), &before);
        assert!(editor.redo());
        assert_eq!(editor.chart(), &after);
    }

    #[test]
    fn test_swap_onto_empty_cell_moves() {
        let mut editor = editor();
        let row = judgment_row(&editor);
        assert_eq!(editor.swap((row, 2), (row, 7)), Ok(true));
        assert!(editor.chart().cell_at(row, 2).is_none());
        assert_eq!(editor.chart().cell_at(row, 7).map(|c| c.pitch), Some(62));
    }

    #[test]
    fn test_swap_from_empty_or_to_self() {
        let mut editor = editor();
        let row = judgment_row(&editor);
        assert_eq!(
            editor.swap((row, 6), (row, 2)),
            Err(EditError::EmptySource { row, lane: 6 })
        );
        assert_eq!(editor.swap((row, 2), (row, 2)), Ok(false));
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_delete_and_undo() {
        let mut editor = editor();
        let row = judgment_row(&editor);
        let before = editor.chart().clone();

        assert_eq!(editor.delete((row, 4)).unwrap(), Some(NoteCell::new(64, 0)));
        assert!(editor.chart().cell_at(row, 4).is_none());
        assert!(editor.undo());
        assert_eq!(editor.chart(), &before);
    }

    #[test]
    fn test_delete_empty_cell_records_nothing() {
        let mut editor = editor();
        assert_eq!(editor.delete((0, 0)), Ok(None));
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_copy_paste_retimes_to_row() {
        let mut editor = editor();
        let row = judgment_row(&editor);
        assert_eq!(editor.paste((row - 5, 0)), Err(EditError::EmptyClipboard));

        editor.copy((row, 4)).unwrap();
        assert!(!editor.history().can_undo());

        let pasted = editor.paste((row - 5, 0)).unwrap();
        assert_eq!(pasted, NoteCell::new(64, 50));
        assert_eq!(editor.chart().cell_at(row - 5, 0), Some(&pasted));

        assert!(editor.undo());
        assert!(editor.chart().cell_at(row - 5, 0).is_none());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut editor = editor();
        let rows = editor.chart().rows();
        assert_eq!(editor.delete((rows, 0)), Err(EditError::OutOfBounds { row: rows, lane: 0 }));
        assert!(editor.copy((0, 99)).is_err());
    }
}
