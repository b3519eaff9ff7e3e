//! The note chart: a sparse `(row, lane)` grid of [`NoteCell`]s.
//!
//! Renderers pull from it through [`GridSource`]; playback reads whole rows
//! with [`Chart::row_cells`]. Only the editor mutates it.

use crate::error::EditError;
use crate::lanes::LaneAssigner;
use crate::layout::ChartLayout;
use crate::midi::NoteEvent;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::debug;

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Key labels for the default eight-lane layout.
const LANE_LABELS: [&str; 8] = ["SCR", "S", "D", "F", "SPACE", "J", "K", "L"];

/// Note name with octave, middle C = "C4".
pub fn note_name(pitch: u8) -> String {
    let octave = i32::from(pitch) / 12 - 1;
    format!("{}{}", NOTE_NAMES[usize::from(pitch % 12)], octave)
}

/// Header text for a lane.
pub fn lane_label(lane: usize, lane_count: usize) -> String {
    if lane_count == LANE_LABELS.len() {
        LANE_LABELS[lane].to_string()
    } else {
        (lane + 1).to_string()
    }
}

/// A placed note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCell {
    pub pitch: u8,
    pub tick: i64,
}

impl NoteCell {
    pub fn new(pitch: u8, tick: i64) -> Self {
        Self { pitch, tick }
    }

    /// Cell text, e.g. `60(C4)`.
    pub fn label(&self) -> String {
        format!("{}({})", self.pitch, note_name(self.pitch))
    }
}

pub type Cells = BTreeMap<(usize, usize), NoteCell>;

/// Read-only grid access for renderers.
pub trait GridSource {
    fn row_count(&self) -> usize;
    fn lane_count(&self) -> usize;
    fn cell_at(&self, row: usize, lane: usize) -> Option<&NoteCell>;
}

/// Outcome of building a chart from MIDI events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub placed: usize,
    /// Notes lost because every lane of their row was taken.
    pub dropped: usize,
    /// Notes whose row fell outside the grid.
    pub out_of_range: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    layout: ChartLayout,
    cells: Cells,
}

impl Chart {
    pub fn new(layout: ChartLayout) -> Self {
        Self {
            layout,
            cells: Cells::new(),
        }
    }

    /// Place `events` in the order given, resolving lane collisions with
    /// [`LaneAssigner`].
    pub fn build(events: &[NoteEvent], layout: ChartLayout) -> (Self, BuildReport) {
        let assigner = LaneAssigner::new(layout.lane_count());
        let mut chart = Chart::new(layout);
        let mut report = BuildReport::default();

        for event in events {
            let Some(row) = layout.row_index(event.tick) else {
                report.out_of_range += 1;
                continue;
            };
            match assigner.assign_in_row(&chart, row, event.pitch) {
                Some(lane) => {
                    chart.cells.insert((row, lane), NoteCell::new(event.pitch, event.tick));
                    report.placed += 1;
                }
                None => report.dropped += 1,
            }
        }

        debug!(
            placed = report.placed,
            dropped = report.dropped,
            out_of_range = report.out_of_range,
            rows = layout.rows(),
            "built chart"
        );
        (chart, report)
    }

    pub fn layout(&self) -> &ChartLayout {
        &self.layout
    }

    pub fn rows(&self) -> usize {
        self.layout.row_count()
    }

    pub fn lanes(&self) -> usize {
        self.layout.lane_count()
    }

    pub fn contains(&self, row: usize, lane: usize) -> bool {
        row < self.rows() && lane < self.lanes()
    }

    pub fn cell_at(&self, row: usize, lane: usize) -> Option<&NoteCell> {
        self.cells.get(&(row, lane))
    }

    pub fn is_occupied(&self, row: usize, lane: usize) -> bool {
        self.cells.contains_key(&(row, lane))
    }

    /// Put `cell` at `(row, lane)` (or clear it with `None`), returning the
    /// previous content.
    pub fn set_cell_at(
        &mut self,
        row: usize,
        lane: usize,
        cell: Option<NoteCell>,
    ) -> Result<Option<NoteCell>, EditError> {
        if !self.contains(row, lane) {
            return Err(EditError::OutOfBounds { row, lane });
        }
        Ok(match cell {
            Some(cell) => self.cells.insert((row, lane), cell),
            None => self.cells.remove(&(row, lane)),
        })
    }

    /// Notes of one row, lanes ascending.
    pub fn row_cells(&self, row: usize) -> impl Iterator<Item = (usize, &NoteCell)> + '_ {
        self.cells
            .range((row, 0)..(row + 1, 0))
            .map(|(&(_, lane), cell)| (lane, cell))
    }

    /// All notes earliest-first: bottom row up, lanes ascending within a row.
    pub fn notes_in_chart_order(&self) -> Vec<(usize, usize, &NoteCell)> {
        let mut notes: Vec<_> = self
            .cells
            .iter()
            .map(|(&(row, lane), cell)| (row, lane, cell))
            .collect();
        notes.sort_by_key(|&(row, lane, _)| (Reverse(row), lane));
        notes
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Start tick of the latest occupied row.
    pub fn last_note_tick(&self) -> Option<i64> {
        self.cells
            .keys()
            .next()
            .map(|&(row, _)| self.layout.tick_for_row(row as i64))
    }

    pub fn cells(&self) -> &Cells {
        &self.cells
    }

    pub(crate) fn replace_cells(&mut self, cells: Cells) {
        self.cells = cells;
    }
}

impl GridSource for Chart {
    fn row_count(&self) -> usize {
        self.rows()
    }

    fn lane_count(&self) -> usize {
        self.lanes()
    }

    fn cell_at(&self, row: usize, lane: usize) -> Option<&NoteCell> {
        Chart::cell_at(self, row, lane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutSettings;

    fn layout_for(max_tick: i64) -> ChartLayout {
        ChartLayout::for_max_tick(Some(max_tick), &LayoutSettings::default())
    }

    #[test]
    fn test_same_tick_octaves_split_lanes() {
        let events = [NoteEvent { pitch: 60, tick: 0 }, NoteEvent { pitch: 72, tick: 0 }];
        let layout = layout_for(0);
        let (chart, report) = Chart::build(&events, layout);
        let row = layout.judgment_row() as usize;
        assert_eq!(chart.cell_at(row, 0), Some(&NoteCell::new(60, 0)));
        assert_eq!(chart.cell_at(row, 1), Some(&NoteCell::new(72, 0)));
        assert_eq!(report, BuildReport { placed: 2, dropped: 0, out_of_range: 0 });
    }

    #[test]
    fn test_file_order_decides_collisions() {
        // Both notes share a row (ticks 3 and 7 with 10 ticks per row). The
        // later tick comes first in the file and keeps the preferred lane.
        let events = [NoteEvent { pitch: 62, tick: 7 }, NoteEvent { pitch: 74, tick: 3 }];
        let layout = layout_for(7);
        let (chart, _) = Chart::build(&events, layout);
        let row = layout.judgment_row() as usize;
        assert_eq!(chart.cell_at(row, 2).map(|c| c.pitch), Some(62));
        assert_eq!(chart.cell_at(row, 3).map(|c| c.pitch), Some(74));
    }

    #[test]
    fn test_full_row_drops_extra_notes() {
        let events: Vec<NoteEvent> = (0..10).map(|i| NoteEvent { pitch: 60 + i, tick: 0 }).collect();
        let (chart, report) = Chart::build(&events, layout_for(0));
        assert_eq!(chart.len(), 8);
        assert_eq!(report.placed, 8);
        assert_eq!(report.dropped, 2);
    }

    #[test]
    fn test_set_cell_rejects_out_of_bounds() {
        let mut chart = Chart::new(layout_for(100));
        let rows = chart.rows();
        assert_eq!(
            chart.set_cell_at(rows, 0, Some(NoteCell::new(60, 0))),
            Err(EditError::OutOfBounds { row: rows, lane: 0 })
        );
        assert_eq!(chart.set_cell_at(0, 8, None), Err(EditError::OutOfBounds { row: 0, lane: 8 }));
        assert!(chart.is_empty());
    }

    #[test]
    fn test_chart_order_is_bottom_up() {
        let events = [
            NoteEvent { pitch: 64, tick: 20 },
            NoteEvent { pitch: 61, tick: 0 },
            NoteEvent { pitch: 60, tick: 0 },
        ];
        let (chart, _) = Chart::build(&events, layout_for(20));
        let pitches: Vec<u8> = chart.notes_in_chart_order().iter().map(|(_, _, c)| c.pitch).collect();
        assert_eq!(pitches, vec![60, 61, 64]);
        assert_eq!(chart.last_note_tick(), Some(20));
    }

    #[test]
    fn test_row_cells_only_returns_that_row() {
        let events = [
            NoteEvent { pitch: 60, tick: 0 },
            NoteEvent { pitch: 62, tick: 0 },
            NoteEvent { pitch: 64, tick: 10 },
        ];
        let layout = layout_for(10);
        let (chart, _) = Chart::build(&events, layout);
        let row = layout.judgment_row() as usize;
        let lanes: Vec<usize> = chart.row_cells(row).map(|(lane, _)| lane).collect();
        assert_eq!(lanes, vec![0, 2]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(NoteCell::new(69, 0).label(), "69(A4)");
        assert_eq!(lane_label(4, 8), "SPACE");
        assert_eq!(lane_label(2, 6), "3");
    }
}
