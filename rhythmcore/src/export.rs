//! Flat text export of a chart.
//!
//! One line per note, earliest first:
//!
//! ```text
//! {"pitch":60, "t":0},
//! {"pitch":64, "t":20},
//! ```
//!
//! `t` counts rows above the judgment row, times ten. The format is consumed
//! line by line by the game, so there is no surrounding array and every line
//! keeps its trailing comma.

use crate::chart::{Chart, NoteCell};
use crate::error::Result;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Time units per chart row in the export.
pub const EXPORT_UNITS_PER_ROW: i64 = 10;

/// Export time of a note in `row`.
pub fn export_time(chart: &Chart, row: usize) -> i64 {
    (chart.layout().judgment_row() - row as i64) * EXPORT_UNITS_PER_ROW
}

pub fn export_line(cell: &NoteCell, t: i64) -> String {
    format!("{{\"pitch\":{}, \"t\":{}}},", cell.pitch, t)
}

/// Write every note of `chart` to `out`. Returns the number of notes written.
pub fn write_chart<W: Write>(chart: &Chart, out: &mut W) -> io::Result<usize> {
    let notes = chart.notes_in_chart_order();
    for &(row, _, cell) in &notes {
        writeln!(out, "{}", export_line(cell, export_time(chart, row)))?;
    }
    Ok(notes.len())
}

/// Write the chart to a file, replacing it.
pub fn export_to_path(chart: &Chart, path: &Path) -> Result<usize> {
    let mut out = BufWriter::new(File::create(path)?);
    let count = write_chart(chart, &mut out)?;
    out.flush()?;
    info!(path = %path.display(), notes = count, "exported chart");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutSettings;
    use crate::layout::ChartLayout;
    use crate::midi::NoteEvent;

    fn export(events: &[NoteEvent]) -> String {
        let max_tick = events.iter().map(|e| e.tick).max();
        let layout = ChartLayout::for_max_tick(max_tick, &LayoutSettings::default());
        let (chart, _) = Chart::build(events, layout);
        let mut out = Vec::new();
        write_chart(&chart, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_note_on_judgment_row_is_time_zero() {
        let text = export(&[NoteEvent { pitch: 60, tick: 0 }]);
        assert_eq!(text, "{\"pitch\":60, \"t\":0},\n");
    }

    #[test]
    fn test_order_is_bottom_up_then_lane() {
        let text = export(&[
            NoteEvent { pitch: 64, tick: 25 },
            NoteEvent { pitch: 62, tick: 0 },
            NoteEvent { pitch: 60, tick: 0 },
        ]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "{\"pitch\":60, \"t\":0},",
                "{\"pitch\":62, \"t\":0},",
                "{\"pitch\":64, \"t\":20},",
            ]
        );
    }

    #[test]
    fn test_empty_chart_writes_nothing() {
        assert_eq!(export(&[]), "");
    }

    #[test]
    fn test_export_to_path() {
        let path = std::env::temp_dir().join(format!("rhythmcore-export-{}.txt", std::process::id()));
        let layout = ChartLayout::for_max_tick(Some(0), &LayoutSettings::default());
        let (chart, _) = Chart::build(&[NoteEvent { pitch: 72, tick: 0 }], layout);
        assert_eq!(export_to_path(&chart, &path).unwrap(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"pitch\":72, \"t\":0},\n");
        let _ = std::fs::remove_file(&path);
    }
}
