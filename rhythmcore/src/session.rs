//! An editing and playback session.
//!
//! [`Session`] ties the loaded chart, its editor, the playback clock and the
//! cue cursor together. The host calls [`Session::tick`] from its timer (a
//! repaint loop in the app) and applies the returned scroll offset; cues come
//! back through a callback that can stop playback on the spot.

use crate::chart::{BuildReport, Chart, NoteCell};
use crate::clock::{PlaybackClock, TickSource, WallTickSource};
use crate::config::Settings;
use crate::editor::Editor;
use crate::layout::ChartLayout;
use crate::midi::{self, ExtractedSequence};
use crate::scroll::{self, ScrollSync, Viewport};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct Session<S: TickSource = WallTickSource> {
    settings: Settings,
    editor: Editor,
    clock: PlaybackClock<S>,
    sync: ScrollSync,
    bpm: f64,
    resolution: u16,
    path: Option<PathBuf>,
}

impl Session<WallTickSource> {
    /// Session driven by real time.
    pub fn with_wall_clock(settings: Settings) -> Self {
        let ms_per_tick = ExtractedSequence::default().ms_per_tick();
        Self::new(settings, WallTickSource::new(ms_per_tick))
    }
}

impl<S: TickSource> Session<S> {
    /// Start with an empty chart.
    pub fn new(settings: Settings, source: S) -> Self {
        let settings = settings.sanitized();
        let empty = ExtractedSequence::default();
        let layout = ChartLayout::for_max_tick(None, &settings.layout);
        let mut session = Self {
            editor: Editor::new(Chart::new(layout), settings.history_limit),
            clock: PlaybackClock::new(source),
            sync: ScrollSync::new(),
            bpm: empty.bpm,
            resolution: empty.resolution,
            path: None,
            settings,
        };
        session.clock.set_ms_per_tick(empty.ms_per_tick());
        session
    }

    /// Build a fresh chart from `sequence`. Stops playback and clears undo
    /// history and clipboard.
    pub fn load_sequence(&mut self, sequence: &ExtractedSequence) -> BuildReport {
        self.stop();
        let layout = ChartLayout::for_max_tick(sequence.max_tick(), &self.settings.layout);
        let (chart, report) = Chart::build(&sequence.events, layout);
        self.editor.replace_chart(chart);

        self.bpm = sequence.bpm;
        self.resolution = sequence.resolution;
        self.clock.set_ms_per_tick(sequence.ms_per_tick());
        self.clock.seek(0);
        self.sync.reset();

        info!(
            notes = report.placed,
            dropped = report.dropped,
            rows = layout.rows(),
            bpm = self.bpm,
            "chart ready"
        );
        report
    }

    /// Load a MIDI file. A missing or broken file gives an empty chart.
    pub fn load(&mut self, path: &Path) -> BuildReport {
        let sequence = midi::load(path);
        self.path = Some(path.to_path_buf());
        self.load_sequence(&sequence)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn chart(&self) -> &Chart {
        self.editor.chart()
    }

    pub fn layout(&self) -> ChartLayout {
        *self.editor.chart().layout()
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn clock(&self) -> &PlaybackClock<S> {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut PlaybackClock<S> {
        &mut self.clock
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn resolution(&self) -> u16 {
        self.resolution
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    pub fn current_tick(&self) -> i64 {
        self.clock.current_tick()
    }

    /// Tick the clock stops at: the start of the last occupied row.
    pub fn end_tick(&self) -> i64 {
        self.chart().last_note_tick().unwrap_or(0)
    }

    /// Start playing from the row under the judgment line. A view past the
    /// last note starts (and immediately finishes) at the end.
    pub fn start(&mut self, viewport: &Viewport) {
        let layout = self.layout();
        let end_tick = self.end_tick();
        let start_tick = scroll::tick_in_view(&layout, viewport).min(end_tick);
        self.sync.prime(start_tick, &layout);
        self.clock.start(start_tick, end_tick);
    }

    pub fn stop(&mut self) -> bool {
        self.clock.stop()
    }

    /// Returns whether playback is running afterwards.
    pub fn toggle_playback(&mut self, viewport: &Viewport) -> bool {
        if self.is_playing() {
            self.stop();
        } else {
            self.start(viewport);
        }
        self.is_playing()
    }

    /// Jump to `tick`. Returns the scroll offset that shows it on the
    /// judgment line.
    pub fn seek(&mut self, tick: i64, viewport: &Viewport) -> f32 {
        let tick = tick.max(0);
        let layout = self.layout();
        self.clock.seek(tick);
        self.sync.prime(tick, &layout);
        scroll::scroll_offset(tick, &layout, viewport)
    }

    /// Change speed by `delta`, clamped to the configured range. Returns the
    /// new speed.
    pub fn adjust_speed(&mut self, delta: f64) -> f64 {
        self.set_speed(self.speed() + delta)
    }

    pub fn set_speed(&mut self, speed: f64) -> f64 {
        // Round to one decimal so repeated steps do not drift.
        let speed = (self.settings.playback.clamp_speed(speed) * 10.0).round() / 10.0;
        self.clock.set_speed(speed);
        debug!(speed, "speed changed");
        speed
    }

    /// One scheduler step.
    ///
    /// Advances the clock and hands every note in every row that crossed the
    /// judgment line to `on_cue`, rows in tick order and lanes ascending.
    /// Returning [`ControlFlow::Break`] from `on_cue` stops playback and no
    /// further cues are delivered.
    ///
    /// Returns the scroll offset for the new position, or `None` when not
    /// playing.
    pub fn tick<F>(&mut self, viewport: &Viewport, mut on_cue: F) -> Option<f32>
    where
        F: FnMut(usize, usize, &NoteCell) -> ControlFlow<()>,
    {
        let step = self.clock.tick()?;
        let layout = self.layout();
        let offset = scroll::smooth_scroll_offset(step.tick, &layout, viewport);

        'rows: for row in self.sync.advance(step.tick, &layout) {
            for (lane, cell) in self.editor.chart().row_cells(row) {
                if on_cue(row, lane, cell).is_break() {
                    self.clock.stop();
                    break 'rows;
                }
            }
        }
        Some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTickSource;
    use crate::midi::NoteEvent;

    fn sequence() -> ExtractedSequence {
        ExtractedSequence {
            events: vec![
                NoteEvent { pitch: 67, tick: 40 },
                NoteEvent { pitch: 60, tick: 0 },
                NoteEvent { pitch: 64, tick: 0 },
                NoteEvent { pitch: 62, tick: 15 },
                NoteEvent { pitch: 65, tick: 30 },
            ],
            ..ExtractedSequence::default()
        }
    }

    fn session() -> Session<ManualTickSource> {
        let mut session = Session::new(Settings::default(), ManualTickSource::new());
        session.load_sequence(&sequence());
        session
    }

    fn viewport() -> Viewport {
        Viewport::new(0.0, 600.0, 24.0)
    }

    fn at_tick(session: &Session<ManualTickSource>, tick: i64) -> Viewport {
        let view = viewport();
        view.with_scroll(scroll::scroll_offset(tick, &session.layout(), &view))
    }

    #[test]
    fn test_every_row_fires_once_in_tick_order() {
        let mut session = session();
        let view = at_tick(&session, 0);
        session.start(&view);

        let mut cues: Vec<(i64, u8)> = Vec::new();
        let mut frames = 0;
        while session.is_playing() {
            session.tick(&view, |row, _, cell| {
                cues.push((session_row_tick(row), cell.pitch));
                ControlFlow::Continue(())
            });
            session.clock_mut().source_mut().advance(7);
            frames += 1;
            assert!(frames < 100);
        }

        assert_eq!(cues, vec![(0, 60), (0, 64), (10, 62), (30, 65), (40, 67)]);
    }

    /// Row tick for the default layout of `sequence()`.
    fn session_row_tick(row: usize) -> i64 {
        let layout = ChartLayout::for_max_tick(Some(40), &Settings::default().layout);
        layout.tick_for_row(row as i64)
    }

    #[test]
    fn test_large_jump_still_fires_every_row() {
        let mut session = session();
        let view = at_tick(&session, 0);
        session.start(&view);

        let mut pitches = Vec::new();
        session.clock_mut().source_mut().advance(1000);
        session.tick(&view, |_, _, cell| {
            pitches.push(cell.pitch);
            ControlFlow::Continue(())
        });

        assert_eq!(pitches, vec![60, 64, 62, 65, 67]);
        assert!(!session.is_playing());
        assert_eq!(session.current_tick(), 40);
    }

    #[test]
    fn test_break_from_cue_stops_delivery() {
        let mut session = session();
        let view = at_tick(&session, 0);
        session.start(&view);
        session.clock_mut().source_mut().advance(1000);

        let mut pitches = Vec::new();
        let offset = session.tick(&view, |_, _, cell| {
            pitches.push(cell.pitch);
            ControlFlow::Break(())
        });

        assert!(offset.is_some());
        assert_eq!(pitches, vec![60]);
        assert!(!session.is_playing());
        assert_eq!(session.tick(&view, |_, _, _| ControlFlow::Continue(())), None);
    }

    #[test]
    fn test_empty_chart_stops_immediately() {
        let mut session = Session::new(Settings::default(), ManualTickSource::new());
        let view = viewport();
        session.start(&view);
        let offset = session.tick(&view, |_, _, _| panic!("no cues expected"));
        assert!(offset.is_some());
        assert!(!session.is_playing());
        assert_eq!(session.current_tick(), 0);
    }

    #[test]
    fn test_start_uses_row_under_judgment_line() {
        let mut session = session();
        let view = at_tick(&session, 30);
        session.start(&view);
        assert_eq!(session.clock().state().start_tick, 30);

        let mut pitches = Vec::new();
        session.tick(&view, |_, _, cell| {
            pitches.push(cell.pitch);
            ControlFlow::Continue(())
        });
        assert_eq!(pitches, vec![65]);
    }

    #[test]
    fn test_seek_returns_scroll_for_tick() {
        let mut session = session();
        let view = viewport();
        let offset = session.seek(30, &view);
        let view = view.with_scroll(offset);
        assert_eq!(scroll::tick_in_view(&session.layout(), &view), 30);
        assert_eq!(session.current_tick(), 30);
    }

    #[test]
    fn test_seek_while_playing_rebases_cues() {
        let mut session = Session::new(Settings::default(), ManualTickSource::new());
        session.load_sequence(&ExtractedSequence {
            events: (0..6).map(|i| NoteEvent { pitch: 60 + i as u8, tick: i * 10 }).collect(),
            ..ExtractedSequence::default()
        });
        let view = at_tick(&session, 0);
        let mut pitches = Vec::new();
        let mut cue = |_: usize, _: usize, cell: &NoteCell| {
            pitches.push(cell.pitch);
            ControlFlow::Continue(())
        };

        session.start(&view);
        session.tick(&view, &mut cue);
        session.clock_mut().source_mut().advance(25);
        session.tick(&view, &mut cue);

        // Back to tick 10: rows 10 and 20 play again.
        session.seek(10, &view);
        assert!(session.is_playing());
        session.tick(&view, &mut cue);
        session.clock_mut().source_mut().advance(15);
        session.tick(&view, &mut cue);

        // Forward to tick 40: row 30 is skipped.
        session.seek(40, &view);
        session.tick(&view, &mut cue);
        session.clock_mut().source_mut().advance(100);
        session.tick(&view, &mut cue);

        assert_eq!(pitches, vec![60, 61, 62, 61, 62, 64, 65]);
        assert!(!session.is_playing());
        assert_eq!(session.current_tick(), 50);
    }

    #[test]
    fn test_speed_is_clamped_and_stepped() {
        let mut session = session();
        assert_eq!(session.adjust_speed(0.2), 1.2);
        assert_eq!(session.adjust_speed(-0.2), 1.0);
        assert_eq!(session.adjust_speed(10.0), 5.0);
        assert_eq!(session.adjust_speed(-10.0), 0.2);
        for _ in 0..3 {
            session.adjust_speed(0.2);
        }
        assert_eq!(session.speed(), 0.8);
    }

    #[test]
    fn test_reload_resets_editing_state() {
        let mut session = session();
        let row = session.layout().judgment_row() as usize;
        session.editor_mut().copy((row, 0)).unwrap();
        session.editor_mut().delete((row, 0)).unwrap();
        assert!(session.editor().history().can_undo());

        session.load_sequence(&sequence());
        assert!(!session.editor().history().can_undo());
        assert!(session.editor().clipboard().is_none());
        assert_eq!(session.chart().len(), 5);
    }

    #[test]
    fn test_edits_while_playing_affect_later_cues() {
        let mut session = session();
        let view = at_tick(&session, 0);
        session.start(&view);
        session.tick(&view, |_, _, _| ControlFlow::Continue(()));

        let row = session.layout().row_for_tick(30) as usize;
        let lane = session.chart().row_cells(row).map(|(lane, _)| lane).next().unwrap();
        session.editor_mut().delete((row, lane)).unwrap();

        let mut pitches = Vec::new();
        session.clock_mut().source_mut().advance(1000);
        session.tick(&view, |_, _, cell| {
            pitches.push(cell.pitch);
            ControlFlow::Continue(())
        });
        assert_eq!(pitches, vec![62, 67]);
    }
}
