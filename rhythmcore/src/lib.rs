//! rhythmcore — chart engine behind slowRhythm
//!
//! Turns a Standard MIDI File into a lane chart for a vertical rhythm game
//! and keeps a scrolling view and a tone cursor in step with musical time.
//!
//! Pipeline: [`midi`] extracts note-ons and tempo, [`layout`] fixes the
//! row/tick geometry, [`lanes`] places each note into a free lane and
//! [`chart`] stores the result. [`session`] drives playback through
//! [`clock`] and [`scroll`], and routes edits through [`editor`] and
//! [`history`].
//!
//! Nothing here depends on a UI toolkit. Renderers read the chart through
//! [`GridSource`], tones go out through [`ToneGenerator`].

pub mod chart;
pub mod clock;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod history;
pub mod lanes;
pub mod layout;
pub mod midi;
pub mod scroll;
pub mod session;
pub mod tone;

pub use chart::{note_name, BuildReport, Chart, GridSource, NoteCell};
pub use clock::{ClockState, PlaybackClock, PlaybackState, TickSource, WallTickSource};
pub use config::Settings;
pub use editor::Editor;
pub use error::{ChartError, EditError, Result};
pub use history::EditHistory;
pub use lanes::LaneAssigner;
pub use layout::ChartLayout;
pub use midi::{ExtractedSequence, NoteEvent};
pub use scroll::{ScrollSync, Viewport};
pub use session::Session;
pub use tone::ToneGenerator;
