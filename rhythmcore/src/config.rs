//! Persistent settings
//!
//! Tuning constants for chart geometry and playback. Stored as pretty JSON;
//! every field has a default so older or partial files still load.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Upper bounds for hand-edited values. Past these the grid gets too large
/// to lay out.
const MAX_TICKS_PER_ROW: i64 = 100_000;
const MAX_LANES: usize = 64;
const MAX_JUDGMENT_OFFSET: i64 = 10_000;
const MAX_EXTRA_ROWS: i64 = 1_000_000;
const MAX_ROW_HEIGHT: f32 = 200.0;

/// Geometry of the chart grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// MIDI ticks covered by one chart row.
    pub ticks_per_row: i64,
    /// Number of playable lanes (columns).
    pub lane_count: usize,
    /// Rows between the bottom of the grid and the row of tick 0.
    pub judgment_offset: i64,
    /// Extra rows above the last note.
    pub padding_rows: i64,
    /// Row count used when no sequence is loaded.
    pub empty_rows: i64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            ticks_per_row: 10,
            lane_count: 8,
            judgment_offset: 30,
            padding_rows: 500,
            empty_rows: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Scheduler cadence while playing.
    pub tick_interval_ms: u64,
    pub speed_step: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    /// How long a cue or preview tone sounds.
    pub preview_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            speed_step: 0.2,
            min_speed: 0.2,
            max_speed: 5.0,
            preview_ms: 300,
        }
    }
}

impl PlaybackSettings {
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        speed.clamp(self.min_speed, self.max_speed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub layout: LayoutSettings,
    pub playback: PlaybackSettings,
    /// Maximum number of undo snapshots kept.
    pub history_limit: usize,
    /// Height of one chart row in pixels.
    pub row_height: f32,
    pub export_file_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layout: LayoutSettings::default(),
            playback: PlaybackSettings::default(),
            history_limit: 50,
            row_height: 24.0,
            export_file_name: "output.txt".into(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        Ok(settings.sanitized())
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring unreadable settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Replace values the engine cannot work with by their defaults and
    /// pull oversized ones back into range.
    pub fn sanitized(mut self) -> Self {
        let defaults = Settings::default();
        let layout = &mut self.layout;
        if layout.ticks_per_row <= 0 {
            layout.ticks_per_row = defaults.layout.ticks_per_row;
        }
        layout.ticks_per_row = layout.ticks_per_row.min(MAX_TICKS_PER_ROW);
        if layout.lane_count == 0 {
            layout.lane_count = defaults.layout.lane_count;
        }
        layout.lane_count = layout.lane_count.min(MAX_LANES);
        layout.judgment_offset = layout.judgment_offset.clamp(0, MAX_JUDGMENT_OFFSET);
        layout.padding_rows = layout.padding_rows.clamp(0, MAX_EXTRA_ROWS);
        layout.empty_rows = layout.empty_rows.min(MAX_EXTRA_ROWS);
        if layout.empty_rows <= layout.judgment_offset {
            layout.empty_rows = defaults.layout.empty_rows.max(layout.judgment_offset + 1);
        }

        let playback = &mut self.playback;
        if !(playback.min_speed > 0.0)
            || !playback.max_speed.is_finite()
            || playback.min_speed > playback.max_speed
        {
            playback.min_speed = defaults.playback.min_speed;
            playback.max_speed = defaults.playback.max_speed;
        }
        // A negative step would swap the slower and faster keys.
        if !(playback.speed_step > 0.0) || playback.speed_step > playback.max_speed {
            playback.speed_step = defaults.playback.speed_step;
        }
        if playback.tick_interval_ms == 0 {
            playback.tick_interval_ms = defaults.playback.tick_interval_ms;
        }

        if !(self.row_height > 0.0) {
            self.row_height = defaults.row_height;
        }
        self.row_height = self.row_height.min(MAX_ROW_HEIGHT);
        self
    }
}
