//! MIDI event extraction
//!
//! Reads a Standard MIDI File and keeps only what the chart needs: one
//! [`NoteEvent`] per note-on with a positive velocity, and the tempo of the
//! last tempo meta event (there is no tempo map).
//!
//! Events come out in file iteration order (track by track, event by event),
//! not sorted by tick. Lane assignment depends on that order.
//!
//! Broken input never aborts loading: [`load`] falls back to an empty
//! sequence at 120 BPM, and a damaged track is skipped while the others are
//! still read.

use crate::error::{ChartError, Result};
use midly::{MetaMessage, MidiMessage, Timing, TrackEventKind};
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_BPM: f64 = 120.0;

/// Pulses per quarter note assumed when the file does not provide one.
pub const DEFAULT_RESOLUTION: u16 = 480;

/// A single note-on, in absolute ticks from the start of its track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub pitch: u8,
    pub tick: i64,
}

/// Everything extracted from one MIDI file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSequence {
    pub events: Vec<NoteEvent>,
    pub bpm: f64,
    /// Pulses per quarter note from the file header.
    pub resolution: u16,
}

impl Default for ExtractedSequence {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            bpm: DEFAULT_BPM,
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

impl ExtractedSequence {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Largest note-on tick, or `None` for an empty sequence.
    pub fn max_tick(&self) -> Option<i64> {
        self.events.iter().map(|e| e.tick).max()
    }

    pub fn ms_per_tick(&self) -> f64 {
        ms_per_tick(self.bpm, self.resolution)
    }
}

/// Wall-clock milliseconds covered by one tick at the given tempo.
pub fn ms_per_tick(bpm: f64, resolution: u16) -> f64 {
    let bpm = if bpm > 0.0 { bpm } else { DEFAULT_BPM };
    let resolution = if resolution > 0 { resolution } else { DEFAULT_RESOLUTION };
    60_000.0 / (bpm * f64::from(resolution))
}

/// Convert a tempo meta value (microseconds per quarter note) to BPM.
pub fn tempo_to_bpm(micros_per_quarter: u32) -> Option<f64> {
    if micros_per_quarter == 0 {
        return None;
    }
    Some(60_000_000.0 / f64::from(micros_per_quarter))
}

/// Extract note-ons and tempo from raw SMF bytes.
///
/// Fails only when the file header itself cannot be read. Track-level damage
/// is logged and skipped.
pub fn extract(data: &[u8]) -> Result<ExtractedSequence> {
    let (header, tracks) = midly::parse(data)?;

    let resolution = match header.timing {
        Timing::Metrical(ticks_per_beat) => ticks_per_beat.as_int(),
        Timing::Timecode(fps, subframe) => {
            warn!(
                fps = fps.as_int(),
                subframe, "SMPTE timing has no quarter-note resolution, assuming {}", DEFAULT_RESOLUTION
            );
            DEFAULT_RESOLUTION
        }
    };

    let mut sequence = ExtractedSequence {
        resolution,
        ..ExtractedSequence::default()
    };

    for (index, track) in tracks.enumerate() {
        let events = match track {
            Ok(events) => events,
            Err(err) => {
                warn!(track = index, %err, "skipping unreadable track");
                continue;
            }
        };

        let mut tick: i64 = 0;
        for event in events {
            let event = match event {
                Ok(event) => event,
                Err(err) => {
                    warn!(track = index, tick, %err, "track truncated, keeping events read so far");
                    break;
                }
            };
            tick += i64::from(event.delta.as_int());

            match event.kind {
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { key, vel },
                    ..
                } if vel.as_int() > 0 => {
                    sequence.events.push(NoteEvent {
                        pitch: key.as_int(),
                        tick,
                    });
                }
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                    if let Some(bpm) = tempo_to_bpm(tempo.as_int()) {
                        sequence.bpm = bpm;
                    }
                }
                _ => {}
            }
        }
    }

    debug!(
        notes = sequence.events.len(),
        bpm = sequence.bpm,
        resolution = sequence.resolution,
        "extracted MIDI sequence"
    );
    Ok(sequence)
}

/// Read and extract a MIDI file, reporting why it failed.
pub fn try_load(path: &Path) -> Result<ExtractedSequence> {
    if !path.exists() {
        return Err(ChartError::NotFound(path.to_path_buf()));
    }
    let data = std::fs::read(path)?;
    extract(&data)
}

/// Read and extract a MIDI file. Any failure yields an empty sequence at the
/// default tempo so the editor stays usable.
pub fn load(path: &Path) -> ExtractedSequence {
    match try_load(path) {
        Ok(sequence) => {
            info!(path = %path.display(), notes = sequence.events.len(), bpm = sequence.bpm, "loaded MIDI file");
            sequence
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "could not load MIDI file, starting with an empty chart");
            ExtractedSequence::default()
        }
    }
}
