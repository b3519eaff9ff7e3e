//! Tone output seam.
//!
//! The engine only says which pitch should start or stop sounding; the app
//! supplies the synthesizer.

pub trait ToneGenerator {
    fn play_pitch(&mut self, pitch: u8);
    fn stop_pitch(&mut self, pitch: u8);
    /// Silence everything. Called when playback stops.
    fn all_off(&mut self);
}

/// Remembers what was requested. Handy for checking cue delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingTone {
    pub played: Vec<u8>,
    pub sounding: Vec<u8>,
}

impl ToneGenerator for RecordingTone {
    fn play_pitch(&mut self, pitch: u8) {
        self.played.push(pitch);
        if !self.sounding.contains(&pitch) {
            self.sounding.push(pitch);
        }
    }

    fn stop_pitch(&mut self, pitch: u8) {
        self.sounding.retain(|&p| p != pitch);
    }

    fn all_off(&mut self) {
        self.sounding.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_tone() {
        let mut tone = RecordingTone::default();
        tone.play_pitch(60);
        tone.play_pitch(64);
        tone.play_pitch(60);
        tone.stop_pitch(64);
        assert_eq!(tone.played, vec![60, 64, 60]);
        assert_eq!(tone.sounding, vec![60]);
        tone.all_off();
        assert!(tone.sounding.is_empty());
    }
}
