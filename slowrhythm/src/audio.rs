//! Sine tones for cues and previews.

use rhythmcore::ToneGenerator;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

const SAMPLE_RATE: u32 = 44_100;
/// Fade in and out over this many samples to avoid clicks.
const RAMP_SAMPLES: usize = 400;

fn pitch_to_freq(pitch: u8) -> f32 {
    440.0 * 2.0_f32.powf((f32::from(pitch) - 69.0) / 12.0)
}

/// A fixed-length sine burst.
struct SineBurst {
    freq: f32,
    len: usize,
    pos: usize,
}

impl SineBurst {
    fn new(pitch: u8, duration: Duration) -> Self {
        Self {
            freq: pitch_to_freq(pitch),
            len: (SAMPLE_RATE as u128 * duration.as_millis() / 1000) as usize,
            pos: 0,
        }
    }
}

impl Iterator for SineBurst {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.len {
            return None;
        }
        let t = self.pos as f32 / SAMPLE_RATE as f32;
        let remaining = self.len - self.pos;
        self.pos += 1;

        let ramp = (self.pos.min(remaining).min(RAMP_SAMPLES)) as f32 / RAMP_SAMPLES as f32;
        let sample = (t * self.freq * std::f32::consts::TAU).sin() * 0.25 * ramp;
        Some(sample.tanh())
    }
}

impl Source for SineBurst {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.len as u64 * 1000 / SAMPLE_RATE as u64))
    }
}

/// Plays each pitch as a short sine burst on its own sink. Without an audio
/// device every request is dropped.
pub struct SineTone {
    _stream: Option<OutputStream>,
    handle: Option<OutputStreamHandle>,
    sinks: HashMap<u8, Sink>,
    duration: Duration,
}

impl SineTone {
    pub fn new(duration: Duration) -> Self {
        let (stream, handle) = match OutputStream::try_default() {
            Ok((stream, handle)) => (Some(stream), Some(handle)),
            Err(err) => {
                warn!(%err, "no audio output, tones are muted");
                (None, None)
            }
        };
        Self {
            _stream: stream,
            handle,
            sinks: HashMap::new(),
            duration,
        }
    }
}

impl ToneGenerator for SineTone {
    fn play_pitch(&mut self, pitch: u8) {
        self.stop_pitch(pitch);
        self.sinks.retain(|_, sink| !sink.empty());

        let Some(handle) = &self.handle else {
            return;
        };
        match Sink::try_new(handle) {
            Ok(sink) => {
                sink.set_volume(0.3);
                sink.append(SineBurst::new(pitch, self.duration));
                self.sinks.insert(pitch, sink);
            }
            Err(err) => warn!(%err, pitch, "could not open audio sink"),
        }
    }

    fn stop_pitch(&mut self, pitch: u8) {
        if let Some(sink) = self.sinks.remove(&pitch) {
            sink.stop();
        }
    }

    fn all_off(&mut self) {
        for (_, sink) in self.sinks.drain() {
            sink.stop();
        }
    }
}
