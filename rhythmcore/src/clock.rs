//! Playback transport.
//!
//! [`PlaybackClock`] is a two-state machine (stopped / playing) that turns a
//! [`TickSource`] into a monotonic stream of tick positions and stops by
//! itself at the end of the chart. The source is either wall time scaled by
//! a speed multiplier ([`WallTickSource`]) or something driven externally,
//! such as a sequencer or [`ManualTickSource`] in tests.
//!
//! Ticks grow from the start position toward the last note. The chart row
//! under the judgment line is what counts down toward row 0.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A monotonic time reading relative to some fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Real time, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Time that only moves when told to. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<Duration>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.0.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.0.get()
    }
}

/// Where playback positions come from.
pub trait TickSource {
    /// Begin advancing from `tick`.
    fn start(&mut self, tick: i64);
    /// Freeze at the current position.
    fn stop(&mut self);
    /// Jump to `tick`, keeping the running state.
    fn seek(&mut self, tick: i64);
    fn current_tick(&self) -> i64;

    fn set_speed(&mut self, _speed: f64) {}
    fn set_ms_per_tick(&mut self, _ms_per_tick: f64) {}
}

/// Ticks derived from elapsed time:
/// `base_tick + floor(elapsed_ms * speed / ms_per_tick)`.
///
/// Changing speed or tempo re-bases at the current tick, so positions
/// already reached are never rewritten.
#[derive(Debug, Clone)]
pub struct WallTickSource<C: Clock = MonotonicClock> {
    clock: C,
    ms_per_tick: f64,
    speed: f64,
    base_tick: i64,
    /// Clock reading at the last (re)base; `None` while stopped.
    origin: Option<Duration>,
}

impl WallTickSource<MonotonicClock> {
    pub fn new(ms_per_tick: f64) -> Self {
        Self::with_clock(MonotonicClock::default(), ms_per_tick)
    }
}

impl<C: Clock> WallTickSource<C> {
    pub fn with_clock(clock: C, ms_per_tick: f64) -> Self {
        Self {
            clock,
            ms_per_tick: sanitize_positive(ms_per_tick, 1.0),
            speed: 1.0,
            base_tick: 0,
            origin: None,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn ms_per_tick(&self) -> f64 {
        self.ms_per_tick
    }

    pub fn is_running(&self) -> bool {
        self.origin.is_some()
    }

    fn rebase(&mut self) {
        if self.origin.is_some() {
            self.base_tick = self.current_tick();
            self.origin = Some(self.clock.now());
        }
    }
}

impl<C: Clock> TickSource for WallTickSource<C> {
    fn start(&mut self, tick: i64) {
        self.base_tick = tick;
        self.origin = Some(self.clock.now());
    }

    fn stop(&mut self) {
        self.base_tick = self.current_tick();
        self.origin = None;
    }

    fn seek(&mut self, tick: i64) {
        self.base_tick = tick;
        if self.origin.is_some() {
            self.origin = Some(self.clock.now());
        }
    }

    fn current_tick(&self) -> i64 {
        let Some(origin) = self.origin else {
            return self.base_tick;
        };
        let elapsed = self.clock.now().saturating_sub(origin);
        let elapsed_ms = elapsed.as_micros() as f64 / 1000.0;
        self.base_tick + (elapsed_ms * self.speed / self.ms_per_tick).floor() as i64
    }

    fn set_speed(&mut self, speed: f64) {
        self.rebase();
        self.speed = sanitize_positive(speed, 1.0);
    }

    fn set_ms_per_tick(&mut self, ms_per_tick: f64) {
        self.rebase();
        self.ms_per_tick = sanitize_positive(ms_per_tick, self.ms_per_tick);
    }
}

fn sanitize_positive(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

/// A tick source moved by hand. Advancing has no effect while stopped.
#[derive(Debug, Clone, Default)]
pub struct ManualTickSource {
    tick: i64,
    running: bool,
}

impl ManualTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ticks: i64) {
        if self.running {
            self.tick += ticks;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl TickSource for ManualTickSource {
    fn start(&mut self, tick: i64) {
        self.tick = tick;
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn seek(&mut self, tick: i64) {
        self.tick = tick;
    }

    fn current_tick(&self) -> i64 {
        self.tick
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Playing,
}

/// Transport state of the current (or last) playback run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub running: bool,
    pub start_wall_time: Option<Instant>,
    /// Captured from the viewport on every start, never resumed.
    pub start_tick: i64,
    pub speed_multiplier: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            running: false,
            start_wall_time: None,
            start_tick: 0,
            speed_multiplier: 1.0,
        }
    }
}

/// One position report from [`PlaybackClock::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    pub tick: i64,
    /// The end was reached and the clock has stopped itself.
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct PlaybackClock<S: TickSource> {
    source: S,
    state: PlaybackState,
    end_tick: i64,
    last_tick: i64,
}

impl<S: TickSource> PlaybackClock<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: PlaybackState::default(),
            end_tick: 0,
            last_tick: 0,
        }
    }

    pub fn clock_state(&self) -> ClockState {
        if self.state.running {
            ClockState::Playing
        } else {
            ClockState::Stopped
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.running
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn end_tick(&self) -> i64 {
        self.end_tick
    }

    /// Last reported position.
    pub fn current_tick(&self) -> i64 {
        self.last_tick
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Start playing from `start_tick` toward `end_tick`. Restarts when
    /// already playing.
    pub fn start(&mut self, start_tick: i64, end_tick: i64) {
        let start_tick = start_tick.max(0);
        self.end_tick = end_tick.max(start_tick);
        self.last_tick = start_tick;
        self.state.running = true;
        self.state.start_tick = start_tick;
        self.state.start_wall_time = Some(Instant::now());
        self.source.set_speed(self.state.speed_multiplier);
        self.source.start(start_tick);
        info!(start_tick, end_tick = self.end_tick, "playback started");
    }

    /// Stop playing. Returns `false` if already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.state.running {
            return false;
        }
        self.source.stop();
        self.state.running = false;
        self.state.start_wall_time = None;
        info!(tick = self.last_tick, "playback stopped");
        true
    }

    /// Advance to the source's position. Returns `None` while stopped.
    ///
    /// Positions never go backwards and never pass the end tick. The end
    /// position is reported once with `finished` set, after which the clock
    /// is stopped.
    pub fn tick(&mut self) -> Option<ClockTick> {
        if !self.state.running {
            return None;
        }
        let tick = self
            .source
            .current_tick()
            .max(self.last_tick)
            .min(self.end_tick.max(self.last_tick));
        self.last_tick = tick;

        let finished = tick >= self.end_tick;
        if finished {
            debug!(tick, "reached end of chart");
            self.stop();
        }
        Some(ClockTick { tick, finished })
    }

    /// Move to `tick`. While playing, playback continues from there.
    pub fn seek(&mut self, tick: i64) {
        let tick = tick.max(0);
        self.last_tick = tick;
        self.source.seek(tick);
    }

    pub fn speed(&self) -> f64 {
        self.state.speed_multiplier
    }

    /// Takes effect from the current position onwards.
    pub fn set_speed(&mut self, speed: f64) {
        self.state.speed_multiplier = speed;
        self.source.set_speed(speed);
    }

    pub fn set_ms_per_tick(&mut self, ms_per_tick: f64) {
        self.source.set_ms_per_tick(ms_per_tick);
    }
}
