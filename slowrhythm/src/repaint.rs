//! Playback cadence.
//!
//! egui only repaints on input. While playing, the chart has to advance
//! without input, so the controller asks for the next frame after a fixed
//! interval. Each of those frames runs one scheduler step. When stopped it
//! schedules nothing and egui sleeps until the next event.

use std::time::Duration;

pub struct RepaintController {
    continuous: bool,
    needs_repaint: bool,
    interval: Duration,
}

impl RepaintController {
    pub fn new(interval: Duration) -> Self {
        Self {
            continuous: false,
            needs_repaint: false,
            interval,
        }
    }

    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    /// One extra frame, e.g. after a file was dropped or a seek that needs
    /// the viewport size.
    pub fn mark_needs_repaint(&mut self) {
        self.needs_repaint = true;
    }

    /// Call at the end of `update()`.
    pub fn end_frame(&mut self, ctx: &egui::Context) {
        if self.continuous {
            ctx.request_repaint_after(self.interval);
        } else if self.needs_repaint {
            ctx.request_repaint();
        }
        self.needs_repaint = false;
    }
}
