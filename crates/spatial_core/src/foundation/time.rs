//! Frame timing
//!
//! The trigger box sweep and AI arrival tolerance are both expressed in
//! terms of the elapsed frame time, so that value must stay bounded. A long
//! hitch (debugger break, window drag) is clamped to `max_step`.

use std::time::Instant;

/// Frame clock producing a bounded delta time each frame
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
    fixed_step: Option<f32>,
    max_step: f32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Largest delta handed out by default (a 10 fps floor)
    pub const DEFAULT_MAX_STEP: f32 = 0.1;

    /// Create a wall-clock driven frame clock
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
            fixed_step: None,
            max_step: Self::DEFAULT_MAX_STEP,
        }
    }

    /// Create a clock that always reports `step` seconds per frame
    pub fn fixed(step: f32) -> Self {
        Self {
            fixed_step: Some(step),
            ..Self::new()
        }
    }

    /// Set the clamp applied to wall-clock deltas
    pub fn with_max_step(mut self, max_step: f32) -> Self {
        self.max_step = max_step;
        self
    }

    /// Advance one frame and return the elapsed time in seconds
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let measured = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.delta_time = self.fixed_step.unwrap_or_else(|| measured.min(self.max_step));
        self.total_time += self.delta_time;
        self.frame_count += 1;
        self.delta_time
    }

    /// Time elapsed during the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Total simulated time in seconds
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of frames ticked so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
