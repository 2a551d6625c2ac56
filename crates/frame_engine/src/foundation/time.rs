//! Time management utilities
//!
//! The frame loop reads time through [`MonotonicClock`] so tests can drive
//! it deterministically. [`FrameClock`] keeps two separate timestamps: one
//! for the previous loop iteration (navigation delta) and one for the last
//! frame that actually reached the screen (frame time handed to systems).

use std::time::Instant;

/// Source of monotonic timestamps
pub trait MonotonicClock {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl MonotonicClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Per-iteration and per-frame delta tracking
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    last_tick: Instant,
    last_frame: Instant,
}

impl FrameClock {
    /// Start both timestamps at `now`
    pub fn new(now: Instant) -> Self {
        Self {
            last_tick: now,
            last_frame: now,
        }
    }

    /// Seconds since the previous call to `tick`, then advance
    pub fn tick(&mut self, now: Instant) -> f32 {
        let delta = now.saturating_duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        delta
    }

    /// Seconds since the last committed frame; does not advance
    pub fn frame_time(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.last_frame).as_secs_f32()
    }

    /// Commit a successfully presented frame
    pub fn mark_frame(&mut self, now: Instant) {
        self.last_frame = now;
    }
}
