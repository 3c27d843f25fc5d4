//! Audio clock abstraction.
//!
//! The engine schedules envelope ramps and stops against a monotonic clock
//! that advances independently of note commands. Rendering drives the
//! default [`SampleClock`]; hosts that already own a clock (a browser
//! `AudioContext`, a test) can feed a [`ManualClock`] instead.

use std::cell::Cell;
use std::rc::Rc;

pub trait AudioClock {
    /// Current time in seconds. Never decreases.
    fn now(&self) -> f64;

    /// Called by the engine after it rendered `frames` samples.
    fn rendered(&mut self, frames: usize, sample_rate: f64);
}

/// Counts rendered frames; time is exact at every block boundary.
#[derive(Debug, Clone)]
pub struct SampleClock {
    frames: u64,
    sample_rate: f64,
}

impl SampleClock {
    pub fn new(sample_rate: f64) -> Self {
        SampleClock {
            frames: 0,
            sample_rate,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl AudioClock for SampleClock {
    fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate
    }

    fn rendered(&mut self, frames: usize, _sample_rate: f64) {
        self.frames += frames as u64;
    }
}

/// A clock moved by hand. Clones share the same time, so the owner of the
/// engine can keep a handle and step it.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock::default()
    }

    /// Jump to `seconds`. Earlier times are ignored to keep the clock monotonic.
    pub fn set(&self, seconds: f64) {
        if seconds > self.time.get() {
            self.time.set(seconds);
        }
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.time.get() + seconds);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.time.get()
    }

    fn rendered(&mut self, frames: usize, sample_rate: f64) {
        self.advance(frames as f64 / sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_clock_counts_frames() {
        let mut clock = SampleClock::new(48000.0);
        assert_eq!(clock.now(), 0.0);
        clock.rendered(480, 48000.0);
        clock.rendered(480, 48000.0);
        assert_eq!(clock.frames(), 960);
        assert!((clock.now() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn manual_clock_handles_share_time() {
        let handle = ManualClock::new();
        let mut owned = handle.clone();
        handle.advance(0.5);
        assert_eq!(owned.now(), 0.5);
        owned.rendered(100, 1000.0);
        assert!((handle.now() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn manual_clock_is_monotonic() {
        let clock = ManualClock::new();
        clock.set(2.0);
        clock.set(1.0);
        assert_eq!(clock.now(), 2.0);
    }
}
