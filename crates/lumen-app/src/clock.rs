//! Variable-step frame clock.
//!
//! Camera movement and threshold ramps are scaled by the measured frame time,
//! so a long stall (window drag, debugger break) is clamped rather than
//! turned into one huge step.

use std::time::Instant;
use tracing::warn;

/// Longest frame time fed to the simulation, in seconds.
pub const MAX_FRAME_TIME: f32 = 0.25;

pub struct FrameClock {
    previous_time: Instant,
    total_time: f32,
    frame_count: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            previous_time: Instant::now(),
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Measure the time since the previous tick and advance the clock.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.previous_time).as_secs_f32();
        self.previous_time = now;
        self.advance(elapsed)
    }

    /// Advance by an explicit frame time. Returns the clamped step.
    pub fn advance(&mut self, elapsed: f32) -> f32 {
        let dt = if elapsed > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                elapsed * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            MAX_FRAME_TIME
        } else {
            elapsed.max(0.0)
        };
        self.total_time += dt;
        self.frame_count += 1;
        dt
    }

    /// Seconds of simulated time since start.
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(0.016), 0.016);
        clock.advance(0.016);
        assert!((clock.total_time() - 0.032).abs() < 1e-6);
        assert_eq!(clock.frame_count(), 2);
    }

    #[test]
    fn test_long_frames_are_clamped() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(3.0), MAX_FRAME_TIME);
        assert_eq!(clock.total_time(), MAX_FRAME_TIME);
    }

    #[test]
    fn test_negative_time_is_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(-1.0), 0.0);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn test_tick_is_non_negative() {
        let mut clock = FrameClock::new();
        let dt = clock.tick();
        assert!((0.0..=MAX_FRAME_TIME).contains(&dt));
    }
}
