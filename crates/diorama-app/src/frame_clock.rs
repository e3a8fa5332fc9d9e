//! Variable-timestep frame clock.

use std::time::Instant;

use diorama_globe::FrameTime;

/// Longest delta handed to the driver. Longer stalls are clamped.
pub const MAX_DELTA: f64 = 0.25;

const FPS_SMOOTHING: f64 = 0.9;

/// Measures frame deltas and keeps a smoothed frame rate.
#[derive(Debug)]
pub struct FrameClock {
    previous: Instant,
    elapsed: f64,
    frame: u64,
    fps: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            previous: Instant::now(),
            elapsed: 0.0,
            frame: 0,
            fps: 0.0,
        }
    }

    /// Measure the time since the last tick.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let raw = now.duration_since(self.previous).as_secs_f64();
        self.previous = now;
        self.advance(raw)
    }

    /// Advance by `raw` seconds of wall time.
    pub fn advance(&mut self, raw: f64) -> FrameTime {
        let raw = raw.max(0.0);
        if raw > MAX_DELTA {
            tracing::debug!(
                "Frame took {:.1}ms, clamping to {:.0}ms",
                raw * 1000.0,
                MAX_DELTA * 1000.0
            );
        }
        let delta = raw.min(MAX_DELTA);
        self.elapsed += raw;

        if raw > 0.0 {
            let instant_fps = 1.0 / raw;
            self.fps = if self.frame == 0 || self.fps == 0.0 {
                instant_fps
            } else {
                self.fps * FPS_SMOOTHING + instant_fps * (1.0 - FPS_SMOOTHING)
            };
        }

        let time = FrameTime {
            delta: delta as f32,
            elapsed: self.elapsed,
            frame: self.frame,
        };
        self.frame += 1;
        time
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Frames ticked so far.
    pub fn frames(&self) -> u64 {
        self.frame
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
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
    fn test_delta_and_elapsed() {
        let mut clock = FrameClock::new();
        let first = clock.advance(0.016);
        assert_eq!(first.frame, 0);
        assert!((first.delta - 0.016).abs() < 1e-6);

        let second = clock.advance(0.020);
        assert_eq!(second.frame, 1);
        assert!((second.elapsed - 0.036).abs() < 1e-9);
        assert_eq!(clock.frames(), 2);
    }

    #[test]
    fn test_long_stall_is_clamped() {
        let mut clock = FrameClock::new();
        let time = clock.advance(3.0);
        assert_eq!(time.delta, MAX_DELTA as f32);
        assert!((time.elapsed - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_fps_is_smoothed() {
        let mut clock = FrameClock::new();
        clock.advance(1.0 / 60.0);
        assert!((clock.fps() - 60.0).abs() < 1e-6);

        clock.advance(1.0 / 30.0);
        assert!((clock.fps() - 57.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_time_is_ignored() {
        let mut clock = FrameClock::new();
        let time = clock.advance(-1.0);
        assert_eq!(time.delta, 0.0);
        assert_eq!(clock.fps(), 0.0);
    }
}
