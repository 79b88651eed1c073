use std::time::{Duration, Instant};

/// Per-frame wall time, clamped against stalls.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last: Instant,
    frames: u64,
    dt_max: Duration,
    total: Duration,
    slowest: Duration,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            dt_max: Duration::from_millis(250),
            total: Duration::ZERO,
            slowest: Duration::ZERO,
        }
    }

    /// Restarts the measurement without touching the totals.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Ends the current frame and returns its duration.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last).min(self.dt_max);
        self.last = now;

        self.frames = self.frames.wrapping_add(1);
        self.total += dt;
        self.slowest = self.slowest.max(dt);
        dt
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn average(&self) -> Duration {
        match self.frames {
            0 => Duration::ZERO,
            n => self.total / n as u32,
        }
    }

    pub fn slowest(&self) -> Duration {
        self.slowest
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_timer_averages_zero() {
        let timer = FrameTimer::new();
        assert_eq!(timer.frames(), 0);
        assert_eq!(timer.average(), Duration::ZERO);
    }

    #[test]
    fn ticks_are_clamped_and_counted() {
        let mut timer = FrameTimer::new();
        let dt = timer.tick();
        assert!(dt <= Duration::from_millis(250));
        timer.tick();
        assert_eq!(timer.frames(), 2);
        assert!(timer.slowest() >= timer.average());
    }
}
