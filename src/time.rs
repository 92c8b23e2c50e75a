use std::time::{Duration, Instant};

/// Frame clock. Animation advances by a fixed step so a run renders the same
/// frames regardless of how long the GPU takes; wall time is kept for logs.
pub struct Time {
    step: f32,
    elapsed: f32,
    now: Instant,
}

impl Time {
    pub fn fixed(step: f32) -> Time {
        Time {
            step,
            elapsed: 0.0,
            now: Instant::now(),
        }
    }

    pub fn delta_time(&self) -> f32 {
        self.step
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Wall time since the previous tick.
    pub fn frame_duration(&self) -> Duration {
        self.now.elapsed()
    }

    pub fn tick(&mut self) {
        self.elapsed += self.step;
        self.now = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_advance_by_the_fixed_step() {
        let mut time = Time::fixed(0.5);
        time.tick();
        time.tick();
        assert_eq!(time.elapsed(), 1.0);
        assert_eq!(time.delta_time(), 0.5);
    }
}
