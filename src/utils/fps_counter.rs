use std::time::{Duration, Instant};

/// Frames-per-second estimate, refreshed once per second.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    last_update: Instant,
    frame_count: u32,
    accumulated_time: Duration,
    pub current_fps: f32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
            accumulated_time: Duration::ZERO,
            current_fps: 0.0,
        }
    }

    /// Counts a frame. Returns the new estimate when a full second has passed.
    pub fn update(&mut self) -> Option<f32> {
        let now = Instant::now();
        let delta = now - self.last_update;
        self.last_update = now;
        self.record(delta)
    }

    fn record(&mut self, delta: Duration) -> Option<f32> {
        self.frame_count += 1;
        self.accumulated_time += delta;

        if self.accumulated_time.as_secs_f32() >= 1.0 {
            self.current_fps = self.frame_count as f32 / self.accumulated_time.as_secs_f32();
            self.accumulated_time = Duration::ZERO;
            self.frame_count = 0;
            return Some(self.current_fps);
        }

        None
    }

    /// `"<base> | 60.0 FPS"`.
    #[must_use]
    pub fn title(&self, base: &str) -> String {
        format!("{base} | {:.1} FPS", self.current_fps)
    }
}
