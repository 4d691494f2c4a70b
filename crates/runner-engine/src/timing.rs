//! Frame timing for the simulation loop.
//!
//! Frames advance by a simulated delta so runs are reproducible; the fixed
//! step drives path following and the variable step drives track upkeep.
//! In realtime mode each frame is additionally paced to the wall clock.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Frame timing manager.
#[derive(Debug)]
pub struct FrameTiming {
    /// Target frames per second
    target_fps: u32,
    /// Time budget per frame
    frame_budget: Duration,
    /// Wall-clock start of the current frame
    frame_start: Instant,
    /// Accumulator for fixed timestep
    accumulator: f32,
    /// Fixed timestep delta
    fixed_dt: f32,
    /// Maximum delta time to prevent spiral of death
    max_dt: f32,
    /// Maximum fixed updates per frame
    max_updates: u32,
    /// Pace frames to the wall clock
    realtime: bool,
    /// Simulated time since the last reset
    elapsed: f64,
    /// Frames since the last reset
    frames: u64,
    /// Recent frame times for averaging
    frame_times: VecDeque<f32>,
    /// Maximum samples for averaging
    max_samples: usize,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameTiming {
    /// Create a new frame timing manager.
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            target_fps,
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(target_fps)),
            frame_start: Instant::now(),
            accumulator: 0.0,
            fixed_dt: 1.0 / 60.0,
            max_dt: 0.25,
            max_updates: 10,
            realtime: false,
            elapsed: 0.0,
            frames: 0,
            frame_times: VecDeque::with_capacity(120),
            max_samples: 120,
        }
    }

    /// Enable wall-clock pacing.
    #[must_use]
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Set the fixed timestep.
    pub fn set_fixed_dt(&mut self, dt: f32) {
        self.fixed_dt = dt.max(0.001);
    }

    /// Get the fixed timestep value.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Get the target FPS.
    #[must_use]
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Frames since the last reset.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Simulated seconds since the last reset.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Starts a frame and returns its simulated delta time.
    pub fn begin_frame(&mut self) -> f32 {
        self.frame_start = Instant::now();
        let dt = self.frame_budget.as_secs_f32().min(self.max_dt);

        self.frame_times.push_back(dt);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }
        self.elapsed += f64::from(dt);
        self.frames += 1;
        dt
    }

    /// Accumulate time for fixed timestep updates.
    /// Returns the number of fixed updates that should be performed.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.min(self.max_dt);
        let mut count = 0;

        while self.accumulator >= self.fixed_dt && count < self.max_updates {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind: drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        count
    }

    /// Sleep for the remainder of the frame budget in realtime mode.
    pub fn sleep_remainder(&self) {
        if !self.realtime {
            return;
        }

        let elapsed = self.frame_start.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
    }

    /// Get the average frame time in milliseconds.
    #[must_use]
    pub fn average_frame_time_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }

        (self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32) * 1000.0
    }

    /// Reset timing (call between runs).
    pub fn reset(&mut self) {
        self.frame_start = Instant::now();
        self.accumulator = 0.0;
        self.elapsed = 0.0;
        self.frames = 0;
        self.frame_times.clear();
    }
}
