//! Time management utilities

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock {
    /// Time since the clock's origin
    fn now(&self) -> Duration;
}

/// High-resolution wall clock
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// Create a clock at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Move time forward by `seconds`
    pub fn advance_secs(&self, seconds: f32) {
        self.advance(Duration::from_secs_f32(seconds));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Stops a running [`FrameLoop`] from inside a callback
#[derive(Debug, Clone)]
pub struct StopHandle(Rc<Cell<bool>>);

impl StopHandle {
    /// Stop the loop; the current tick still completes
    pub fn stop(&self) {
        self.0.set(false);
    }

    /// Whether the loop is running
    pub fn is_running(&self) -> bool {
        self.0.get()
    }
}

/// Frame timing driven by a [`Clock`]
///
/// Ticks are inert until [`FrameLoop::start`]. The first tick after a start
/// measures from the start.
pub struct FrameLoop {
    clock: Box<dyn Clock>,
    running: Rc<Cell<bool>>,
    last_tick: Option<Duration>,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new(Box::new(SystemClock::new()))
    }
}

impl FrameLoop {
    /// Create a stopped loop over `clock`
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            running: Rc::new(Cell::new(false)),
            last_tick: None,
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Start the loop; returns `false` when it is already running
    pub fn start(&mut self) -> bool {
        if self.running.get() {
            return false;
        }
        self.running.set(true);
        self.last_tick = Some(self.clock.now());
        true
    }

    /// Stop the loop
    pub fn stop(&mut self) {
        self.running.set(false);
    }

    /// Whether the loop is running
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Handle that stops this loop
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Rc::clone(&self.running))
    }

    /// Advance one frame; returns the delta in seconds, or `None` when stopped
    pub fn tick(&mut self) -> Option<f32> {
        if !self.running.get() {
            return None;
        }
        let now = self.clock.now();
        let last = self.last_tick.replace(now).unwrap_or(now);
        self.delta_time = now.saturating_sub(last).as_secs_f32();
        self.total_time += self.delta_time;
        self.frame_count += 1;
        Some(self.delta_time)
    }

    /// Delta of the last tick in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Sum of all deltas in seconds
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Ticks processed so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since the first tick
    #[allow(clippy::cast_precision_loss)]
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("running", &self.running.get())
            .field("frame_count", &self.frame_count)
            .field("total_time", &self.total_time)
            .finish_non_exhaustive()
    }
}
