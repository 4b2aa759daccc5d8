use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Clamped time since the previous tick, in seconds.
    pub dt: f64,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Produces clamped frame deltas.
///
/// The upper clamp keeps a debugger pause or a minimized window from feeding
/// one enormous delta into the update phase.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the baseline, e.g. after resuming from suspension.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock using the wall clock.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        self.record(elapsed, now)
    }

    /// Advances the clock by an explicit duration instead of the wall clock.
    pub fn advance(&mut self, elapsed: Duration) -> FrameTime {
        self.last += elapsed;
        self.record(elapsed, self.last)
    }

    fn record(&mut self, elapsed: Duration, now: Instant) -> FrameTime {
        let dt = elapsed.clamp(self.dt_min, self.dt_max);
        let ft = FrameTime {
            dt: dt.as_secs_f64(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
