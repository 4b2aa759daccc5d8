/// Fixed-timestep accumulator with a catch-up cap.
///
/// Each frame adds its delta to the accumulated debt; every whole `step`
/// of debt yields one fixed update, at most `max_steps` per frame. When the
/// cap is hit the remaining debt is dropped, so a long stall costs at most
/// `max_steps` updates and simulation time slips behind wall time.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: f64,
    max_steps: u32,
    accumulated: f64,
    total_steps: u64,
    dropped: f64,
}

impl FixedStep {
    pub fn new(step: f64, max_steps: u32) -> Self {
        debug_assert!(step > 0.0);
        Self {
            step,
            max_steps,
            accumulated: 0.0,
            total_steps: 0,
            dropped: 0.0,
        }
    }

    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    #[inline]
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Debt carried into the next frame, always below `step` after `advance`.
    #[inline]
    pub fn pending(&self) -> f64 {
        self.accumulated
    }

    /// Fixed steps run since creation.
    #[inline]
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Simulation time discarded by the catch-up cap since creation.
    #[inline]
    pub fn dropped(&self) -> f64 {
        self.dropped
    }

    /// Adds `dt` of debt and returns how many fixed updates to run this frame.
    pub fn advance(&mut self, dt: f64) -> u32 {
        if dt.is_finite() && dt > 0.0 {
            self.accumulated += dt;
        }

        let mut steps = 0;
        while self.accumulated >= self.step && steps < self.max_steps {
            self.accumulated -= self.step;
            steps += 1;
        }

        if steps == self.max_steps && self.accumulated >= self.step {
            log::debug!(
                "fixed step: dropping {:.3}s of debt after {} catch-up steps",
                self.accumulated,
                steps
            );
            self.dropped += self.accumulated;
            self.accumulated = 0.0;
        }

        self.total_steps += u64::from(steps);
        steps
    }

    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}
