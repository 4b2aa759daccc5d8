use crate::coords::Viewport;
use crate::error::{Error, Result};

/// Engine timing and surface configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Seconds per fixed update.
    pub fixed_step: f64,
    /// Most fixed updates run in one frame; leftover debt is discarded.
    pub max_catch_up: u32,
    /// Upper clamp for a frame delta, in seconds.
    pub max_frame_dt: f64,
    pub viewport: Viewport,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_step: 0.05,
            max_catch_up: 5,
            max_frame_dt: 0.25,
            viewport: Viewport::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_fixed_step(mut self, seconds: f64) -> Self {
        self.fixed_step = seconds;
        self
    }

    pub fn with_max_catch_up(mut self, steps: u32) -> Self {
        self.max_catch_up = steps;
        self
    }

    pub fn with_max_frame_dt(mut self, seconds: f64) -> Self {
        self.max_frame_dt = seconds;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fixed_step.is_finite() && self.fixed_step > 0.0) {
            return Err(Error::invalid(format!("fixed step must be positive, got {}", self.fixed_step)));
        }
        if !(self.max_frame_dt.is_finite() && self.max_frame_dt > 0.0) {
            return Err(Error::invalid(format!("max frame dt must be positive, got {}", self.max_frame_dt)));
        }
        if !self.viewport.is_valid() {
            return Err(Error::invalid(format!("invalid viewport {:?}", self.viewport)));
        }
        Ok(())
    }
}
